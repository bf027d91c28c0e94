//! Every document is owned by one task, so all messages for a document are handled one at a
//! time and in the order they arrive.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::{EditorSession, Outgoing, Recipient};

pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug)]
pub enum Command {
    Join { client_id: String, outbox: Outbox },
    Message { client_id: String, message: ClientMessage },
    Leave { client_id: String },
}

#[derive(Clone, Debug)]
pub struct DocumentHandle {
    sender: mpsc::UnboundedSender<Command>,
}

impl DocumentHandle {
    /// Returns false when the document task is gone.
    pub fn send(&self, command: Command) -> bool {
        self.sender.send(command).is_ok()
    }
}

/// Finds the task of a document, starting it on first use.
#[derive(Clone, Default)]
pub struct Registry {
    documents: Arc<Mutex<HashMap<String, DocumentHandle>>>,
}

impl Registry {
    pub async fn document(&self, doc_id: &str) -> DocumentHandle {
        let mut documents = self.documents.lock().await;
        if let Some(handle) = documents.get(doc_id) {
            if !handle.sender.is_closed() {
                return handle.clone();
            }
        }
        log::info!("Opening document {}", doc_id);
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_document(EditorSession::new(doc_id, ""), receiver));
        let handle = DocumentHandle { sender };
        documents.insert(doc_id.to_string(), handle.clone());
        handle
    }
}

async fn run_document(mut session: EditorSession, mut receiver: mpsc::UnboundedReceiver<Command>) {
    let mut outboxes: HashMap<String, Outbox> = HashMap::new();
    while let Some(command) = receiver.recv().await {
        let outgoing = match command {
            Command::Join { client_id, outbox } => {
                outboxes.insert(client_id.clone(), outbox);
                session.join(&client_id)
            }
            Command::Message { client_id, message } => {
                session.handle_message(&client_id, message)
            }
            Command::Leave { client_id } => {
                outboxes.remove(&client_id);
                let outgoing = session.leave(&client_id);
                if session.is_empty() {
                    log::info!("Nobody is editing document {} anymore", session.doc_id());
                }
                outgoing
            }
        };
        deliver(&outboxes, outgoing);
    }
}

/// A closed outbox means the connection is going away and a `Leave` is on its way.
fn deliver(outboxes: &HashMap<String, Outbox>, outgoing: Outgoing) {
    for (recipient, message) in outgoing {
        match recipient {
            Recipient::Client(client_id) => {
                if let Some(outbox) = outboxes.get(&client_id) {
                    let _ = outbox.send(message);
                }
            }
            Recipient::AllExcept(client_id) => {
                for (id, outbox) in outboxes {
                    if *id != client_id {
                        let _ = outbox.send(message.clone());
                    }
                }
            }
        }
    }
}
