use std::collections::BTreeMap;

use ot::{Selection, TextOperation, WrappedOperation};

use crate::protocol::{ClientMessage, ServerMessage, UserData};
use crate::server::DocumentServer;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Recipient {
    Client(String),
    /// Everyone in the session except the given client.
    AllExcept(String),
}

pub type Outgoing = Vec<(Recipient, ServerMessage)>;

/// One document being edited together: the authoritative text plus who is editing it. Handlers
/// return the messages to deliver rather than sending them.
pub struct EditorSession {
    doc_id: String,
    server: DocumentServer<Selection>,
    users: BTreeMap<String, UserData>,
}

impl EditorSession {
    pub fn new(doc_id: &str, content: &str) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            server: DocumentServer::new(content),
            users: BTreeMap::new(),
        }
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn content(&self) -> &str {
        self.server.content()
    }

    pub fn revision(&self) -> u64 {
        self.server.revision()
    }

    pub fn users(&self) -> &BTreeMap<String, UserData> {
        &self.users
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Sends the joining client the document and the users already editing it.
    pub fn join(&mut self, client_id: &str) -> Outgoing {
        log::info!("User {} joined document {}", client_id, self.doc_id);
        let doc = ServerMessage::Doc {
            client_id: client_id.to_string(),
            content: self.server.content().to_string(),
            revision: self.server.revision(),
            clients: self.users.clone(),
        };
        self.users.insert(client_id.to_string(), UserData::default());
        vec![(Recipient::Client(client_id.to_string()), doc)]
    }

    pub fn handle_message(&mut self, client_id: &str, message: ClientMessage) -> Outgoing {
        match message {
            ClientMessage::Join { doc_id } => {
                log::warn!(
                    "User {} tried to join {} while editing {}",
                    client_id,
                    doc_id,
                    self.doc_id
                );
                vec![]
            }
            ClientMessage::Operation {
                revision,
                operation,
                selection,
            } => self.operation(client_id, revision, operation, selection),
            ClientMessage::Selection { selection } => self.selection(client_id, selection),
            ClientMessage::SetName { name } => self.set_name(client_id, name),
        }
    }

    /// Operations that do not fit the history are dropped; the sender never gets an ack for them.
    pub fn operation(
        &mut self,
        client_id: &str,
        revision: u64,
        operation: TextOperation,
        selection: Option<Selection>,
    ) -> Outgoing {
        let wrapped = WrappedOperation::new(operation, selection);
        let applied = match self.server.receive_operation(revision, wrapped) {
            Ok(applied) => applied,
            Err(e) => {
                log::error!(
                    "Dropping operation from {} on document {}: {}",
                    client_id,
                    self.doc_id,
                    e
                );
                return vec![];
            }
        };
        log::debug!(
            "New operation from {} on document {}: {}",
            client_id,
            self.doc_id,
            applied.wrapped
        );
        self.user(client_id).selection = applied.meta.clone();
        vec![
            (Recipient::Client(client_id.to_string()), ServerMessage::Ack),
            (
                Recipient::AllExcept(client_id.to_string()),
                ServerMessage::Operation {
                    client_id: client_id.to_string(),
                    operation: applied.wrapped,
                    selection: applied.meta,
                },
            ),
        ]
    }

    pub fn selection(&mut self, client_id: &str, selection: Option<Selection>) -> Outgoing {
        self.user(client_id).selection = selection.clone();
        vec![(
            Recipient::AllExcept(client_id.to_string()),
            ServerMessage::Selection {
                client_id: client_id.to_string(),
                selection,
            },
        )]
    }

    pub fn set_name(&mut self, client_id: &str, name: String) -> Outgoing {
        self.user(client_id).name = Some(name.clone());
        vec![(
            Recipient::AllExcept(client_id.to_string()),
            ServerMessage::SetName {
                client_id: client_id.to_string(),
                name,
            },
        )]
    }

    pub fn leave(&mut self, client_id: &str) -> Outgoing {
        log::info!("User {} left document {}", client_id, self.doc_id);
        self.users.remove(client_id);
        vec![(
            Recipient::AllExcept(client_id.to_string()),
            ServerMessage::ClientLeft {
                client_id: client_id.to_string(),
            },
        )]
    }

    fn user(&mut self, client_id: &str) -> &mut UserData {
        self.users.entry(client_id.to_string()).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(json: &str) -> TextOperation {
        serde_json::from_str(json).unwrap()
    }

    fn to(client_id: &str) -> Recipient {
        Recipient::Client(client_id.to_string())
    }

    fn all_except(client_id: &str) -> Recipient {
        Recipient::AllExcept(client_id.to_string())
    }

    #[test]
    fn test_join_sends_snapshot() {
        let mut session = EditorSession::new("notes", "lorem dolor");
        session.join("alice");
        session.set_name("alice", "Alice".to_string());

        let outgoing = session.join("bob");
        let mut clients = BTreeMap::new();
        clients.insert(
            "alice".to_string(),
            UserData {
                name: Some("Alice".to_string()),
                selection: None,
            },
        );
        assert_eq!(
            outgoing,
            vec![(
                to("bob"),
                ServerMessage::Doc {
                    client_id: "bob".to_string(),
                    content: "lorem dolor".to_string(),
                    revision: 0,
                    clients,
                }
            )]
        );
        assert_eq!(session.users().len(), 2);
    }

    #[test]
    fn test_operation_is_acked_and_broadcast() {
        let mut session = EditorSession::new("notes", "lorem dolor");
        session.join("alice");
        session.join("bob");

        session.operation("alice", 0, operation(r#"[5," ",6]"#), None);
        let outgoing = session.operation(
            "bob",
            0,
            operation(r#"[11,"!"]"#),
            Some(Selection::create_cursor(Some(12))),
        );
        assert_eq!(
            outgoing,
            vec![
                (to("bob"), ServerMessage::Ack),
                (
                    all_except("bob"),
                    ServerMessage::Operation {
                        client_id: "bob".to_string(),
                        operation: operation(r#"[12,"!"]"#),
                        selection: Some(Selection::create_cursor(Some(13))),
                    }
                ),
            ]
        );
        assert_eq!(session.content(), "lorem  dolor!");
        assert_eq!(session.revision(), 2);
        assert_eq!(
            session.users()["bob"].selection,
            Some(Selection::create_cursor(Some(13)))
        );
    }

    #[test]
    fn test_invalid_operation_is_dropped() {
        let mut session = EditorSession::new("notes", "abc");
        session.join("alice");
        assert!(session
            .operation("alice", 3, operation("[3]"), None)
            .is_empty());
        assert!(session
            .operation("alice", 0, operation("[4]"), None)
            .is_empty());
        assert_eq!(session.revision(), 0);
        assert_eq!(session.content(), "abc");
    }

    #[test]
    fn test_presence_messages() {
        let mut session = EditorSession::new("notes", "abc");
        session.join("alice");
        session.join("bob");

        let outgoing = session.handle_message(
            "alice",
            ClientMessage::Selection {
                selection: Some(Selection::create_cursor(Some(2))),
            },
        );
        assert_eq!(
            outgoing,
            vec![(
                all_except("alice"),
                ServerMessage::Selection {
                    client_id: "alice".to_string(),
                    selection: Some(Selection::create_cursor(Some(2))),
                }
            )]
        );

        let outgoing = session.handle_message("alice", ClientMessage::Selection { selection: None });
        assert_eq!(session.users()["alice"].selection, None);
        assert_eq!(outgoing.len(), 1);

        let outgoing = session.handle_message(
            "bob",
            ClientMessage::SetName {
                name: "Bob".to_string(),
            },
        );
        assert_eq!(
            outgoing,
            vec![(
                all_except("bob"),
                ServerMessage::SetName {
                    client_id: "bob".to_string(),
                    name: "Bob".to_string(),
                }
            )]
        );

        assert!(session
            .handle_message(
                "bob",
                ClientMessage::Join {
                    doc_id: "other".to_string()
                }
            )
            .is_empty());

        let outgoing = session.leave("bob");
        assert_eq!(
            outgoing,
            vec![(
                all_except("bob"),
                ServerMessage::ClientLeft {
                    client_id: "bob".to_string()
                }
            )]
        );
        assert!(!session.is_empty());
        session.leave("alice");
        assert!(session.is_empty());
    }
}
