use std::collections::HashMap;

use ot::{OtError, Selection, TextOperation, WrappedOperation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::{Client, ClientEffect, ClientError, ClientState};
use crate::undo_manager::{UndoError, UndoManager};

mod adapter;
mod other_client;
mod self_meta;

pub use adapter::{EditorAdapter, SelectionMark, ServerConnector};
pub use other_client::OtherClient;
pub use self_meta::SelfMeta;

#[derive(Debug, Error)]
pub enum DocumentEditorError {
    #[error("Client Error: {0}")]
    Client(#[from] ClientError),
    #[error("Undo Error: {0}")]
    Undo(#[from] UndoError),
    #[error("Ot Error: {0}")]
    Ot(#[from] OtError),
}

/// What the server tells us about another connected user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub selection: Option<Selection>,
}

/// Everything that can happen to an `EditorClient`, coming either from the text widget or from
/// the server.
#[derive(Clone, Debug, PartialEq)]
pub enum EditorEvent {
    /// The user edited the document. `inverse` undoes `operation`.
    Change {
        operation: TextOperation,
        inverse: TextOperation,
    },
    SelectionChange,
    Blur,
    Undo,
    Redo,

    /// The server acknowledged our outstanding operation.
    Ack,
    /// Another user's operation, with that user's selection after it.
    Operation {
        client_id: String,
        operation: TextOperation,
        selection: Option<Selection>,
    },
    /// Another user's selection. `None` when that user has no selection.
    Selection {
        client_id: String,
        selection: Option<Selection>,
    },
    SetName {
        client_id: String,
        name: String,
    },
    ClientLeft {
        client_id: String,
    },
    /// A snapshot of all other connected users.
    Clients(HashMap<String, ClientData>),
    Reconnect,
}

/// Connects a text widget to the server: local edits go out through the `Client` state machine,
/// remote edits come in transformed, and the undo history stays valid across both.
pub struct EditorClient<A, C> {
    client: Client,
    adapter: A,
    connector: C,
    undo_manager: UndoManager<SelfMeta>,
    selection: Selection,
    clients: HashMap<String, OtherClient>,
}

impl<A: EditorAdapter, C: ServerConnector> EditorClient<A, C> {
    pub fn new(
        revision: u64,
        clients: HashMap<String, ClientData>,
        adapter: A,
        connector: C,
    ) -> Self {
        Self::with_undo_manager(revision, clients, adapter, connector, UndoManager::default())
    }

    pub fn with_undo_manager(
        revision: u64,
        clients: HashMap<String, ClientData>,
        mut adapter: A,
        connector: C,
        undo_manager: UndoManager<SelfMeta>,
    ) -> Self {
        let mut other_clients = HashMap::new();
        for (client_id, data) in clients {
            let mut other = OtherClient::new(&client_id, data.name.as_deref());
            if let Some(selection) = data.selection {
                other.update_selection(&mut adapter, selection);
            }
            other_clients.insert(client_id, other);
        }
        let selection = adapter.get_selection();
        Self {
            client: Client::new(revision),
            adapter,
            connector,
            undo_manager,
            selection,
            clients: other_clients,
        }
    }

    pub fn revision(&self) -> u64 {
        self.client.revision()
    }

    pub fn state(&self) -> &ClientState {
        self.client.state()
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    pub fn undo_manager(&self) -> &UndoManager<SelfMeta> {
        &self.undo_manager
    }

    /// The local user's selection as last reported by the widget. Empty while blurred.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn other_client(&self, client_id: &str) -> Option<&OtherClient> {
        self.clients.get(client_id)
    }

    pub fn other_clients(&self) -> impl Iterator<Item = &OtherClient> {
        self.clients.values()
    }

    pub fn handle_event(&mut self, event: EditorEvent) -> Result<(), DocumentEditorError> {
        match event {
            EditorEvent::Change { operation, inverse } => self.on_change(operation, inverse),
            EditorEvent::SelectionChange => {
                self.on_selection_change();
                Ok(())
            }
            EditorEvent::Blur => {
                self.on_blur();
                Ok(())
            }
            EditorEvent::Undo => self.undo(),
            EditorEvent::Redo => self.redo(),
            EditorEvent::Ack => {
                let effects = self.client.server_ack()?;
                self.perform(effects)
            }
            EditorEvent::Operation {
                client_id,
                operation,
                selection,
            } => {
                log::debug!("Received operation {} from {}", operation, client_id);
                let effects = self.client.apply_server(operation)?;
                self.perform(effects)?;
                self.on_other_selection(&client_id, selection);
                Ok(())
            }
            EditorEvent::Selection {
                client_id,
                selection,
            } => {
                self.on_other_selection(&client_id, selection);
                Ok(())
            }
            EditorEvent::SetName { client_id, name } => {
                self.client_object(&client_id).set_name(&name);
                Ok(())
            }
            EditorEvent::ClientLeft { client_id } => {
                self.on_client_left(&client_id);
                Ok(())
            }
            EditorEvent::Clients(clients) => {
                self.on_update_clients(clients);
                Ok(())
            }
            EditorEvent::Reconnect => {
                let effects = self.client.server_reconnect()?;
                self.perform(effects)
            }
        }
    }

    /// Reverts the latest local edit. Does nothing when there is nothing to undo.
    pub fn undo(&mut self) -> Result<(), DocumentEditorError> {
        if !self.undo_manager.can_undo() {
            return Ok(());
        }
        let (adapter, selection) = (&mut self.adapter, &mut self.selection);
        let operation = self.undo_manager.perform_undo(|undo_manager, operation| {
            apply_unredo(undo_manager, adapter, selection, operation)
        })??;
        self.apply_client(operation)
    }

    pub fn redo(&mut self) -> Result<(), DocumentEditorError> {
        if !self.undo_manager.can_redo() {
            return Ok(());
        }
        let (adapter, selection) = (&mut self.adapter, &mut self.selection);
        let operation = self.undo_manager.perform_redo(|undo_manager, operation| {
            apply_unredo(undo_manager, adapter, selection, operation)
        })??;
        self.apply_client(operation)
    }

    fn on_change(
        &mut self,
        operation: TextOperation,
        inverse: TextOperation,
    ) -> Result<(), DocumentEditorError> {
        let selection_before = std::mem::replace(&mut self.selection, self.adapter.get_selection());
        let compose = self
            .undo_manager
            .last_undo()
            .map_or(false, |last| inverse.should_be_composed_with_inverted(&last.wrapped));
        let meta = SelfMeta::new(self.selection.clone(), selection_before);
        self.apply_client(operation)?;

        // The edit is already in the widget, so it is sent even when its undo step is not kept.
        let undo_step = WrappedOperation::new(inverse, Some(meta));
        if let Err(e) = self.undo_manager.add(undo_step.clone(), compose) {
            log::warn!("Could not merge undo step, keeping it separate: {}", e);
            self.undo_manager.add(undo_step, false)?;
        }
        Ok(())
    }

    fn on_selection_change(&mut self) {
        let selection = self.adapter.get_selection();
        if selection == self.selection {
            return;
        }
        self.selection = selection;
        self.send_selection();
    }

    fn on_blur(&mut self) {
        self.selection = Selection::default();
        self.send_selection();
    }

    /// While a buffer is pending, the server could not place our selection correctly, so it is
    /// sent along with the next operation instead.
    fn send_selection(&mut self) {
        if let ClientState::AwaitingWithBuffer { .. } = self.client.state() {
            return;
        }
        let selection = if self.selection.is_empty() {
            None
        } else {
            Some(&self.selection)
        };
        self.connector.send_selection(selection);
    }

    fn on_other_selection(&mut self, client_id: &str, selection: Option<Selection>) {
        let selection = selection.map(|selection| self.client.transform_selection(&selection));
        let other = self
            .clients
            .entry(client_id.to_string())
            .or_insert_with(|| OtherClient::new(client_id, None));
        match selection {
            Some(selection) => other.update_selection(&mut self.adapter, selection),
            None => other.remove_selection(),
        }
    }

    fn on_client_left(&mut self, client_id: &str) {
        log::info!("User disconnected: {}", client_id);
        if let Some(mut other) = self.clients.remove(client_id) {
            other.remove_selection();
        }
    }

    fn on_update_clients(&mut self, clients: HashMap<String, ClientData>) {
        let gone: Vec<String> = self
            .clients
            .keys()
            .filter(|client_id| !clients.contains_key(*client_id))
            .cloned()
            .collect();
        for client_id in gone {
            self.on_client_left(&client_id);
        }

        for (client_id, data) in clients {
            if let Some(name) = &data.name {
                self.client_object(&client_id).set_name(name);
            }
            self.on_other_selection(&client_id, data.selection);
        }
    }

    fn client_object(&mut self, client_id: &str) -> &mut OtherClient {
        self.clients
            .entry(client_id.to_string())
            .or_insert_with(|| OtherClient::new(client_id, None))
    }

    fn apply_client(&mut self, operation: TextOperation) -> Result<(), DocumentEditorError> {
        let effects = self.client.apply_client(operation)?;
        self.perform(effects)
    }

    fn perform(&mut self, effects: Vec<ClientEffect>) -> Result<(), DocumentEditorError> {
        for effect in effects {
            match effect {
                ClientEffect::SendOperation {
                    revision,
                    operation,
                } => {
                    self.connector
                        .send_operation(revision, &operation, &self.selection);
                }
                ClientEffect::ApplyOperation(operation) => self.apply_operation(operation)?,
            }
        }
        Ok(())
    }

    /// Applies an operation from another user to the widget and the undo history.
    fn apply_operation(&mut self, operation: TextOperation) -> Result<(), DocumentEditorError> {
        self.adapter.apply_operation(&operation)?;
        self.on_selection_change();
        self.undo_manager
            .transform(&WrappedOperation::new(operation, None))?;
        Ok(())
    }
}

/// Applies an undo or redo step and records its inverse on the opposite stack.
fn apply_unredo<A: EditorAdapter>(
    undo_manager: &mut UndoManager<SelfMeta>,
    adapter: &mut A,
    selection: &mut Selection,
    operation: WrappedOperation<SelfMeta>,
) -> Result<TextOperation, DocumentEditorError> {
    let inverse = operation.invert(&adapter.get_value())?;
    adapter.apply_operation(&operation.wrapped)?;
    undo_manager.add(inverse, false)?;
    if let Some(meta) = operation.meta {
        *selection = meta.selection_after;
        adapter.set_selection(selection);
    }
    Ok(operation.wrapped)
}
