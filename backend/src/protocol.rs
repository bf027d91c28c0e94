//! Messages exchanged with editors, one JSON object per line.

use std::collections::BTreeMap;

use ot::{Selection, TextOperation};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Must be the first message on a connection.
    Join { doc_id: String },
    Operation {
        revision: u64,
        operation: TextOperation,
        #[serde(default)]
        selection: Option<Selection>,
    },
    Selection {
        #[serde(default)]
        selection: Option<Selection>,
    },
    SetName { name: String },
}

/// What the server knows about a connected user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The state of the document when joining. `clients` holds the other users.
    Doc {
        client_id: String,
        content: String,
        revision: u64,
        clients: BTreeMap<String, UserData>,
    },
    /// Our operation was accepted.
    Ack,
    /// Someone else's operation, transformed against everything before it.
    Operation {
        client_id: String,
        operation: TextOperation,
        selection: Option<Selection>,
    },
    Selection {
        client_id: String,
        selection: Option<Selection>,
    },
    SetName { client_id: String, name: String },
    ClientLeft { client_id: String },
}
