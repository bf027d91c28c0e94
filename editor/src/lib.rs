mod client;
mod colors;
mod document_editor;
mod undo_manager;

pub use client::{Client, ClientEffect, ClientError, ClientEvent, ClientState};
pub use colors::{hsl_to_hex, hue_from_name, rgb_to_hex};
pub use document_editor::{
    ClientData, DocumentEditorError, EditorAdapter, EditorClient, EditorEvent, OtherClient,
    SelectionMark, SelfMeta, ServerConnector,
};
pub use undo_manager::{UndoError, UndoManager, DEFAULT_MAX_UNDO_ITEMS};
