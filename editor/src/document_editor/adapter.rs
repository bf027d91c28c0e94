use ot::{OtError, Selection, TextOperation};

/// The text widget the user edits in.
///
/// The widget reports changes, selection changes, blur and undo/redo key presses to the
/// `EditorClient` as `EditorEvent`s. A `Change` must be delivered before the `SelectionChange`
/// caused by the same edit.
pub trait EditorAdapter {
    fn get_value(&self) -> String;

    /// Applies a change made by someone else, or an undo/redo step.
    fn apply_operation(&mut self, operation: &TextOperation) -> Result<(), OtError>;

    fn get_selection(&self) -> Selection;

    fn set_selection(&mut self, selection: &Selection);

    /// Highlights another user's selection. The highlight stays until the returned mark is
    /// cleared.
    fn set_other_selection(
        &mut self,
        selection: &Selection,
        color: &str,
        client_id: &str,
    ) -> Box<dyn SelectionMark>;
}

pub trait SelectionMark {
    fn clear(&mut self);
}

/// The connection to the server.
pub trait ServerConnector {
    fn send_operation(&mut self, revision: u64, operation: &TextOperation, selection: &Selection);

    /// `None` tells the other users that this user has no selection, e.g. after a blur.
    fn send_selection(&mut self, selection: Option<&Selection>);
}
