use ot::{Meta, Selection, TextOperation};

/// The local user's selection around an entry of the undo stack: the selection before the entry
/// is applied and the one to restore after it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelfMeta {
    pub selection_before: Selection,
    pub selection_after: Selection,
}

impl SelfMeta {
    pub fn new(selection_before: Selection, selection_after: Selection) -> Self {
        Self {
            selection_before,
            selection_after,
        }
    }
}

impl Meta for SelfMeta {
    fn compose(&self, other: &Self) -> Self {
        SelfMeta::new(self.selection_before.clone(), other.selection_after.clone())
    }

    fn invert(&self, _document: &str) -> Self {
        SelfMeta::new(self.selection_after.clone(), self.selection_before.clone())
    }

    fn transform(&self, operation: &TextOperation) -> Self {
        SelfMeta::new(
            self.selection_before.transform(operation),
            self.selection_after.transform(operation),
        )
    }
}
