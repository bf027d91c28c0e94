use std::collections::VecDeque;

use ot::{Meta, OtError, WrappedOperation};
use thiserror::Error;

pub const DEFAULT_MAX_UNDO_ITEMS: usize = 50;

#[derive(Debug, Error)]
pub enum UndoError {
    #[error("Undo is not possible, the undo stack is empty")]
    NothingToUndo,
    #[error("Redo is not possible, the redo stack is empty")]
    NothingToRedo,
    #[error("Ot Error: {0}")]
    Ot(#[from] OtError),
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum UndoState {
    Normal,
    Undoing,
    Redoing,
}

/// Undo and redo stacks of inverted operations.
///
/// Every entry is the inverse of an edit, so undoing means applying the top entry of the undo
/// stack. The operation that undoes *that* is added back through `add` and lands on the redo stack.
pub struct UndoManager<M> {
    max_items: usize,
    state: UndoState,
    dont_compose: bool,
    undo_stack: VecDeque<WrappedOperation<M>>,
    redo_stack: VecDeque<WrappedOperation<M>>,
}

impl<M: Meta> Default for UndoManager<M> {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNDO_ITEMS)
    }
}

impl<M: Meta> UndoManager<M> {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items,
            state: UndoState::Normal,
            dont_compose: false,
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
        }
    }

    /// Adds the inverse of the latest edit.
    ///
    /// While undoing, the operation goes to the redo stack, and while redoing it goes to the undo
    /// stack. Otherwise it goes to the undo stack and the redo stack is cleared. When `compose` is
    /// true, the operation is merged into the top of the undo stack, unless that entry came from
    /// an undo or redo.
    pub fn add(&mut self, operation: WrappedOperation<M>, compose: bool) -> Result<(), UndoError> {
        match self.state {
            UndoState::Undoing => {
                self.redo_stack.push_back(operation);
                self.dont_compose = true;
            }
            UndoState::Redoing => {
                self.undo_stack.push_back(operation);
                self.dont_compose = true;
            }
            UndoState::Normal => {
                let top = if !self.dont_compose && compose {
                    self.undo_stack.pop_back()
                } else {
                    None
                };
                match top {
                    Some(top) => {
                        let composed = match operation.compose(&top) {
                            Ok(composed) => composed,
                            Err(e) => {
                                self.undo_stack.push_back(top);
                                return Err(e.into());
                            }
                        };
                        self.undo_stack.push_back(composed);
                    }
                    None => {
                        self.undo_stack.push_back(operation);
                        if self.undo_stack.len() > self.max_items {
                            self.undo_stack.pop_front();
                        }
                    }
                }
                self.dont_compose = false;
                self.redo_stack.clear();
            }
        }
        Ok(())
    }

    /// Transforms both stacks against an operation made by another client, so their entries apply
    /// to the document as it is after that operation.
    pub fn transform(&mut self, operation: &WrappedOperation<M>) -> Result<(), UndoError> {
        let undo_stack = Self::transform_stack(&self.undo_stack, operation)?;
        let redo_stack = Self::transform_stack(&self.redo_stack, operation)?;
        self.undo_stack = undo_stack;
        self.redo_stack = redo_stack;
        Ok(())
    }

    /// Pops the top of the undo stack and hands it to `f`, which is expected to apply it and `add`
    /// its inverse. That inverse goes to the redo stack.
    pub fn perform_undo<T, F>(&mut self, f: F) -> Result<T, UndoError>
    where
        F: FnOnce(&mut Self, WrappedOperation<M>) -> T,
    {
        let operation = self.undo_stack.pop_back().ok_or(UndoError::NothingToUndo)?;
        self.state = UndoState::Undoing;
        let result = f(self, operation);
        self.state = UndoState::Normal;
        Ok(result)
    }

    /// The inverse of `perform_undo`.
    pub fn perform_redo<T, F>(&mut self, f: F) -> Result<T, UndoError>
    where
        F: FnOnce(&mut Self, WrappedOperation<M>) -> T,
    {
        let operation = self.redo_stack.pop_back().ok_or(UndoError::NothingToRedo)?;
        self.state = UndoState::Redoing;
        let result = f(self, operation);
        self.state = UndoState::Normal;
        Ok(result)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn is_undoing(&self) -> bool {
        self.state == UndoState::Undoing
    }

    pub fn is_redoing(&self) -> bool {
        self.state == UndoState::Redoing
    }

    /// The operation the next undo would apply.
    pub fn last_undo(&self) -> Option<&WrappedOperation<M>> {
        self.undo_stack.back()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    // Entries are transformed from the top of the stack down. Each entry is based on the document
    // right after the entry above it was applied, which is where the running operation lives.
    fn transform_stack(
        stack: &VecDeque<WrappedOperation<M>>,
        operation: &WrappedOperation<M>,
    ) -> Result<VecDeque<WrappedOperation<M>>, OtError> {
        let mut operation = operation.clone();
        let mut transformed = VecDeque::with_capacity(stack.len());
        for item in stack.iter().rev() {
            let (item_prime, operation_prime) = WrappedOperation::transform(item, &operation)?;
            if !item_prime.wrapped.is_noop() {
                transformed.push_front(item_prime);
            }
            operation = operation_prime;
        }
        Ok(transformed)
    }
}
