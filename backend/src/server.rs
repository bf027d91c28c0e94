use ot::{Meta, OtError, WrappedOperation};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Revision {revision} is not in the history of {history_len} operations")]
    RevisionOutOfRange { revision: u64, history_len: usize },
    #[error("Ot Error: {0}")]
    Ot(#[from] OtError),
}

/// The authoritative copy of a document and every operation applied to it. Revision `n` is the
/// document after the first `n` operations.
///
/// Operations from clients are written against some older revision. Transforming them against
/// everything that happened since puts all edits into one order, decided by revision and not by
/// arrival time.
pub struct DocumentServer<M> {
    content: String,
    operations: Vec<WrappedOperation<M>>,
}

impl<M: Meta> DocumentServer<M> {
    pub fn new(content: &str) -> Self {
        Self::with_history(content, Vec::new())
    }

    /// `operations` must be the history that produced `content`.
    pub fn with_history(content: &str, operations: Vec<WrappedOperation<M>>) -> Self {
        Self {
            content: content.to_string(),
            operations,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn revision(&self) -> u64 {
        self.operations.len() as u64
    }

    pub fn operations(&self) -> &[WrappedOperation<M>] {
        &self.operations
    }

    /// Applies an operation a client wrote against `revision` and returns it as applied to the
    /// current document. The caller acknowledges it to the sender and broadcasts the returned
    /// operation to everyone else.
    pub fn receive_operation(
        &mut self,
        revision: u64,
        operation: WrappedOperation<M>,
    ) -> Result<WrappedOperation<M>, ServerError> {
        if revision > self.revision() {
            return Err(ServerError::RevisionOutOfRange {
                revision,
                history_len: self.operations.len(),
            });
        }
        let mut operation = operation;
        for concurrent in &self.operations[revision as usize..] {
            operation = WrappedOperation::transform(&operation, concurrent)?.0;
        }
        self.content = operation.apply(&self.content)?;
        self.operations.push(operation.clone());
        Ok(operation)
    }
}
