mod selection;
mod simple_operation;
mod text_operation;
mod wrapped_operation;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use selection::{Range, Selection};
pub use simple_operation::SimpleOperation;
pub use text_operation::{Op, TextOperation};
pub use wrapped_operation::{Meta, WrappedOperation};

use std::cmp::Ordering;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OtError {
    #[error("The operation's base length is {expected}, but the document has length {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Cannot retain past the end of the document")]
    RetainPastEnd,

    #[error("Cannot delete past the end of the document")]
    DeletePastEnd,

    #[error("The operation did not operate on the whole document")]
    IncompleteApply,

    #[error(
        "Cannot compose operations A and B. A.target_len ({first_target}) does not equal \
        B.base_len ({second_base})"
    )]
    IncompatibleLength {
        first_target: usize,
        second_base: usize,
    },

    #[error(
        "Both operations must be based on a document of the same length. A.base_len: {first}, \
        B.base_len: {second}"
    )]
    BaseLengthMismatch { first: usize, second: usize },

    #[error("Invalid operation component: {0}")]
    InvalidComponent(String),

    #[error("Post condition failed: {0}")]
    PostConditionFailed(String),
}

/// Applies `operation` to `document` and returns the new document.
///
/// The operation walks the document from the start: `Retain` copies characters over, `Insert`
/// adds its content and `Delete` skips characters.
///
/// # Errors
///
/// - Returns `OtError::LengthMismatch` when the operation's base length is different from the
/// document's length.
///
/// - Returns `OtError::RetainPastEnd` or `OtError::DeletePastEnd` when the operation runs past the
/// end of the document, and `OtError::IncompleteApply` when it stops short of the end.
///
/// - Returns `OtError::PostConditionFailed` when the resulting document does not have the length
/// the operation should produce.
///
pub fn apply(document: &str, operation: &TextOperation) -> Result<String, OtError> {
    let doc_len = document.chars().count();
    if operation.base_len() != doc_len {
        return Err(OtError::LengthMismatch {
            expected: operation.base_len(),
            actual: doc_len,
        });
    }
    let mut new_document = String::with_capacity(document.len());
    let mut doc_chars = document.chars();
    for op in operation.ops() {
        match op {
            Op::Retain(count) => {
                for _ in 0..*count {
                    let ch = doc_chars.next().ok_or(OtError::RetainPastEnd)?;
                    new_document.push(ch);
                }
            }
            Op::Insert(content) => {
                new_document.push_str(content);
            }
            Op::Delete(count) => {
                for _ in 0..*count {
                    doc_chars.next().ok_or(OtError::DeletePastEnd)?;
                }
            }
        }
    }
    if doc_chars.next().is_some() {
        return Err(OtError::IncompleteApply);
    }
    let new_doc_len = new_document.chars().count();
    if new_doc_len != operation.target_len() {
        return Err(OtError::PostConditionFailed(format!(
            "After applying the operation, the document should have length {}, but it had length {}",
            operation.target_len(),
            new_doc_len,
        )));
    }
    Ok(new_document)
}

/// Computes the inverse of `operation` with respect to `document`, the document as it was
/// *before* the operation was applied. Applying the inverse to the result of the operation restores
/// `document`.
///
/// - `Retain` stays a `Retain`.
/// - `Insert` becomes a `Delete` of the inserted length.
/// - `Delete` becomes an `Insert` of the characters it removed from `document`.
///
/// # Errors
///
/// Returns the same length errors as `apply`, since the inverse is only defined for a document the
/// operation can be applied to.
///
pub fn invert(document: &str, operation: &TextOperation) -> Result<TextOperation, OtError> {
    let doc_len = document.chars().count();
    if operation.base_len() != doc_len {
        return Err(OtError::LengthMismatch {
            expected: operation.base_len(),
            actual: doc_len,
        });
    }
    let mut inverse = TextOperation::new();
    let mut doc_chars = document.chars();
    for op in operation.ops() {
        match op {
            Op::Retain(count) => {
                if doc_chars.by_ref().take(*count).count() != *count {
                    return Err(OtError::RetainPastEnd);
                }
                inverse.retain(*count);
            }
            Op::Insert(content) => {
                inverse.delete(content.chars().count());
            }
            Op::Delete(count) => {
                let deleted: String = doc_chars.by_ref().take(*count).collect();
                if deleted.chars().count() != *count {
                    return Err(OtError::DeletePastEnd);
                }
                inverse.insert(&deleted);
            }
        }
    }
    Ok(inverse)
}

/// Composes two consecutive operations `A` and `B` into a single operation `AB`, such that
/// applying `AB` to a document has the same effect as applying `A` and then `B`.
///
/// # Formal definition of composition
///
/// Let `A` be `a(x) -> y` and `B` be `b(y) -> z`. The composed operation is `ab(x) -> z`, with
/// `ab(x) == b(a(x))` for every document of length `x`.
///
/// # How the operations are merged
///
/// We walk both operations at the same time. The components of `A` are positioned in the document
/// before `A` is applied, while the components of `B` are positioned in the document after `A` is
/// applied. So:
///
/// - A `Delete` in `A` never overlaps with anything in `B`. It is added verbatim to `AB`.
///
/// - An `Insert` in `B` never overlaps with anything in `A`. It is added verbatim to `AB`.
///
/// - A `Retain` in `A` that overlaps with a `Retain` in `B` is retained in `AB`. If it overlaps
/// with a `Delete` in `B`, the characters are deleted in `AB`.
///
/// - An `Insert` in `A` that overlaps with a `Retain` in `B` is inserted in `AB`. If it overlaps
/// with a `Delete` in `B`, the inserted characters cancel out and nothing is added to `AB`.
///
/// # Errors
///
/// - Returns `OtError::IncompatibleLength` when the base length of `B` is not equal to the target
/// length of `A`.
///
/// - Returns `OtError::PostConditionFailed` when the composed operation does not have the correct
/// base and target lengths.
///
pub fn compose(a: &TextOperation, b: &TextOperation) -> Result<TextOperation, OtError> {
    if a.target_len() != b.base_len() {
        return Err(OtError::IncompatibleLength {
            first_target: a.target_len(),
            second_base: b.base_len(),
        });
    }

    let mut composed = TextOperation::new();
    let mut a_ops = a.ops().iter().cloned();
    let mut b_ops = b.ops().iter().cloned();
    let mut maybe_a = a_ops.next();
    let mut maybe_b = b_ops.next();
    loop {
        match (maybe_a, maybe_b) {
            (None, None) => break,
            (Some(Op::Delete(count)), b_op) => {
                composed.delete(count);
                maybe_a = a_ops.next();
                maybe_b = b_op;
            }
            (a_op, Some(Op::Insert(content))) => {
                composed.insert(&content);
                maybe_a = a_op;
                maybe_b = b_ops.next();
            }
            (None, _) | (_, None) => {
                return Err(OtError::PostConditionFailed(String::from(
                    "One operation ended before the other while composing",
                )));
            }
            (Some(Op::Retain(a_count)), Some(Op::Retain(b_count))) => {
                let (overlap, a_rest, b_rest) = split_overlap(a_count, b_count);
                composed.retain(overlap);
                maybe_a = remainder(Op::Retain, a_rest, &mut a_ops);
                maybe_b = remainder(Op::Retain, b_rest, &mut b_ops);
            }
            (Some(Op::Retain(a_count)), Some(Op::Delete(b_count))) => {
                let (overlap, a_rest, b_rest) = split_overlap(a_count, b_count);
                composed.delete(overlap);
                maybe_a = remainder(Op::Retain, a_rest, &mut a_ops);
                maybe_b = remainder(Op::Delete, b_rest, &mut b_ops);
            }
            (Some(Op::Insert(content)), Some(Op::Retain(b_count))) => {
                let content_len = content.chars().count();
                match content_len.cmp(&b_count) {
                    Ordering::Less => {
                        composed.insert(&content);
                        maybe_a = a_ops.next();
                        maybe_b = Some(Op::Retain(b_count - content_len));
                    }
                    Ordering::Equal => {
                        composed.insert(&content);
                        maybe_a = a_ops.next();
                        maybe_b = b_ops.next();
                    }
                    Ordering::Greater => {
                        let (head, tail) = split_at_char(&content, b_count);
                        composed.insert(head);
                        maybe_a = Some(Op::Insert(tail.to_string()));
                        maybe_b = b_ops.next();
                    }
                }
            }
            (Some(Op::Insert(content)), Some(Op::Delete(b_count))) => {
                let content_len = content.chars().count();
                match content_len.cmp(&b_count) {
                    Ordering::Less => {
                        maybe_a = a_ops.next();
                        maybe_b = Some(Op::Delete(b_count - content_len));
                    }
                    Ordering::Equal => {
                        maybe_a = a_ops.next();
                        maybe_b = b_ops.next();
                    }
                    Ordering::Greater => {
                        let (_, tail) = split_at_char(&content, b_count);
                        maybe_a = Some(Op::Insert(tail.to_string()));
                        maybe_b = b_ops.next();
                    }
                }
            }
        }
    }

    if composed.base_len() != a.base_len() || composed.target_len() != b.target_len() {
        return Err(OtError::PostConditionFailed(format!(
            "Composed operation should map length {} to {}, but maps {} to {}",
            a.base_len(),
            b.target_len(),
            composed.base_len(),
            composed.target_len(),
        )));
    }
    Ok(composed)
}

/// Composes a sequence of consecutive operations into one. An empty sequence composes to the
/// empty operation.
pub fn compose_iter<'a, I>(operations: I) -> Result<TextOperation, OtError>
where
    I: IntoIterator<Item = &'a TextOperation>,
{
    let mut operations = operations.into_iter();
    let mut composed = match operations.next() {
        Some(first) => first.clone(),
        None => return Ok(TextOperation::new()),
    };
    for operation in operations {
        composed = compose(&composed, operation)?;
    }
    Ok(composed)
}

/// Given two operations `A` and `B` based on the same version of a document, returns a pair
/// `(A', B')` such that applying `A` then `B'` produces the same document as applying `B` then
/// `A'`. This is the heart of operational transformation.
///
/// # Formal definition of transformation
///
/// An operation can be thought of as a function `f(x) -> y` that takes a document of length `x` as
/// input and returns a document of length `y` as output.
///
/// Let `A` be `a(x) -> y` and `B` be `b(x) -> z`. Note that both of the operations take the same
/// document length `x` as input. We create `a'(z) -> w` and `b'(y) -> w` such that
/// `b'(a(x)) == a'(b(x))`. That is:
/// - Every character retained in both `a(x)` and `b(x)` is retained in the result.
/// - Every character inserted in either `a(x)` or `b(x)` is inserted in the result.
/// - Every character deleted in either `a(x)` or `b(x)` is deleted in the result.
///
/// # How the components are transformed
///
/// - An `Insert` in either operation is added verbatim to its own transformed operation, and
/// becomes a `Retain` of the inserted length in the other one. When both operations insert at the
/// same position, the insert of `A` goes first.
///
/// - Where a `Retain` overlaps with a `Retain`, both transformed operations retain.
///
/// - Where a `Delete` overlaps with a `Retain`, the transformed operation of the deleting side
/// deletes. The other side has nothing to do, since the characters it kept are gone.
///
/// - Where a `Delete` overlaps with a `Delete`, neither transformed operation needs to delete.
/// The characters were already deleted by the other side.
///
/// # Errors
///
/// - Returns `OtError::BaseLengthMismatch` when the operations are based on documents of different
/// lengths.
///
/// - Returns `OtError::PostConditionFailed` when the transformed operations cannot be applied
/// after the other side's operation (i.e. Given `a(x) -> y` and `b(x) -> z`, we created
/// `a'(p) -> q` where `z != p`).
///
pub fn transform(
    a: &TextOperation,
    b: &TextOperation,
) -> Result<(TextOperation, TextOperation), OtError> {
    if a.base_len() != b.base_len() {
        return Err(OtError::BaseLengthMismatch {
            first: a.base_len(),
            second: b.base_len(),
        });
    }

    let mut a_prime = TextOperation::new();
    let mut b_prime = TextOperation::new();
    let mut a_ops = a.ops().iter().cloned();
    let mut b_ops = b.ops().iter().cloned();
    let mut maybe_a = a_ops.next();
    let mut maybe_b = b_ops.next();
    loop {
        match (maybe_a, maybe_b) {
            (None, None) => break,
            (Some(Op::Insert(content)), b_op) => {
                a_prime.insert(&content);
                b_prime.retain(content.chars().count());
                maybe_a = a_ops.next();
                maybe_b = b_op;
            }
            (a_op, Some(Op::Insert(content))) => {
                a_prime.retain(content.chars().count());
                b_prime.insert(&content);
                maybe_a = a_op;
                maybe_b = b_ops.next();
            }
            (None, _) | (_, None) => {
                return Err(OtError::PostConditionFailed(String::from(
                    "One operation ended before the other while transforming",
                )));
            }
            (Some(Op::Retain(a_count)), Some(Op::Retain(b_count))) => {
                let (overlap, a_rest, b_rest) = split_overlap(a_count, b_count);
                a_prime.retain(overlap);
                b_prime.retain(overlap);
                maybe_a = remainder(Op::Retain, a_rest, &mut a_ops);
                maybe_b = remainder(Op::Retain, b_rest, &mut b_ops);
            }
            (Some(Op::Delete(a_count)), Some(Op::Delete(b_count))) => {
                let (_, a_rest, b_rest) = split_overlap(a_count, b_count);
                maybe_a = remainder(Op::Delete, a_rest, &mut a_ops);
                maybe_b = remainder(Op::Delete, b_rest, &mut b_ops);
            }
            (Some(Op::Delete(a_count)), Some(Op::Retain(b_count))) => {
                let (overlap, a_rest, b_rest) = split_overlap(a_count, b_count);
                a_prime.delete(overlap);
                maybe_a = remainder(Op::Delete, a_rest, &mut a_ops);
                maybe_b = remainder(Op::Retain, b_rest, &mut b_ops);
            }
            (Some(Op::Retain(a_count)), Some(Op::Delete(b_count))) => {
                let (overlap, a_rest, b_rest) = split_overlap(a_count, b_count);
                b_prime.delete(overlap);
                maybe_a = remainder(Op::Retain, a_rest, &mut a_ops);
                maybe_b = remainder(Op::Delete, b_rest, &mut b_ops);
            }
        }
    }

    if a_prime.base_len() != b.target_len() || b_prime.base_len() != a.target_len() {
        return Err(OtError::PostConditionFailed(format!(
            "Transformed operations have base lengths ({}, {}), expected ({}, {})",
            a_prime.base_len(),
            b_prime.base_len(),
            b.target_len(),
            a.target_len(),
        )));
    }
    Ok((a_prime, b_prime))
}

/// Splits two overlapping run lengths. Returns the overlap and what is left of each run.
fn split_overlap(a_count: usize, b_count: usize) -> (usize, usize, usize) {
    let overlap = a_count.min(b_count);
    (overlap, a_count - overlap, b_count - overlap)
}

/// The rest of a partially consumed run, or the next component once the run is used up.
fn remainder(
    op: fn(usize) -> Op,
    rest: usize,
    ops: &mut impl Iterator<Item = Op>,
) -> Option<Op> {
    if rest > 0 {
        Some(op(rest))
    } else {
        ops.next()
    }
}

/// Splits `s` after `char_count` characters.
fn split_at_char(s: &str, char_count: usize) -> (&str, &str) {
    let byte_index = s
        .char_indices()
        .nth(char_count)
        .map(|(i, _)| i)
        .unwrap_or_else(|| s.len());
    s.split_at(byte_index)
}
