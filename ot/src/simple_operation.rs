use std::fmt;

use crate::{Op, OtError, TextOperation};

/// A positional edit: one insert or one delete at a zero-based character position. Transforming
/// these is simpler than transforming a full `TextOperation`, but a `Delete` of two overlapping
/// ranges, or an insert landing inside a concurrent delete, can only be resolved by dropping
/// intent. `Noop` is the result in those cases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimpleOperation {
    Insert { text: String, position: usize },
    Delete { count: usize, position: usize },
    Noop,
}

use SimpleOperation::{Delete, Insert, Noop};

impl SimpleOperation {
    pub fn apply(&self, document: &str) -> Result<String, OtError> {
        match self {
            Insert { text, position } => {
                let at = byte_offset(document, *position).ok_or(OtError::RetainPastEnd)?;
                let mut result = String::with_capacity(document.len() + text.len());
                result.push_str(&document[..at]);
                result.push_str(text);
                result.push_str(&document[at..]);
                Ok(result)
            }
            Delete { count, position } => {
                let start = byte_offset(document, *position).ok_or(OtError::RetainPastEnd)?;
                let end =
                    byte_offset(document, position + count).ok_or(OtError::DeletePastEnd)?;
                Ok(format!("{}{}", &document[..start], &document[end..]))
            }
            Noop => Ok(document.to_string()),
        }
    }

    /// Returns `(a', b')` such that `a'` applied after `b` and `b'` applied after `a` lead to the
    /// same document. Inserts at the same position are ordered by their text. Two identical
    /// inserts collapse into one.
    pub fn transform(a: &SimpleOperation, b: &SimpleOperation) -> (SimpleOperation, SimpleOperation) {
        match (a, b) {
            (Noop, _) | (_, Noop) => (a.clone(), b.clone()),

            (
                Insert {
                    text: a_text,
                    position: a_pos,
                },
                Insert {
                    text: b_text,
                    position: b_pos,
                },
            ) => match (a_pos, a_text).cmp(&(b_pos, b_text)) {
                std::cmp::Ordering::Less => (a.clone(), insert(b_text, b_pos + char_len(a_text))),
                std::cmp::Ordering::Greater => {
                    (insert(a_text, a_pos + char_len(b_text)), b.clone())
                }
                std::cmp::Ordering::Equal => (Noop, Noop),
            },

            (
                Insert {
                    text: a_text,
                    position: a_pos,
                },
                Delete {
                    count: b_count,
                    position: b_pos,
                },
            ) => {
                if a_pos <= b_pos {
                    (a.clone(), delete(*b_count, b_pos + char_len(a_text)))
                } else if *a_pos >= b_pos + b_count {
                    (insert(a_text, a_pos - b_count), b.clone())
                } else {
                    // The insert landed inside the deleted range, so it is deleted too.
                    (Noop, delete(b_count + char_len(a_text), *b_pos))
                }
            }

            (
                Delete {
                    count: a_count,
                    position: a_pos,
                },
                Insert {
                    text: b_text,
                    position: b_pos,
                },
            ) => {
                if a_pos >= b_pos {
                    (delete(*a_count, a_pos + char_len(b_text)), b.clone())
                } else if a_pos + a_count <= *b_pos {
                    (a.clone(), insert(b_text, b_pos - a_count))
                } else {
                    (delete(a_count + char_len(b_text), *a_pos), Noop)
                }
            }

            (
                Delete {
                    count: a_count,
                    position: a_pos,
                },
                Delete {
                    count: b_count,
                    position: b_pos,
                },
            ) => {
                let (a_count, a_pos, b_count, b_pos) = (*a_count, *a_pos, *b_count, *b_pos);
                let (a_end, b_end) = (a_pos + a_count, b_pos + b_count);
                if a_pos == b_pos {
                    match a_count.cmp(&b_count) {
                        std::cmp::Ordering::Equal => (Noop, Noop),
                        std::cmp::Ordering::Less => (Noop, delete(b_count - a_count, b_pos)),
                        std::cmp::Ordering::Greater => (delete(a_count - b_count, a_pos), Noop),
                    }
                } else if a_pos < b_pos {
                    if a_end <= b_pos {
                        (a.clone(), delete(b_count, b_pos - a_count))
                    } else if a_end >= b_end {
                        (delete(a_count - b_count, a_pos), Noop)
                    } else {
                        (delete(b_pos - a_pos, a_pos), delete(b_end - a_end, a_pos))
                    }
                } else if a_pos >= b_end {
                    (delete(a_count, a_pos - b_count), b.clone())
                } else if a_end <= b_end {
                    (Noop, delete(b_count - a_count, b_pos))
                } else {
                    (delete(a_end - b_end, b_pos), delete(a_pos - b_pos, b_pos))
                }
            }
        }
    }

    /// Splits `operation` into simple operations that have the same effect when applied one after
    /// the other.
    pub fn from_text_operation(operation: &TextOperation) -> Vec<SimpleOperation> {
        let mut simple_operations = Vec::new();
        let mut index = 0;
        for op in operation.ops() {
            match op {
                Op::Retain(count) => index += count,
                Op::Insert(content) => {
                    simple_operations.push(insert(content, index));
                    index += char_len(content);
                }
                Op::Delete(count) => simple_operations.push(delete(*count, index)),
            }
        }
        simple_operations
    }
}

impl fmt::Display for SimpleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insert { text, position } => write!(f, "Insert({:?}, {})", text, position),
            Delete { count, position } => write!(f, "Delete({}, {})", count, position),
            Noop => write!(f, "Noop()"),
        }
    }
}

fn insert(text: &str, position: usize) -> SimpleOperation {
    Insert {
        text: text.to_string(),
        position,
    }
}

fn delete(count: usize, position: usize) -> SimpleOperation {
    Delete { count, position }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte offset of the character at `char_index`. The end of the string is a valid offset.
fn byte_offset(s: &str, char_index: usize) -> Option<usize> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .nth(char_index)
}
