use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::OtError;

/// A single component of a `TextOperation`.
///
/// You can think of an operation as a list of commands to send to an imaginary cursor. The cursor
/// starts at the beginning of the document, advances a while, inserts some characters, advances
/// again, deletes some characters, etc. Here are the commands:
/// - `Retain(count)`: Advance the cursor by `count` characters.
/// - `Insert(content)`: Insert the string `content` at the current cursor position.
/// - `Delete(count)`: Delete the next `count` characters after the current cursor position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Retain(usize),
    Insert(String),
    Delete(usize),
}

/// An edit script over a document's characters.
///
/// Operations are built incrementally with `retain`, `insert` and `delete`. The builder keeps the
/// component list canonical:
/// - Empty components are dropped.
/// - Adjacent components of the same kind are merged.
/// - When an insert follows a delete, the insert is placed before the delete. Both orders have the
///   same effect, so this makes operations with the same effect compare equal.
///
/// Lengths are measured in `char`s.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<WireOp>", try_from = "Vec<WireOp>")]
pub struct TextOperation {
    ops: Vec<Op>,
    base_len: usize,
    target_len: usize,
}

impl TextOperation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Length of every document this operation can be applied to.
    pub fn base_len(&self) -> usize {
        self.base_len
    }

    /// Length of every document that results from applying this operation.
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Skip over `count` characters.
    pub fn retain(&mut self, count: usize) -> &mut Self {
        if count == 0 {
            return self;
        }
        self.base_len += count;
        self.target_len += count;
        if let Some(Op::Retain(last_count)) = self.ops.last_mut() {
            *last_count += count;
        } else {
            self.ops.push(Op::Retain(count));
        }
        self
    }

    /// Insert `content` at the current position.
    pub fn insert(&mut self, content: &str) -> &mut Self {
        if content.is_empty() {
            return self;
        }
        self.target_len += content.chars().count();
        let len = self.ops.len();
        match self.ops.as_mut_slice() {
            [.., Op::Insert(last)] | [.., Op::Insert(last), Op::Delete(_)] => {
                last.push_str(content);
            }
            [.., Op::Delete(_)] => {
                self.ops.insert(len - 1, Op::Insert(content.to_string()));
            }
            _ => {
                self.ops.push(Op::Insert(content.to_string()));
            }
        }
        self
    }

    /// Delete the next `count` characters.
    pub fn delete(&mut self, count: usize) -> &mut Self {
        if count == 0 {
            return self;
        }
        self.base_len += count;
        if let Some(Op::Delete(last_count)) = self.ops.last_mut() {
            *last_count += count;
        } else {
            self.ops.push(Op::Delete(count));
        }
        self
    }

    /// Appends a component through the builder, so merging and ordering rules still apply.
    pub fn push_op(&mut self, op: &Op) -> &mut Self {
        match op {
            Op::Retain(count) => self.retain(*count),
            Op::Insert(content) => self.insert(content),
            Op::Delete(count) => self.delete(*count),
        }
    }

    /// Tests whether this operation has no effect.
    pub fn is_noop(&self) -> bool {
        matches!(self.ops.as_slice(), [] | [Op::Retain(_)])
    }

    /// Decides whether this operation and the `next` one should share an undo step.
    ///
    /// When you undo your latest changes, you expect the editor not to undo every single keystroke
    /// but the sentence you wrote at a stretch, or the text you removed by holding down backspace.
    /// Returns true when both operations are single inserts that continue one another, or both are
    /// single deletes at the same position (the delete key) or adjoining positions (backspace).
    pub fn should_be_composed_with(&self, next: &TextOperation) -> bool {
        if self.is_noop() || next.is_noop() {
            return true;
        }
        let (start_a, start_b) = (self.start_index(), next.start_index());
        match (self.simple_op(), next.simple_op()) {
            (Some(Op::Insert(a)), Some(Op::Insert(_))) => start_a + a.chars().count() == start_b,
            (Some(Op::Delete(_)), Some(Op::Delete(b_count))) => {
                start_b + b_count == start_a || start_a == start_b
            }
            _ => false,
        }
    }

    /// The same decision for inverted operations, so that
    /// `a.should_be_composed_with(b) == b_inv.should_be_composed_with_inverted(a_inv)`.
    pub fn should_be_composed_with_inverted(&self, other: &TextOperation) -> bool {
        if self.is_noop() || other.is_noop() {
            return true;
        }
        let (start_a, start_b) = (self.start_index(), other.start_index());
        match (self.simple_op(), other.simple_op()) {
            (Some(Op::Insert(a)), Some(Op::Insert(_))) => {
                start_a + a.chars().count() == start_b || start_a == start_b
            }
            (Some(Op::Delete(_)), Some(Op::Delete(b_count))) => start_b + b_count == start_a,
            _ => false,
        }
    }

    /// The only non-retain component, if the operation has at most one.
    fn simple_op(&self) -> Option<&Op> {
        match self.ops.as_slice() {
            [op] => Some(op),
            [Op::Retain(_), op] | [op, Op::Retain(_)] => Some(op),
            [Op::Retain(_), op, Op::Retain(_)] => Some(op),
            _ => None,
        }
    }

    fn start_index(&self) -> usize {
        match self.ops.first() {
            Some(Op::Retain(count)) => *count,
            _ => 0,
        }
    }
}

impl fmt::Display for TextOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match op {
                Op::Retain(count) => write!(f, "retain {}", count)?,
                Op::Insert(content) => write!(f, "insert '{}'", content)?,
                Op::Delete(count) => write!(f, "delete {}", count)?,
            }
        }
        Ok(())
    }
}

/// JSON encoding of one component: a positive integer retains, a negative integer deletes and a
/// string inserts. `[5, "foo", -2, 3]` retains 5, inserts "foo", deletes 2 and retains 3.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireOp {
    Count(i64),
    Content(String),
}

impl From<TextOperation> for Vec<WireOp> {
    fn from(operation: TextOperation) -> Self {
        operation
            .ops
            .into_iter()
            .map(|op| match op {
                Op::Retain(count) => WireOp::Count(count as i64),
                Op::Insert(content) => WireOp::Content(content),
                Op::Delete(count) => WireOp::Count(-(count as i64)),
            })
            .collect()
    }
}

impl TryFrom<Vec<WireOp>> for TextOperation {
    type Error = OtError;

    fn try_from(wire_ops: Vec<WireOp>) -> Result<Self, Self::Error> {
        let mut operation = TextOperation::new();
        // Lengths are tracked separately so absurd counts fail here instead of overflowing.
        let (mut base_len, mut target_len) = (0usize, 0usize);
        for (i, wire_op) in wire_ops.into_iter().enumerate() {
            let too_long = || {
                OtError::InvalidComponent(format!(
                    "Component at index {} makes the operation too long",
                    i
                ))
            };
            match wire_op {
                WireOp::Count(0) => {
                    return Err(OtError::InvalidComponent(format!(
                        "Component at index {} is zero, which is neither a retain nor a delete",
                        i
                    )));
                }
                WireOp::Count(count) => {
                    let n = usize::try_from(count.unsigned_abs()).map_err(|_| too_long())?;
                    base_len = base_len.checked_add(n).ok_or_else(too_long)?;
                    if count > 0 {
                        target_len = target_len.checked_add(n).ok_or_else(too_long)?;
                        operation.retain(n);
                    } else {
                        operation.delete(n);
                    }
                }
                WireOp::Content(content) => {
                    let n = content.chars().count();
                    target_len = target_len.checked_add(n).ok_or_else(too_long)?;
                    operation.insert(&content);
                }
            }
        }
        Ok(operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lengths() {
        let mut operation = TextOperation::new();
        assert_eq!((operation.base_len(), operation.target_len()), (0, 0));
        operation.retain(5);
        assert_eq!((operation.base_len(), operation.target_len()), (5, 5));
        operation.insert("abc");
        assert_eq!((operation.base_len(), operation.target_len()), (5, 8));
        operation.retain(2);
        assert_eq!((operation.base_len(), operation.target_len()), (7, 10));
        operation.delete(2);
        assert_eq!((operation.base_len(), operation.target_len()), (9, 10));
    }

    #[test]
    fn test_lengths_count_chars() {
        let mut operation = TextOperation::new();
        operation.retain(1).insert("héllo");
        assert_eq!(operation.target_len(), 6);
    }

    #[test]
    fn test_empty_components_are_dropped() {
        let mut operation = TextOperation::new();
        operation.retain(0).insert("").delete(0);
        assert!(operation.ops().is_empty());

        let mut operation = TextOperation::new();
        operation
            .retain(5)
            .retain(0)
            .insert("lorem")
            .insert("")
            .delete(3)
            .delete(3)
            .delete(0);
        assert_eq!(operation.ops().len(), 3);
    }

    #[test]
    fn test_merging() {
        let mut operation = TextOperation::new();
        operation.retain(2).retain(3);
        assert_eq!(operation.ops(), &[Op::Retain(5)]);
        operation.insert("abc").insert("xyz");
        assert_eq!(operation.ops().last(), Some(&Op::Insert("abcxyz".to_string())));
        operation.delete(1).delete(1);
        assert_eq!(operation.ops().len(), 3);
        assert_eq!(operation.ops().last(), Some(&Op::Delete(2)));
    }

    #[test]
    fn test_insert_is_ordered_before_delete() {
        let mut a = TextOperation::new();
        a.delete(1).insert("lo").retain(2).retain(3);
        let mut b = TextOperation::new();
        b.delete(1).insert("l").insert("o").retain(5);
        assert_eq!(a.ops(), &[Op::Insert("lo".to_string()), Op::Delete(1), Op::Retain(5)]);
        assert_eq!(a, b);

        a.delete(1);
        b.retain(1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_is_noop() {
        let mut operation = TextOperation::new();
        assert!(operation.is_noop());
        operation.retain(5);
        assert!(operation.is_noop());
        operation.retain(3);
        assert!(operation.is_noop());
        operation.insert("lorem");
        assert!(!operation.is_noop());
    }

    #[test]
    fn test_display() {
        let mut operation = TextOperation::new();
        operation.retain(2).insert("lorem").delete(5).retain(5);
        assert_eq!(
            operation.to_string(),
            "retain 2, insert 'lorem', delete 5, retain 5"
        );
    }

    #[test]
    fn test_from_json() {
        let operation: TextOperation = serde_json::from_str(r#"[2, -1, -1, "cde"]"#).unwrap();
        assert_eq!(operation.ops().len(), 3);
        assert_eq!(operation.base_len(), 4);
        assert_eq!(operation.target_len(), 5);
        assert_eq!(serde_json::to_string(&operation).unwrap(), r#"[2,"cde",-2]"#);
    }

    #[test]
    fn test_from_json_rejects_unknown_components() {
        for json in &[
            r#"[2, -1, -1, "cde", {"insert": "x"}]"#,
            r#"[2, -1, -1, "cde", null]"#,
            r#"[2, 0]"#,
            r#"[1.5]"#,
        ] {
            assert!(
                serde_json::from_str::<TextOperation>(json).is_err(),
                "accepted {}",
                json
            );
        }
    }

    #[test]
    fn test_from_json_rejects_overflowing_lengths() {
        let json = r#"[9223372036854775807, "x", 9223372036854775807, "y", 9223372036854775807]"#;
        let result = serde_json::from_str::<TextOperation>(json);
        match result {
            Err(e) => assert!(e.to_string().contains("too long"), "{}", e),
            _ => panic!("Unexpected result: {:?}", result),
        }

        let json = r#"[-9223372036854775807, -9223372036854775807, -9223372036854775807]"#;
        assert!(serde_json::from_str::<TextOperation>(json).is_err());
    }

    #[test]
    fn test_should_be_composed_with() {
        fn op(build: impl FnOnce(&mut TextOperation)) -> TextOperation {
            let mut operation = TextOperation::new();
            build(&mut operation);
            operation
        }

        let a = op(|o| {
            o.retain(3);
        });
        let b = op(|o| {
            o.retain(1).insert("tag").retain(2);
        });
        assert!(a.should_be_composed_with(&b));
        assert!(b.should_be_composed_with(&a));

        let mut a = op(|o| {
            o.retain(1).insert("a").retain(2);
        });
        let b = op(|o| {
            o.retain(2).insert("b").retain(2);
        });
        assert!(a.should_be_composed_with(&b));
        a.delete(3);
        assert!(!a.should_be_composed_with(&b));

        let a = op(|o| {
            o.retain(1).insert("b").retain(2);
        });
        let b = op(|o| {
            o.retain(1).insert("a").retain(3);
        });
        assert!(!a.should_be_composed_with(&b));

        let a = op(|o| {
            o.retain(4).delete(3).retain(10);
        });
        let b = op(|o| {
            o.retain(2).delete(2).retain(10);
        });
        assert!(a.should_be_composed_with(&b));
        let b = op(|o| {
            o.retain(4).delete(7).retain(3);
        });
        assert!(a.should_be_composed_with(&b));
        let b = op(|o| {
            o.retain(2).delete(9).retain(3);
        });
        assert!(!a.should_be_composed_with(&b));
    }
}
