use serde::{Deserialize, Serialize};

use crate::{Meta, Op, TextOperation};

/// A selected range of the document. `anchor` is the side of the selection that stays fixed and
/// `head` is the side where the cursor is. When both are equal, the range is a cursor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub anchor: usize,
    pub head: usize,
}

impl Range {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn cursor(position: usize) -> Self {
        Self::new(position, position)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Moves both ends of the range so they point at the same characters after `operation` is
    /// applied.
    pub fn transform(&self, operation: &TextOperation) -> Range {
        let anchor = transform_index(self.anchor, operation);
        if self.is_empty() {
            return Range::cursor(anchor);
        }
        Range::new(anchor, transform_index(self.head, operation))
    }
}

/// Inserts at or before `index` push it right. Deletes before it pull it left, by at most the
/// distance to `index`.
fn transform_index(index: usize, operation: &TextOperation) -> usize {
    let mut new_index = index;
    let mut remaining = index;
    for op in operation.ops() {
        match op {
            Op::Retain(count) => {
                if *count > remaining {
                    break;
                }
                remaining -= count;
            }
            Op::Insert(content) => {
                new_index += content.chars().count();
            }
            Op::Delete(count) => {
                new_index -= remaining.min(*count);
                if *count > remaining {
                    break;
                }
                remaining -= count;
            }
        }
    }
    new_index
}

/// A list of ranges. An empty list means the editor has no selection at all, e.g. when it is not
/// focused.
///
/// Serialized as `{"ranges": [{"anchor": 3, "head": 5}]}`. A bare array of ranges is accepted when
/// deserializing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SelectionWire")]
pub struct Selection {
    pub ranges: Vec<Range>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectionWire {
    Object { ranges: Vec<Range> },
    Ranges(Vec<Range>),
}

impl From<SelectionWire> for Selection {
    fn from(wire: SelectionWire) -> Self {
        match wire {
            SelectionWire::Object { ranges } | SelectionWire::Ranges(ranges) => Selection { ranges },
        }
    }
}

impl Selection {
    pub fn new(ranges: Vec<Range>) -> Self {
        Self { ranges }
    }

    /// A selection holding a single cursor, or no range at all when there is no position.
    pub fn create_cursor(position: Option<usize>) -> Self {
        match position {
            Some(position) => Self::new(vec![Range::cursor(position)]),
            None => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// True when at least one range is not a cursor.
    pub fn something_selected(&self) -> bool {
        self.ranges.iter().any(|range| !range.is_empty())
    }

    pub fn transform(&self, operation: &TextOperation) -> Selection {
        Selection::new(
            self.ranges
                .iter()
                .map(|range| range.transform(operation))
                .collect(),
        )
    }
}

/// The more recent selection wins.
impl Meta for Selection {
    fn compose(&self, other: &Self) -> Self {
        other.clone()
    }

    fn transform(&self, operation: &TextOperation) -> Self {
        Selection::transform(self, operation)
    }
}
