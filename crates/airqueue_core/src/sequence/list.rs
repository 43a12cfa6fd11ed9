//! Arena-backed doubly linked sequence with header/trailer sentinels.
//!
//! # Responsibility
//! - Provide O(1) end operations and clamped/bounded positional operations.
//! - Keep every link edit inside this module.
//!
//! # Invariants
//! - Slots `HEADER` and `TRAILER` are sentinels and never hold an item.
//! - For every linked slot `nodes[nodes[i].prev].next == i` and
//!   `nodes[nodes[i].next].prev == i`.
//! - Walking `next` from `HEADER` reaches `TRAILER` in exactly `len + 1` hops.
//! - Unlinked slots are parked on `free` and reused by later inserts.

use super::node::{Node, NodeIndex, HEADER, TRAILER};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::iter::FusedIterator;

pub type SequenceResult<T> = Result<T, SequenceError>;

/// Signalled outcomes for reads and removals that cannot produce an item.
///
/// These are expected conditions, not faults: callers check them the same
/// way they would check `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceError {
    /// The sequence holds no items.
    Empty,
    /// `position` is outside `[0, len)`.
    OutOfRange { position: i64, len: usize },
}

impl Display for SequenceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "sequence is empty"),
            Self::OutOfRange { position, len } => {
                write!(f, "position {position} is out of range for length {len}")
            }
        }
    }
}

impl Error for SequenceError {}

/// Doubly linked sequence stored in a growable arena.
#[derive(Clone)]
pub struct LinkedSequence<T> {
    nodes: Vec<Node<T>>,
    free: Vec<NodeIndex>,
    len: usize,
}

impl<T> Default for LinkedSequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LinkedSequence<T> {
    /// Creates an empty sequence holding only the sentinel pair.
    pub fn new() -> Self {
        Self {
            nodes: vec![
                Node::sentinel(HEADER, TRAILER),
                Node::sentinel(HEADER, TRAILER),
            ],
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of items, excluding sentinels.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Inserts `item` right after the header sentinel.
    pub fn add_first(&mut self, item: T) {
        let first = self.nodes[HEADER].next;
        self.insert_between(item, HEADER, first);
    }

    /// Inserts `item` right before the trailer sentinel.
    pub fn add_last(&mut self, item: T) {
        let last = self.nodes[TRAILER].prev;
        self.insert_between(item, last, TRAILER);
    }

    /// Inserts `item` so that it ends up at `position`.
    ///
    /// `position <= 0` behaves as `add_first`, `position >= len` as
    /// `add_last`. Otherwise the item is linked before the current occupant
    /// of `position`.
    pub fn insert_at(&mut self, position: i64, item: T) {
        if position <= 0 {
            self.add_first(item);
            return;
        }

        let position = usize::try_from(position).unwrap_or(usize::MAX);
        if position >= self.len {
            self.add_last(item);
            return;
        }

        let successor = self.index_at(position);
        let predecessor = self.nodes[successor].prev;
        self.insert_between(item, predecessor, successor);
    }

    /// Unlinks and returns the first item.
    pub fn remove_first(&mut self) -> SequenceResult<T> {
        let first = self.nodes[HEADER].next;
        self.unlink(first).ok_or(SequenceError::Empty)
    }

    /// Unlinks and returns the last item.
    pub fn remove_last(&mut self) -> SequenceResult<T> {
        let last = self.nodes[TRAILER].prev;
        self.unlink(last).ok_or(SequenceError::Empty)
    }

    /// Unlinks and returns the item at `position`.
    pub fn remove_at(&mut self, position: i64) -> SequenceResult<T> {
        let index = self.index_at(self.checked_position(position)?);
        self.unlink(index)
            .ok_or(SequenceError::OutOfRange {
                position,
                len: self.len,
            })
    }

    pub fn get_first(&self) -> SequenceResult<&T> {
        self.item_of(self.nodes[HEADER].next)
            .ok_or(SequenceError::Empty)
    }

    pub fn get_last(&self) -> SequenceResult<&T> {
        self.item_of(self.nodes[TRAILER].prev)
            .ok_or(SequenceError::Empty)
    }

    pub fn get_at(&self, position: i64) -> SequenceResult<&T> {
        let index = self.index_at(self.checked_position(position)?);
        self.item_of(index).ok_or(SequenceError::OutOfRange {
            position,
            len: self.len,
        })
    }

    /// Mutable access to the item at `position`.
    ///
    /// Callers that change a ranked attribute are responsible for re-sorting.
    pub fn get_at_mut(&mut self, position: i64) -> SequenceResult<&mut T> {
        let len = self.len;
        let index = self.index_at(self.checked_position(position)?);
        self.nodes[index]
            .item
            .as_mut()
            .ok_or(SequenceError::OutOfRange { position, len })
    }

    /// Moves the item at `from` in front of the item currently at `to`.
    ///
    /// `to == len` moves the item to the back; larger targets clamp there.
    /// Moving onto its own position is a no-op. A negative `to` is out of
    /// range.
    pub fn move_item(&mut self, from: i64, to: i64) -> SequenceResult<()> {
        self.checked_position(from)?;
        if to < 0 {
            return Err(SequenceError::OutOfRange {
                position: to,
                len: self.len,
            });
        }
        if from == to {
            return Ok(());
        }
        let item = self.remove_at(from)?;
        let target = if to > from { to - 1 } else { to };
        self.insert_at(target, item);
        Ok(())
    }

    /// Returns the position of the first item matching `predicate`.
    pub fn position_of(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.iter().position(predicate)
    }

    /// Drops every item and releases the arena.
    pub fn clear(&mut self) {
        self.nodes.truncate(2);
        self.nodes[HEADER] = Node::sentinel(HEADER, TRAILER);
        self.nodes[TRAILER] = Node::sentinel(HEADER, TRAILER);
        self.free.clear();
        self.len = 0;
    }

    /// Takes every item out in head-to-tail order, leaving the sequence empty.
    pub fn drain_ordered(&mut self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.len);
        let mut cursor = self.nodes[HEADER].next;
        while cursor != TRAILER {
            let next = self.nodes[cursor].next;
            if let Some(item) = self.nodes[cursor].item.take() {
                items.push(item);
            }
            cursor = next;
        }
        self.clear();
        items
    }

    /// Lazy head-to-tail traversal. Calling it again restarts from the head.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            front: self.nodes[HEADER].next,
            back: self.nodes[TRAILER].prev,
            remaining: self.len,
        }
    }

    /// Clones every item in head-to-tail order.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }

    /// Verifies the link invariants listed in the module docs.
    pub fn is_well_linked(&self) -> bool {
        if self.nodes[HEADER].item.is_some() || self.nodes[TRAILER].item.is_some() {
            return false;
        }

        let mut hops = 0usize;
        let mut cursor = HEADER;
        loop {
            let next = self.nodes[cursor].next;
            if next >= self.nodes.len() || self.nodes[next].prev != cursor {
                return false;
            }
            hops += 1;
            if next == TRAILER {
                break;
            }
            if next == HEADER || self.nodes[next].item.is_none() || hops > self.len {
                return false;
            }
            cursor = next;
        }

        hops == self.len + 1 && self.nodes.len() == self.len + 2 + self.free.len()
    }

    pub(super) fn first_index(&self) -> NodeIndex {
        self.nodes[HEADER].next
    }

    pub(super) fn last_index(&self) -> NodeIndex {
        self.nodes[TRAILER].prev
    }

    pub(super) fn next_of(&self, index: NodeIndex) -> NodeIndex {
        self.nodes[index].next
    }

    pub(super) fn prev_of(&self, index: NodeIndex) -> NodeIndex {
        self.nodes[index].prev
    }

    /// Item stored at an arena slot; `None` for sentinels and vacant slots.
    pub(super) fn item_of(&self, index: NodeIndex) -> Option<&T> {
        self.nodes[index].item.as_ref()
    }

    /// Links a new node between two adjacent nodes and returns its slot.
    pub(super) fn insert_between(
        &mut self,
        item: T,
        predecessor: NodeIndex,
        successor: NodeIndex,
    ) -> NodeIndex {
        let node = Node::occupied(item, predecessor, successor);
        let index = match self.free.pop() {
            Some(index) => {
                self.nodes[index] = node;
                index
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        self.nodes[predecessor].next = index;
        self.nodes[successor].prev = index;
        self.len += 1;
        index
    }

    /// Unlinks one data node. Returns `None` for sentinels.
    fn unlink(&mut self, index: NodeIndex) -> Option<T> {
        if index == HEADER || index == TRAILER {
            return None;
        }

        let item = self.nodes[index].item.take()?;
        let (prev, next) = (self.nodes[index].prev, self.nodes[index].next);
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        self.nodes[index].prev = index;
        self.nodes[index].next = index;
        self.free.push(index);
        self.len -= 1;
        Some(item)
    }

    fn checked_position(&self, position: i64) -> SequenceResult<usize> {
        if self.len == 0 {
            return Err(SequenceError::Empty);
        }
        usize::try_from(position)
            .ok()
            .filter(|value| *value < self.len)
            .ok_or(SequenceError::OutOfRange {
                position,
                len: self.len,
            })
    }

    /// Slot of the item at `position`, walking from the closer end.
    ///
    /// `position` must be `< len`.
    fn index_at(&self, position: usize) -> NodeIndex {
        if position <= self.len / 2 {
            let mut cursor = self.nodes[HEADER].next;
            for _ in 0..position {
                cursor = self.nodes[cursor].next;
            }
            cursor
        } else {
            let mut cursor = self.nodes[TRAILER].prev;
            for _ in 0..(self.len - 1 - position) {
                cursor = self.nodes[cursor].prev;
            }
            cursor
        }
    }
}

impl<T: Debug> Debug for LinkedSequence<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T> FromIterator<T> for LinkedSequence<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut sequence = Self::new();
        sequence.extend(iter);
        sequence
    }
}

impl<T> Extend<T> for LinkedSequence<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.add_last(item);
        }
    }
}

impl<'a, T> IntoIterator for &'a LinkedSequence<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> IntoIterator for LinkedSequence<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(mut self) -> Self::IntoIter {
        self.drain_ordered().into_iter()
    }
}

/// Borrowing head-to-tail iterator over a `LinkedSequence`.
pub struct Iter<'a, T> {
    nodes: &'a [Node<T>],
    front: NodeIndex,
    back: NodeIndex,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.front];
        self.front = node.next;
        self.remaining -= 1;
        node.item.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.back];
        self.back = node.prev;
        self.remaining -= 1;
        node.item.as_ref()
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}
