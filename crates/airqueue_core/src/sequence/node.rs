//! Arena cell for the sequence engine.

/// Index of a node inside the sequence arena.
pub(crate) type NodeIndex = usize;

/// Leading sentinel. Always present, never holds an item.
pub(crate) const HEADER: NodeIndex = 0;
/// Trailing sentinel. Always present, never holds an item.
pub(crate) const TRAILER: NodeIndex = 1;

/// One link-holding cell.
///
/// `item` is `None` for both sentinels and for vacant slots on the free list.
/// Links are plain arena indices, so the sequence is the sole owner of every
/// cell and no reference cycle exists.
#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    pub(crate) item: Option<T>,
    pub(crate) prev: NodeIndex,
    pub(crate) next: NodeIndex,
}

impl<T> Node<T> {
    pub(crate) fn sentinel(prev: NodeIndex, next: NodeIndex) -> Self {
        Self {
            item: None,
            prev,
            next,
        }
    }

    pub(crate) fn occupied(item: T, prev: NodeIndex, next: NodeIndex) -> Self {
        Self {
            item: Some(item),
            prev,
            next,
        }
    }
}
