//! Diagnostic rendering of sequence structure.
//!
//! Output is meant for debugging only and is not a stable format.

use super::list::LinkedSequence;
use super::node::{HEADER, TRAILER};
use std::fmt::Display;

const EMPTY_DUMP: &str = "[empty sequence]";
const PREV_LINK: &str = "<-";
const NEXT_LINK: &str = "->";
const SENTINEL_LINK: &str = "x";

impl<T: Display> LinkedSequence<T> {
    /// Renders one line per slot with markers for data neighbours.
    ///
    /// `<-` / `->` mean the slot links to another item on that side, `x`
    /// means the neighbour is a sentinel.
    pub fn visualize(&self) -> String {
        if self.is_empty() {
            return EMPTY_DUMP.to_string();
        }

        let mut lines = Vec::with_capacity(self.len() + 3);
        lines.push(format!("Sequence (size: {})", self.len()));
        lines.push("HEAD".to_string());

        let mut position = 0usize;
        let mut cursor = self.first_index();
        while let Some(item) = self.item_of(cursor) {
            let prev_marker = if self.prev_of(cursor) == HEADER {
                SENTINEL_LINK
            } else {
                PREV_LINK
            };
            let next_marker = if self.next_of(cursor) == TRAILER {
                SENTINEL_LINK
            } else {
                NEXT_LINK
            };
            lines.push(format!("{position}: {prev_marker} [{item}] {next_marker}"));
            position += 1;
            cursor = self.next_of(cursor);
        }

        lines.push("TAIL".to_string());
        lines.join("\n")
    }
}
