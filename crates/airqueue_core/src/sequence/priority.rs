//! Urgency ranking and rank-aware insertion.
//!
//! # Responsibility
//! - Map flight status to one closed `Rank` via a single exhaustive match.
//! - Insert and re-sort so that ranks form contiguous blocks.
//!
//! # Invariants
//! - Block order is `Emergency`, `Urgent`, `Regular`, `Unranked`.
//! - A new item joins the back of its own block.
//! - `reorder_by_priority` is stable within a rank and idempotent.

use super::list::LinkedSequence;
use super::node::HEADER;
use crate::model::flight::{Flight, FlightStatus};
use serde::{Deserialize, Serialize};

/// Queue urgency class. Lower ranks are served first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Emergency,
    Urgent,
    Regular,
    /// Terminal or otherwise unrecognized states, always sorted last.
    Unranked,
}

impl Rank {
    /// All ranks in serving order.
    pub const ALL: [Rank; 4] = [Rank::Emergency, Rank::Urgent, Rank::Regular, Rank::Unranked];

    /// Urgency class of a flight status.
    pub fn of(status: FlightStatus) -> Self {
        match status {
            FlightStatus::Emergency => Self::Emergency,
            FlightStatus::Boarding => Self::Urgent,
            FlightStatus::Scheduled => Self::Regular,
            FlightStatus::Delayed
            | FlightStatus::Departed
            | FlightStatus::Landed
            | FlightStatus::Cancelled => Self::Unranked,
        }
    }
}

/// Items that can be ordered by urgency.
pub trait Ranked {
    fn rank(&self) -> Rank;
}

impl Ranked for Flight {
    fn rank(&self) -> Rank {
        Rank::of(self.status)
    }
}

/// Per-rank item counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySummary {
    pub emergency: usize,
    pub urgent: usize,
    pub regular: usize,
    pub other: usize,
    pub total: usize,
}

impl PrioritySummary {
    /// Counts one item of `rank`.
    pub fn record(&mut self, rank: Rank) {
        match rank {
            Rank::Emergency => self.emergency += 1,
            Rank::Urgent => self.urgent += 1,
            Rank::Regular => self.regular += 1,
            Rank::Unranked => self.other += 1,
        }
        self.total += 1;
    }

    pub fn count(&self, rank: Rank) -> usize {
        match rank {
            Rank::Emergency => self.emergency,
            Rank::Urgent => self.urgent,
            Rank::Regular => self.regular,
            Rank::Unranked => self.other,
        }
    }
}

impl<T: Ranked> LinkedSequence<T> {
    /// Builds a sequence by appending rank buckets in serving order.
    ///
    /// Relative order inside each bucket follows `items`.
    pub fn from_rank_buckets(items: impl IntoIterator<Item = T>) -> (Self, PrioritySummary) {
        let mut buckets: [Vec<T>; 4] = Default::default();
        let mut summary = PrioritySummary::default();
        for item in items {
            let rank = item.rank();
            summary.record(rank);
            buckets[rank as usize].push(item);
        }

        let sequence = buckets.into_iter().flatten().collect();
        (sequence, summary)
    }

    /// Inserts `item` at the back of its rank block.
    ///
    /// Emergencies walk forward from the head past the emergency block, every
    /// other rank walks backward from the tail past strictly lower-priority
    /// items. Both walks are bounded by the size of the skipped block.
    pub fn insert_by_priority(&mut self, item: T) {
        let rank = item.rank();
        let predecessor = match rank {
            Rank::Emergency => {
                let mut cursor = HEADER;
                loop {
                    let next = self.next_of(cursor);
                    match self.item_of(next) {
                        Some(current) if current.rank() == Rank::Emergency => cursor = next,
                        _ => break cursor,
                    }
                }
            }
            Rank::Urgent | Rank::Regular | Rank::Unranked => {
                let mut cursor = self.last_index();
                while let Some(current) = self.item_of(cursor) {
                    if current.rank() <= rank {
                        break;
                    }
                    cursor = self.prev_of(cursor);
                }
                cursor
            }
        };

        let successor = self.next_of(predecessor);
        self.insert_between(item, predecessor, successor);
    }

    /// Re-sorts every item by rank, keeping encounter order within a rank.
    pub fn reorder_by_priority(&mut self) {
        if self.len() <= 1 {
            return;
        }
        for item in self.drain_ordered() {
            self.insert_by_priority(item);
        }
    }

    /// Counts current items per rank.
    pub fn bucket_counts(&self) -> PrioritySummary {
        self.iter().fold(PrioritySummary::default(), |mut summary, item| {
            summary.record(item.rank());
            summary
        })
    }

    /// Whether ranks currently form contiguous blocks in serving order.
    pub fn is_priority_ordered(&self) -> bool {
        let mut cursor = self.first_index();
        let mut previous = Rank::Emergency;
        while let Some(item) = self.item_of(cursor) {
            let rank = item.rank();
            if rank < previous {
                return false;
            }
            previous = rank;
            cursor = self.next_of(cursor);
        }
        true
    }
}
