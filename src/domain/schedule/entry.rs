use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::schedule::assess::AssessedAction;
use crate::domain::utils::id::{BatchId, ChannelId, NodeName};

/// The three remote operation kinds of the harvest cycle. Closed on purpose;
/// every match over it is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Extract value. Runs `1.0 * D`.
    Hack,
    /// Lower the defense level. Runs `4.0 * D`.
    Weaken,
    /// Raise the yield. Runs `3.2 * D`.
    Grow,
}

impl OperationKind {
    /// Duration of this operation relative to the node's base duration `D`.
    pub fn duration_factor(self) -> f64 {
        match self {
            OperationKind::Hack => 1.0,
            OperationKind::Weaken => 4.0,
            OperationKind::Grow => 3.2,
        }
    }

    pub fn duration_ms(self, base_duration_ms: i64) -> i64 {
        (base_duration_ms as f64 * self.duration_factor()).round() as i64
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Hack => write!(f, "hack"),
            OperationKind::Weaken => write!(f, "weaken"),
            OperationKind::Grow => write!(f, "grow"),
        }
    }
}

/// One planned remote operation. Created by the planner, consumed (shifted
/// off) by dispatch as it is launched or as time passes its window. Never
/// mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub target: NodeName,
    pub kind: OperationKind,
    /// Channel of the coordinator that must receive the completion report.
    pub owner: ChannelId,
    pub expected_start: i64,
    pub expected_end: i64,
    pub threads: u32,
    /// Total capacity cost (`threads * per-thread worker cost`).
    pub cost: i64,
    /// Marks the batch's final, order-defining entry.
    pub batch_final: bool,
}

/// An ordered set of schedule entries for one target sharing a common
/// landing sequence.
///
/// Invariants upheld by the planner:
/// - entries are sorted by `expected_start` ascending,
/// - exactly one entry carries `batch_final`,
/// - in landing order, consecutive `expected_end`s differ by at least the
///   configured completion margin,
/// - the summed cost fit the target's free capacity at plan time.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: BatchId,
    /// The assessment this batch was built on. A fresh snapshot assessing
    /// differently invalidates the whole remaining batch.
    pub assumed_action: AssessedAction,
    pub entries: VecDeque<ScheduleEntry>,
}

impl Batch {
    pub fn new(assumed_action: AssessedAction, mut entries: Vec<ScheduleEntry>) -> Self {
        entries.sort_by_key(|entry| entry.expected_start);
        Batch { id: BatchId::new(), assumed_action, entries: entries.into() }
    }

    pub fn total_cost(&self) -> i64 {
        self.entries.iter().map(|entry| entry.cost).sum()
    }

    /// Planned end of the batch's order-defining entry. Used to keep the
    /// next batch's first start at or after this batch's last end.
    pub fn last_end(&self) -> i64 {
        self.entries.iter().map(|entry| entry.expected_end).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
