use thiserror::Error;

use crate::domain::utils::id::{ChannelId, NodeName};

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Failed to build internal network model: {0}")]
    ModelConstructionError(String),

    /// A schedule was built on state that a later snapshot invalidated.
    /// Recovered locally by discarding pending entries and replanning.
    #[error("Schedule for '{target}' rests on stale state: {reason}")]
    StaleAssumption { target: NodeName, reason: String },

    /// An entry can never be launched because the host's total capacity is
    /// below the entry's cost. Unlike a transient shortfall this is terminal
    /// and must be reported instead of retried forever.
    #[error("Entry for '{target}' needs {needed} capacity but host '{host}' only ever provides {capacity}")]
    CapacityShortfall { target: NodeName, host: NodeName, needed: i64, capacity: i64 },

    /// A channel write did not go through, or a worker came back with the
    /// failure sentinel. Forces a replan for the affected target.
    #[error("Message delivery failed on channel {0}")]
    DeliveryFailure(ChannelId),

    /// Internal consistency violation. Fatal for the coordinator that hit it.
    #[error("Invalid coordinator transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, Error>;
