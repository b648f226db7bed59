use crate::domain::schedule::entry::OperationKind;
use crate::domain::utils::id::{ChannelId, NodeName, WorkerPid};

/// Everything a worker needs to run one scheduled operation and report back.
///
/// The expected duration and landing timestamp let the worker self-correct
/// its internal delay so the completion lands where the planner put it.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub kind: OperationKind,
    pub host: NodeName,
    pub threads: u32,
    pub target: NodeName,
    pub expected_duration_ms: i64,
    pub expected_land: i64,
    /// Channel the completion report must be written to.
    pub report_to: ChannelId,
}

/// Fire-and-forget worker launch interface.
///
/// Returns the new worker's process identifier, or `WorkerPid::FAILED` (0)
/// when the launch did not happen. The core never awaits the launch itself;
/// completion arrives asynchronously on the request's report channel.
pub trait WorkerLauncher: std::fmt::Debug + Send + Sync {
    fn launch(&self, request: LaunchRequest) -> WorkerPid;
}
