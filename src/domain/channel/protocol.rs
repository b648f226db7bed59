use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::domain::utils::id::WorkerPid;

/// What a worker observed about its own run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// Operation completed; actual start and end as the worker measured them.
    Done { true_start: i64, true_end: i64 },
    /// Operation failed. Produced once, never retried by the worker.
    Failed,
}

/// A worker's self-report, written to its owner's channel at completion.
/// Produced exactly once per worker; consumed at most once by dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub worker: WorkerPid,
    pub outcome: Outcome,
}

impl CompletionReport {
    pub fn done(worker: WorkerPid, true_start: i64, true_end: i64) -> Self {
        CompletionReport { worker, outcome: Outcome::Done { true_start, true_end } }
    }

    pub fn failed(worker: WorkerPid) -> Self {
        CompletionReport { worker, outcome: Outcome::Failed }
    }

    pub fn encode(&self) -> String {
        // A struct of two plain fields cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_else(|e| {
            log::error!("Failed to encode completion report: {}", e);
            String::new()
        })
    }

    pub fn decode(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_survives_the_wire() {
        let report = CompletionReport::done(WorkerPid(7), 1000, 2500);
        let decoded = CompletionReport::decode(&report.encode()).unwrap();
        assert_eq!(decoded, report);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(CompletionReport::decode("{FAIL: FAIL}").is_err());
    }
}
