use std::collections::VecDeque;
use std::sync::Arc;

use crate::domain::channel::protocol::{CompletionReport, Outcome};
use crate::domain::dispatch::launcher::{LaunchRequest, WorkerLauncher};
use crate::domain::schedule::entry::{Batch, ScheduleEntry};
use crate::domain::utils::id::{NodeName, WorkerPid};
use crate::error::{Error, Result};

#[derive(Debug)]
struct RunningOp {
    entry: ScheduleEntry,
    pid: WorkerPid,
}

/// Launches scheduled entries as independent workers and tracks them until
/// their completion reports come back.
///
/// Dispatch never blocks waiting for a specific worker; the coordinator
/// polls reports opportunistically and feeds them in via `reconcile`. Each
/// planned entry is dispatched at most once: a failed launch or a failed
/// worker is never relaunched verbatim, it forces a replan upstream.
#[derive(Debug)]
pub struct Dispatcher {
    launcher: Arc<dyn WorkerLauncher>,
    host: NodeName,
    /// Total capacity of the host, as last observed. The physical pool is
    /// shared and externally resizable, so this is a figure, not a promise.
    host_capacity: i64,
    /// Free capacity as tracked between snapshots: decremented on launch,
    /// restored on completion, overwritten by every fresh observation.
    free: i64,
    pending: VecDeque<ScheduleEntry>,
    running: Vec<RunningOp>,
}

impl Dispatcher {
    pub fn new(launcher: Arc<dyn WorkerLauncher>, host: NodeName) -> Self {
        Dispatcher { launcher, host, host_capacity: 0, free: 0, pending: VecDeque::new(), running: Vec::new() }
    }

    /// Overwrites the capacity figures with a fresh observation. Called
    /// before every dispatch step; the pool can shrink between plan and
    /// launch and the tracked figure must never win over an observation.
    pub fn sync_capacity(&mut self, total: i64, free: i64) {
        self.host_capacity = total;
        self.free = free;
    }

    pub fn load_batch(&mut self, batch: Batch) {
        log::debug!("Loading batch {} ({} entries, cost {}).", batch.id, batch.entries.len(), batch.total_cost());
        self.pending.extend(batch.entries);
    }

    /// Drops all not-yet-launched entries. In-flight workers keep running;
    /// "cancel" only ever means "stop counting on".
    pub fn discard_pending(&mut self) -> usize {
        let dropped = self.pending.len();
        if dropped > 0 {
            log::info!("Discarding {} pending entries for replan.", dropped);
            self.pending.clear();
        }
        dropped
    }

    /// Summed cost of everything not yet launched.
    pub fn pending_cost(&self) -> i64 {
        self.pending.iter().map(|entry| entry.cost).sum()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Launches every head entry that fits the currently-known free
    /// capacity. Entries whose window has already closed are shifted off
    /// unlaunched.
    ///
    /// Errors:
    /// - `CapacityShortfall` when the head entry could never fit the host's
    ///   total capacity (terminal, reported instead of silently retried;
    ///   the entry's remaining batch siblings are discarded with it),
    /// - `DeliveryFailure` when the launch interface returned the failure
    ///   sentinel (forces a replan).
    pub fn step(&mut self, now: i64) -> Result<()> {
        while let Some(entry) = self.pending.pop_front() {
            if now >= entry.expected_end {
                log::warn!("Window for {} on '{}' closed unlaunched (end {} <= now {}). Shifting off.", entry.kind, entry.target, entry.expected_end, now);
                continue;
            }

            if entry.cost > self.free {
                if entry.cost > self.host_capacity {
                    // The batch's effects only make sense together; without
                    // this entry its siblings must not launch.
                    if !self.pending.is_empty() {
                        log::warn!("Discarding {} sibling entries of an unlaunchable batch.", self.pending.len());
                        self.pending.clear();
                    }

                    return Err(Error::CapacityShortfall {
                        target: entry.target,
                        host: self.host.clone(),
                        needed: entry.cost,
                        capacity: self.host_capacity,
                    });
                }

                // Transient shortfall: defer to the next cycle.
                log::debug!("Head entry needs {} but only {} is free. Waiting.", entry.cost, self.free);
                self.pending.push_front(entry);
                break;
            }

            let pid = self.launcher.launch(LaunchRequest {
                kind: entry.kind,
                host: self.host.clone(),
                threads: entry.threads,
                target: entry.target.clone(),
                expected_duration_ms: entry.expected_end - entry.expected_start,
                expected_land: entry.expected_end,
                report_to: entry.owner,
            });

            if pid.is_failure() {
                let owner = entry.owner;
                log::error!("Launch of {} on '{}' failed. Entry will not be retried.", entry.kind, entry.target);
                return Err(Error::DeliveryFailure(owner));
            }

            log::debug!("Launched {} on '{}' as {} ({} threads, landing {}).", entry.kind, entry.target, pid, entry.threads, entry.expected_end);

            self.free -= entry.cost;
            self.running.push(RunningOp { entry, pid });
        }

        Ok(())
    }

    /// Matches a completion report to its running entry.
    ///
    /// Unknown worker pids are tolerated (duplicated or very late messages)
    /// and logged. A failure outcome surfaces as `DeliveryFailure` so the
    /// coordinator replans the target.
    pub fn reconcile(&mut self, report: CompletionReport) -> Result<Option<ScheduleEntry>> {
        let Some(position) = self.running.iter().position(|op| op.pid == report.worker) else {
            log::warn!("Report from unknown worker {}. Ignoring.", report.worker);
            return Ok(None);
        };

        let op = self.running.swap_remove(position);
        self.free += op.entry.cost;

        match report.outcome {
            Outcome::Done { true_start, true_end } => {
                let drift = true_end - op.entry.expected_end;
                log::info!(
                    "{} on '{}' done: expected {} -> {}, actual {} -> {} (drift {} ms).",
                    op.entry.kind, op.entry.target, op.entry.expected_start, op.entry.expected_end, true_start, true_end, drift
                );
                Ok(Some(op.entry))
            }
            Outcome::Failed => {
                log::error!("{} on '{}' reported failure.", op.entry.kind, op.entry.target);
                Err(Error::DeliveryFailure(op.entry.owner))
            }
        }
    }
}
