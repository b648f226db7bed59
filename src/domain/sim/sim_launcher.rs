use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::domain::channel::bus::MessageBus;
use crate::domain::channel::protocol::CompletionReport;
use crate::domain::clock::SharedClock;
use crate::domain::dispatch::launcher::{LaunchRequest, WorkerLauncher};
use crate::domain::net::probe::NodeProbe;
use crate::domain::sim::network::SimNetwork;
use crate::domain::utils::id::WorkerPid;

/// Launches simulated workers as independent tokio tasks.
///
/// A worker self-corrects its delay against the expected landing timestamp,
/// sleeps through its operation, applies the effect, releases its capacity
/// and writes one completion report to the owner channel. Write failures
/// are logged and dropped; the worker never retries a report.
#[derive(Debug)]
pub struct SimLauncher {
    net: Arc<SimNetwork>,
    bus: MessageBus,
    clock: SharedClock,
    next_pid: AtomicU32,
}

impl SimLauncher {
    pub fn new(net: Arc<SimNetwork>, bus: MessageBus, clock: SharedClock) -> Self {
        SimLauncher { net, bus, clock, next_pid: AtomicU32::new(1) }
    }
}

impl WorkerLauncher for SimLauncher {
    fn launch(&self, request: LaunchRequest) -> WorkerPid {
        if request.threads == 0 {
            log::error!("Refusing to launch a zero-thread {} worker.", request.kind);
            return WorkerPid::FAILED;
        }

        let cost = request.threads as i64 * self.net.worker_cost(request.kind);
        if !self.net.reserve(&request.host, cost) {
            log::warn!("Host '{}' cannot hold {} more capacity. Launch failed.", request.host, cost);
            return WorkerPid::FAILED;
        }

        let pid = WorkerPid(self.next_pid.fetch_add(1, Ordering::Relaxed));

        let net = Arc::clone(&self.net);
        let bus = self.bus.clone();
        let clock = Arc::clone(&self.clock);

        tokio::spawn(async move {
            let true_start = clock.now_ms();

            // Self-correct so the completion lands where the planner put it.
            let mut delay = request.expected_land - true_start - request.expected_duration_ms;
            if delay < 0 {
                log::debug!("{} {} started {} ms late.", pid, request.kind, -delay);
                delay = 0;
            }

            tokio::time::sleep(Duration::from_millis((delay + request.expected_duration_ms) as u64)).await;

            let ok = net.apply(request.kind, &request.target, request.threads);
            net.release(&request.host, cost);

            let report = if ok {
                CompletionReport::done(pid, true_start, clock.now_ms())
            } else {
                CompletionReport::failed(pid)
            };

            if let Err(e) = bus.try_write(request.report_to, report.encode()) {
                log::error!("{} could not deliver its report: {}", pid, e);
            }
        });

        pid
    }
}
