use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::channel::bus::MessageBus;
use crate::domain::channel::listen::Listener;
use crate::domain::channel::protocol::CompletionReport;
use crate::domain::clock::SharedClock;
use crate::domain::config::HarvestConfig;
use crate::domain::dispatch::dispatcher::Dispatcher;
use crate::domain::dispatch::launcher::WorkerLauncher;
use crate::domain::net::probe::SharedProbe;
use crate::domain::net::scanner::scan;
use crate::domain::node::snapshot::NodeSnapshot;
use crate::domain::schedule::assess::AssessedAction;
use crate::domain::schedule::planner::Planner;
use crate::domain::utils::id::{ChannelId, NodeName};
use crate::error::{Error, Result};

/// The coordinator's control states. Transitions outside the allowed table
/// are an internal consistency violation and halt the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorState {
    Init,
    Scan,
    Select,
    Plan,
    Dispatch,
    Idle,
    Halt,
}

impl CoordinatorState {
    fn allowed(self) -> &'static [CoordinatorState] {
        use CoordinatorState::*;
        match self {
            Init => &[Scan],
            Scan => &[Select],
            Select => &[Plan, Halt],
            Plan => &[Dispatch, Idle],
            Dispatch => &[Idle],
            Idle => &[Scan, Halt],
            Halt => &[],
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoordinatorState::Init => "init",
            CoordinatorState::Scan => "scan",
            CoordinatorState::Select => "select",
            CoordinatorState::Plan => "plan",
            CoordinatorState::Dispatch => "dispatch",
            CoordinatorState::Idle => "idle",
            CoordinatorState::Halt => "halt",
        };
        write!(f, "{}", name)
    }
}

/// One coordinating control flow per managed target.
///
/// Cooperatively multiplexes between scan, plan and dispatch steps; the only
/// suspension points are the idle `listen` and the workers' own operation
/// sleeps. All collaborators are held as named fields, and all network state
/// flows in as immutable snapshots from the scan step.
#[derive(Debug)]
pub struct Coordinator {
    target: NodeName,
    /// Where scans start. Workers run on the target itself.
    origin: NodeName,
    probe: SharedProbe,
    clock: SharedClock,
    cfg: HarvestConfig,
    planner: Planner,
    dispatcher: Dispatcher,
    listener: Listener,
    bus: MessageBus,
    /// This coordinator's own report channel; every entry it plans carries
    /// it as the owner id.
    channel: ChannelId,
    /// Cooperative stop request, set by the selection loop when this target
    /// drops out of the managed set. Checked once per cycle.
    stop: Arc<AtomicBool>,
    state: CoordinatorState,
    /// Assessment the in-flight batch was built on, if any.
    assumed: Option<AssessedAction>,
    /// Last planned end of the previous batch; the next batch starts at or
    /// after it.
    last_end: i64,
    snapshot: Option<NodeSnapshot>,
}

impl Coordinator {
    pub fn new(
        target: NodeName,
        origin: NodeName,
        probe: SharedProbe,
        launcher: Arc<dyn WorkerLauncher>,
        bus: MessageBus,
        clock: SharedClock,
        cfg: HarvestConfig,
    ) -> Self {
        let channel = bus.allocate();

        Coordinator {
            target: target.clone(),
            origin,
            probe,
            clock,
            planner: Planner::new(cfg.clone()),
            dispatcher: Dispatcher::new(launcher, target),
            listener: Listener::new(bus.clone()),
            bus,
            channel,
            stop: Arc::new(AtomicBool::new(false)),
            cfg,
            state: CoordinatorState::Init,
            assumed: None,
            last_end: 0,
            snapshot: None,
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Handle the selection loop uses to ask this coordinator to halt after
    /// its current cycle.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn transition(&mut self, next: CoordinatorState) -> Result<()> {
        if !self.state.allowed().contains(&next) {
            return Err(Error::InvalidTransition { from: self.state.to_string(), to: next.to_string() });
        }

        log::debug!("['{}'] {} => {}", self.target, self.state, next);
        self.state = next;
        Ok(())
    }

    /// Drives the harvest cycle until `max_cycles` idle passes have run
    /// (forever when `None`) or a fatal error occurs.
    pub async fn run(&mut self, max_cycles: Option<u64>) -> Result<()> {
        log::info!("Coordinator for '{}' starting on channel {}.", self.target, self.channel);

        let mut cycles: u64 = 0;
        self.transition(CoordinatorState::Scan)?;

        loop {
            match self.state {
                CoordinatorState::Init => self.transition(CoordinatorState::Scan)?,

                CoordinatorState::Scan => {
                    let tree = scan(self.probe.as_ref(), &self.origin);
                    self.snapshot = tree.find(&self.target).cloned();
                    self.transition(CoordinatorState::Select)?;
                }

                CoordinatorState::Select => match &self.snapshot {
                    Some(snapshot) if snapshot.unlocked => self.transition(CoordinatorState::Plan)?,
                    _ => {
                        log::warn!("Target '{}' is gone or locked. Halting its coordinator.", self.target);
                        self.transition(CoordinatorState::Halt)?;
                    }
                },

                CoordinatorState::Plan => {
                    self.plan_step()?;
                    let next = if self.dispatcher.has_pending() { CoordinatorState::Dispatch } else { CoordinatorState::Idle };
                    self.transition(next)?;
                }

                CoordinatorState::Dispatch => {
                    self.dispatch_step()?;
                    self.transition(CoordinatorState::Idle)?;
                }

                CoordinatorState::Idle => {
                    self.idle_step().await;

                    cycles += 1;
                    let done = max_cycles.is_some_and(|max| cycles >= max) || self.stop.load(Ordering::Relaxed);
                    self.transition(if done { CoordinatorState::Halt } else { CoordinatorState::Scan })?;
                }

                CoordinatorState::Halt => {
                    log::info!("Coordinator for '{}' halted after {} cycles.", self.target, cycles);
                    return Ok(());
                }
            }
        }
    }

    /// Replans when the freshest snapshot invalidates the in-flight batch's
    /// assumptions, and plans a new batch when nothing is in flight.
    fn plan_step(&mut self) -> Result<()> {
        let Some(target) = self.snapshot.clone() else {
            return Ok(());
        };

        if let Some(assumed) = self.assumed
            && self.dispatcher.has_pending()
            && let Some(reason) = self.planner.needs_replan(assumed, self.dispatcher.pending_cost(), &target)
        {
            // Recovered locally, never surfaced to the caller.
            let stale = Error::StaleAssumption { target: self.target.clone(), reason };
            log::info!("Replanning: {}", stale);
            self.dispatcher.discard_pending();
            self.assumed = None;
        }

        if !self.dispatcher.has_pending() && self.dispatcher.running_count() == 0 {
            let now = self.clock.now_ms();
            if let Some(batch) = self.planner.plan(self.probe.as_ref(), &target, self.channel, now, self.last_end) {
                self.last_end = batch.last_end();
                self.assumed = Some(batch.assumed_action);
                self.dispatcher.load_batch(batch);
            }
        }

        Ok(())
    }

    /// Launches affordable entries against a fresh capacity read. The pool
    /// is globally shared, so the figure from plan time is never trusted.
    fn dispatch_step(&mut self) -> Result<()> {
        let total = self.probe.capacity(&self.target);
        let free = total - self.probe.used(&self.target);
        self.dispatcher.sync_capacity(total, free);

        match self.dispatcher.step(self.clock.now_ms()) {
            Ok(()) => Ok(()),
            Err(e @ Error::CapacityShortfall { .. }) => {
                // Terminal for that entry; reported, not retried.
                log::error!("{}", e);
                Ok(())
            }
            Err(Error::DeliveryFailure(channel)) => {
                log::warn!("Launch failure on {}. Forcing replan of '{}'.", channel, self.target);
                self.dispatcher.discard_pending();
                self.assumed = None;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Waits out the tick on this coordinator's channel and reconciles
    /// every report that arrived.
    async fn idle_step(&mut self) {
        let channels = [self.channel];
        if self.listener.listen(&channels, self.cfg.tick_ms, self.cfg.listen_max_interval_ms).await.is_none() {
            return;
        }

        let mut next = self.listener.consume();
        while let Some(raw) = next {
            self.handle_report(&raw);
            next = self.bus.read(self.channel);
        }
    }

    fn handle_report(&mut self, raw: &str) {
        let report = match CompletionReport::decode(raw) {
            Ok(report) => report,
            Err(e) => {
                log::warn!("Dropping undecodable report on {}: {}", self.channel, e);
                return;
            }
        };

        match self.dispatcher.reconcile(report) {
            Ok(Some(entry)) if entry.batch_final => {
                // Batch landed; the next plan starts from a fresh assessment.
                self.assumed = None;
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("Worker failure for '{}': {}. Forcing replan.", self.target, e);
                self.dispatcher.discard_pending();
                self.assumed = None;
            }
        }
    }
}
