use crate::domain::config::HarvestConfig;
use crate::domain::net::probe::NodeProbe;
use crate::domain::node::snapshot::NodeSnapshot;
use crate::domain::schedule::assess::{AssessedAction, assess};
use crate::domain::schedule::entry::{Batch, OperationKind, ScheduleEntry};
use crate::domain::utils::id::ChannelId;

/// Builds margin-separated operation batches for one target.
///
/// Planned *end* times are computed first, working backward from a common
/// landing time, because completions, not starts, must land in a precise
/// order. The landing anchor sits one weaken-duration past the earliest
/// permissible time; weaken is the longest of the three operations, so every
/// entry's start then falls at or after "now".
///
/// A batch is only emitted when its total capacity cost fits the target's
/// free capacity at plan time. Otherwise nothing is scheduled this cycle and
/// the caller retries on the next tick.
#[derive(Debug)]
pub struct Planner {
    cfg: HarvestConfig,
}

impl Planner {
    pub fn new(cfg: HarvestConfig) -> Self {
        Planner { cfg }
    }

    /// Assesses `target` and produces the matching batch, or `None` when the
    /// batch does not fit the target's free capacity this cycle.
    ///
    /// `last_end` is the previous batch's last planned end for this target;
    /// batches for one target never overlap.
    pub fn plan(&self, probe: &dyn NodeProbe, target: &NodeSnapshot, owner: ChannelId, now: i64, last_end: i64) -> Option<Batch> {
        let action = assess(target, &self.cfg);
        log::debug!("Assessed '{}' as {} (defense {:.2}/{:.2}, money {:.0}/{:.0})",
            target.name, action, target.defense, target.min_defense, target.money, target.max_money);

        match action {
            AssessedAction::Weaken => self.plan_weaken(probe, target, owner, now, last_end),
            AssessedAction::Grow => self.plan_grow(probe, target, owner, now, last_end),
            AssessedAction::Hack => self.plan_hack(probe, target, owner, now, last_end),
        }
    }

    /// Whether the remaining (not yet launched) part of a batch has to be
    /// thrown away. Returns the reason, or `None` when the plan still holds.
    /// In-flight entries are never cancelled either way.
    pub fn needs_replan(&self, assumed: AssessedAction, pending_cost: i64, fresh: &NodeSnapshot) -> Option<String> {
        let action = assess(fresh, &self.cfg);
        if action != assumed {
            return Some(format!("assessed action changed from {} to {}", assumed, action));
        }

        if fresh.free() < pending_cost {
            return Some(format!("free capacity {} dropped below reserved {}", fresh.free(), pending_cost));
        }

        None
    }

    /// Single weaken entry sized to push defense down to the minimum,
    /// clamped to what free capacity affords. Divisible work: a clamped
    /// weaken still makes progress, so clamping is not a deferral.
    fn plan_weaken(&self, probe: &dyn NodeProbe, target: &NodeSnapshot, owner: ChannelId, now: i64, last_end: i64) -> Option<Batch> {
        let deficit = target.defense - target.min_defense;
        let required = (deficit / self.cfg.weaken_per_thread).ceil() as u32;

        let per_cost = probe.worker_cost(OperationKind::Weaken);
        let affordable = (target.free() / per_cost).max(0) as u32;
        let threads = required.min(affordable);

        if threads == 0 {
            log::debug!("No capacity for a single weaken thread on '{}'. Deferring.", target.name);
            return None;
        }

        let duration = OperationKind::Weaken.duration_ms(probe.base_duration_ms(&target.name));
        let start = now.max(last_end + self.cfg.completion_margin_ms);

        let entry = ScheduleEntry {
            target: target.name.clone(),
            kind: OperationKind::Weaken,
            owner,
            expected_start: start,
            expected_end: start + duration,
            threads,
            cost: threads as i64 * per_cost,
            batch_final: true,
        };

        log::info!("Planned weaken of '{}': {} threads ({} required), landing at {}.", target.name, threads, required, entry.expected_end);

        Some(Batch::new(AssessedAction::Weaken, vec![entry]))
    }

    /// Grow entry plus the mandatory trailing weaken sized to offset the
    /// defense increase the growth causes. Without the compensation, defense
    /// drifts monotonically upward across cycles.
    fn plan_grow(&self, probe: &dyn NodeProbe, target: &NodeSnapshot, owner: ChannelId, now: i64, last_end: i64) -> Option<Batch> {
        let multiplier = (target.max_money / target.money.max(1.0)).max(1.0);
        let grow_threads = probe.growth_threads(&target.name, multiplier).max(1);
        let comp_threads = ((grow_threads as f64 * self.cfg.grow_security_per_thread) / self.cfg.weaken_per_thread).ceil().max(1.0) as u32;

        let cost = grow_threads as i64 * probe.worker_cost(OperationKind::Grow) + comp_threads as i64 * probe.worker_cost(OperationKind::Weaken);
        if cost > target.free() {
            log::debug!("Grow batch for '{}' costs {} but only {} is free. Deferring.", target.name, cost, target.free());
            return None;
        }

        let base = probe.base_duration_ms(&target.name);
        let margin = self.cfg.completion_margin_ms;
        let earliest = now.max(last_end + margin);

        // Growth lands first, its compensation one margin later.
        let grow_end = earliest + OperationKind::Weaken.duration_ms(base);
        let weak_end = grow_end + margin;

        let entries = vec![
            ScheduleEntry {
                target: target.name.clone(),
                kind: OperationKind::Grow,
                owner,
                expected_start: grow_end - OperationKind::Grow.duration_ms(base),
                expected_end: grow_end,
                threads: grow_threads,
                cost: grow_threads as i64 * probe.worker_cost(OperationKind::Grow),
                batch_final: false,
            },
            ScheduleEntry {
                target: target.name.clone(),
                kind: OperationKind::Weaken,
                owner,
                expected_start: weak_end - OperationKind::Weaken.duration_ms(base),
                expected_end: weak_end,
                threads: comp_threads,
                cost: comp_threads as i64 * probe.worker_cost(OperationKind::Weaken),
                batch_final: true,
            },
        ];

        log::info!(
            "Planned grow of '{}': x{:.2} with {} grow / {} weaken threads, landing at {}.",
            target.name, multiplier, grow_threads, comp_threads, weak_end
        );

        Some(Batch::new(AssessedAction::Grow, entries))
    }

    /// The canonical four-entry sequence `[hack, weaken, grow, weaken]` with
    /// durations `[D, 4D, 3.2D, 4D]`. Completions land back-to-back, one
    /// margin apart: the hack's effect before either weaken, the growth's
    /// effect after the second entry but before the fourth.
    fn plan_hack(&self, probe: &dyn NodeProbe, target: &NodeSnapshot, owner: ChannelId, now: i64, last_end: i64) -> Option<Batch> {
        let name = &target.name;

        let fraction = probe.hack_fraction_per_thread(name);
        let hack_threads = if fraction > 0.0 { ((self.cfg.hack_take / fraction).ceil() as u32).max(1) } else { 1 };
        let take = (fraction * hack_threads as f64).min(0.9);

        // Recover the stolen fraction and offset both security bumps.
        let grow_threads = probe.growth_threads(name, 1.0 / (1.0 - take)).max(1);
        let weak1_threads = ((hack_threads as f64 * self.cfg.hack_security_per_thread) / self.cfg.weaken_per_thread).ceil().max(1.0) as u32;
        let weak2_threads = ((grow_threads as f64 * self.cfg.grow_security_per_thread) / self.cfg.weaken_per_thread).ceil().max(1.0) as u32;

        let threads = [hack_threads, weak1_threads, grow_threads, weak2_threads];
        let kinds = [OperationKind::Hack, OperationKind::Weaken, OperationKind::Grow, OperationKind::Weaken];

        let cost: i64 = kinds.iter().zip(threads).map(|(kind, t)| t as i64 * probe.worker_cost(*kind)).sum();
        if cost > target.free() {
            log::debug!("HWGW batch for '{}' costs {} but only {} is free. Deferring.", name, cost, target.free());
            return None;
        }

        let base = probe.base_duration_ms(name);
        let margin = self.cfg.completion_margin_ms;
        let earliest = now.max(last_end + margin);

        // Anchor the first landing one weaken-duration out so that even the
        // earliest start stays in the future.
        let mut next_end = earliest + OperationKind::Weaken.duration_ms(base);

        let mut entries = Vec::with_capacity(4);
        for (i, (kind, t)) in kinds.iter().zip(threads).enumerate() {
            entries.push(ScheduleEntry {
                target: name.clone(),
                kind: *kind,
                owner,
                expected_start: next_end - kind.duration_ms(base),
                expected_end: next_end,
                threads: t,
                cost: t as i64 * probe.worker_cost(*kind),
                batch_final: i == kinds.len() - 1,
            });

            next_end += margin;
        }

        log::info!("Planned HWGW batch for '{}': threads {:?}, cost {}, first landing at {}.", name, threads, cost, earliest + OperationKind::Weaken.duration_ms(base));

        Some(Batch::new(AssessedAction::Hack, entries))
    }
}
