use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::api::network_dto::NetworkDto;
use crate::domain::channel::bus::MessageBus;
use crate::domain::clock::SharedClock;
use crate::domain::config::HarvestConfig;
use crate::domain::coordinator::Coordinator;
use crate::domain::dispatch::launcher::WorkerLauncher;
use crate::domain::net::probe::SharedProbe;
use crate::domain::net::scanner::scan;
use crate::domain::net::selector::TargetSelector;
use crate::domain::node::snapshot::NodeSnapshot;
use crate::domain::sim::network::SimNetwork;
use crate::domain::utils::id::NodeName;
use crate::error::Result;
use crate::loader::parser::parse_json_file;

pub mod api;
pub mod domain;
pub mod error;
pub mod loader;
pub mod logger;

/// Builds the simulated network from a JSON fixture.
pub fn generate_network(file_path: &str) -> Result<Arc<SimNetwork>> {
    let network_dto: NetworkDto = parse_json_file::<NetworkDto>(file_path)?;
    log::info!("JSON file parsed successfully.");

    let network = SimNetwork::from_dto(network_dto)?;
    log::info!("Internal network model constructed successfully.");

    Ok(Arc::new(network))
}

/// A coordinator task under management, with the flag that asks it to halt.
struct ManagedTarget {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Repeatedly scans the network from `origin`, re-selects the best-scoring
/// targets each tick, and keeps one coordinator running per selected target:
/// newly ranked targets get a coordinator spawned, dropped ones are asked to
/// halt. Runs `cycles` selection ticks (forever when `None`), then winds all
/// coordinators down.
pub async fn run_harvest(
    probe: SharedProbe,
    launcher: Arc<dyn WorkerLauncher>,
    bus: MessageBus,
    clock: SharedClock,
    origin: NodeName,
    cfg: HarvestConfig,
    cycles: Option<u64>,
) -> Result<()> {
    let mut selector = TargetSelector::new(cfg.max_targets);
    let mut managed: HashMap<NodeName, ManagedTarget> = HashMap::new();
    let mut retired: Vec<JoinHandle<()>> = Vec::new();
    let mut ticks: u64 = 0;

    loop {
        let tree = scan(probe.as_ref(), &origin);
        let update = selector.select(&tree);

        if update.changed {
            reconcile_managed(&mut managed, &mut retired, &update.targets, &probe, &launcher, &bus, &clock, &origin, &cfg);
        }

        ticks += 1;
        if cycles.is_some_and(|max| ticks >= max) {
            break;
        }

        tokio::time::sleep(Duration::from_millis(cfg.tick_ms.max(0) as u64)).await;
    }

    log::info!("Selection loop done after {} ticks. Stopping {} coordinators.", ticks, managed.len());

    for target in managed.values() {
        target.stop.store(true, Ordering::Relaxed);
    }

    for (name, target) in managed.drain() {
        if let Err(e) = target.handle.await {
            log::error!("Coordinator task for '{}' panicked: {}", name, e);
        }
    }

    for handle in retired {
        if let Err(e) = handle.await {
            log::error!("Retired coordinator task panicked: {}", e);
        }
    }

    Ok(())
}

/// Aligns the running coordinators with a fresh target ranking. Targets that
/// fell out of the ranking are asked to halt; their tasks finish their
/// current cycle and are awaited at shutdown.
#[allow(clippy::too_many_arguments)]
fn reconcile_managed(
    managed: &mut HashMap<NodeName, ManagedTarget>,
    retired: &mut Vec<JoinHandle<()>>,
    targets: &[NodeSnapshot],
    probe: &SharedProbe,
    launcher: &Arc<dyn WorkerLauncher>,
    bus: &MessageBus,
    clock: &SharedClock,
    origin: &NodeName,
    cfg: &HarvestConfig,
) {
    let wanted: Vec<&NodeName> = targets.iter().map(|t| &t.name).collect();

    let dropped: Vec<NodeName> = managed.keys().filter(|name| !wanted.contains(name)).cloned().collect();
    for name in dropped {
        if let Some(target) = managed.remove(&name) {
            log::info!("Target '{}' fell out of the ranking. Stopping its coordinator.", name);
            target.stop.store(true, Ordering::Relaxed);
            retired.push(target.handle);
        }
    }

    for target in targets {
        if managed.contains_key(&target.name) {
            continue;
        }

        let name = target.name.clone();
        let mut coordinator = Coordinator::new(
            name.clone(),
            origin.clone(),
            Arc::clone(probe),
            Arc::clone(launcher),
            bus.clone(),
            Arc::clone(clock),
            cfg.clone(),
        );
        let stop = coordinator.stop_handle();

        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = coordinator.run(None).await {
                log::error!("Coordinator for '{}' aborted: {}", task_name, e);
            }
        });

        managed.insert(name, ManagedTarget { stop, handle });
    }
}
