use std::sync::Arc;

use clap::Parser;

use mesh_harvester::domain::channel::bus::MessageBus;
use mesh_harvester::domain::clock::{SharedClock, SystemClock};
use mesh_harvester::domain::config::HarvestConfig;
use mesh_harvester::domain::sim::sim_launcher::SimLauncher;
use mesh_harvester::{generate_network, logger, run_harvest};

#[derive(Parser, Debug)]
#[command(name = "mesh_harvester", about = "Scans a simulated node mesh and runs timed exploitation batches against the best targets.")]
struct Args {
    /// Path to the network fixture.
    #[arg(long, default_value = "data/network.json")]
    network: String,

    /// Path to an optional config file; defaults apply when absent.
    #[arg(long, default_value = "data/config.json")]
    config: String,

    /// Idle cycles each coordinator runs before shutting down. Runs
    /// indefinitely when omitted.
    #[arg(long)]
    cycles: Option<u64>,
}

#[tokio::main]
async fn main() {
    logger::init();
    log::info!("Logger initialized. Starting harvester.");

    let args = Args::parse();
    let cfg = HarvestConfig::load_or_default(&args.config);

    let network = match generate_network(&args.network) {
        Ok(network) => network,
        Err(e) => {
            log::error!("Could not build the network model: {}", e);
            std::process::exit(1);
        }
    };

    let origin = network.origin().clone();
    let bus = MessageBus::default();
    let clock: SharedClock = Arc::new(SystemClock);
    let launcher = Arc::new(SimLauncher::new(Arc::clone(&network), bus.clone(), Arc::clone(&clock)));

    if let Err(e) = run_harvest(network, launcher, bus, clock, origin, cfg, args.cycles).await {
        log::error!("Harvest run aborted: {}", e);
        std::process::exit(1);
    }

    log::info!("Harvest run finished.");
}
