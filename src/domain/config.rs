use serde::Deserialize;

use crate::loader::parser::get_json_as_str;

/// Tunable knobs of the harvest cycle. Loaded from an optional JSON file;
/// every field falls back to the defaults below when absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// A target whose defense sits above `min_defense + security_margin`
    /// is corrected before anything else.
    pub security_margin: f64,

    /// A target holding less than `max_money * grow_threshold` is grown
    /// before extraction is attempted.
    pub grow_threshold: f64,

    /// Minimum gap in milliseconds between two planned completions.
    pub completion_margin_ms: i64,

    /// Upper bound on simultaneously managed targets.
    pub max_targets: usize,

    /// Pace of the coordinator loop; also the idle listen timeout.
    pub tick_ms: i64,

    /// Cap for the listen poll backoff interval.
    pub listen_max_interval_ms: i64,

    /// Defense units removed per weaken thread-operation.
    pub weaken_per_thread: f64,

    /// Defense units added per grow thread-operation.
    pub grow_security_per_thread: f64,

    /// Defense units added per hack thread-operation.
    pub hack_security_per_thread: f64,

    /// Fraction of a target's current money one hack batch aims to take.
    pub hack_take: f64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        HarvestConfig {
            security_margin: 2.0,
            grow_threshold: 0.8,
            completion_margin_ms: 5,
            max_targets: 5,
            tick_ms: 1000,
            listen_max_interval_ms: 100,
            weaken_per_thread: 0.05,
            grow_security_per_thread: 0.004,
            hack_security_per_thread: 0.002,
            hack_take: 0.25,
        }
    }
}

impl HarvestConfig {
    /// Loads the config from `file_path`, falling back to defaults when the
    /// file is missing or malformed. A malformed file is logged, not fatal.
    pub fn load_or_default(file_path: &str) -> Self {
        match get_json_as_str(file_path) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("Config file '{}' is malformed ({}), using defaults.", file_path, e);
                    HarvestConfig::default()
                }
            },
            None => {
                log::info!("No config file at '{}', using defaults.", file_path);
                HarvestConfig::default()
            }
        }
    }
}
