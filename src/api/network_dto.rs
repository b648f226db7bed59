use serde::{Deserialize, Serialize};

/// Wire format of a simulated network fixture.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDto {
    /// Name of the node the scan starts from and workers run on.
    pub origin: String,
    /// Gate tools the harvester holds, lowercase (`"ssh"`, `"ftp"`, ...).
    #[serde(default)]
    pub gate_tools: Vec<String>,
    pub nodes: Vec<NodeDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDto {
    pub id: String,
    pub capacity: i64,
    #[serde(default)]
    pub used: i64,
    pub defense: f64,
    pub min_defense: f64,
    pub money: f64,
    pub max_money: f64,
    #[serde(default)]
    pub required_gates: u8,
    #[serde(default)]
    pub unlocked: bool,
    /// Base operation duration at minimum defense.
    pub base_duration_ms: i64,
    /// Money multiplier applied per grow thread (e.g. 1.02).
    #[serde(default = "default_growth_per_thread")]
    pub growth_per_thread: f64,
    /// Fraction of current money one hack thread extracts.
    #[serde(default = "default_hack_fraction")]
    pub hack_fraction: f64,
    /// Adjacent node ids. Links are undirected; listing one direction is
    /// enough.
    #[serde(default)]
    pub neighbors: Vec<String>,
}

fn default_growth_per_thread() -> f64 {
    1.02
}

fn default_hack_fraction() -> f64 {
    0.002
}
