//! Instance description.

pub mod options;

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::element_store::StoreError;
use crate::core::generator::GenerationError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("can't parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("unknown placement algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("option '{1}' is missing in '{0}'")]
    MissingOption(String, String),
    #[error("option '{1}' has invalid value in '{0}'")]
    InvalidOption(String, String),
    #[error("invalid group: {0}")]
    InvalidGroup(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Holds raw instance config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
struct RawInstanceConfig {
    pub seed: Option<u64>,
    pub planner: Option<String>,
    pub sort_by_demand: Option<bool>,
    pub failure_ratio: Option<f64>,
    pub shuffle_moves: Option<usize>,
    pub nodes: Option<Vec<NodeGroupConfig>>,
    pub vjobs: Option<Vec<VJobGroupConfig>>,
}

/// Holds configuration of a single node or a set of identical nodes.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct NodeGroupConfig {
    /// Node name.
    /// Should be set if count = 1.
    pub name: Option<String>,
    /// Node name prefix.
    /// Full name is produced by appending node instance number (starting from 1) to the prefix.
    /// Should be set if count > 1.
    pub name_prefix: Option<String>,
    /// Number of physical CPUs.
    pub nb_cpus: u32,
    /// CPU capacity.
    pub cpu_capacity: u32,
    /// Memory capacity.
    pub memory_capacity: u64,
    /// Number of such nodes.
    pub count: Option<u32>,
    /// Whether the nodes are online, true by default.
    pub online: Option<bool>,
}

impl NodeGroupConfig {
    pub fn names(&self) -> Result<Vec<String>, ConfigError> {
        group_names(&self.name, &self.name_prefix, self.count.unwrap_or(1))
    }

    pub fn is_online(&self) -> bool {
        self.online.unwrap_or(true)
    }
}

/// Resources of a virtual machine. Demand defaults to consumption, CPU max defaults to CPU consumption.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct VmProfileConfig {
    pub nb_cpus: Option<u32>,
    pub cpu_consumption: u32,
    pub memory_consumption: u64,
    pub cpu_demand: Option<u32>,
    pub memory_demand: Option<u64>,
    pub cpu_max: Option<u32>,
}

/// Holds configuration of a single vjob or a set of identical vjobs.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct VJobGroupConfig {
    /// VJob name.
    /// Should be set if count = 1.
    pub name: Option<String>,
    /// VJob name prefix.
    /// Full name is produced by appending vjob instance number (starting from 1) to the prefix.
    /// Should be set if count > 1.
    pub name_prefix: Option<String>,
    /// Number of such vjobs.
    pub count: Option<u32>,
    /// Number of VMs in each vjob.
    pub vm_count: u32,
    /// Resources of each VM.
    pub vm: VmProfileConfig,
    /// Whether the VMs of each vjob must run on distinct nodes.
    pub spread: Option<bool>,
    /// If set, CPU demand of the vjob VMs is scaled to this share of their CPU max.
    pub cpu_demand_ratio: Option<f64>,
}

impl VJobGroupConfig {
    pub fn names(&self) -> Result<Vec<String>, ConfigError> {
        group_names(&self.name, &self.name_prefix, self.count.unwrap_or(1))
    }
}

fn group_names(name: &Option<String>, name_prefix: &Option<String>, count: u32) -> Result<Vec<String>, ConfigError> {
    match (name, name_prefix) {
        (Some(name), _) if count == 1 => Ok(vec![name.clone()]),
        (_, Some(prefix)) => Ok((1..=count).map(|i| format!("{}{}", prefix, i)).collect()),
        (Some(name), None) => Err(ConfigError::InvalidGroup(format!(
            "'{}' has count {} but no name prefix",
            name, count
        ))),
        (None, None) => Err(ConfigError::InvalidGroup("neither name nor name prefix is set".to_string())),
    }
}

/// Represents instance configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct InstanceConfig {
    /// Seed of the random generator used by failure injection, shuffling and scaling.
    pub seed: u64,
    /// Placement algorithm of the greedy planner, e.g. `FirstFit` or `BestFitThreshold[threshold=0.8]`.
    pub planner: String,
    /// Whether the planner places the most demanding VMs first.
    pub sort_by_demand: bool,
    /// Share of online nodes turned offline by failure injection.
    pub failure_ratio: f64,
    /// Number of relocations attempted by shuffling.
    pub shuffle_moves: usize,
    /// Configurations of nodes.
    pub nodes: Vec<NodeGroupConfig>,
    /// Configurations of vjobs.
    pub vjobs: Vec<VJobGroupConfig>,
}

impl InstanceConfig {
    /// Creates instance config with default parameter values and no nodes or vjobs.
    pub fn new() -> Self {
        Self {
            seed: 123,
            planner: "FirstFit".to_string(),
            sort_by_demand: false,
            failure_ratio: 0.,
            shuffle_moves: 0,
            nodes: Vec::new(),
            vjobs: Vec::new(),
        }
    }

    /// Creates instance config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(file_name).map_err(|source| ConfigError::Read {
            path: file_name.to_string(),
            source,
        })?;
        data.parse()
    }

    /// Checks values that YAML types can't express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0. ..=1.).contains(&self.failure_ratio) {
            return Err(ConfigError::InvalidValue(format!(
                "failure ratio {} is out of [0, 1]",
                self.failure_ratio
            )));
        }
        for group in &self.nodes {
            group.names()?;
        }
        for group in &self.vjobs {
            group.names()?;
            if let Some(ratio) = group.cpu_demand_ratio {
                if !(0. ..=1.).contains(&ratio) {
                    return Err(ConfigError::InvalidValue(format!("cpu demand ratio {} is out of [0, 1]", ratio)));
                }
            }
        }
        Ok(())
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for InstanceConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: RawInstanceConfig = serde_yaml::from_str(s)?;
        let default = Self::new();
        let config = Self {
            seed: raw.seed.unwrap_or(default.seed),
            planner: raw.planner.unwrap_or(default.planner),
            sort_by_demand: raw.sort_by_demand.unwrap_or(default.sort_by_demand),
            failure_ratio: raw.failure_ratio.unwrap_or(default.failure_ratio),
            shuffle_moves: raw.shuffle_moves.unwrap_or(default.shuffle_moves),
            nodes: raw.nodes.unwrap_or_default(),
            vjobs: raw.vjobs.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: InstanceConfig = "nodes: []".parse().unwrap();
        assert_eq!(config, InstanceConfig::new());
    }

    #[test]
    fn group_naming() {
        let single = group_names(&Some("head".to_string()), &None, 1).unwrap();
        assert_eq!(single, vec!["head"]);
        let many = group_names(&None, &Some("n".to_string()), 3).unwrap();
        assert_eq!(many, vec!["n1", "n2", "n3"]);
        assert!(group_names(&Some("head".to_string()), &None, 2).is_err());
        assert!(group_names(&None, &None, 1).is_err());
    }

    #[test]
    fn invalid_failure_ratio() {
        let result = "failure_ratio: 1.5".parse::<InstanceConfig>();
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }
}
