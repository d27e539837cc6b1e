//! Node selection algorithms used by the greedy planner.

use crate::config::options::{parse_config_value, parse_options};
use crate::config::ConfigError;
use crate::core::common::{Allocation, NodeId};
use crate::core::resource_pool::ResourcePool;
use crate::core::vm_placement_algorithms::best_fit::BestFit;
use crate::core::vm_placement_algorithms::best_fit_threshold::BestFitThreshold;
use crate::core::vm_placement_algorithms::first_fit::FirstFit;
use crate::core::vm_placement_algorithms::worst_fit::WorstFit;

/// Trait for implementation of VM placement algorithms.
///
/// The algorithm is defined as a function of VM allocation and current resource pool state, which returns the nodes
/// able to host the VM, the preferred ones first. An empty result means there is no suitable node.
///
/// The caller walks the returned nodes in order and keeps the first one accepted by the placement constraints.
pub trait VmPlacementAlgorithm {
    fn select_nodes(&self, alloc: &Allocation, pool: &ResourcePool) -> Vec<NodeId>;
}

/// Creates placement algorithm from its config string, e.g. `BestFit` or `BestFitThreshold[threshold=0.8]`.
pub fn placement_algorithm_resolver(config_str: &str) -> Result<Box<dyn VmPlacementAlgorithm>, ConfigError> {
    let (algorithm_name, options) = parse_config_value(config_str);
    match algorithm_name.as_str() {
        "FirstFit" => Ok(Box::new(FirstFit::new())),
        "BestFit" => Ok(Box::new(BestFit::new())),
        "WorstFit" => Ok(Box::new(WorstFit::new())),
        "BestFitThreshold" => {
            let options = parse_options(&options.unwrap_or_default());
            let threshold = options
                .get("threshold")
                .ok_or_else(|| ConfigError::MissingOption(config_str.to_string(), "threshold".to_string()))?
                .parse::<f64>()
                .map_err(|_| ConfigError::InvalidOption(config_str.to_string(), "threshold".to_string()))?;
            Ok(Box::new(BestFitThreshold::new(threshold)))
        }
        _ => Err(ConfigError::UnknownAlgorithm(config_str.to_string())),
    }
}
