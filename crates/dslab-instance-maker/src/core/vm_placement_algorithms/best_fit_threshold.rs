//! Best Fit algorithm with load threshold.

use std::cmp::Ordering;

use crate::core::common::{Allocation, AllocationVerdict, NodeId};
use crate::core::resource_pool::{NodeInfo, ResourcePool};
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;

/// Prefers the nodes with the highest CPU load after placement, ignoring nodes whose CPU or memory load would
/// exceed the threshold.
pub struct BestFitThreshold {
    threshold: f64,
}

impl BestFitThreshold {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

fn loads_after(alloc: &Allocation, node: &NodeInfo) -> (f64, f64) {
    let cpu_used = (node.cpu_total - node.cpu_available + alloc.cpu_usage) as f64;
    let memory_used = (node.memory_total - node.memory_available + alloc.memory_usage) as f64;
    (cpu_used / node.cpu_total as f64, memory_used / node.memory_total as f64)
}

impl VmPlacementAlgorithm for BestFitThreshold {
    fn select_nodes(&self, alloc: &Allocation, pool: &ResourcePool) -> Vec<NodeId> {
        let mut result: Vec<(NodeId, f64)> = pool
            .get_nodes()
            .filter(|node| pool.can_allocate(alloc, node.id) == AllocationVerdict::Success)
            .filter_map(|node| {
                let (cpu_load, memory_load) = loads_after(alloc, node);
                if cpu_load <= self.threshold && memory_load <= self.threshold {
                    Some((node.id, cpu_load))
                } else {
                    None
                }
            })
            .collect();
        result.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        result.into_iter().map(|(node, _)| node).collect()
    }
}
