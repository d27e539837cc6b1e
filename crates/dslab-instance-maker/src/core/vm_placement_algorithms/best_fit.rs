//! Best Fit algorithm.

use crate::core::common::{Allocation, AllocationVerdict, NodeId};
use crate::core::resource_pool::ResourcePool;
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;

/// Prefers the most loaded (by available CPU) suitable nodes.
#[derive(Default)]
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Default::default()
    }
}

impl VmPlacementAlgorithm for BestFit {
    fn select_nodes(&self, alloc: &Allocation, pool: &ResourcePool) -> Vec<NodeId> {
        let mut result: Vec<NodeId> = pool
            .get_node_ids()
            .filter(|&node| pool.can_allocate(alloc, node) == AllocationVerdict::Success)
            .collect();
        result.sort_by_key(|&node| pool.get_available_cpu(node));
        result
    }
}
