//! Worst Fit algorithm.

use std::cmp::Reverse;

use crate::core::common::{Allocation, AllocationVerdict, NodeId};
use crate::core::resource_pool::ResourcePool;
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;

/// Prefers the least loaded (by available CPU) suitable nodes.
#[derive(Default)]
pub struct WorstFit;

impl WorstFit {
    pub fn new() -> Self {
        Default::default()
    }
}

impl VmPlacementAlgorithm for WorstFit {
    fn select_nodes(&self, alloc: &Allocation, pool: &ResourcePool) -> Vec<NodeId> {
        let mut result: Vec<NodeId> = pool
            .get_node_ids()
            .filter(|&node| pool.can_allocate(alloc, node) == AllocationVerdict::Success)
            .collect();
        result.sort_by_key(|&node| Reverse(pool.get_available_cpu(node)));
        result
    }
}
