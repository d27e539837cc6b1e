//! First Fit algorithm.

use crate::core::common::{Allocation, AllocationVerdict, NodeId};
use crate::core::resource_pool::ResourcePool;
use crate::core::vm_placement_algorithm::VmPlacementAlgorithm;

/// Prefers suitable nodes in the order of their IDs.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Default::default()
    }
}

impl VmPlacementAlgorithm for FirstFit {
    fn select_nodes(&self, alloc: &Allocation, pool: &ResourcePool) -> Vec<NodeId> {
        pool.get_node_ids()
            .filter(|&node| pool.can_allocate(alloc, node) == AllocationVerdict::Success)
            .collect()
    }
}
