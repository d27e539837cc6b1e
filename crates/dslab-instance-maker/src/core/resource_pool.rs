//! Resource pool state.

use std::collections::BTreeMap;

use crate::core::common::{Allocation, AllocationVerdict, NodeId, VmId};
use crate::core::configuration::Configuration;
use crate::core::element_store::ElementStore;

/// Stores node properties (resource capacity) and state (available resources, current allocations).
#[derive(Clone, Debug)]
pub struct NodeInfo {
    pub id: NodeId,

    pub cpu_total: u32,
    pub memory_total: u64,

    pub cpu_available: u32,
    pub memory_available: u64,

    pub allocations: BTreeMap<VmId, Allocation>,
}

impl NodeInfo {
    /// Creates node info with specified capacity and no allocations.
    pub fn new(id: NodeId, cpu_total: u32, memory_total: u64) -> Self {
        Self {
            id,
            cpu_total,
            memory_total,
            cpu_available: cpu_total,
            memory_available: memory_total,
            allocations: BTreeMap::new(),
        }
    }
}

/// Tracks which part of the node capacities is reserved by VM demands.
#[derive(Clone, Debug, Default)]
pub struct ResourcePool {
    nodes: BTreeMap<NodeId, NodeInfo>,
}

impl ResourcePool {
    /// Creates empty resource pool.
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates pool with online nodes of the configuration, reserving the demand of the running VMs.
    pub fn from_configuration(cfg: &Configuration, store: &ElementStore) -> Self {
        let mut pool = Self::new();
        for &node_id in cfg.onlines() {
            let node = store.node(node_id);
            pool.add_node(node_id, node.cpu_capacity, node.memory_capacity);
            for vm in cfg.runnings_on(node_id) {
                pool.allocate(&store.vm(vm).demand(), node_id);
            }
        }
        pool
    }

    /// Adds node to resource pool.
    pub fn add_node(&mut self, id: NodeId, cpu_total: u32, memory_total: u64) {
        self.nodes.insert(id, NodeInfo::new(id, cpu_total, memory_total));
    }

    /// Returns IDs of all nodes.
    pub fn get_node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn get_nodes(&self) -> impl Iterator<Item = &NodeInfo> {
        self.nodes.values()
    }

    /// Checks if the specified allocation is currently possible on the specified node.
    pub fn can_allocate(&self, alloc: &Allocation, node_id: NodeId) -> AllocationVerdict {
        match self.nodes.get(&node_id) {
            None => AllocationVerdict::NodeNotFound,
            Some(node) if node.cpu_available < alloc.cpu_usage => AllocationVerdict::NotEnoughCPU,
            Some(node) if node.memory_available < alloc.memory_usage => AllocationVerdict::NotEnoughMemory,
            Some(_) => AllocationVerdict::Success,
        }
    }

    /// Applies the specified allocation on the specified node.
    ///
    /// The available resources saturate at zero, so an allocation that does not fit still marks the node as full.
    pub fn allocate(&mut self, alloc: &Allocation, node_id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            if node.allocations.contains_key(&alloc.id) {
                return;
            }
            node.cpu_available = node.cpu_available.saturating_sub(alloc.cpu_usage);
            node.memory_available = node.memory_available.saturating_sub(alloc.memory_usage);
            node.allocations.insert(alloc.id, alloc.clone());
        }
    }

    /// Returns the amount of available CPU on the specified node.
    pub fn get_available_cpu(&self, node_id: NodeId) -> u32 {
        self.nodes[&node_id].cpu_available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alloc(id: VmId, cpu_usage: u32, memory_usage: u64) -> Allocation {
        Allocation {
            id,
            cpu_usage,
            memory_usage,
        }
    }

    #[test]
    fn allocate() {
        let mut pool = ResourcePool::new();
        pool.add_node(0, 4, 8);
        pool.add_node(1, 2, 2);
        assert_eq!(pool.get_node_ids().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(pool.can_allocate(&alloc(0, 3, 2), 0), AllocationVerdict::Success);
        pool.allocate(&alloc(0, 3, 2), 0);
        assert_eq!(pool.get_available_cpu(0), 1);
        assert_eq!(pool.can_allocate(&alloc(1, 2, 2), 0), AllocationVerdict::NotEnoughCPU);
        assert_eq!(pool.can_allocate(&alloc(1, 1, 7), 0), AllocationVerdict::NotEnoughMemory);
        assert_eq!(pool.can_allocate(&alloc(1, 1, 1), 2), AllocationVerdict::NodeNotFound);

        // allocating the same VM twice reserves nothing more
        pool.allocate(&alloc(0, 3, 2), 0);
        assert_eq!(pool.get_available_cpu(0), 1);

        // oversized allocations saturate at zero
        pool.allocate(&alloc(2, 5, 5), 1);
        assert_eq!(pool.get_available_cpu(1), 0);
        let node = pool.get_nodes().find(|node| node.id == 1).unwrap();
        assert_eq!((node.cpu_total, node.memory_available), (2, 0));
    }
}
