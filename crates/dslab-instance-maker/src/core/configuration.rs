//! Placement state of nodes and virtual machines.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::core::common::{Allocation, NodeId, VmId};
use crate::core::element_store::ElementStore;
use crate::core::vm::{VirtualMachine, VmState};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("node #{0} is not online")]
    NodeNotOnline(NodeId),
    #[error("node #{0} still hosts virtual machines")]
    NodeHostsVms(NodeId),
    #[error("node #{0} is not part of the configuration")]
    UnknownNode(NodeId),
}

/// VMs located on a single online node.
#[derive(Clone, Debug, Default, PartialEq)]
struct HostedVms {
    running: BTreeSet<VmId>,
    sleeping: BTreeSet<VmId>,
}

impl HostedVms {
    fn is_empty(&self) -> bool {
        self.running.is_empty() && self.sleeping.is_empty()
    }
}

/// Configuration partitions nodes into online and offline ones and puts each known VM into exactly one state:
/// waiting, running on a node or sleeping on a node. The host of a running or sleeping VM is always online.
///
/// Only element IDs are stored, the elements themselves live in the [`ElementStore`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Configuration {
    onlines: BTreeSet<NodeId>,
    offlines: BTreeSet<NodeId>,
    waitings: BTreeSet<VmId>,
    runnings: BTreeMap<VmId, NodeId>,
    sleepings: BTreeMap<VmId, NodeId>,
    hosted: BTreeMap<NodeId, HostedVms>,
}

impl Configuration {
    /// Creates empty configuration.
    pub fn new() -> Self {
        Default::default()
    }

    /// Puts the node online. An offline node is switched online.
    pub fn add_online(&mut self, node: NodeId) {
        self.offlines.remove(&node);
        self.onlines.insert(node);
        self.hosted.entry(node).or_default();
    }

    /// Puts the node offline. Fails if the node still hosts some VMs.
    pub fn add_offline(&mut self, node: NodeId) -> Result<(), ConfigurationError> {
        if self.hosted.get(&node).map_or(false, |h| !h.is_empty()) {
            return Err(ConfigurationError::NodeHostsVms(node));
        }
        self.onlines.remove(&node);
        self.hosted.remove(&node);
        self.offlines.insert(node);
        Ok(())
    }

    /// Puts the VM into waiting state, erasing its previous location if any.
    pub fn add_waiting(&mut self, vm: VmId) {
        self.detach(vm);
        self.waitings.insert(vm);
    }

    /// Sets the VM running on the specified online node.
    pub fn set_run_on(&mut self, vm: VmId, node: NodeId) -> Result<(), ConfigurationError> {
        if !self.onlines.contains(&node) {
            return Err(ConfigurationError::NodeNotOnline(node));
        }
        self.detach(vm);
        self.runnings.insert(vm, node);
        self.hosted.entry(node).or_default().running.insert(vm);
        Ok(())
    }

    /// Sets the VM sleeping on the specified online node.
    pub fn set_sleep_on(&mut self, vm: VmId, node: NodeId) -> Result<(), ConfigurationError> {
        if !self.onlines.contains(&node) {
            return Err(ConfigurationError::NodeNotOnline(node));
        }
        self.detach(vm);
        self.sleepings.insert(vm, node);
        self.hosted.entry(node).or_default().sleeping.insert(vm);
        Ok(())
    }

    /// Removes the VM from the configuration. Returns `false` if the VM was not there.
    pub fn remove_vm(&mut self, vm: VmId) -> bool {
        self.detach(vm)
    }

    /// Removes the node from the configuration. Fails if the node is unknown or still hosts some VMs.
    pub fn remove_node(&mut self, node: NodeId) -> Result<(), ConfigurationError> {
        if self.hosted.get(&node).map_or(false, |h| !h.is_empty()) {
            return Err(ConfigurationError::NodeHostsVms(node));
        }
        if !self.onlines.remove(&node) && !self.offlines.remove(&node) {
            return Err(ConfigurationError::UnknownNode(node));
        }
        self.hosted.remove(&node);
        Ok(())
    }

    fn detach(&mut self, vm: VmId) -> bool {
        if self.waitings.remove(&vm) {
            return true;
        }
        if let Some(node) = self.runnings.remove(&vm) {
            if let Some(hosted) = self.hosted.get_mut(&node) {
                hosted.running.remove(&vm);
            }
            return true;
        }
        if let Some(node) = self.sleepings.remove(&vm) {
            if let Some(hosted) = self.hosted.get_mut(&node) {
                hosted.sleeping.remove(&vm);
            }
            return true;
        }
        false
    }

    pub fn onlines(&self) -> &BTreeSet<NodeId> {
        &self.onlines
    }

    pub fn offlines(&self) -> &BTreeSet<NodeId> {
        &self.offlines
    }

    pub fn waitings(&self) -> &BTreeSet<VmId> {
        &self.waitings
    }

    /// Returns an iterator of running VMs.
    pub fn runnings(&self) -> impl Iterator<Item = VmId> + '_ {
        self.runnings.keys().copied()
    }

    /// Returns an iterator of sleeping VMs.
    pub fn sleepings(&self) -> impl Iterator<Item = VmId> + '_ {
        self.sleepings.keys().copied()
    }

    pub fn running_count(&self) -> usize {
        self.runnings.len()
    }

    pub fn sleeping_count(&self) -> usize {
        self.sleepings.len()
    }

    /// Returns all VMs of the configuration, whatever their state.
    pub fn all_vms(&self) -> BTreeSet<VmId> {
        self.waitings
            .iter()
            .chain(self.runnings.keys())
            .chain(self.sleepings.keys())
            .copied()
            .collect()
    }

    /// Returns an iterator of VMs running on the specified node.
    pub fn runnings_on(&self, node: NodeId) -> impl Iterator<Item = VmId> + '_ {
        self.hosted
            .get(&node)
            .into_iter()
            .flat_map(|hosted| hosted.running.iter().copied())
    }

    /// Returns an iterator of VMs sleeping on the specified node.
    pub fn sleepings_on(&self, node: NodeId) -> impl Iterator<Item = VmId> + '_ {
        self.hosted
            .get(&node)
            .into_iter()
            .flat_map(|hosted| hosted.sleeping.iter().copied())
    }

    /// Returns the node hosting the VM (running or sleeping).
    pub fn location(&self, vm: VmId) -> Option<NodeId> {
        self.runnings
            .get(&vm)
            .or_else(|| self.sleepings.get(&vm))
            .copied()
    }

    /// Returns the node on which the VM is running, `None` if the VM is not running.
    pub fn running_host(&self, vm: VmId) -> Option<NodeId> {
        self.runnings.get(&vm).copied()
    }

    pub fn state(&self, vm: VmId) -> Option<VmState> {
        if self.waitings.contains(&vm) {
            Some(VmState::Waiting)
        } else if self.runnings.contains_key(&vm) {
            Some(VmState::Running)
        } else if self.sleepings.contains_key(&vm) {
            Some(VmState::Sleeping)
        } else {
            None
        }
    }

    pub fn is_online(&self, node: NodeId) -> bool {
        self.onlines.contains(&node)
    }

    pub fn is_offline(&self, node: NodeId) -> bool {
        self.offlines.contains(&node)
    }

    pub fn is_waiting(&self, vm: VmId) -> bool {
        self.waitings.contains(&vm)
    }

    pub fn is_running(&self, vm: VmId) -> bool {
        self.runnings.contains_key(&vm)
    }

    pub fn is_sleeping(&self, vm: VmId) -> bool {
        self.sleepings.contains_key(&vm)
    }

    pub fn contains_vm(&self, vm: VmId) -> bool {
        self.state(vm).is_some()
    }

    /// Checks whether the current consumption of VMs running on the node exceeds its CPU or memory capacity.
    pub fn is_currently_overloaded(&self, store: &ElementStore, node: NodeId) -> bool {
        self.is_overloaded(store, node, VirtualMachine::consumption)
    }

    /// Checks whether the demand of VMs running on the node exceeds its CPU or memory capacity.
    pub fn is_future_overloaded(&self, store: &ElementStore, node: NodeId) -> bool {
        self.is_overloaded(store, node, VirtualMachine::demand)
    }

    /// Returns online nodes that are currently overloaded.
    pub fn currently_overloaded_nodes(&self, store: &ElementStore) -> Vec<NodeId> {
        self.onlines
            .iter()
            .copied()
            .filter(|&node| self.is_currently_overloaded(store, node))
            .collect()
    }

    /// Returns online nodes that will be overloaded once VMs reach their demand.
    pub fn future_overloaded_nodes(&self, store: &ElementStore) -> Vec<NodeId> {
        self.onlines
            .iter()
            .copied()
            .filter(|&node| self.is_future_overloaded(store, node))
            .collect()
    }

    fn is_overloaded(&self, store: &ElementStore, node: NodeId, usage: impl Fn(&VirtualMachine) -> Allocation) -> bool {
        let (cpu, memory) = self
            .runnings_on(node)
            .map(|vm| usage(store.vm(vm)))
            .fold((0u64, 0u64), |(cpu, memory), alloc| {
                (cpu + alloc.cpu_usage as u64, memory + alloc.memory_usage)
            });
        let node = store.node(node);
        cpu > node.cpu_capacity as u64 || memory > node.memory_capacity
    }
}
