//! Storage of all nodes and virtual machines.

use std::collections::HashMap;

use thiserror::Error;

use crate::core::common::{NodeId, VmId};
use crate::core::node::Node;
use crate::core::vm::VirtualMachine;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("virtual machine '{0}' already exists")]
    DuplicateVmName(String),
    #[error("node '{0}' already exists")]
    DuplicateNodeName(String),
    #[error("unknown virtual machine #{0}")]
    UnknownVm(VmId),
}

/// Owns every node and VM. Configurations, vjobs and constraints refer to them by ID, so a change of VM resources
/// made through the store is visible to all of them.
#[derive(Clone, Debug, Default)]
pub struct ElementStore {
    nodes: Vec<Node>,
    vms: Vec<VirtualMachine>,
    node_ids: HashMap<String, NodeId>,
    vm_ids: HashMap<String, VmId>,
}

impl ElementStore {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds new node and returns its ID.
    pub fn add_node(
        &mut self,
        name: &str,
        nb_cpus: u32,
        cpu_capacity: u32,
        memory_capacity: u64,
    ) -> Result<NodeId, StoreError> {
        if self.node_ids.contains_key(name) {
            return Err(StoreError::DuplicateNodeName(name.to_string()));
        }
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node::new(id, name, nb_cpus, cpu_capacity, memory_capacity));
        self.node_ids.insert(name.to_string(), id);
        Ok(id)
    }

    /// Adds new VM with demand equal to consumption and returns its ID.
    pub fn add_vm(
        &mut self,
        name: &str,
        nb_cpus: u32,
        cpu_consumption: u32,
        memory_consumption: u64,
    ) -> Result<VmId, StoreError> {
        if self.vm_ids.contains_key(name) {
            return Err(StoreError::DuplicateVmName(name.to_string()));
        }
        let id = self.vms.len() as VmId;
        self.vms.push(VirtualMachine::new(id, name, nb_cpus, cpu_consumption, memory_consumption));
        self.vm_ids.insert(name.to_string(), id);
        Ok(id)
    }

    /// Deep-copies the specified VM under a new name and returns the ID of the copy.
    pub fn duplicate_vm(&mut self, vm_id: VmId, name: &str) -> Result<VmId, StoreError> {
        if self.vm_ids.contains_key(name) {
            return Err(StoreError::DuplicateVmName(name.to_string()));
        }
        let id = self.vms.len() as VmId;
        let copy = self
            .vms
            .get(vm_id as usize)
            .ok_or(StoreError::UnknownVm(vm_id))?
            .duplicate(id, name);
        self.vms.push(copy);
        self.vm_ids.insert(name.to_string(), id);
        Ok(id)
    }

    /// Renames the specified VM.
    pub fn rename_vm(&mut self, vm_id: VmId, name: &str) -> Result<(), StoreError> {
        if self.vm_ids.contains_key(name) {
            return Err(StoreError::DuplicateVmName(name.to_string()));
        }
        let vm = self.vms.get_mut(vm_id as usize).ok_or(StoreError::UnknownVm(vm_id))?;
        self.vm_ids.remove(&vm.name);
        vm.name = name.to_string();
        self.vm_ids.insert(name.to_string(), vm_id);
        Ok(())
    }

    /// Returns the node with specified ID. Panics if there is no such node.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    /// Returns the VM with specified ID. Panics if there is no such VM.
    pub fn vm(&self, id: VmId) -> &VirtualMachine {
        &self.vms[id as usize]
    }

    pub fn vm_mut(&mut self, id: VmId) -> &mut VirtualMachine {
        &mut self.vms[id as usize]
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn get_vm(&self, id: VmId) -> Option<&VirtualMachine> {
        self.vms.get(id as usize)
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.node_ids.get(name).copied()
    }

    pub fn vm_by_name(&self, name: &str) -> Option<VmId> {
        self.vm_ids.get(name).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn vms(&self) -> impl Iterator<Item = &VirtualMachine> {
        self.vms.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }
}
