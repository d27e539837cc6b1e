//! Reusable workload templates.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::core::common::{NodeId, VmId};
use crate::core::constraint::PlacementConstraint;
use crate::core::element_store::{ElementStore, StoreError};
use crate::core::vjob::VJob;

/// A vjob skeleton that can be instantiated several times.
///
/// Each instance gets its own copies of the template VMs, named by prepending a prefix to the original names, so the
/// instances share the architecture and resource profiles of the template but not the VMs themselves.
#[derive(Clone, Debug)]
pub struct VJobTemplate {
    id: String,
    vms: BTreeSet<VmId>,
    // Not filled by any instantiation path yet, kept so that `nodes()` mirrors `vms()`.
    nodes: BTreeSet<NodeId>,
    constraints: Vec<PlacementConstraint>,
}

impl VJobTemplate {
    /// Creates empty template.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            vms: BTreeSet::new(),
            nodes: BTreeSet::new(),
            constraints: Vec::new(),
        }
    }

    /// Creates template referencing the VMs of an existing vjob (the VMs are not copied).
    pub fn from_vjob(id: &str, source: &VJob) -> Self {
        let mut template = Self::new(id);
        template.vms = source.vms();
        template
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn add_vm(&mut self, vm: VmId) -> bool {
        self.vms.insert(vm)
    }

    pub fn add_vms(&mut self, vms: impl IntoIterator<Item = VmId>) -> bool {
        vms.into_iter().fold(false, |added, vm| self.vms.insert(vm) || added)
    }

    pub fn add_node(&mut self, node: NodeId) -> bool {
        self.nodes.insert(node)
    }

    pub fn add_constraint(&mut self, constraint: PlacementConstraint) {
        self.constraints.push(constraint);
    }

    pub fn remove_constraint(&mut self, index: usize) -> Option<PlacementConstraint> {
        if index < self.constraints.len() {
            Some(self.constraints.remove(index))
        } else {
            None
        }
    }

    pub fn constraints(&self) -> &[PlacementConstraint] {
        &self.constraints
    }

    /// Returns the VMs added directly to the template.
    pub fn direct_vms(&self) -> &BTreeSet<VmId> {
        &self.vms
    }

    /// Returns the template VMs together with the VMs involved in its constraints.
    pub fn vms(&self) -> BTreeSet<VmId> {
        let mut vms = self.vms.clone();
        for c in self.constraints.iter() {
            vms.extend(c.involved_vms());
        }
        vms
    }

    /// Returns the template nodes together with the nodes involved in its constraints.
    pub fn nodes(&self) -> BTreeSet<NodeId> {
        let mut nodes = self.nodes.clone();
        for c in self.constraints.iter() {
            nodes.extend(c.involved_nodes());
        }
        nodes
    }

    /// Creates a vjob with copies of the template VMs named `prefix + original name`.
    ///
    /// Placement constraints are not carried over, see [`VJobTemplate::instantiate_with_constraints`].
    pub fn instantiate(&self, store: &mut ElementStore, id: &str, prefix: &str) -> Result<VJob, StoreError> {
        let mut instance = VJob::new(id);
        for &vm in self.vms.iter() {
            let name = format!("{}{}", prefix, store.vm(vm).name);
            instance.add_vm(store.duplicate_vm(vm, &name)?);
        }
        debug!(
            "instantiated template {} as vjob {} with {} vms",
            self.id,
            id,
            instance.direct_vms().len()
        );
        Ok(instance)
    }

    /// Same as [`VJobTemplate::instantiate`], but also copies the VMs referenced by constraints and adds the
    /// constraints rewritten over the copies. Custom constraints are skipped.
    pub fn instantiate_with_constraints(
        &self,
        store: &mut ElementStore,
        id: &str,
        prefix: &str,
    ) -> Result<VJob, StoreError> {
        let mut instance = VJob::new(id);
        let mut copies = BTreeMap::new();
        for vm in self.vms() {
            let name = format!("{}{}", prefix, store.vm(vm).name);
            let copy = store.duplicate_vm(vm, &name)?;
            copies.insert(vm, copy);
            instance.add_vm(copy);
        }
        for c in self.constraints.iter() {
            match c.map_vms(|vm| copies.get(&vm).copied().unwrap_or(vm)) {
                Some(mapped) => instance.add_constraint(mapped),
                None => debug!("template {}: skipped {} constraint", self.id, c.kind()),
            }
        }
        Ok(instance)
    }
}
