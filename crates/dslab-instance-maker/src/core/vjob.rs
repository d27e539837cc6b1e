//! Workloads (vjobs).

use std::collections::BTreeSet;

use crate::core::common::{NodeId, VmId};
use crate::core::constraint::PlacementConstraint;

/// A named bundle of VMs and placement constraints treated as a unit.
#[derive(Clone, Debug)]
pub struct VJob {
    id: String,
    vms: BTreeSet<VmId>,
    constraints: Vec<PlacementConstraint>,
}

impl VJob {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            vms: BTreeSet::new(),
            constraints: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Adds VM to the vjob. Returns `false` if it was already there.
    pub fn add_vm(&mut self, vm: VmId) -> bool {
        self.vms.insert(vm)
    }

    /// Adds VMs to the vjob. Returns `true` if at least one of them is new.
    pub fn add_vms(&mut self, vms: impl IntoIterator<Item = VmId>) -> bool {
        vms.into_iter().fold(false, |added, vm| self.vms.insert(vm) || added)
    }

    pub fn add_constraint(&mut self, constraint: PlacementConstraint) {
        self.constraints.push(constraint);
    }

    /// Removes the constraint at the specified position.
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

    /// Returns the VMs added directly to the vjob.
    pub fn direct_vms(&self) -> &BTreeSet<VmId> {
        &self.vms
    }

    /// Returns the VMs of the vjob together with the VMs involved in its constraints.
    pub fn vms(&self) -> BTreeSet<VmId> {
        let mut vms = self.vms.clone();
        for c in self.constraints.iter() {
            vms.extend(c.involved_vms());
        }
        vms
    }

    /// Returns the nodes involved in the constraints of the vjob.
    pub fn nodes(&self) -> BTreeSet<NodeId> {
        self.constraints.iter().flat_map(|c| c.involved_nodes()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vms_include_constraint_closure() {
        let mut v = VJob::new("v1");
        assert!(v.add_vms([0, 1]));
        assert!(!v.add_vm(1));
        v.add_constraint(PlacementConstraint::fence([1, 2], [7, 8]));
        assert_eq!(v.direct_vms().len(), 2);
        assert_eq!(v.vms(), BTreeSet::from([0, 1, 2]));
        assert_eq!(v.nodes(), BTreeSet::from([7, 8]));
        assert!(v.remove_constraint(0).is_some());
        assert!(v.remove_constraint(0).is_none());
        assert_eq!(v.vms().len(), 2);
    }
}
