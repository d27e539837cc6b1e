//! Interface of the placement planner and reconfiguration plans.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::core::common::{NodeId, VmId};
use crate::core::configuration::{Configuration, ConfigurationError};
use crate::core::element_store::ElementStore;
use crate::core::vjob::VJob;
use crate::core::vm::VmState;

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("no feasible node for virtual machine #{vm}")]
    NoFeasibleNode { vm: VmId },
    #[error("unknown virtual machine #{0}")]
    UnknownVm(VmId),
    #[error("unknown node #{0}")]
    UnknownNode(NodeId),
    #[error("invalid plan request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Describes the transition the planner has to compute: the source configuration, the expected final state of some
/// VMs and nodes, and the vjobs whose constraints must hold in the destination.
#[derive(Clone, Debug)]
pub struct PlanRequest<'a> {
    pub source: &'a Configuration,
    /// VMs that must end running.
    pub to_run: BTreeSet<VmId>,
    /// VMs that must end absent.
    pub to_stop: BTreeSet<VmId>,
    /// VMs that must end sleeping.
    pub to_sleep: BTreeSet<VmId>,
    /// Sleeping VMs that must end running.
    pub to_wake: BTreeSet<VmId>,
    /// Nodes that must end online.
    pub onlines: BTreeSet<NodeId>,
    /// Nodes that must end offline.
    pub offlines: BTreeSet<NodeId>,
    pub vjobs: &'a [VJob],
}

impl<'a> PlanRequest<'a> {
    /// Creates request that keeps the node states of the source configuration and changes no VM.
    pub fn new(source: &'a Configuration, vjobs: &'a [VJob]) -> Self {
        Self {
            source,
            to_run: BTreeSet::new(),
            to_stop: BTreeSet::new(),
            to_sleep: BTreeSet::new(),
            to_wake: BTreeSet::new(),
            onlines: source.onlines().clone(),
            offlines: source.offlines().clone(),
            vjobs,
        }
    }

    /// Checks that the request only mentions known elements and has no contradicting targets.
    pub fn validate(&self, store: &ElementStore) -> Result<(), PlanError> {
        let vm_sets = [&self.to_run, &self.to_stop, &self.to_sleep, &self.to_wake];
        for vm in vm_sets.iter().flat_map(|vms| vms.iter()) {
            if store.get_vm(*vm).is_none() {
                return Err(PlanError::UnknownVm(*vm));
            }
        }
        for node in self.onlines.iter().chain(self.offlines.iter()) {
            if store.get_node(*node).is_none() {
                return Err(PlanError::UnknownNode(*node));
            }
        }
        if let Some(node) = self.onlines.intersection(&self.offlines).next() {
            return Err(PlanError::InvalidRequest(format!(
                "node #{} must be both online and offline",
                node
            )));
        }
        let mut targeted = BTreeSet::new();
        for vm in vm_sets.iter().flat_map(|vms| vms.iter()) {
            if !targeted.insert(*vm) {
                return Err(PlanError::InvalidRequest(format!(
                    "virtual machine #{} has several targets",
                    vm
                )));
            }
        }
        Ok(())
    }
}

/// Elementary action of a reconfiguration plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlanAction {
    Run { vm: VmId, node: NodeId },
    Migrate { vm: VmId, from: NodeId, to: NodeId },
    Stop { vm: VmId, node: Option<NodeId> },
    Suspend { vm: VmId, from: NodeId, to: NodeId },
    Resume { vm: VmId, from: NodeId, to: NodeId },
    Startup { node: NodeId },
    Shutdown { node: NodeId },
}

impl Display for PlanAction {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            PlanAction::Run { vm, node } => write!(f, "run(vm {}, node {})", vm, node),
            PlanAction::Migrate { vm, from, to } => write!(f, "migrate(vm {}, {} -> {})", vm, from, to),
            PlanAction::Stop { vm, .. } => write!(f, "stop(vm {})", vm),
            PlanAction::Suspend { vm, from, to } => write!(f, "suspend(vm {}, {} -> {})", vm, from, to),
            PlanAction::Resume { vm, from, to } => write!(f, "resume(vm {}, {} -> {})", vm, from, to),
            PlanAction::Startup { node } => write!(f, "startup(node {})", node),
            PlanAction::Shutdown { node } => write!(f, "shutdown(node {})", node),
        }
    }
}

/// Reconfiguration plan: the destination configuration and the actions leading to it from the source.
#[derive(Clone, Debug)]
pub struct Plan {
    destination: Configuration,
    actions: Vec<PlanAction>,
}

impl Plan {
    pub fn new(source: &Configuration, destination: Configuration) -> Self {
        let actions = diff(source, &destination);
        Self { destination, actions }
    }

    pub fn destination(&self) -> &Configuration {
        &self.destination
    }

    pub fn into_destination(self) -> Configuration {
        self.destination
    }

    pub fn actions(&self) -> &[PlanAction] {
        &self.actions
    }
}

fn diff(src: &Configuration, dst: &Configuration) -> Vec<PlanAction> {
    let mut actions = Vec::new();
    for &node in dst.onlines().difference(src.onlines()) {
        actions.push(PlanAction::Startup { node });
    }
    let vms: BTreeSet<VmId> = src.all_vms().union(&dst.all_vms()).copied().collect();
    for vm in vms {
        let before = src.state(vm).map(|state| (state, src.location(vm)));
        let after = dst.state(vm).map(|state| (state, dst.location(vm)));
        let action = match (before, after) {
            (Some((_, node)), None) => Some(PlanAction::Stop { vm, node }),
            (Some((VmState::Running, Some(from))), Some((VmState::Running, Some(to)))) if from != to => {
                Some(PlanAction::Migrate { vm, from, to })
            }
            (Some((VmState::Running, Some(from))), Some((VmState::Sleeping, Some(to)))) => {
                Some(PlanAction::Suspend { vm, from, to })
            }
            (Some((VmState::Sleeping, Some(from))), Some((VmState::Running, Some(to)))) => {
                Some(PlanAction::Resume { vm, from, to })
            }
            (None | Some((VmState::Waiting, _)), Some((VmState::Running, Some(node)))) => {
                Some(PlanAction::Run { vm, node })
            }
            _ => None,
        };
        actions.extend(action);
    }
    for &node in dst.offlines().intersection(src.onlines()) {
        actions.push(PlanAction::Shutdown { node });
    }
    actions
}

/// Trait for placement planners.
///
/// A planner turns a source configuration plus transition targets into a destination configuration satisfying the
/// constraints of all vjobs in the request.
pub trait Planner {
    fn compute(&self, store: &ElementStore, request: &PlanRequest) -> Result<Plan, PlanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_actions_follow_the_diff() {
        let mut src = Configuration::new();
        src.add_online(0);
        src.add_online(1);
        src.add_offline(2).unwrap();
        src.add_waiting(0);
        src.set_run_on(1, 0).unwrap();
        src.set_run_on(2, 0).unwrap();
        src.set_sleep_on(3, 1).unwrap();

        let mut dst = src.clone();
        dst.add_online(2);
        dst.set_run_on(0, 2).unwrap();
        dst.set_run_on(1, 1).unwrap();
        dst.set_sleep_on(2, 0).unwrap();
        dst.remove_vm(3);

        let plan = Plan::new(&src, dst);
        assert_eq!(
            plan.actions(),
            &[
                PlanAction::Startup { node: 2 },
                PlanAction::Run { vm: 0, node: 2 },
                PlanAction::Migrate { vm: 1, from: 0, to: 1 },
                PlanAction::Suspend { vm: 2, from: 0, to: 0 },
                PlanAction::Stop { vm: 3, node: Some(1) },
            ]
        );
    }

    #[test]
    fn contradicting_request_is_rejected() {
        let mut store = ElementStore::new();
        let n = store.add_node("N", 1, 1, 1).unwrap();
        let vm = store.add_vm("VM", 1, 1, 1).unwrap();
        let cfg = Configuration::new();
        let mut request = PlanRequest::new(&cfg, &[]);
        request.onlines.insert(n);
        request.offlines.insert(n);
        assert!(matches!(request.validate(&store), Err(PlanError::InvalidRequest(_))));

        request.offlines.clear();
        request.to_run.insert(vm);
        request.to_stop.insert(vm);
        assert!(matches!(request.validate(&store), Err(PlanError::InvalidRequest(_))));

        request.to_stop.clear();
        request.to_wake.insert(vm + 1);
        assert_eq!(request.validate(&store), Err(PlanError::UnknownVm(vm + 1)));
    }
}
