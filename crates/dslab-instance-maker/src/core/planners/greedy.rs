//! Greedy planner packing VMs by demand.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use log::{debug, trace};

use crate::config::ConfigError;
use crate::core::common::VmId;
use crate::core::configuration::Configuration;
use crate::core::constraint::{ConstraintKind, PlacementConstraint};
use crate::core::element_store::ElementStore;
use crate::core::planner::{Plan, PlanError, PlanRequest, Planner};
use crate::core::resource_pool::ResourcePool;
use crate::core::vm_placement_algorithm::{placement_algorithm_resolver, VmPlacementAlgorithm};
use crate::core::vm_placement_algorithms::first_fit::FirstFit;

/// Places the VMs that must end running one after another on the nodes proposed by a VM placement algorithm.
///
/// Node capacity is reserved by VM demand, so the destination is never future-overloaded. A node is accepted only if
/// every constraint mentioning the VM, and every lonely constraint, holds after the placement. There is no
/// backtracking: when no proposed node is accepted, the whole computation fails.
pub struct GreedyPlanner {
    algorithm: Box<dyn VmPlacementAlgorithm>,
    sort_by_demand: bool,
}

impl GreedyPlanner {
    pub fn new(algorithm: Box<dyn VmPlacementAlgorithm>) -> Self {
        Self {
            algorithm,
            sort_by_demand: false,
        }
    }

    /// Creates planner using the placement algorithm described by a config string (see
    /// [`placement_algorithm_resolver`]).
    pub fn from_config_str(config_str: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(placement_algorithm_resolver(config_str)?))
    }

    /// Places the VMs with the largest CPU demand (then memory demand) first instead of following the VM IDs.
    pub fn with_sort_by_demand(mut self, sort_by_demand: bool) -> Self {
        self.sort_by_demand = sort_by_demand;
        self
    }

    /// Applies the VM and node targets that need no placement decision and returns the VMs left to place.
    fn prepare(&self, dst: &mut Configuration, request: &PlanRequest) -> Result<Vec<VmId>, PlanError> {
        for &node in request.onlines.iter() {
            dst.add_online(node);
        }
        for &vm in request.to_stop.iter() {
            dst.remove_vm(vm);
        }
        for &vm in request.to_sleep.iter() {
            match dst.location(vm) {
                Some(node) => dst.set_sleep_on(vm, node)?,
                None => {
                    return Err(PlanError::InvalidRequest(format!(
                        "virtual machine #{} cannot sleep as it is not placed",
                        vm
                    )))
                }
            }
        }

        let mut to_place = BTreeSet::new();
        for &vm in request.to_run.iter() {
            if !dst.is_running(vm) {
                to_place.insert(vm);
            }
        }
        for &vm in request.to_wake.iter() {
            if !dst.is_sleeping(vm) {
                return Err(PlanError::InvalidRequest(format!(
                    "virtual machine #{} cannot be woken up as it is not sleeping",
                    vm
                )));
            }
            to_place.insert(vm);
        }
        for &node in request.offlines.iter() {
            // running VMs of a node going down are placed again, sleeping ones would be lost
            to_place.extend(dst.runnings_on(node));
        }
        for &vm in to_place.iter() {
            dst.add_waiting(vm);
        }
        for &node in request.offlines.iter() {
            dst.add_offline(node)?;
        }
        Ok(to_place.into_iter().collect())
    }
}

impl Default for GreedyPlanner {
    fn default() -> Self {
        Self::new(Box::new(FirstFit::new()))
    }
}

fn accepts(constraints: &[&PlacementConstraint], vm: VmId, cfg: &Configuration) -> bool {
    constraints
        .iter()
        .filter(|c| c.kind() == ConstraintKind::Lonely || c.involves_vm(vm))
        .all(|c| c.is_satisfied(cfg))
}

impl Planner for GreedyPlanner {
    fn compute(&self, store: &ElementStore, request: &PlanRequest) -> Result<Plan, PlanError> {
        request.validate(store)?;
        let mut dst = request.source.clone();
        let mut to_place = self.prepare(&mut dst, request)?;
        if self.sort_by_demand {
            to_place.sort_by_key(|&vm| {
                let vm = store.vm(vm);
                (Reverse(vm.cpu_demand), Reverse(vm.memory_demand), vm.id)
            });
        }

        let constraints: Vec<&PlacementConstraint> =
            request.vjobs.iter().flat_map(|v| v.constraints().iter()).collect();
        let mut pool = ResourcePool::from_configuration(&dst, store);

        for vm in to_place {
            let alloc = store.vm(vm).demand();
            let mut placed = false;
            for node in self.algorithm.select_nodes(&alloc, &pool) {
                dst.set_run_on(vm, node)?;
                if accepts(&constraints, vm, &dst) {
                    trace!("placed vm {} on node {}", vm, node);
                    pool.allocate(&alloc, node);
                    placed = true;
                    break;
                }
                trace!("node {} rejected for vm {} by constraints", node, vm);
            }
            if !placed {
                debug!("no feasible node for vm {}", vm);
                return Err(PlanError::NoFeasibleNode { vm });
            }
        }

        let plan = Plan::new(request.source, dst);
        debug!("computed plan with {} actions", plan.actions().len());
        Ok(plan)
    }
}
