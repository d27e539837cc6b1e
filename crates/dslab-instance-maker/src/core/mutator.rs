//! Alterations of a configuration: node failures and constraint-respecting relocations.

use std::collections::BTreeSet;

use indexmap::IndexSet;
use log::{debug, trace};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::common::{NodeId, VmId};
use crate::core::configuration::Configuration;
use crate::core::constraint::{ConstraintKind, PlacementConstraint};
use crate::core::element_store::ElementStore;
use crate::core::vjob::VJob;

/// Puts offline `floor(|onlines| * ratio)` online nodes selected at random.
///
/// The VMs running or sleeping on the selected nodes are removed from the configuration and returned.
pub fn apply_node_failure_ratio<R: Rng + ?Sized>(cfg: &mut Configuration, ratio: f64, rng: &mut R) -> BTreeSet<VmId> {
    let to_fail = (cfg.onlines().len() as f64 * ratio) as usize;
    let onlines: Vec<NodeId> = cfg.onlines().iter().copied().collect();
    let failed: Vec<NodeId> = onlines.choose_multiple(rng, to_fail).copied().collect();

    let mut vms = BTreeSet::new();
    for node in failed {
        let hosted: Vec<VmId> = cfg.runnings_on(node).chain(cfg.sleepings_on(node)).collect();
        for vm in hosted {
            cfg.remove_vm(vm);
            vms.insert(vm);
        }
        let switched = cfg.add_offline(node);
        debug_assert!(switched.is_ok());
        trace!("node {} failed", node);
    }
    debug!("{} nodes failed, {} vms lost", to_fail, vms.len());
    vms
}

/// Relocates a running VM to another node, trying at most as many times as there are online nodes.
///
/// See [`relocate_with_tries`].
pub fn relocate<R: Rng + ?Sized>(
    cfg: &mut Configuration,
    store: &ElementStore,
    vm: VmId,
    vjobs: &[VJob],
    rng: &mut R,
) -> bool {
    let tries = cfg.onlines().len();
    relocate_with_tries(cfg, store, vm, vjobs, tries, rng)
}

/// Relocates a running VM to another node picked at random, so that the node is not overloaded and the placement
/// constraints of the vjobs still hold.
///
/// Each rejected node is dropped from the candidates and costs one try, as does drawing the current host. A fence
/// constraint on the VM permanently restricts the candidates to its nodes. The restriction applies as soon as the fence
/// is examined for a tried node, even when another constraint rejects that node, so a fenced VM converges faster than
/// with a check that stops at the first violation. Returns `false` and keeps the VM on its host if the VM is not
/// running or no node is found.
pub fn relocate_with_tries<R: Rng + ?Sized>(
    cfg: &mut Configuration,
    store: &ElementStore,
    vm: VmId,
    vjobs: &[VJob],
    mut tries: usize,
    rng: &mut R,
) -> bool {
    let current = match cfg.running_host(vm) {
        Some(node) => node,
        None => return false,
    };
    let mut candidates: IndexSet<NodeId> = cfg.onlines().iter().copied().collect();
    let mut relocated = false;

    while !relocated && tries > 0 && !candidates.is_empty() {
        let node = match candidates.get_index(rng.gen_range(0..candidates.len())) {
            Some(&node) => node,
            None => break,
        };
        if node == current {
            tries -= 1;
            continue;
        }
        if cfg.set_run_on(vm, node).is_ok() && is_acceptable(cfg, store, vm, node, vjobs, &mut candidates) {
            relocated = true;
        } else {
            trace!("node {} rejected for vm {}", node, vm);
            tries -= 1;
            candidates.swap_remove(&node);
        }
    }

    if relocated {
        debug!("vm {} relocated from node {} to node {:?}", vm, current, cfg.running_host(vm));
    } else {
        let restored = cfg.set_run_on(vm, current);
        debug_assert!(restored.is_ok());
        debug!("vm {} cannot be relocated from node {}", vm, current);
    }
    relocated
}

/// Checks the VM placed on `node`. Fence constraints of the VM narrow `candidates` as a side effect, whether the
/// placement is accepted or not.
fn is_acceptable(
    cfg: &Configuration,
    store: &ElementStore,
    vm: VmId,
    node: NodeId,
    vjobs: &[VJob],
    candidates: &mut IndexSet<NodeId>,
) -> bool {
    if cfg.is_currently_overloaded(store, node) {
        trace!("node {} is overloaded with vm {}", node, vm);
        return false;
    }
    let mut acceptable = true;
    for c in vjobs.iter().flat_map(|v| v.constraints().iter()) {
        let involved = c.involves_vm(vm);
        if acceptable && (c.kind() == ConstraintKind::Lonely || involved) && !c.is_satisfied(cfg) {
            trace!("{} constraint violated by vm {} on node {}", c.kind(), vm, node);
            acceptable = false;
        }
        if let PlacementConstraint::Fence { nodes, .. } = c {
            if involved {
                candidates.retain(|n| nodes.contains(n));
            }
        }
    }
    acceptable
}

/// Tries `nb_moves` relocations of VMs picked at random among all the VMs of the configuration.
///
/// Failed relocations are ignored, returns the number of VMs actually moved.
pub fn shuffle<R: Rng + ?Sized>(
    cfg: &mut Configuration,
    store: &ElementStore,
    vjobs: &[VJob],
    nb_moves: usize,
    rng: &mut R,
) -> usize {
    let vms: Vec<VmId> = cfg.all_vms().into_iter().collect();
    let mut moved = 0;
    for _ in 0..nb_moves {
        if let Some(&vm) = vms.choose(rng) {
            if relocate(cfg, store, vm, vjobs, rng) {
                moved += 1;
            }
        }
    }
    debug!("shuffle moved {} of {} vms", moved, nb_moves);
    moved
}
