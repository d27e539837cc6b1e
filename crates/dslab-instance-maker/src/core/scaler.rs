//! Scaling of VM resource consumption and demand inside vjobs.

use log::debug;
use rand::Rng;

use crate::core::common::VmResource;
use crate::core::element_store::ElementStore;
use crate::core::vjob::VJob;

/// Sums the selected resources over the VMs of a vjob. The result follows the order of `resources`.
pub fn resource_sum(store: &ElementStore, vjob: &VJob, resources: &[VmResource]) -> Vec<u64> {
    let mut sums = vec![0; resources.len()];
    for vm in vjob.vms() {
        let vm = store.vm(vm);
        for (sum, &resource) in sums.iter_mut().zip(resources) {
            *sum += vm.resource(resource);
        }
    }
    sums
}

/// Sums the selected resources over the VMs of several vjobs.
pub fn resource_sum_all(store: &ElementStore, vjobs: &[VJob], resources: &[VmResource]) -> Vec<u64> {
    let mut sums = vec![0; resources.len()];
    for vjob in vjobs {
        for (sum, value) in sums.iter_mut().zip(resource_sum(store, vjob, resources)) {
            *sum += value;
        }
    }
    sums
}

/// Sets the CPU consumption of each VM to `floor(cpu_max * ratio)`. Returns the new total CPU consumption.
pub fn set_cpu_consumption_ratio(store: &mut ElementStore, vjob: &VJob, ratio: f64) -> u64 {
    let mut total = 0;
    for vm in vjob.vms() {
        let vm = store.vm_mut(vm);
        vm.cpu_consumption = (vm.cpu_max as f64 * ratio) as u32;
        total += vm.cpu_consumption as u64;
    }
    debug!("vjob {}: cpu consumption set to {} (ratio {})", vjob.id(), total, ratio);
    total
}

/// Sets the CPU demand of each VM to `floor(cpu_max * ratio)`. Returns the new total CPU demand.
pub fn set_cpu_demand_ratio(store: &mut ElementStore, vjob: &VJob, ratio: f64) -> u64 {
    let mut total = 0;
    for vm in vjob.vms() {
        let vm = store.vm_mut(vm);
        vm.cpu_demand = (vm.cpu_max as f64 * ratio) as u32;
        total += vm.cpu_demand as u64;
    }
    debug!("vjob {}: cpu demand set to {} (ratio {})", vjob.id(), total, ratio);
    total
}

/// Returns the mean of `cpu_demand / cpu_max` over the VMs of the vjob, zero for an empty vjob.
pub fn cpu_demand_ratio(store: &ElementStore, vjob: &VJob) -> f64 {
    let vms = vjob.vms();
    if vms.is_empty() {
        return 0.;
    }
    let sum: f64 = vms
        .iter()
        .map(|&vm| {
            let vm = store.vm(vm);
            vm.cpu_demand as f64 / vm.cpu_max as f64
        })
        .sum();
    sum / vms.len() as f64
}

/// Sets the CPU consumption of every VM to its CPU demand.
pub fn set_cpu_consumption_to_demand(store: &mut ElementStore, vjobs: &[VJob]) {
    for vm in vjobs.iter().flat_map(|v| v.vms()) {
        let vm = store.vm_mut(vm);
        vm.cpu_consumption = vm.cpu_demand;
    }
}

/// Sets the CPU demand of every VM to its CPU consumption.
pub fn set_cpu_demand_to_consumption(store: &mut ElementStore, vjobs: &[VJob]) {
    for vm in vjobs.iter().flat_map(|v| v.vms()) {
        let vm = store.vm_mut(vm);
        vm.cpu_demand = vm.cpu_consumption;
    }
}

/// Applies [`set_cpu_consumption_ratio`] to each vjob with a ratio drawn uniformly from `[0, 1)`.
pub fn set_random_cpu_consumption<R: Rng + ?Sized>(store: &mut ElementStore, vjobs: &[VJob], rng: &mut R) {
    for vjob in vjobs {
        let ratio = rng.gen::<f64>();
        set_cpu_consumption_ratio(store, vjob, ratio);
    }
}

/// Applies [`set_cpu_demand_ratio`] to each vjob with a ratio drawn uniformly from `[lb, ub)`.
pub fn set_random_cpu_demand<R: Rng + ?Sized>(
    store: &mut ElementStore,
    lb: f64,
    ub: f64,
    vjobs: &[VJob],
    rng: &mut R,
) {
    for vjob in vjobs {
        let ratio = rng.gen::<f64>() * (ub - lb) + lb;
        set_cpu_demand_ratio(store, vjob, ratio);
    }
}

/// Same as [`set_random_cpu_demand`] with ratios drawn from `[0, 1)`.
pub fn set_random_cpu_demand_default<R: Rng + ?Sized>(store: &mut ElementStore, vjobs: &[VJob], rng: &mut R) {
    set_random_cpu_demand(store, 0., 1., vjobs, rng)
}
