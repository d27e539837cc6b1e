//! Load of a configuration.

use serde::Serialize;

use crate::core::common::VmResource;
use crate::core::configuration::Configuration;
use crate::core::element_store::ElementStore;

fn vm_total(cfg: &Configuration, store: &ElementStore, resource: VmResource) -> u64 {
    cfg.all_vms().into_iter().map(|vm| store.vm(vm).resource(resource)).sum()
}

fn online_cpu_capacity(cfg: &Configuration, store: &ElementStore) -> u64 {
    cfg.onlines().iter().map(|&n| store.node(n).cpu_capacity as u64).sum()
}

fn online_memory_capacity(cfg: &Configuration, store: &ElementStore) -> u64 {
    cfg.onlines().iter().map(|&n| store.node(n).memory_capacity).sum()
}

/// Total CPU consumption of the VMs divided by the CPU capacity of the online nodes.
pub fn cpu_consumption_load(cfg: &Configuration, store: &ElementStore) -> f64 {
    vm_total(cfg, store, VmResource::CpuConsumption) as f64 / online_cpu_capacity(cfg, store) as f64
}

/// Total CPU demand of the VMs divided by the CPU capacity of the online nodes.
pub fn cpu_demand_load(cfg: &Configuration, store: &ElementStore) -> f64 {
    vm_total(cfg, store, VmResource::CpuDemand) as f64 / online_cpu_capacity(cfg, store) as f64
}

/// Total memory consumption of the VMs divided by the memory capacity of the online nodes.
pub fn memory_consumption_load(cfg: &Configuration, store: &ElementStore) -> f64 {
    vm_total(cfg, store, VmResource::MemoryConsumption) as f64 / online_memory_capacity(cfg, store) as f64
}

/// Total memory demand of the VMs divided by the memory capacity of the online nodes.
pub fn memory_demand_load(cfg: &Configuration, store: &ElementStore) -> f64 {
    vm_total(cfg, store, VmResource::MemoryDemand) as f64 / online_memory_capacity(cfg, store) as f64
}

/// Summary of a configuration state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadReport {
    pub cpu_consumption_load: f64,
    pub cpu_demand_load: f64,
    pub memory_consumption_load: f64,
    pub memory_demand_load: f64,
    pub onlines: usize,
    pub offlines: usize,
    pub runnings: usize,
    pub sleepings: usize,
    pub waitings: usize,
}

impl LoadReport {
    /// Computes the report. The loads are meaningless (NaN or infinite) without online nodes.
    pub fn compute(cfg: &Configuration, store: &ElementStore) -> Self {
        Self {
            cpu_consumption_load: cpu_consumption_load(cfg, store),
            cpu_demand_load: cpu_demand_load(cfg, store),
            memory_consumption_load: memory_consumption_load(cfg, store),
            memory_demand_load: memory_demand_load(cfg, store),
            onlines: cfg.onlines().len(),
            offlines: cfg.offlines().len(),
            runnings: cfg.running_count(),
            sleepings: cfg.sleeping_count(),
            waitings: cfg.waitings().len(),
        }
    }
}
