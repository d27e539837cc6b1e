//! Representations of virtual machine and its state.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::core::common::{Allocation, VmId, VmResource};

/// State of virtual machine inside a configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmState {
    Waiting,
    Running,
    Sleeping,
}

impl Display for VmState {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmState::Waiting => write!(f, "waiting"),
            VmState::Running => write!(f, "running"),
            VmState::Sleeping => write!(f, "sleeping"),
        }
    }
}

/// Represents virtual machine (VM).
///
// VM is characterized by its current resource consumption and its demand, i.e. the amount of resources it is expected
// to need in the future. CPU max is the ceiling used by the resource scaler to derive consumption and demand from a
// ratio.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VirtualMachine {
    pub id: VmId,
    pub name: String,
    pub nb_cpus: u32,
    pub cpu_consumption: u32,
    pub memory_consumption: u64,
    pub cpu_demand: u32,
    pub memory_demand: u64,
    pub cpu_max: u32,
    pub template: Option<String>,
    pub options: BTreeMap<String, Option<String>>,
}

impl VirtualMachine {
    /// Creates virtual machine whose demand equals its consumption and whose CPU max equals its CPU consumption.
    pub fn new(id: VmId, name: &str, nb_cpus: u32, cpu_consumption: u32, memory_consumption: u64) -> Self {
        Self {
            id,
            name: name.to_string(),
            nb_cpus,
            cpu_consumption,
            memory_consumption,
            cpu_demand: cpu_consumption,
            memory_demand: memory_consumption,
            cpu_max: cpu_consumption,
            template: None,
            options: BTreeMap::new(),
        }
    }

    /// Returns a copy of this VM with another identity. All other attributes are kept.
    pub fn duplicate(&self, id: VmId, name: &str) -> Self {
        let mut copy = self.clone();
        copy.id = id;
        copy.name = name.to_string();
        copy
    }

    /// Adds a flag option (without value).
    pub fn add_option(&mut self, key: &str) {
        self.options.insert(key.to_string(), None);
    }

    /// Adds an option with value, replacing the previous value if any.
    pub fn add_option_with_value(&mut self, key: &str, value: &str) {
        self.options.insert(key.to_string(), Some(value.to_string()));
    }

    pub fn resource(&self, resource: VmResource) -> u64 {
        match resource {
            VmResource::CpuConsumption => self.cpu_consumption as u64,
            VmResource::CpuDemand => self.cpu_demand as u64,
            VmResource::MemoryConsumption => self.memory_consumption,
            VmResource::MemoryDemand => self.memory_demand,
            VmResource::CpuMax => self.cpu_max as u64,
            VmResource::NbCpus => self.nb_cpus as u64,
        }
    }

    /// Returns the current consumption as an allocation.
    pub fn consumption(&self) -> Allocation {
        Allocation {
            id: self.id,
            cpu_usage: self.cpu_consumption,
            memory_usage: self.memory_consumption,
        }
    }

    /// Returns the demand as an allocation.
    pub fn demand(&self) -> Allocation {
        Allocation {
            id: self.id,
            cpu_usage: self.cpu_demand,
            memory_usage: self.memory_demand,
        }
    }
}
