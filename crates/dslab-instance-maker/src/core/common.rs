//! Common identifiers and resource selectors.

use rand::SeedableRng;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

/// Identifier of a node inside an [`ElementStore`](crate::core::element_store::ElementStore).
pub type NodeId = u32;

/// Identifier of a virtual machine inside an [`ElementStore`](crate::core::element_store::ElementStore).
pub type VmId = u32;

/// Random number generator used by all randomized operations.
pub type InstanceRng = Pcg64;

/// Creates a generator with the specified seed, for reproducible runs.
pub fn seeded_rng(seed: u64) -> InstanceRng {
    Pcg64::seed_from_u64(seed)
}

/// Creates a generator seeded from the system entropy source.
pub fn entropy_rng() -> InstanceRng {
    Pcg64::from_entropy()
}

/// Resource demand of a single VM, as seen by the placement algorithms.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Allocation {
    pub id: VmId,
    pub cpu_usage: u32,
    pub memory_usage: u64,
}

#[derive(Debug, PartialEq)]
pub enum AllocationVerdict {
    NotEnoughCPU,
    NotEnoughMemory,
    Success,
    NodeNotFound,
}

/// Selects one numeric resource field of a virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VmResource {
    CpuConsumption,
    CpuDemand,
    MemoryConsumption,
    MemoryDemand,
    CpuMax,
    NbCpus,
}
