//! Physical node.

use serde::Serialize;

use crate::core::common::NodeId;

/// Represents a physical node. Nodes are immutable once added to the element store.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub nb_cpus: u32,
    pub cpu_capacity: u32,
    pub memory_capacity: u64,
}

impl Node {
    pub fn new(id: NodeId, name: &str, nb_cpus: u32, cpu_capacity: u32, memory_capacity: u64) -> Self {
        Self {
            id,
            name: name.to_string(),
            nb_cpus,
            cpu_capacity,
            memory_capacity,
        }
    }
}
