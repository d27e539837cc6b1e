pub mod common;
pub mod configuration;
pub mod constraint;
pub mod element_store;
pub mod generator;
pub mod metrics;
pub mod mutator;
pub mod node;
pub mod planner;
pub mod planners;
pub mod resource_pool;
pub mod scaler;
pub mod template;
pub mod vjob;
pub mod vm;
pub mod vm_placement_algorithm;
pub mod vm_placement_algorithms;
