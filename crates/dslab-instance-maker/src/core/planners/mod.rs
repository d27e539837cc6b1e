//! Planners shipped with the crate.

pub mod greedy;
