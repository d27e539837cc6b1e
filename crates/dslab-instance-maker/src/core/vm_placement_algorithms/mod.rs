//! Implementations of VM placement algorithms.

pub mod best_fit;
pub mod best_fit_threshold;
pub mod first_fit;
pub mod worst_fit;
