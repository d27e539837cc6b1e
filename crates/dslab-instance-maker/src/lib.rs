#![doc = include_str!("../readme.md")]

pub mod config;
pub mod core;
pub mod instance;
