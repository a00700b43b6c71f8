//! Integration test modules for cadenza

pub mod concurrency;
pub mod engine;
pub mod graph;
pub mod routing;
