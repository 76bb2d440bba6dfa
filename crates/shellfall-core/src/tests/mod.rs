//! Crate-level tests.
//!
//! - `helpers.rs`: match setup, scripted physics, tracing for tests
//! - `integration.rs`: whole matches driven through the coordinator
//! - `determinism.rs`: seeded reproducibility and replica agreement

mod determinism;
mod helpers;
mod integration;
