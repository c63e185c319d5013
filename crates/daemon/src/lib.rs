//! Todocore daemon library: configuration, logging and component wiring.
//!
//! The binary in `main.rs` runs the worker and health prober. Services that
//! embed the task lifecycle hooks build them through [`wiring`] so they see
//! the same configuration.

pub mod logging;
pub mod settings;
pub mod wiring;
