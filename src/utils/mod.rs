//! The `utils` module provides a collection of utility functions and common
//! definitions used across the `courier` application.
//!
//! It contains the shared error types returned by the broker, registry and
//! persistence layers, and the logging initialization helper.

pub mod error;
pub mod logging;
