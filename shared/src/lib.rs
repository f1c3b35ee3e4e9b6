//! Shared types and models for the Juice Production Planning service
//!
//! This crate contains the production domain shared between the backend,
//! the planning form (via WASM), and the test suites.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
