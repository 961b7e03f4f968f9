//! Domain layer for the Heike agent runtime.
//!
//! Core data model, error taxonomy, and the ports external collaborators
//! implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{AgentError, AgentResult};
