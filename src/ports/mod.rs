//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the scoring application and its collaborators (probability
//! model, patient registry storage).

mod risk_model;
mod storage;

pub use risk_model::{ModelError, RiskModel};
pub use storage::Storage;
