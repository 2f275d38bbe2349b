//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod demo;
mod model_loader;
mod records;
mod scoring;

pub use demo::{demo_lab_history, demo_patients, seed_demo, DEMO_TRENDS_PATIENT};
pub use model_loader::{load_model, load_model_or_fallback};
pub use records::RecordService;
pub use scoring::ScoringService;
