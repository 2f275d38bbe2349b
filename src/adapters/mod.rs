//! Adapters layer: Concrete implementations of ports.
//!
//! - `forest`: random forest CKD model (rayon-parallel training)
//! - `null`: stand-in model when no trained model is present
//! - `memory`: in-memory patient registry
//! - `sanitize`: identifier filtering for logs

pub mod forest;
pub mod memory;
pub mod null;
pub mod sanitize;

pub use forest::{ForestModel, ForestParams};
pub use memory::{InMemoryStorage, StorageError};
pub use null::NullModel;
