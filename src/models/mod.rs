//! Data Models
//!
//! Contains all data structures used throughout the engine.

pub mod execution;
pub mod plan;
pub mod queue;
pub mod requirement;
pub mod settings;

pub use execution::*;
pub use plan::*;
pub use queue::*;
pub use requirement::*;
pub use settings::*;
