//! Services
//!
//! The task execution engine and the local capability providers it runs on.

pub mod capabilities;
pub mod engine;
