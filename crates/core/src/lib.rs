//! Automation Hub Core
//!
//! Foundational error types, capability-provider traits and the shared backoff
//! policy for the Automation Hub task engine. This crate has zero dependencies
//! on engine-level code (planner, scheduler, executor).
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `capability` - Collaborator traits consumed by step handlers
//!   (`BrowserCapability`, `FileSystemCapability`, `CodeAnalysisCapability`,
//!   `HttpCapability`, `ErrorRecovery`)
//! - `backoff` - Retry delay policy (`BackoffStrategy`)
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/async-trait/thiserror** - keeps build times minimal
//! 2. **Trait-based abstractions** - enables mocking, testing, and swapping backends
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod backoff;
pub mod capability;
pub mod error;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Capability Traits ──────────────────────────────────────────────────
pub use capability::{
    BrowserCapability, BrowserSession, CodeAnalysisCapability, DirEntry, ErrorRecovery,
    ErrorReport, FileSystemCapability, HttpCapability, HttpRequest, HttpResponse,
    SessionOptions, Severity, StructureReport,
};

// ── Backoff ────────────────────────────────────────────────────────────
pub use backoff::BackoffStrategy;
