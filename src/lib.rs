//! Automation Hub - Task Execution Engine
//!
//! Turns abstract work requests into scheduled, tracked, retried executions:
//! - Planner: requirement -> dependency-ordered execution plan
//! - Scheduler: priority queues with admission control, concurrency caps and retry
//! - Executor: sequential, fail-fast step execution over capability providers
//!
//! Capability providers (browser, filesystem, code analysis, HTTP, error
//! recovery) are traits in `automation-hub-core`; local implementations live
//! in `services::capabilities`.

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::*;
pub use services::capabilities::Capabilities;
pub use services::engine::{
    local_scheduler, EngineEvent, EventBus, Executor, HandlerRegistry, Planner, Scheduler,
    StepHandler, StepValidator,
};
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
