//! Task Execution Engine
//!
//! Planner, scheduler and executor, plus the step handlers, step validation
//! and progress events they share.
//!
//! The scheduler composes the planner and the executor; the executor depends
//! only on capability providers.

pub mod events;
pub mod executor;
pub mod handlers;
pub mod planner;
pub mod scheduler;
pub mod validation;

pub use events::{EngineEvent, EventBus};
pub use executor::Executor;
pub use handlers::{HandlerRegistry, StepHandler};
pub use planner::{assess_risk, fallback_strategies, order_steps, Planner};
pub use scheduler::Scheduler;
pub use validation::StepValidator;

use crate::models::EngineConfig;
use crate::services::capabilities::Capabilities;
use crate::utils::error::AppResult;

/// Build a scheduler over the local capability providers.
pub async fn local_scheduler(config: EngineConfig) -> AppResult<Scheduler> {
    let capabilities = Capabilities::local(&config)?;
    let executor = Executor::new(&capabilities, EventBus::default());
    Scheduler::new(config, Planner::new(), executor, capabilities.recovery.clone()).await
}
