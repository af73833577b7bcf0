//! Integration Tests Module
//!
//! End-to-end tests for the task execution engine, driven through the public
//! API with in-test capability doubles.


// Plan generation and dependency ordering
mod planner_test;

// Step execution, fail-fast and cancellation
mod executor_test;

// Queues, admission, retries and concurrency caps
mod scheduler_test;
