//! Agent nodes: one function per step of the plan/execute/review cycle.
//!
//! Every node mutates the state in place and never fails; failures become
//! part of the state (a fallback estimate, an error task, an error result)
//! so the loop always has a loggable outcome to persist.

pub mod estimator;
pub mod executor;
pub mod planner;
pub mod reviewer;
