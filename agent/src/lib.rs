//! Goal-driven plan/execute/review agent loop.
//!
//! A single persisted [`state::AgentState`] threads through a fixed cycle of
//! nodes driven by a remote completion service. The crate keeps a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (reply parsing, the safe action
//!   set, retry schedule). No I/O.
//! - **[`io`]**: Side-effecting operations (state file, config, HTTP calls,
//!   probe server). Isolated behind traits so tests can script them.
//! - **[`nodes`]**: One function per step, mutating the state in place.
//!
//! [`controller`] ties the nodes together and implements `goal-agent run`.

pub mod context;
pub mod controller;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod nodes;
pub mod state;
pub mod status;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
