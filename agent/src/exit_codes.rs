//! Stable exit codes for `goal-agent` commands.

/// Command succeeded, the goal was completed, or it already was.
pub const OK: i32 = 0;
/// Command failed due to invalid config, unwritable state, or other errors.
pub const INVALID: i32 = 1;
/// `goal-agent run` hit the tick ceiling before the goal was complete.
pub const CEILING: i32 = 2;
