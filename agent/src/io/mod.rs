//! I/O helpers: persistence, configuration, completion calls, probes.

pub mod completion;
pub mod config;
pub mod health;
pub mod paths;
pub mod prompt;
pub mod state_store;
