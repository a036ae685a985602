//! Deterministic, pure logic shared by the agent nodes.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod action;
pub mod backoff;
pub mod reply;
