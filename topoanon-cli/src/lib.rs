//! Support library for the `topoanon` binary.
//!
//! Exposes the command pipeline and logging setup so integration tests can
//! drive a full run without spawning a process.

pub mod cli;
pub mod logging;
