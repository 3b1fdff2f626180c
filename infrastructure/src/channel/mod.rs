//! Subprocess Tool Channel
//!
//! Hosts tools that must run in an isolated process: separate credentials,
//! separate dependency surface, long-running or blocking external calls.
//! The parent spawns the tool server with an explicit, minimal environment
//! and speaks a newline-delimited JSON protocol over the child's
//! stdin/stdout; stderr is a diagnostic side channel that never touches the
//! protocol stream.

pub mod config;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod session;
