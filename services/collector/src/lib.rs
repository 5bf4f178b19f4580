//! Collector service library.
//!
//! This module exposes the internal modules for testing purposes.

pub mod config;
pub mod scheduler;
pub mod server;
