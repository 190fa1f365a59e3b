//! loopstacks operator library.
//!
//! This crate primarily ships an `operator` binary, but we expose the
//! controllers, registry and dispatcher as a library to enable integration
//! testing and reuse with other store backends.

pub mod config;
pub mod controllers;
pub mod dispatch;
pub mod registry;
pub mod seed;
