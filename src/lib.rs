//! Updraft Library
//!
//! This library provides the core functionality for the `updraft` CLI:
//! version arbitration, cancellable artifact downloads, descriptor
//! inspection, and staged plugin installation with deferred cleanup.

pub mod commands;
pub mod core;
pub mod error;
pub mod plugin;
pub mod utils;
