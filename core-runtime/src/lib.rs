//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the library sync core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus for sync lifecycle notifications
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the library and sync
//! crates depend on. It establishes the logging conventions and the event
//! broadcasting mechanism used throughout the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
