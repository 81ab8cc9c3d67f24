//! # maestro-core
//!
//! Core types for the Maestro task-to-workflow orchestration system.
//!
//! A free-text task flows through a fixed pipeline:
//!
//! - The classifier scores its complexity and domain
//! - The selector picks capability-matched workers
//! - The plan builder arranges workers into phases with dependency edges
//! - The executor walks the plan and records per-phase results
//! - The consolidator turns results into a report with recommendations
//!
//! This crate holds the data that moves between those stages, plus the
//! shared error type and repository-level configuration.

pub mod config;
mod error;
pub mod fail_open;
mod types;
mod workflow;

pub use config::{LoggingConfig, MaestroConfig, WorkflowDefaults};
pub use error::{MaestroError, Result};
pub use types::*;
pub use workflow::*;
