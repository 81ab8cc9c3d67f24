//! Maestro Planning - from task text to workflow plan
//!
//! This crate covers the pure, synchronous half of an orchestration run:
//! classifying a task, choosing workers for it and arranging those workers
//! into a phase graph. Nothing here performs I/O; the same inputs always
//! produce the same outputs.

pub mod builder;
pub mod classifier;
pub mod selector;
pub mod templates;

pub use builder::PlanBuilder;
pub use classifier::TaskClassifier;
pub use selector::WorkerSelector;
pub use templates::{canonical_phases, steps_for_capability, steps_for_worker, CanonicalPhase};
