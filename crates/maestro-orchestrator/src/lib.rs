//! # maestro-orchestrator
//!
//! Execution half of the Maestro pipeline.
//!
//! This crate provides:
//! - The `StepInvoker` contract and a markdown template invoker
//! - The plan executor with shared-context propagation and partial-failure handling
//! - Result consolidation into metrics, deliverables and recommendations
//! - An activity log under `.maestro/activity.md`
//! - The `Orchestrator` facade with typed request and response enums

mod activity_logger;
mod consolidator;
mod executor;
mod invoker;
mod orchestrator;

pub use activity_logger::ActivityLogger;
pub use consolidator::{deliverable_kind, ResultConsolidator};
pub use executor::{ExecutorConfig, PlanExecutor};
pub use invoker::{
    DeliverableRenderer, MarkdownRenderer, StepInvoker, StepOutcome, StepRequest, TemplateInvoker,
};
pub use orchestrator::{
    OrchestrationRequest, OrchestrationResponse, Orchestrator, Request, Response, TaskAnalysis,
};
