//! Step invocation contract and the template-backed default invoker

use async_trait::async_trait;
use maestro_core::{DeliverableKind, Result, SharedContext, WorkerDescriptor};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::consolidator::deliverable_kind;

/// Everything an invoker gets to see for one step
#[derive(Debug, Clone)]
pub struct StepRequest {
    pub task: String,
    pub phase: String,
    pub phase_description: String,
    pub step: String,
    pub workers: Vec<WorkerDescriptor>,
    /// Outputs of earlier steps in the same phase
    pub prior_outputs: BTreeMap<String, String>,
    /// Snapshot of published phase outputs (empty when sharing is off)
    pub shared_context: SharedContext,
    /// Prerequisite phases that failed or never ran
    pub missing_prerequisites: Vec<String>,
}

/// Result reported by an invoker for one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// Executes a single step (allows mocking in tests)
///
/// An `Err` is treated like an unsuccessful outcome: it fails the owning
/// phase and never aborts the run.
#[async_trait]
pub trait StepInvoker: Send + Sync {
    async fn invoke(&self, request: &StepRequest) -> Result<StepOutcome>;
}

#[async_trait]
impl<T: StepInvoker + ?Sized> StepInvoker for Arc<T> {
    async fn invoke(&self, request: &StepRequest) -> Result<StepOutcome> {
        (**self).invoke(request).await
    }
}

#[async_trait]
impl<'a, T: StepInvoker + ?Sized> StepInvoker for &'a T {
    async fn invoke(&self, request: &StepRequest) -> Result<StepOutcome> {
        (**self).invoke(request).await
    }
}

/// Produces deliverable content for a kind of step
pub trait DeliverableRenderer: Send + Sync {
    fn render(&self, kind: DeliverableKind, request: &StepRequest) -> String;
}

/// Plain markdown renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl DeliverableRenderer for MarkdownRenderer {
    fn render(&self, kind: DeliverableKind, request: &StepRequest) -> String {
        let mut out = format!("# {}\n\n", title_case(&request.step));
        out.push_str(&format!("**Phase**: {}\n", request.phase));
        out.push_str(&format!("**Kind**: {}\n", kind));

        let owners: Vec<&str> = request.workers.iter().map(|w| w.title.as_str()).collect();
        if !owners.is_empty() {
            out.push_str(&format!("**Prepared by**: {}\n", owners.join(", ")));
        }
        out.push('\n');

        out.push_str("## Task\n\n");
        out.push_str(request.task.trim());
        out.push_str("\n\n");

        let section = match kind {
            DeliverableKind::Documentation => "Summary",
            DeliverableKind::Design => "Proposed Design",
            DeliverableKind::Code => "Implementation Notes",
            DeliverableKind::Testing => "Verification",
            DeliverableKind::Other => "Notes",
        };
        out.push_str(&format!("## {}\n\n", section));
        out.push_str(&request.phase_description);
        out.push_str("\n\n");

        if !request.prior_outputs.is_empty() {
            out.push_str("## Builds On\n\n");
            for step in request.prior_outputs.keys() {
                out.push_str(&format!("- {}\n", step));
            }
            out.push('\n');
        }

        let upstream: Vec<&String> = request.shared_context.phases().collect();
        if !upstream.is_empty() {
            out.push_str("## Inputs From Earlier Phases\n\n");
            for phase in upstream {
                let steps = request
                    .shared_context
                    .get(phase)
                    .map(|o| o.keys().cloned().collect::<Vec<_>>().join(", "))
                    .unwrap_or_default();
                out.push_str(&format!("- {}: {}\n", phase, steps));
            }
            out.push('\n');
        }

        if !request.missing_prerequisites.is_empty() {
            out.push_str(&format!(
                "> Prepared without output from: {}\n",
                request.missing_prerequisites.join(", ")
            ));
        }

        out
    }
}

/// Invoker that renders a templated deliverable for every step
#[derive(Debug, Clone, Default)]
pub struct TemplateInvoker<R = MarkdownRenderer> {
    renderer: R,
}

impl TemplateInvoker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: DeliverableRenderer> TemplateInvoker<R> {
    pub fn with_renderer(renderer: R) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl<R: DeliverableRenderer> StepInvoker for TemplateInvoker<R> {
    async fn invoke(&self, request: &StepRequest) -> Result<StepOutcome> {
        let kind = deliverable_kind(&request.step);
        Ok(StepOutcome::ok(self.renderer.render(kind, request)))
    }
}

fn title_case(step: &str) -> String {
    step.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
