//! Result consolidation: metrics, deliverables and recommendations

use maestro_core::{
    CompletionStatus, ComplexityProfile, ConsolidatedResult, Deliverable, DeliverableKind,
    PhaseSummary, QualityMetrics, WorkflowPlan, WorkflowState, WorkflowStatus,
};
use tracing::debug;

/// Success rate below which a run is considered too ambitious
const LOW_SUCCESS_RATE: f64 = 0.8;

/// Step-name keywords per deliverable kind, checked in this order
const KIND_KEYWORDS: [(DeliverableKind, &[&str]); 4] = [
    (DeliverableKind::Testing, &["test", "qa", "validation", "verif"]),
    (
        DeliverableKind::Design,
        &["design", "architecture", "interface", "specification", "schema"],
    ),
    (
        DeliverableKind::Code,
        &["code", "implementation", "source", "build", "script"],
    ),
    (
        DeliverableKind::Documentation,
        &[
            "document", "guide", "readme", "manual", "requirement", "stories", "plan", "report",
        ],
    ),
];

/// Classify a step name into a deliverable kind
pub fn deliverable_kind(step: &str) -> DeliverableKind {
    let step = step.to_lowercase();
    KIND_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| step.contains(k)))
        .map(|(kind, _)| *kind)
        .unwrap_or(DeliverableKind::Other)
}

/// Stateless consolidator
pub struct ResultConsolidator;

impl ResultConsolidator {
    pub fn consolidate(
        plan: &WorkflowPlan,
        state: &WorkflowState,
        complexity: &ComplexityProfile,
    ) -> ConsolidatedResult {
        let phase_summaries = Self::summaries(plan, state);
        let quality_metrics = Self::metrics(plan, &phase_summaries);

        let completion_status = if did_no_work(state, &quality_metrics) {
            CompletionStatus::PartiallyCompleted
        } else if quality_metrics.failed_steps == 0 && quality_metrics.skipped_steps == 0 {
            CompletionStatus::Completed
        } else {
            CompletionStatus::PartiallyCompleted
        };

        let deliverables = Self::deliverables(plan, state);
        let recommendations = Self::recommendations(
            &phase_summaries,
            &quality_metrics,
            state,
            complexity,
            deliverables.len(),
        );

        debug!(
            status = %completion_status,
            successful = quality_metrics.successful_steps,
            failed = quality_metrics.failed_steps,
            skipped = quality_metrics.skipped_steps,
            "Consolidated workflow results"
        );

        ConsolidatedResult {
            completion_status,
            phase_summaries,
            deliverables,
            quality_metrics,
            recommendations,
        }
    }

    fn summaries(plan: &WorkflowPlan, state: &WorkflowState) -> Vec<PhaseSummary> {
        plan.phases
            .iter()
            .map(|phase| match state.result_for(&phase.name) {
                Some(result) => PhaseSummary {
                    phase: phase.name.clone(),
                    attempted: true,
                    success: result.success,
                    completed_steps: result.completed_steps,
                    total_steps: phase.steps.len(),
                    degraded: result.degraded,
                    error: result.error.clone(),
                    execution_time_ms: result.execution_time_ms,
                },
                None => PhaseSummary {
                    phase: phase.name.clone(),
                    attempted: false,
                    success: false,
                    completed_steps: 0,
                    total_steps: phase.steps.len(),
                    degraded: false,
                    error: None,
                    execution_time_ms: 0,
                },
            })
            .collect()
    }

    fn metrics(plan: &WorkflowPlan, summaries: &[PhaseSummary]) -> QualityMetrics {
        let total_steps = plan.total_steps();
        let successful_steps: usize = summaries.iter().map(|s| s.completed_steps).sum();
        // A failed phase stops at its first failing step
        let failed_steps = summaries
            .iter()
            .filter(|s| s.attempted && !s.success && s.completed_steps < s.total_steps)
            .count();
        let skipped_steps = total_steps.saturating_sub(successful_steps + failed_steps);

        let attempted_steps = successful_steps + failed_steps;
        let overall_success_rate = if attempted_steps == 0 {
            0.0
        } else {
            successful_steps as f64 / attempted_steps as f64
        };

        QualityMetrics {
            overall_success_rate,
            total_steps,
            successful_steps,
            failed_steps,
            skipped_steps,
            phases_succeeded: summaries.iter().filter(|s| s.attempted && s.success).count(),
            phases_failed: summaries.iter().filter(|s| s.attempted && !s.success).count(),
            phases_not_attempted: summaries.iter().filter(|s| !s.attempted).count(),
            total_execution_time_ms: summaries.iter().map(|s| s.execution_time_ms).sum(),
        }
    }

    /// Flatten successful phase outputs in step order
    fn deliverables(plan: &WorkflowPlan, state: &WorkflowState) -> Vec<Deliverable> {
        let mut deliverables = Vec::new();
        for phase in &plan.phases {
            let Some(result) = state.result_for(&phase.name).filter(|r| r.success) else {
                continue;
            };
            for step in &phase.steps {
                if let Some(content) = result.outputs.get(step) {
                    deliverables.push(Deliverable {
                        phase: phase.name.clone(),
                        step: step.clone(),
                        kind: deliverable_kind(step),
                        content: content.clone(),
                        workers: phase.worker_names(),
                    });
                }
            }
        }
        deliverables
    }

    fn recommendations(
        summaries: &[PhaseSummary],
        metrics: &QualityMetrics,
        state: &WorkflowState,
        complexity: &ComplexityProfile,
        deliverable_count: usize,
    ) -> Vec<String> {
        let mut out = Vec::new();

        if did_no_work(state, metrics) {
            out.push(
                "No phases were executed; check the worker selection and plan before retrying"
                    .to_string(),
            );
            return out;
        }

        let failed: Vec<&str> = summaries
            .iter()
            .filter(|s| s.attempted && !s.success)
            .map(|s| s.phase.as_str())
            .collect();
        if !failed.is_empty() {
            out.push(format!(
                "Review failed steps in: {}",
                failed.join(", ")
            ));
        }

        let attempted = metrics.successful_steps + metrics.failed_steps;
        if attempted > 0 && metrics.overall_success_rate < LOW_SUCCESS_RATE {
            out.push(format!(
                "Success rate was {:.0}%; break down complex tasks into smaller units",
                metrics.overall_success_rate * 100.0
            ));
        }

        if state.budget_exhausted {
            out.push(format!(
                "Iteration budget ran out with {} phase(s) not attempted; \
                 raise max_iterations to finish the plan",
                metrics.phases_not_attempted
            ));
        }

        let degraded: Vec<&str> = summaries
            .iter()
            .filter(|s| s.degraded)
            .map(|s| s.phase.as_str())
            .collect();
        if !degraded.is_empty() {
            out.push(format!(
                "Re-run {} once their prerequisites succeed",
                degraded.join(", ")
            ));
        }

        if complexity.is_complex() {
            for summary in summaries {
                if let Some(advice) = complex_phase_advice(&summary.phase) {
                    out.push(advice.to_string());
                }
            }
        }

        if out.is_empty() {
            out.push(format!(
                "All phases completed; review the {} deliverable(s) before sign-off",
                deliverable_count
            ));
        }

        out
    }
}

/// An empty plan or a run that never started counts as unfinished
fn did_no_work(state: &WorkflowState, metrics: &QualityMetrics) -> bool {
    metrics.total_steps == 0 || state.status == WorkflowStatus::Failed
}

fn complex_phase_advice(phase: &str) -> Option<&'static str> {
    if phase.contains("requirements") {
        Some("Confirm requirements with stakeholders before committing to the design")
    } else if phase.contains("design") {
        Some("Hold an architecture review before implementation proceeds")
    } else if phase.contains("implementation") {
        Some("Deliver the implementation in incremental milestones")
    } else if phase.contains("testing") {
        Some("Add integration and load tests for cross-component paths")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::{Phase, PhaseResult, Priority, Strategy, Task};
    use maestro_planning::TaskClassifier;

    fn plan(steps_per_phase: &[usize]) -> WorkflowPlan {
        WorkflowPlan {
            strategy: Strategy::Sequential,
            phases: steps_per_phase
                .iter()
                .enumerate()
                .map(|(idx, &n)| Phase {
                    name: format!("phase_{}", idx + 1),
                    description: String::new(),
                    workers: Vec::new(),
                    priority: Priority::Medium,
                    estimated_duration: 60,
                    steps: (0..n).map(|s| format!("document_{}", s)).collect(),
                })
                .collect(),
            dependencies: Vec::new(),
            estimated_duration: 60.0 * steps_per_phase.len() as f64,
        }
    }

    fn succeeded(plan: &WorkflowPlan, idx: usize) -> PhaseResult {
        let phase = &plan.phases[idx];
        let mut result = PhaseResult::new(&phase.name);
        for step in &phase.steps {
            result.outputs.insert(step.clone(), format!("content of {}", step));
            result.completed_steps += 1;
        }
        result
    }

    fn simple() -> ComplexityProfile {
        TaskClassifier::complexity(&Task::new("Build a login page"))
    }

    #[test]
    fn test_deliverable_kind_classification() {
        assert_eq!(deliverable_kind("test_plan"), DeliverableKind::Testing);
        assert_eq!(deliverable_kind("architecture_design"), DeliverableKind::Design);
        assert_eq!(deliverable_kind("interface_specification"), DeliverableKind::Design);
        assert_eq!(deliverable_kind("source_code"), DeliverableKind::Code);
        assert_eq!(deliverable_kind("implementation_plan"), DeliverableKind::Code);
        assert_eq!(deliverable_kind("requirements_document"), DeliverableKind::Documentation);
        assert_eq!(deliverable_kind("user_stories"), DeliverableKind::Documentation);
        assert_eq!(deliverable_kind("localization_deliverable"), DeliverableKind::Other);
    }

    #[test]
    fn test_clean_run_is_completed() {
        let plan = plan(&[2, 1]);
        let mut state = WorkflowState::new();
        state.phase_results = vec![succeeded(&plan, 0), succeeded(&plan, 1)];

        let result = ResultConsolidator::consolidate(&plan, &state, &simple());
        assert_eq!(result.completion_status, CompletionStatus::Completed);
        assert_eq!(result.quality_metrics.successful_steps, 3);
        assert_eq!(result.quality_metrics.overall_success_rate, 1.0);
        assert_eq!(result.deliverables.len(), 3);
        assert_eq!(result.deliverables[0].step, "document_0");
        assert_eq!(result.recommendations.len(), 1);
        assert!(result.recommendations[0].contains("3 deliverable"));
    }

    #[test]
    fn test_failed_step_makes_partial() {
        let plan = plan(&[1, 2, 1]);
        let mut failed = PhaseResult::new("phase_2");
        failed.outputs.insert("document_0".to_string(), "draft".to_string());
        failed.completed_steps = 1;
        failed.fail("document_1: invoker unavailable");
        let mut third = succeeded(&plan, 2);
        third.degraded = true;

        let mut state = WorkflowState::new();
        state.phase_results = vec![succeeded(&plan, 0), failed, third];

        let result = ResultConsolidator::consolidate(&plan, &state, &simple());
        let metrics = &result.quality_metrics;
        assert_eq!(result.completion_status, CompletionStatus::PartiallyCompleted);
        assert_eq!(metrics.successful_steps, 3);
        assert_eq!(metrics.failed_steps, 1);
        assert_eq!(metrics.skipped_steps, 0);
        assert_eq!(metrics.overall_success_rate, 0.75);
        assert_eq!(metrics.phases_failed, 1);

        // failed phase outputs are not deliverables
        assert!(result.deliverables.iter().all(|d| d.phase != "phase_2"));
        assert!(result.recommendations[0].starts_with("Review failed steps in: phase_2"));
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("break down complex tasks")));
        assert!(result.recommendations.iter().any(|r| r.contains("Re-run phase_3")));
    }

    #[test]
    fn test_unattempted_phases_are_skipped_steps() {
        let plan = plan(&[1, 1, 1]);
        let mut state = WorkflowState::new();
        state.phase_results = vec![succeeded(&plan, 0)];
        state.budget_exhausted = true;

        let result = ResultConsolidator::consolidate(&plan, &state, &simple());
        assert_eq!(result.completion_status, CompletionStatus::PartiallyCompleted);
        assert_eq!(result.quality_metrics.skipped_steps, 2);
        assert_eq!(result.quality_metrics.phases_not_attempted, 2);
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("raise max_iterations")));
        assert!(!result.phase_summaries[1].attempted);
    }

    #[test]
    fn test_complex_tasks_get_phase_advice() {
        let mut plan = plan(&[1, 1]);
        plan.phases[0].name = "system_design".to_string();
        plan.phases[1].name = "implementation".to_string();
        let mut state = WorkflowState::new();
        state.phase_results = vec![succeeded(&plan, 0), succeeded(&plan, 1)];

        let complex = TaskClassifier::complexity(&Task::new(
            "distributed microservices architecture with API gateway",
        ));
        let result = ResultConsolidator::consolidate(&plan, &state, &complex);
        assert_eq!(result.completion_status, CompletionStatus::Completed);
        assert_eq!(result.recommendations.len(), 2);
        assert!(result.recommendations[0].contains("architecture review"));
    }

    #[test]
    fn test_empty_run_is_not_completed() {
        let plan = plan(&[]);
        let mut state = WorkflowState::new();
        state.status = WorkflowStatus::Failed;
        let result = ResultConsolidator::consolidate(&plan, &state, &simple());
        assert_eq!(result.quality_metrics.overall_success_rate, 0.0);
        assert_eq!(result.quality_metrics.phases_succeeded, 0);
        assert_eq!(
            result.completion_status,
            CompletionStatus::PartiallyCompleted
        );
        assert_eq!(result.recommendations.len(), 1);
        assert!(result.recommendations[0].contains("No phases were executed"));
    }
}
