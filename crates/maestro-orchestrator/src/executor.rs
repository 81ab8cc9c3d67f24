//! Plan Executor - walks a workflow plan phase by phase
//!
//! Key design: a failed step fails its phase, never the run. Every phase the
//! budget allows is attempted; later phases see which prerequisites are
//! missing and are flagged as degraded.
//!
//! Each run owns its [`WorkflowState`]. In wave mode, phases with no
//! dependency path between them run concurrently and publish their outputs
//! into the shared context one at a time, after they finish.

use chrono::Utc;
use futures::future::join_all;
use maestro_core::{
    Phase, PhaseResult, Result, SharedContext, WorkflowDefaults, WorkflowPlan, WorkflowState,
    WorkflowStatus,
};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::activity_logger::ActivityLogger;
use crate::invoker::{StepInvoker, StepRequest};

/// Execution parameters for one run
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Phase attempts allowed (0 = unlimited)
    pub max_iterations: usize,
    pub context_sharing: bool,
    /// Wall-clock deadline for each phase
    pub phase_timeout: Duration,
    /// Run independent phases concurrently
    pub parallel_phases: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from(&WorkflowDefaults::default())
    }
}

impl From<&WorkflowDefaults> for ExecutorConfig {
    fn from(defaults: &WorkflowDefaults) -> Self {
        Self {
            max_iterations: defaults.max_iterations,
            context_sharing: defaults.context_sharing,
            phase_timeout: defaults.phase_timeout(),
            parallel_phases: defaults.parallel_phases,
        }
    }
}

/// Executes workflow plans through a step invoker
pub struct PlanExecutor<I: StepInvoker> {
    invoker: I,
    config: ExecutorConfig,
    activity_logger: Option<ActivityLogger>,
}

impl<I: StepInvoker> PlanExecutor<I> {
    pub fn new(invoker: I, config: ExecutorConfig) -> Self {
        Self {
            invoker,
            config,
            activity_logger: None,
        }
    }

    /// Enable activity logging to `<maestro_dir>/activity.md`
    pub fn with_activity_logging(mut self, maestro_dir: std::path::PathBuf) -> Self {
        self.activity_logger = Some(ActivityLogger::new(maestro_dir));
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run a plan to the end or until the iteration budget runs out
    ///
    /// Only a structurally invalid plan is an error. Step failures, timeouts
    /// and budget exhaustion are recorded in the returned state.
    #[instrument(skip_all, fields(phases = plan.phases.len(), strategy = %plan.strategy))]
    pub async fn execute(&self, task: &str, plan: &WorkflowPlan) -> Result<WorkflowState> {
        plan.validate()?;

        let mut state = WorkflowState::new();
        info!("Starting workflow {}", state.id);

        if let Some(logger) = &self.activity_logger {
            logger.log_run_start(&state, task, plan).await;
        }

        if plan.is_empty() {
            warn!("Workflow {} has no phases", state.id);
            state.status = WorkflowStatus::Failed;
            state.warnings.push("Plan has no phases to execute".to_string());
            return Ok(self.finish(state).await);
        }

        state.status = WorkflowStatus::Executing;

        if self.config.parallel_phases {
            self.run_waves(task, plan, &mut state).await?;
        } else {
            self.run_sequential(task, plan, &mut state).await;
        }

        state.status = WorkflowStatus::Completed;
        Ok(self.finish(state).await)
    }

    async fn run_sequential(&self, task: &str, plan: &WorkflowPlan, state: &mut WorkflowState) {
        for (idx, phase) in plan.phases.iter().enumerate() {
            if self.budget_spent(state.current_iteration) {
                self.record_budget_exhausted(state, plan.phases.len() - idx);
                break;
            }
            state.current_iteration += 1;

            let missing = missing_prerequisites(plan, phase, &state.phase_results);
            let snapshot = if self.config.context_sharing {
                state.shared_context.clone()
            } else {
                SharedContext::new()
            };

            let result = self.run_phase(task, phase, snapshot, missing).await;

            if result.success && self.config.context_sharing {
                state.shared_context.publish(&phase.name, &result.outputs);
            }
            if let Some(logger) = &self.activity_logger {
                logger.log_phase(state.current_iteration, &result).await;
            }
            state.phase_results.push(result);
        }
    }

    async fn run_waves(
        &self,
        task: &str,
        plan: &WorkflowPlan,
        state: &mut WorkflowState,
    ) -> Result<()> {
        let waves = plan.execution_waves()?;
        let context = Mutex::new(SharedContext::new());
        let mut slots: Vec<Option<PhaseResult>> = vec![None; plan.phases.len()];
        let mut remaining = plan.phases.len();

        for wave in waves {
            let mut batch = Vec::new();
            for idx in wave {
                if self.budget_spent(state.current_iteration) {
                    break;
                }
                state.current_iteration += 1;
                batch.push((state.current_iteration, idx));
            }
            let truncated = self.budget_spent(state.current_iteration);
            debug!("Running wave of {} phase(s)", batch.len());

            // Every phase in a wave sees the context as of the wave start
            let finished: Vec<PhaseResult> = slots.iter().flatten().cloned().collect();
            let snapshot = if self.config.context_sharing {
                context.lock().await.clone()
            } else {
                SharedContext::new()
            };
            let context = &context;
            let runs = batch.iter().map(|&(iteration, idx)| {
                let phase = &plan.phases[idx];
                let missing = missing_prerequisites(plan, phase, &finished);
                let snapshot = snapshot.clone();
                async move {
                    let result = self.run_phase(task, phase, snapshot, missing).await;
                    if result.success && self.config.context_sharing {
                        context.lock().await.publish(&phase.name, &result.outputs);
                    }
                    if let Some(logger) = &self.activity_logger {
                        logger.log_phase(iteration, &result).await;
                    }
                    (idx, result)
                }
            });

            for (idx, result) in join_all(runs).await {
                slots[idx] = Some(result);
                remaining -= 1;
            }

            if truncated && remaining > 0 {
                self.record_budget_exhausted(state, remaining);
                break;
            }
        }

        // Plan order, regardless of completion order
        state.phase_results = slots.into_iter().flatten().collect();
        state.shared_context = context.into_inner();
        Ok(())
    }

    /// Run every step of one phase in order, stopping at the first failure
    async fn run_phase(
        &self,
        task: &str,
        phase: &Phase,
        shared_context: SharedContext,
        missing_prerequisites: Vec<String>,
    ) -> PhaseResult {
        let started = Instant::now();
        // a timeout too large to represent means no deadline
        let deadline = started.checked_add(self.config.phase_timeout);
        let mut result = PhaseResult::new(&phase.name);
        result.degraded = !missing_prerequisites.is_empty();

        if result.degraded {
            warn!(
                phase = %phase.name,
                missing = ?missing_prerequisites,
                "Running phase without its prerequisites"
            );
        }

        for step in &phase.steps {
            let request = StepRequest {
                task: task.to_string(),
                phase: phase.name.clone(),
                phase_description: phase.description.clone(),
                step: step.clone(),
                workers: phase.workers.clone(),
                prior_outputs: result.outputs.clone(),
                shared_context: shared_context.clone(),
                missing_prerequisites: missing_prerequisites.clone(),
            };

            let invocation = self.invoker.invoke(&request);
            let outcome = match deadline {
                Some(deadline) => timeout_at(deadline, invocation).await,
                None => Ok(invocation.await),
            };

            match outcome {
                Ok(Ok(outcome)) if outcome.success => {
                    result
                        .outputs
                        .insert(step.clone(), outcome.output.unwrap_or_default());
                    result.completed_steps += 1;
                }
                Ok(Ok(outcome)) => {
                    let reason = outcome
                        .error
                        .unwrap_or_else(|| "reported failure without detail".to_string());
                    result.fail(format!("{}: {}", step, reason));
                    break;
                }
                Ok(Err(e)) => {
                    result.fail(format!("{}: {}", step, e));
                    break;
                }
                Err(_) => {
                    result.fail(format!(
                        "{}: phase deadline of {}ms exceeded",
                        step,
                        self.config.phase_timeout.as_millis()
                    ));
                    break;
                }
            }
        }

        result.execution_time_ms = started.elapsed().as_millis() as u64;

        if result.success {
            info!(
                "Phase {} completed {} step(s) in {}ms",
                phase.name, result.completed_steps, result.execution_time_ms
            );
        } else {
            warn!(
                phase = %phase.name,
                error = result.error.as_deref().unwrap_or_default(),
                "Phase failed"
            );
        }

        result
    }

    fn budget_spent(&self, iteration: usize) -> bool {
        self.config.max_iterations > 0 && iteration >= self.config.max_iterations
    }

    fn record_budget_exhausted(&self, state: &mut WorkflowState, remaining: usize) {
        let message = format!(
            "Iteration budget of {} exhausted with {} phase(s) not attempted",
            self.config.max_iterations, remaining
        );
        warn!("{}", message);
        state.budget_exhausted = true;
        state.warnings.push(message);
    }

    async fn finish(&self, mut state: WorkflowState) -> WorkflowState {
        state.finished_at = Some(Utc::now());
        if let Some(logger) = &self.activity_logger {
            logger.log_run_complete(&state).await;
        }
        info!(
            "Workflow {} {} after {} phase(s)",
            state.id, state.status, state.current_iteration
        );
        state
    }
}

/// Prerequisites of `phase` that have no successful result yet
fn missing_prerequisites(
    plan: &WorkflowPlan,
    phase: &Phase,
    results: &[PhaseResult],
) -> Vec<String> {
    plan.prerequisites_of(&phase.name)
        .into_iter()
        .filter(|dep| {
            !results
                .iter()
                .any(|r| r.phase_name == *dep && r.success)
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::{StepOutcome, TemplateInvoker};
    use async_trait::async_trait;
    use maestro_core::{Dependency, DependencyKind, MaestroError, Priority, Strategy};
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    fn phase(name: &str, steps: &[&str]) -> Phase {
        Phase {
            name: name.to_string(),
            description: format!("{} phase", name),
            workers: Vec::new(),
            priority: Priority::Medium,
            estimated_duration: 60,
            steps: steps.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn chain(phases: Vec<Phase>) -> WorkflowPlan {
        let dependencies = phases
            .windows(2)
            .map(|pair| Dependency {
                phase: pair[1].name.clone(),
                depends_on: vec![pair[0].name.clone()],
                kind: DependencyKind::Sequential,
            })
            .collect();
        WorkflowPlan {
            strategy: Strategy::Sequential,
            phases,
            dependencies,
            estimated_duration: 0.0,
        }
    }

    fn config() -> ExecutorConfig {
        ExecutorConfig {
            max_iterations: 0,
            context_sharing: true,
            phase_timeout: Duration::from_secs(5),
            parallel_phases: false,
        }
    }

    /// Fails named steps and records every request it sees
    #[derive(Default)]
    struct ScriptedInvoker {
        failing: HashSet<String>,
        erroring: HashSet<String>,
        seen: StdMutex<Vec<StepRequest>>,
    }

    impl ScriptedInvoker {
        fn failing(steps: &[&str]) -> Self {
            Self {
                failing: steps.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        fn seen(&self) -> Vec<StepRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StepInvoker for ScriptedInvoker {
        async fn invoke(&self, request: &StepRequest) -> Result<StepOutcome> {
            self.seen.lock().unwrap().push(request.clone());
            if self.erroring.contains(&request.step) {
                return Err(MaestroError::Step("backend unavailable".to_string()));
            }
            if self.failing.contains(&request.step) {
                return Ok(StepOutcome::failed("scripted failure"));
            }
            Ok(StepOutcome::ok(format!("{} output", request.step)))
        }
    }

    struct SlowInvoker;

    #[async_trait]
    impl StepInvoker for SlowInvoker {
        async fn invoke(&self, request: &StepRequest) -> Result<StepOutcome> {
            if request.step == "slow" {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(StepOutcome::ok("done"))
        }
    }

    #[tokio::test]
    async fn test_steps_run_in_order_with_prior_outputs() {
        let invoker = ScriptedInvoker::default();
        let executor = PlanExecutor::new(&invoker, config());
        let plan = chain(vec![phase("one", &["a", "b", "c"])]);

        let state = executor.execute("task", &plan).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert_eq!(state.phase_results[0].completed_steps, 3);

        let seen = invoker.seen();
        let steps: Vec<&str> = seen.iter().map(|r| r.step.as_str()).collect();
        assert_eq!(steps, vec!["a", "b", "c"]);
        assert!(seen[2].prior_outputs.contains_key("a"));
        assert!(seen[2].prior_outputs.contains_key("b"));
    }

    #[tokio::test]
    async fn test_failed_step_stops_phase_but_not_run() {
        let invoker = ScriptedInvoker::failing(&["b"]);
        let executor = PlanExecutor::new(&invoker, config());
        let plan = chain(vec![
            phase("one", &["a"]),
            phase("two", &["b", "never"]),
            phase("three", &["c"]),
        ]);

        let state = executor.execute("task", &plan).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert_eq!(state.phase_results.len(), 3);

        let two = &state.phase_results[1];
        assert!(!two.success);
        assert_eq!(two.completed_steps, 0);
        assert_eq!(two.error.as_deref(), Some("b: scripted failure"));

        let three = &state.phase_results[2];
        assert!(three.success);
        assert!(three.degraded);

        let seen = invoker.seen();
        assert!(seen.iter().all(|r| r.step != "never"));
        let c = seen.iter().find(|r| r.step == "c").unwrap();
        assert_eq!(c.missing_prerequisites, vec!["two"]);

        // failed phase is never published
        assert!(state.shared_context.get("two").is_none());
        assert!(state.shared_context.get("one").is_some());
    }

    #[tokio::test]
    async fn test_invoker_error_is_recorded_as_step_failure() {
        let invoker = ScriptedInvoker {
            erroring: ["a".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let executor = PlanExecutor::new(&invoker, config());
        let plan = chain(vec![phase("one", &["a"])]);

        let state = executor.execute("task", &plan).await.unwrap();
        let error = state.phase_results[0].error.as_deref().unwrap();
        assert!(error.contains("backend unavailable"));
    }

    #[tokio::test]
    async fn test_context_flows_to_later_phases() {
        let invoker = ScriptedInvoker::default();
        let executor = PlanExecutor::new(&invoker, config());
        let plan = chain(vec![phase("one", &["a"]), phase("two", &["b"])]);

        executor.execute("task", &plan).await.unwrap();
        let seen = invoker.seen();
        let b = seen.iter().find(|r| r.step == "b").unwrap();
        assert_eq!(
            b.shared_context.get("one").and_then(|o| o.get("a")).map(String::as_str),
            Some("a output")
        );
    }

    #[tokio::test]
    async fn test_context_sharing_disabled() {
        let invoker = ScriptedInvoker::default();
        let mut cfg = config();
        cfg.context_sharing = false;
        let executor = PlanExecutor::new(&invoker, cfg);
        let plan = chain(vec![phase("one", &["a"]), phase("two", &["b"])]);

        let state = executor.execute("task", &plan).await.unwrap();
        assert!(state.shared_context.is_empty());
        assert!(invoker.seen().iter().all(|r| r.shared_context.is_empty()));
    }

    #[tokio::test]
    async fn test_iteration_budget_halts_run() {
        let invoker = ScriptedInvoker::default();
        let mut cfg = config();
        cfg.max_iterations = 1;
        let executor = PlanExecutor::new(&invoker, cfg);
        let plan = chain(vec![phase("one", &["a"]), phase("two", &["b"]), phase("three", &["c"])]);

        let state = executor.execute("task", &plan).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Completed);
        assert_eq!(state.current_iteration, 1);
        assert_eq!(state.phase_results.len(), 1);
        assert!(state.budget_exhausted);
        assert!(state.warnings[0].contains("2 phase(s) not attempted"));
    }

    #[tokio::test]
    async fn test_budget_equal_to_phase_count_is_not_exhausted() {
        let invoker = ScriptedInvoker::default();
        let mut cfg = config();
        cfg.max_iterations = 2;
        let executor = PlanExecutor::new(&invoker, cfg);
        let plan = chain(vec![phase("one", &["a"]), phase("two", &["b"])]);

        let state = executor.execute("task", &plan).await.unwrap();
        assert!(!state.budget_exhausted);
        assert!(state.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_phase_deadline_fails_phase() {
        let mut cfg = config();
        cfg.phase_timeout = Duration::from_millis(100);
        let executor = PlanExecutor::new(SlowInvoker, cfg);
        let plan = chain(vec![phase("one", &["fast", "slow", "after"]), phase("two", &["x"])]);

        let state = executor.execute("task", &plan).await.unwrap();
        let one = &state.phase_results[0];
        assert!(!one.success);
        assert_eq!(one.completed_steps, 1);
        assert!(one.error.as_deref().unwrap().contains("deadline"));
        assert!(state.phase_results[1].success);
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_means_no_deadline() {
        let mut cfg = config();
        cfg.phase_timeout = Duration::MAX;
        let executor = PlanExecutor::new(TemplateInvoker::new(), cfg);
        let plan = chain(vec![phase("one", &["a", "b"])]);

        let state = executor.execute("task", &plan).await.unwrap();
        assert!(state.phase_results[0].success);
        assert_eq!(state.phase_results[0].completed_steps, 2);
    }

    #[tokio::test]
    async fn test_empty_plan_fails_run() {
        let executor = PlanExecutor::new(TemplateInvoker::new(), config());
        let state = executor.execute("task", &chain(Vec::new())).await.unwrap();
        assert_eq!(state.status, WorkflowStatus::Failed);
        assert!(state.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_invalid_plan_is_rejected() {
        let executor = PlanExecutor::new(TemplateInvoker::new(), config());
        let mut plan = chain(vec![phase("one", &["a"])]);
        plan.dependencies.push(Dependency {
            phase: "one".to_string(),
            depends_on: vec!["ghost".to_string()],
            kind: DependencyKind::Prerequisite,
        });
        assert!(executor.execute("task", &plan).await.is_err());
    }

    #[tokio::test]
    async fn test_wave_mode_matches_sequential_results() {
        let mut plan = chain(vec![phase("root", &["r"])]);
        plan.phases.push(phase("left", &["l"]));
        plan.phases.push(phase("right", &["x"]));
        plan.phases.push(phase("join", &["j"]));
        for (from, on) in [
            ("left", "root"),
            ("right", "root"),
            ("join", "left"),
            ("join", "right"),
        ] {
            plan.dependencies.push(Dependency {
                phase: from.to_string(),
                depends_on: vec![on.to_string()],
                kind: DependencyKind::Prerequisite,
            });
        }

        let invoker = ScriptedInvoker::failing(&["x"]);
        let mut cfg = config();
        cfg.parallel_phases = true;
        let state = PlanExecutor::new(&invoker, cfg)
            .execute("task", &plan)
            .await
            .unwrap();

        let names: Vec<&str> = state.phase_results.iter().map(|r| r.phase_name.as_str()).collect();
        assert_eq!(names, vec!["root", "left", "right", "join"]);
        assert_eq!(state.current_iteration, 4);
        assert!(!state.phase_results[2].success);

        let join = &state.phase_results[3];
        assert!(join.degraded);
        let seen = invoker.seen();
        let j = seen.iter().find(|r| r.step == "j").unwrap();
        assert_eq!(j.missing_prerequisites, vec!["right"]);
        assert!(j.shared_context.get("left").is_some());
        assert!(j.shared_context.get("root").is_some());
    }

    #[tokio::test]
    async fn test_wave_mode_respects_budget() {
        let mut plan = chain(vec![phase("root", &["r"])]);
        for name in ["a", "b", "c"] {
            plan.phases.push(phase(name, &["s"]));
            plan.dependencies.push(Dependency {
                phase: name.to_string(),
                depends_on: vec!["root".to_string()],
                kind: DependencyKind::Prerequisite,
            });
        }

        let mut cfg = config();
        cfg.parallel_phases = true;
        cfg.max_iterations = 2;
        let state = PlanExecutor::new(TemplateInvoker::new(), cfg)
            .execute("task", &plan)
            .await
            .unwrap();

        assert_eq!(state.phase_results.len(), 2);
        assert!(state.budget_exhausted);
        assert!(state.warnings[0].contains("2 phase(s) not attempted"));
    }

    #[tokio::test]
    async fn test_activity_log_written() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let executor = PlanExecutor::new(TemplateInvoker::new(), config())
            .with_activity_logging(temp_dir.path().to_path_buf());
        let plan = chain(vec![phase("one", &["user_guide"])]);

        let state = executor.execute("Write the guide", &plan).await.unwrap();
        let log = std::fs::read_to_string(temp_dir.path().join("activity.md")).unwrap();
        assert!(log.contains(&state.id.to_string()));
        assert!(log.contains("### Phase 1: one"));
        assert!(log.contains("**Status**: completed"));
    }
}
