//! Orchestration facade tying the pipeline stages together

use maestro_core::fail_open::fail_open;
use maestro_core::{
    ComplexityLevel, ComplexityProfile, CompletionStatus, ConsolidatedResult, DomainProfile,
    MaestroConfig, MaestroError, Result, Strategy, Task, WorkerDescriptor, WorkerRecommendation,
    WorkerSource, WorkflowPlan, WorkflowState, WorkflowStatus,
};
use maestro_planning::{PlanBuilder, TaskClassifier, WorkerSelector};
use maestro_registry::{FileRegistry, WorkerRegistry};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::consolidator::ResultConsolidator;
use crate::executor::{ExecutorConfig, PlanExecutor};
use crate::invoker::StepInvoker;

/// A request to run a task end to end
///
/// Unset fields fall back to the orchestrator's configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationRequest {
    pub task_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_directory: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_workers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_sharing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_hint: Option<ComplexityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_hint: Option<String>,
}

impl OrchestrationRequest {
    pub fn new(task_content: impl Into<String>) -> Self {
        Self {
            task_content: task_content.into(),
            ..Default::default()
        }
    }

    pub fn task(&self) -> Task {
        Task {
            content: self.task_content.clone(),
            complexity_hint: self.complexity_hint,
            domain_hint: self.domain_hint.clone(),
        }
    }
}

/// Classifier output included in every response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAnalysis {
    pub complexity: ComplexityProfile,
    pub domain: DomainProfile,
}

/// Outcome of an end-to-end run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResponse {
    pub workflow_id: Uuid,
    pub status: WorkflowStatus,
    pub agents_used: Vec<String>,
    pub total_phases: usize,
    pub execution_time_ms: u64,
    pub task_analysis: TaskAnalysis,
    pub results: ConsolidatedResult,
    pub next_steps: Vec<String>,
    pub warnings: Vec<String>,
}

/// One public operation per variant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Request {
    Classify {
        task: Task,
    },
    SelectWorkers {
        task: Task,
        #[serde(default)]
        selected_workers: Option<Vec<String>>,
    },
    BuildPlan {
        complexity: ComplexityProfile,
        workers: Vec<WorkerDescriptor>,
        #[serde(default)]
        strategy: Option<Strategy>,
    },
    Execute {
        task: String,
        plan: WorkflowPlan,
    },
    Consolidate {
        plan: WorkflowPlan,
        state: Box<WorkflowState>,
        complexity: ComplexityProfile,
    },
    Orchestrate(OrchestrationRequest),
}

/// Result of a [`Request`], variant for variant
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Response {
    Classify {
        complexity: ComplexityProfile,
        domain: DomainProfile,
    },
    SelectWorkers {
        workers: Vec<WorkerRecommendation>,
    },
    BuildPlan {
        plan: WorkflowPlan,
    },
    Execute {
        state: Box<WorkflowState>,
    },
    Consolidate {
        result: ConsolidatedResult,
    },
    Orchestrate(Box<OrchestrationResponse>),
}

/// Runs tasks through classify, select, plan, execute and consolidate
///
/// Configuration is passed in at construction; nothing is resolved from
/// the environment at call time.
pub struct Orchestrator {
    config: MaestroConfig,
    registry: Arc<dyn WorkerRegistry>,
    invoker: Arc<dyn StepInvoker>,
    state_dir: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        config: MaestroConfig,
        registry: Arc<dyn WorkerRegistry>,
        invoker: Arc<dyn StepInvoker>,
    ) -> Self {
        Self {
            config,
            registry,
            invoker,
            state_dir: None,
        }
    }

    /// Directory for run artifacts; enables the activity log when configured
    pub fn with_state_dir(mut self, state_dir: PathBuf) -> Self {
        self.state_dir = Some(state_dir);
        self
    }

    pub fn config(&self) -> &MaestroConfig {
        &self.config
    }

    /// Dispatch a typed request
    pub async fn handle(&self, request: Request) -> Result<Response> {
        match request {
            Request::Classify { task } => {
                let (complexity, domain) = self.classify(&task);
                Ok(Response::Classify { complexity, domain })
            }
            Request::SelectWorkers {
                task,
                selected_workers,
            } => {
                let workers = self
                    .select_workers(&task, selected_workers.as_deref())
                    .await?;
                Ok(Response::SelectWorkers { workers })
            }
            Request::BuildPlan {
                complexity,
                workers,
                strategy,
            } => Ok(Response::BuildPlan {
                plan: self.build_plan(&complexity, &workers, strategy),
            }),
            Request::Execute { task, plan } => {
                let state = self.execute(&task, &plan).await?;
                Ok(Response::Execute {
                    state: Box::new(state),
                })
            }
            Request::Consolidate {
                plan,
                state,
                complexity,
            } => Ok(Response::Consolidate {
                result: ResultConsolidator::consolidate(&plan, &state, &complexity),
            }),
            Request::Orchestrate(request) => {
                let response = self.orchestrate(request).await?;
                Ok(Response::Orchestrate(Box::new(response)))
            }
        }
    }

    pub fn classify(&self, task: &Task) -> (ComplexityProfile, DomainProfile) {
        TaskClassifier::classify(task)
    }

    /// Select workers from the configured registry
    pub async fn select_workers(
        &self,
        task: &Task,
        selected_workers: Option<&[String]>,
    ) -> Result<Vec<WorkerRecommendation>> {
        let (complexity, domain) = self.classify(task);
        self.select_from(
            self.registry.as_ref(),
            task,
            &complexity,
            &domain,
            selected_workers,
        )
        .await
    }

    pub fn build_plan(
        &self,
        complexity: &ComplexityProfile,
        workers: &[WorkerDescriptor],
        strategy: Option<Strategy>,
    ) -> WorkflowPlan {
        PlanBuilder::build(
            complexity,
            workers,
            strategy.unwrap_or(self.config.workflow.strategy),
        )
    }

    /// Execute a plan with the configured workflow defaults
    pub async fn execute(&self, task: &str, plan: &WorkflowPlan) -> Result<WorkflowState> {
        let config = ExecutorConfig::from(&self.config.workflow);
        self.executor(config).execute(task, plan).await
    }

    /// Run a task end to end
    ///
    /// Only input errors and registry failures surface as `Err`; everything
    /// that goes wrong during execution is reported in the response.
    #[instrument(skip_all, fields(strategy = ?request.strategy))]
    pub async fn orchestrate(
        &self,
        request: OrchestrationRequest,
    ) -> Result<OrchestrationResponse> {
        let started = Instant::now();

        if request.task_content.trim().is_empty() {
            return Err(MaestroError::InvalidInput(
                "Task content must not be empty".to_string(),
            ));
        }

        let task = request.task();
        let (complexity, domain) = self.classify(&task);
        info!(
            level = %complexity.level,
            domain = %domain.primary,
            "Orchestrating task"
        );

        let request_registry: Option<FileRegistry> =
            request.worker_directory.clone().map(FileRegistry::new);
        let registry: &dyn WorkerRegistry = match &request_registry {
            Some(registry) => registry,
            None => self.registry.as_ref(),
        };

        let recommendations = self
            .select_from(
                registry,
                &task,
                &complexity,
                &domain,
                request.selected_workers.as_deref(),
            )
            .await?;

        if self.config.workflow.auto_create_workers {
            provision_builtin_workers(registry, &recommendations).await;
        }

        let workers: Vec<WorkerDescriptor> =
            recommendations.iter().map(|r| r.worker.clone()).collect();
        let plan = self.build_plan(&complexity, &workers, request.strategy);

        let mut config = ExecutorConfig::from(&self.config.workflow);
        if let Some(max_iterations) = request.max_iterations {
            config.max_iterations = max_iterations;
        }
        if let Some(context_sharing) = request.context_sharing {
            config.context_sharing = context_sharing;
        }

        let state = self
            .executor(config.clone())
            .execute(&task.content, &plan)
            .await?;
        let results = ResultConsolidator::consolidate(&plan, &state, &complexity);
        let next_steps = next_steps(&plan, &state, &results, &config);

        Ok(OrchestrationResponse {
            workflow_id: state.id,
            status: state.status,
            agents_used: workers.iter().map(|w| w.name.clone()).collect(),
            total_phases: plan.phases.len(),
            execution_time_ms: started.elapsed().as_millis() as u64,
            task_analysis: TaskAnalysis { complexity, domain },
            results,
            next_steps,
            warnings: state.warnings,
        })
    }

    async fn select_from(
        &self,
        registry: &dyn WorkerRegistry,
        task: &Task,
        complexity: &ComplexityProfile,
        domain: &DomainProfile,
        selected_workers: Option<&[String]>,
    ) -> Result<Vec<WorkerRecommendation>> {
        let available = registry.list().await?;
        debug!("Registry offers {} worker(s)", available.len());

        WorkerSelector::new(available)
            .strict(self.config.workflow.strict_worker_selection)
            .select(complexity, domain, &task.content, selected_workers)
    }

    fn executor(&self, config: ExecutorConfig) -> PlanExecutor<Arc<dyn StepInvoker>> {
        let executor = PlanExecutor::new(self.invoker.clone(), config);
        match &self.state_dir {
            Some(dir) if self.config.logging.activity_log => {
                executor.with_activity_logging(dir.clone())
            }
            _ => executor,
        }
    }
}

/// Persist built-in workers the registry lacked (fail-open)
async fn provision_builtin_workers(
    registry: &dyn WorkerRegistry,
    recommendations: &[WorkerRecommendation],
) {
    for rec in recommendations
        .iter()
        .filter(|r| r.source == WorkerSource::Builtin)
    {
        let created = fail_open("orchestrator::provision_worker", || {
            registry.create(rec.worker.clone())
        })
        .await;
        if created.is_some() {
            info!("Added built-in worker '{}' to the registry", rec.worker.name);
        }
    }
}

fn next_steps(
    plan: &WorkflowPlan,
    state: &WorkflowState,
    results: &ConsolidatedResult,
    config: &ExecutorConfig,
) -> Vec<String> {
    let mut steps = Vec::new();

    if state.status == WorkflowStatus::Failed {
        steps.push("No phases were executed; check the worker selection and retry".to_string());
        return steps;
    }

    for summary in results.phase_summaries.iter().filter(|s| s.attempted && !s.success) {
        steps.push(format!(
            "Retry phase '{}' after addressing: {}",
            summary.phase,
            summary.error.as_deref().unwrap_or("unknown error")
        ));
    }

    if state.budget_exhausted {
        steps.push(format!(
            "Re-run with max_iterations of at least {} (was {}) to cover every phase",
            plan.phases.len(),
            config.max_iterations
        ));
    }

    if results.completion_status == CompletionStatus::Completed {
        steps.push(format!(
            "Review the {} deliverable(s) and integrate them into the project",
            results.deliverables.len()
        ));
    }

    steps
}
