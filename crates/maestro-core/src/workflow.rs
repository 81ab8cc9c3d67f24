//! Workflow plans, run state and consolidated results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::{MaestroError, Priority, Result, WorkerDescriptor};

/// How phases are grouped and ordered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One phase per worker, chained
    Sequential,
    /// A single phase holding every worker
    Parallel,
    /// Canonical purpose-grouped phases
    #[default]
    Smart,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Parallel => write!(f, "parallel"),
            Self::Smart => write!(f, "smart"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            "smart" | "hybrid" => Ok(Self::Smart),
            _ => Err(format!(
                "Invalid strategy: {}. Use sequential, parallel, or smart.",
                s
            )),
        }
    }
}

/// A named unit of the workflow plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    pub description: String,
    pub workers: Vec<WorkerDescriptor>,
    pub priority: Priority,
    /// Estimated duration in abstract time units
    pub estimated_duration: u32,
    /// Steps executed strictly in this order
    pub steps: Vec<String>,
}

impl Phase {
    pub fn worker_names(&self) -> Vec<String> {
        self.workers.iter().map(|w| w.name.clone()).collect()
    }
}

/// Kind of ordering edge between phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Sequential,
    Prerequisite,
    Validation,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Prerequisite => write!(f, "prerequisite"),
            Self::Validation => write!(f, "validation"),
        }
    }
}

/// Directed edge: `phase` may only start after every `depends_on` phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub phase: String,
    pub depends_on: Vec<String>,
    pub kind: DependencyKind,
}

/// The full phase and dependency graph chosen for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPlan {
    pub strategy: Strategy,
    pub phases: Vec<Phase>,
    pub dependencies: Vec<Dependency>,
    /// Scaled sum of phase durations
    pub estimated_duration: f64,
}

impl WorkflowPlan {
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn phase(&self, name: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Phases that `name` depends on, across all edge kinds, de-duplicated
    pub fn prerequisites_of(&self, name: &str) -> Vec<&str> {
        let mut deps: Vec<&str> = Vec::new();
        for dep in self.dependencies.iter().filter(|d| d.phase == name) {
            for target in &dep.depends_on {
                if !deps.contains(&target.as_str()) {
                    deps.push(target);
                }
            }
        }
        deps
    }

    pub fn total_steps(&self) -> usize {
        self.phases.iter().map(|p| p.steps.len()).sum()
    }

    /// Check for dangling edges, forward references and cycles
    pub fn validate(&self) -> Result<()> {
        let positions: HashMap<&str, usize> = self
            .phases
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.name.as_str(), idx))
            .collect();

        if positions.len() != self.phases.len() {
            return Err(MaestroError::Plan("Duplicate phase names".to_string()));
        }

        for dep in &self.dependencies {
            let from = positions.get(dep.phase.as_str()).ok_or_else(|| {
                MaestroError::Plan(format!("Dependency names unknown phase '{}'", dep.phase))
            })?;
            for target in &dep.depends_on {
                let to = positions.get(target.as_str()).ok_or_else(|| {
                    MaestroError::Plan(format!(
                        "Phase '{}' depends on unknown phase '{}'",
                        dep.phase, target
                    ))
                })?;
                if to >= from {
                    return Err(MaestroError::Plan(format!(
                        "Phase '{}' depends on later phase '{}'",
                        dep.phase, target
                    )));
                }
            }
        }

        self.execution_waves().map(|_| ())
    }

    /// Group phase indices into waves with no dependency path inside a wave
    ///
    /// Every phase in wave `n` depends only on phases in earlier waves. Within
    /// a wave, indices keep plan order.
    pub fn execution_waves(&self) -> Result<Vec<Vec<usize>>> {
        let positions: HashMap<&str, usize> = self
            .phases
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.name.as_str(), idx))
            .collect();

        let mut blockers: Vec<Vec<usize>> = vec![Vec::new(); self.phases.len()];
        for dep in &self.dependencies {
            let Some(&from) = positions.get(dep.phase.as_str()) else {
                return Err(MaestroError::Plan(format!("Unknown phase '{}'", dep.phase)));
            };
            for target in &dep.depends_on {
                let Some(&to) = positions.get(target.as_str()) else {
                    return Err(MaestroError::Plan(format!("Unknown phase '{}'", target)));
                };
                if !blockers[from].contains(&to) {
                    blockers[from].push(to);
                }
            }
        }

        let mut placed = vec![false; self.phases.len()];
        let mut waves = Vec::new();
        let mut remaining = self.phases.len();

        while remaining > 0 {
            let wave: Vec<usize> = (0..self.phases.len())
                .filter(|&idx| !placed[idx] && blockers[idx].iter().all(|&b| placed[b]))
                .collect();

            if wave.is_empty() {
                return Err(MaestroError::Plan(
                    "Dependency graph contains a cycle".to_string(),
                ));
            }

            for &idx in &wave {
                placed[idx] = true;
            }
            remaining -= wave.len();
            waves.push(wave);
        }

        Ok(waves)
    }
}

/// Lifecycle of a workflow run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Initializing,
    Executing,
    Completed,
    Failed,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "initializing"),
            Self::Executing => write!(f, "executing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Run-scoped store propagating phase outputs to later phases
///
/// Merge-only: entries are never removed once published.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedContext(BTreeMap<String, BTreeMap<String, String>>);

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a finished phase's outputs under its name
    pub fn publish(&mut self, phase: &str, outputs: &BTreeMap<String, String>) {
        self.0
            .entry(phase.to_string())
            .or_default()
            .extend(outputs.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    pub fn get(&self, phase: &str) -> Option<&BTreeMap<String, String>> {
        self.0.get(phase)
    }

    pub fn phases(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Outcome of one attempted phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase_name: String,
    pub success: bool,
    pub completed_steps: usize,
    /// Step name to produced content, for steps that succeeded
    pub outputs: BTreeMap<String, String>,
    pub error: Option<String>,
    pub execution_time_ms: u64,
    /// A dependency of this phase had failed before it ran
    #[serde(default)]
    pub degraded: bool,
}

impl PhaseResult {
    pub fn new(phase_name: impl Into<String>) -> Self {
        Self {
            phase_name: phase_name.into(),
            success: true,
            completed_steps: 0,
            outputs: BTreeMap::new(),
            error: None,
            execution_time_ms: 0,
            degraded: false,
        }
    }

    /// Record a step failure; later steps of the phase are not run
    pub fn fail(&mut self, error: impl Into<String>) {
        self.success = false;
        self.error = Some(error.into());
    }
}

/// Mutable record of one workflow run, owned by a single executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: Uuid,
    pub status: WorkflowStatus,
    pub current_iteration: usize,
    pub shared_context: SharedContext,
    pub phase_results: Vec<PhaseResult>,
    /// Soft-limit notices such as iteration budget exhaustion
    pub warnings: Vec<String>,
    pub budget_exhausted: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: WorkflowStatus::Initializing,
            current_iteration: 0,
            shared_context: SharedContext::new(),
            phase_results: Vec::new(),
            warnings: Vec::new(),
            budget_exhausted: false,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn result_for(&self, phase: &str) -> Option<&PhaseResult> {
        self.phase_results.iter().find(|r| r.phase_name == phase)
    }

    pub fn elapsed_ms(&self) -> u64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0) as u64
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

/// Classification of a produced deliverable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliverableKind {
    Documentation,
    Design,
    Code,
    Testing,
    Other,
}

impl std::fmt::Display for DeliverableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Documentation => write!(f, "documentation"),
            Self::Design => write!(f, "design"),
            Self::Code => write!(f, "code"),
            Self::Testing => write!(f, "testing"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// One output of a successful phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deliverable {
    pub phase: String,
    pub step: String,
    pub kind: DeliverableKind,
    pub content: String,
    pub workers: Vec<String>,
}

/// Whether every planned step ran and succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Completed,
    PartiallyCompleted,
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::PartiallyCompleted => write!(f, "partially_completed"),
        }
    }
}

/// Per-phase line in the consolidated report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSummary {
    pub phase: String,
    pub attempted: bool,
    pub success: bool,
    pub completed_steps: usize,
    pub total_steps: usize,
    pub degraded: bool,
    pub error: Option<String>,
    pub execution_time_ms: u64,
}

/// Aggregate step and phase counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub overall_success_rate: f64,
    pub total_steps: usize,
    pub successful_steps: usize,
    pub failed_steps: usize,
    /// Planned steps that never ran
    pub skipped_steps: usize,
    pub phases_succeeded: usize,
    pub phases_failed: usize,
    pub phases_not_attempted: usize,
    pub total_execution_time_ms: u64,
}

/// Final report for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedResult {
    pub completion_status: CompletionStatus,
    pub phase_summaries: Vec<PhaseSummary>,
    pub deliverables: Vec<Deliverable>,
    pub quality_metrics: QualityMetrics,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(name: &str) -> Phase {
        Phase {
            name: name.to_string(),
            description: String::new(),
            workers: Vec::new(),
            priority: Priority::Medium,
            estimated_duration: 60,
            steps: vec!["a".to_string(), "b".to_string()],
        }
    }

    fn edge(phase: &str, on: &str, kind: DependencyKind) -> Dependency {
        Dependency {
            phase: phase.to_string(),
            depends_on: vec![on.to_string()],
            kind,
        }
    }

    fn plan(phases: &[&str], dependencies: Vec<Dependency>) -> WorkflowPlan {
        WorkflowPlan {
            strategy: Strategy::Smart,
            phases: phases.iter().map(|n| phase(n)).collect(),
            dependencies,
            estimated_duration: 0.0,
        }
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("SEQUENTIAL".parse::<Strategy>().unwrap(), Strategy::Sequential);
        assert_eq!("hybrid".parse::<Strategy>().unwrap(), Strategy::Smart);
        assert!("random".parse::<Strategy>().is_err());
        assert_eq!(Strategy::default(), Strategy::Smart);
    }

    #[test]
    fn test_chain_waves() {
        let plan = plan(
            &["a", "b", "c"],
            vec![
                edge("b", "a", DependencyKind::Sequential),
                edge("c", "b", DependencyKind::Sequential),
            ],
        );
        plan.validate().unwrap();
        assert_eq!(plan.execution_waves().unwrap(), vec![vec![0], vec![1], vec![2]]);
        assert_eq!(plan.total_steps(), 6);
    }

    #[test]
    fn test_independent_phases_share_a_wave() {
        let plan = plan(
            &["a", "b", "c"],
            vec![edge("c", "a", DependencyKind::Prerequisite)],
        );
        assert_eq!(plan.execution_waves().unwrap(), vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let plan = plan(&["a"], vec![edge("a", "ghost", DependencyKind::Prerequisite)]);
        assert!(matches!(plan.validate(), Err(MaestroError::Plan(_))));
    }

    #[test]
    fn test_cycle_rejected() {
        let plan = plan(
            &["a", "b"],
            vec![
                edge("a", "b", DependencyKind::Sequential),
                edge("b", "a", DependencyKind::Sequential),
            ],
        );
        assert!(plan.validate().is_err());
        assert!(plan.execution_waves().is_err());
    }

    #[test]
    fn test_prerequisites_deduplicated() {
        let plan = plan(
            &["impl", "test"],
            vec![
                edge("test", "impl", DependencyKind::Prerequisite),
                edge("test", "impl", DependencyKind::Validation),
            ],
        );
        assert_eq!(plan.prerequisites_of("test"), vec!["impl"]);
        assert!(plan.prerequisites_of("impl").is_empty());
    }

    #[test]
    fn test_shared_context_is_merge_only() {
        let mut ctx = SharedContext::new();
        let mut first = BTreeMap::new();
        first.insert("doc".to_string(), "v1".to_string());
        ctx.publish("requirements", &first);

        let mut second = BTreeMap::new();
        second.insert("stories".to_string(), "v2".to_string());
        ctx.publish("requirements", &second);

        let entry = ctx.get("requirements").unwrap();
        assert_eq!(entry.len(), 2);
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn test_phase_result_fail() {
        let mut result = PhaseResult::new("design");
        assert!(result.success);
        result.fail("timed out");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("timed out"));
    }
}
