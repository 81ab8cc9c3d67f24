//! Workflow plan construction
//!
//! Turns an ordered worker list into a phase graph under one of three
//! strategies. Building is pure: the same profile, workers and strategy
//! always yield the same plan.

use maestro_core::{
    ComplexityProfile, Dependency, DependencyKind, Phase, Priority, Strategy,
    WorkerDescriptor, WorkflowPlan,
};
use tracing::debug;

use crate::templates::{canonical_phases, push_unique, steps_for_capability, steps_for_worker};

const SEQUENTIAL_PHASE_DURATION: u32 = 60;
const PARALLEL_PHASE_DURATION: u32 = 90;
const PARALLEL_PHASE_NAME: &str = "parallel_execution";
const IMPLEMENTATION_PHASE: &str = "implementation";
const TESTING_PHASE: &str = "testing_validation";

/// Stateless plan builder
pub struct PlanBuilder;

impl PlanBuilder {
    pub fn build(
        complexity: &ComplexityProfile,
        workers: &[WorkerDescriptor],
        strategy: Strategy,
    ) -> WorkflowPlan {
        let (phases, dependencies) = match strategy {
            Strategy::Sequential => Self::sequential(workers),
            Strategy::Parallel => Self::parallel(workers),
            Strategy::Smart => Self::smart(workers),
        };

        let base: u32 = phases.iter().map(|p| p.estimated_duration).sum();
        let estimated_duration = base as f64 * complexity.duration_tier.multiplier();

        debug!(
            %strategy,
            phases = phases.len(),
            estimated_duration,
            "Built workflow plan"
        );

        WorkflowPlan {
            strategy,
            phases,
            dependencies,
            estimated_duration,
        }
    }

    /// One phase per worker, each chained to its predecessor
    fn sequential(workers: &[WorkerDescriptor]) -> (Vec<Phase>, Vec<Dependency>) {
        let mut phases: Vec<Phase> = Vec::with_capacity(workers.len());
        let mut dependencies = Vec::new();

        for (idx, worker) in workers.iter().enumerate() {
            let name = format!("phase_{}_{}", idx + 1, worker.name);
            if let Some(previous) = phases.last() {
                dependencies.push(Dependency {
                    phase: name.clone(),
                    depends_on: vec![previous.name.clone()],
                    kind: DependencyKind::Sequential,
                });
            }
            phases.push(Phase {
                name,
                description: format!("Work by {}", worker.title),
                workers: vec![worker.clone()],
                priority: priority_for(worker),
                estimated_duration: SEQUENTIAL_PHASE_DURATION,
                steps: steps_for_worker(worker),
            });
        }

        (phases, dependencies)
    }

    /// A single phase holding every worker and the union of their steps
    fn parallel(workers: &[WorkerDescriptor]) -> (Vec<Phase>, Vec<Dependency>) {
        if workers.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let mut steps = Vec::new();
        for worker in workers {
            push_unique(&mut steps, steps_for_worker(worker));
        }

        let phase = Phase {
            name: PARALLEL_PHASE_NAME.to_string(),
            description: "All workers contribute concurrently".to_string(),
            workers: workers.to_vec(),
            priority: Priority::High,
            estimated_duration: PARALLEL_PHASE_DURATION,
            steps,
        };

        (vec![phase], Vec::new())
    }

    /// Purpose-grouped canonical phases
    ///
    /// Every worker in a canonical phase carries one of that phase's purpose
    /// capabilities, with one exception: workers without any canonical
    /// capability join the implementation phase with their own deliverable
    /// steps, so they are never dropped from the plan.
    fn smart(workers: &[WorkerDescriptor]) -> (Vec<Phase>, Vec<Dependency>) {
        let mut phases: Vec<Phase> = Vec::new();
        let mut dependencies = Vec::new();

        for canonical in canonical_phases() {
            let catch_all = canonical.name == IMPLEMENTATION_PHASE;
            let members: Vec<WorkerDescriptor> = workers
                .iter()
                .filter(|w| {
                    canonical.matches(w) || (catch_all && w.primary_capability().is_none())
                })
                .cloned()
                .collect();

            if members.is_empty() {
                continue;
            }

            let mut steps = Vec::new();
            for capability in canonical.purpose {
                if !members.iter().any(|w| w.has_capability(capability)) {
                    continue;
                }
                if let Some(template) = steps_for_capability(capability) {
                    push_unique(&mut steps, template.iter().map(|s| s.to_string()));
                }
            }
            if catch_all {
                for worker in members.iter().filter(|w| w.primary_capability().is_none()) {
                    push_unique(&mut steps, steps_for_worker(worker));
                }
            }

            let name = canonical.name.to_string();

            if let Some(previous) = phases.last() {
                dependencies.push(Dependency {
                    phase: name.clone(),
                    depends_on: vec![previous.name.clone()],
                    kind: DependencyKind::Prerequisite,
                });
            }

            if canonical.name == TESTING_PHASE
                && phases.iter().any(|p| p.name == IMPLEMENTATION_PHASE)
            {
                dependencies.push(Dependency {
                    phase: name.clone(),
                    depends_on: vec![IMPLEMENTATION_PHASE.to_string()],
                    kind: DependencyKind::Validation,
                });
            }

            phases.push(Phase {
                name,
                description: canonical.description.to_string(),
                workers: members,
                priority: canonical.priority,
                estimated_duration: canonical.estimated_duration,
                steps,
            });
        }

        (phases, dependencies)
    }
}

/// Priority of the canonical phase a worker's primary capability belongs to
fn priority_for(worker: &WorkerDescriptor) -> Priority {
    let Some(capability) = worker.primary_capability() else {
        return Priority::Medium;
    };
    canonical_phases()
        .iter()
        .find(|p| p.purpose.contains(&capability))
        .map(|p| p.priority)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::{capabilities, ComplexityLevel, DurationTier, ResourceTier, Task};
    use maestro_registry::builtin_workers;

    use crate::TaskClassifier;

    fn profile(tier: DurationTier) -> ComplexityProfile {
        let mut profile = TaskClassifier::complexity(&Task::new("anything"));
        profile.duration_tier = tier;
        profile
    }

    fn worker(name: &str, capability: &str) -> WorkerDescriptor {
        WorkerDescriptor::new(name, name).with_capability(capability)
    }

    fn triad() -> Vec<WorkerDescriptor> {
        vec![
            worker("analyst", capabilities::REQUIREMENTS_ANALYSIS),
            worker("builder", capabilities::IMPLEMENTATION),
            worker("tester", capabilities::TESTING),
        ]
    }

    #[test]
    fn test_sequential_chains_phases() {
        let plan =
            PlanBuilder::build(&profile(DurationTier::Medium), &triad(), Strategy::Sequential);

        let names: Vec<&str> = plan.phases.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["phase_1_analyst", "phase_2_builder", "phase_3_tester"]
        );
        assert_eq!(plan.dependencies.len(), 2);
        assert_eq!(plan.prerequisites_of("phase_3_tester"), vec!["phase_2_builder"]);
        assert!(plan
            .dependencies
            .iter()
            .all(|d| d.kind == DependencyKind::Sequential));
        assert_eq!(plan.phases[0].steps, vec!["requirements_document", "user_stories"]);
        assert_eq!(plan.phases[2].priority, Priority::Medium);
        assert_eq!(plan.estimated_duration, 180.0);
        plan.validate().unwrap();
    }

    #[test]
    fn test_parallel_single_phase_with_union_of_steps() {
        let mut workers = triad();
        workers.push(worker("second-tester", capabilities::TESTING));
        let plan = PlanBuilder::build(&profile(DurationTier::Simple), &workers, Strategy::Parallel);

        assert_eq!(plan.phases.len(), 1);
        assert_eq!(plan.phases[0].name, "parallel_execution");
        assert_eq!(plan.phases[0].workers.len(), 4);
        assert_eq!(plan.phases[0].steps.len(), 6);
        assert!(plan.dependencies.is_empty());
        assert_eq!(plan.estimated_duration, 72.0);
    }

    #[test]
    fn test_smart_uses_canonical_phases_present() {
        let plan = PlanBuilder::build(&profile(DurationTier::Medium), &triad(), Strategy::Smart);

        let names: Vec<&str> = plan.phases.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["requirements_analysis", "implementation", "testing_validation"]
        );
        // nearest present predecessor, not the absent design phase
        assert_eq!(plan.prerequisites_of("implementation"), vec!["requirements_analysis"]);

        let validation: Vec<&Dependency> = plan
            .dependencies
            .iter()
            .filter(|d| d.kind == DependencyKind::Validation)
            .collect();
        assert_eq!(validation.len(), 1);
        assert_eq!(validation[0].phase, "testing_validation");
        assert_eq!(validation[0].depends_on, vec!["implementation"]);

        assert_eq!(plan.estimated_duration, 45.0 + 120.0 + 60.0);
        plan.validate().unwrap();
    }

    #[test]
    fn test_smart_groups_project_management_with_requirements() {
        let workers = vec![
            worker("pm", capabilities::PROJECT_MANAGEMENT),
            worker("analyst", capabilities::REQUIREMENTS_ANALYSIS),
        ];
        let plan = PlanBuilder::build(&profile(DurationTier::Medium), &workers, Strategy::Smart);

        assert_eq!(plan.phases.len(), 1);
        assert_eq!(plan.phases[0].workers.len(), 2);
        assert_eq!(
            plan.phases[0].steps,
            vec![
                "requirements_document",
                "user_stories",
                "project_plan",
                "status_report"
            ]
        );
    }

    #[test]
    fn test_smart_places_custom_workers_in_implementation() {
        let workers = vec![
            worker("analyst", capabilities::REQUIREMENTS_ANALYSIS),
            worker("translator", "localization"),
        ];
        let plan = PlanBuilder::build(&profile(DurationTier::Medium), &workers, Strategy::Smart);

        let implementation = plan.phase("implementation").unwrap();
        assert_eq!(implementation.worker_names(), vec!["translator"]);
        assert_eq!(implementation.steps, vec!["localization_deliverable"]);

        // the exception is limited to workers with no canonical capability
        for phase in &plan.phases {
            let canonical = canonical_phases()
                .iter()
                .find(|c| c.name == phase.name)
                .unwrap();
            for member in &phase.workers {
                assert!(canonical.matches(member) || member.primary_capability().is_none());
            }
        }
    }

    #[test]
    fn test_full_catalogue_plan_is_valid_for_every_strategy() {
        let workers = builtin_workers();
        for strategy in [Strategy::Sequential, Strategy::Parallel, Strategy::Smart] {
            let plan = PlanBuilder::build(&profile(DurationTier::High), &workers, strategy);
            plan.validate().unwrap();
            for dep in &plan.dependencies {
                assert!(plan.phase(&dep.phase).is_some());
                for target in &dep.depends_on {
                    assert!(plan.phase(target).is_some());
                }
            }
        }
    }

    #[test]
    fn test_smart_full_catalogue_durations() {
        let plan = PlanBuilder::build(
            &profile(DurationTier::Complex),
            &builtin_workers(),
            Strategy::Smart,
        );
        assert_eq!(plan.phases.len(), 5);
        assert_eq!(plan.estimated_duration, (45 + 60 + 120 + 60 + 30) as f64 * 1.5);
    }

    #[test]
    fn test_builder_is_idempotent() {
        let task = Task::new("distributed microservices architecture with API gateway");
        let complexity = TaskClassifier::complexity(&task);
        assert_eq!(complexity.level, ComplexityLevel::Complex);

        let workers = vec![
            worker("analyst", capabilities::REQUIREMENTS_ANALYSIS),
            worker("architect", capabilities::DESIGN).with_tier(ResourceTier::Premium),
            worker("builder", capabilities::IMPLEMENTATION),
        ];
        for strategy in [Strategy::Sequential, Strategy::Parallel, Strategy::Smart] {
            let first = PlanBuilder::build(&complexity, &workers, strategy);
            let second = PlanBuilder::build(&complexity, &workers, strategy);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_no_workers_gives_empty_plan() {
        for strategy in [Strategy::Sequential, Strategy::Parallel, Strategy::Smart] {
            let plan = PlanBuilder::build(&profile(DurationTier::Medium), &[], strategy);
            assert!(plan.is_empty());
            assert_eq!(plan.estimated_duration, 0.0);
        }
    }
}
