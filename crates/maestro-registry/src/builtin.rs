//! Built-in worker catalogue
//!
//! One worker per canonical capability. The selector falls back to these when
//! a registry has no worker for a capability it needs.

use maestro_core::{capabilities, ResourceTier, WorkerDescriptor};

/// The built-in worker for a canonical capability
pub fn builtin_worker(capability: &str) -> Option<WorkerDescriptor> {
    builtin_workers()
        .into_iter()
        .find(|w| w.has_capability(capability))
}

/// All built-in workers, in workflow order
pub fn builtin_workers() -> Vec<WorkerDescriptor> {
    vec![
        WorkerDescriptor::new("requirements-analyst", "Requirements Analyst")
            .with_capability(capabilities::REQUIREMENTS_ANALYSIS)
            .with_instructions(
                "Turn the task into explicit functional and non-functional \
                 requirements. List assumptions, open questions and acceptance criteria \
                 before anything is designed.",
            ),

        WorkerDescriptor::new("system-architect", "System Architect")
            .with_capability(capabilities::DESIGN)
            .with_tier(ResourceTier::Premium)
            .with_instructions(
                "Propose the component structure, data flow and interfaces that satisfy \
                 the requirements. Call out trade-offs and the decisions that are \
                 expensive to reverse.",
            ),

        WorkerDescriptor::new("software-engineer", "Software Engineer")
            .with_capability(capabilities::IMPLEMENTATION)
            .with_instructions(
                "Implement the design in small, reviewable increments. Follow the \
                 agreed interfaces and note any deviation in the implementation plan.",
            ),

        WorkerDescriptor::new("qa-engineer", "QA Engineer")
            .with_capability(capabilities::TESTING)
            .with_instructions(
                "Derive a test plan from the acceptance criteria. Cover the failure \
                 paths, not only the happy path.",
            ),

        WorkerDescriptor::new("technical-writer", "Technical Writer")
            .with_capability(capabilities::DOCUMENTATION)
            .with_instructions(
                "Document how to use and operate the result. Prefer short task-oriented \
                 guides over reference dumps.",
            ),

        WorkerDescriptor::new("project-manager", "Project Manager")
            .with_capability(capabilities::PROJECT_MANAGEMENT)
            .with_instructions(
                "Break the work into milestones, track risks and keep stakeholders \
                 informed of scope changes.",
            ),
    ]
}
