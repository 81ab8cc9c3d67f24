//! Step templates and canonical phase definitions

use maestro_core::{capabilities, Priority, WorkerDescriptor};

/// A purpose-grouped phase used by the smart strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalPhase {
    pub name: &'static str,
    pub description: &'static str,
    /// Capabilities that make a worker belong to this phase
    pub purpose: &'static [&'static str],
    pub priority: Priority,
    pub estimated_duration: u32,
}

impl CanonicalPhase {
    pub fn matches(&self, worker: &WorkerDescriptor) -> bool {
        self.purpose.iter().any(|c| worker.has_capability(c))
    }
}

static CANONICAL_PHASES: [CanonicalPhase; 5] = [
    CanonicalPhase {
        name: "requirements_analysis",
        description: "Clarify scope, requirements and acceptance criteria",
        purpose: &[
            capabilities::REQUIREMENTS_ANALYSIS,
            capabilities::PROJECT_MANAGEMENT,
        ],
        priority: Priority::High,
        estimated_duration: 45,
    },
    CanonicalPhase {
        name: "system_design",
        description: "Design the architecture and interfaces",
        purpose: &[capabilities::DESIGN],
        priority: Priority::High,
        estimated_duration: 60,
    },
    CanonicalPhase {
        name: "implementation",
        description: "Build the solution against the agreed design",
        purpose: &[capabilities::IMPLEMENTATION],
        priority: Priority::High,
        estimated_duration: 120,
    },
    CanonicalPhase {
        name: "testing_validation",
        description: "Verify the implementation against the requirements",
        purpose: &[capabilities::TESTING],
        priority: Priority::Medium,
        estimated_duration: 60,
    },
    CanonicalPhase {
        name: "documentation",
        description: "Document usage and operation of the result",
        purpose: &[capabilities::DOCUMENTATION],
        priority: Priority::Low,
        estimated_duration: 30,
    },
];

/// Canonical phases in workflow order
pub fn canonical_phases() -> &'static [CanonicalPhase] {
    &CANONICAL_PHASES
}

/// Steps a canonical capability contributes to a phase
pub fn steps_for_capability(capability: &str) -> Option<&'static [&'static str]> {
    let steps: &'static [&'static str] = match capability {
        capabilities::REQUIREMENTS_ANALYSIS => &["requirements_document", "user_stories"],
        capabilities::DESIGN => &["architecture_design", "interface_specification"],
        capabilities::IMPLEMENTATION => &["implementation_plan", "source_code"],
        capabilities::TESTING => &["test_plan", "test_cases"],
        capabilities::DOCUMENTATION => &["user_guide", "api_documentation"],
        capabilities::PROJECT_MANAGEMENT => &["project_plan", "status_report"],
        _ => return None,
    };
    Some(steps)
}

/// Steps a worker performs when it owns a phase by itself
///
/// Canonical capabilities contribute their templates in workflow order. A
/// worker with none gets a single deliverable step named after its first
/// capability.
pub fn steps_for_worker(worker: &WorkerDescriptor) -> Vec<String> {
    let mut steps = Vec::new();
    for capability in capabilities::ALL {
        if !worker.has_capability(capability) {
            continue;
        }
        if let Some(template) = steps_for_capability(capability) {
            push_unique(&mut steps, template.iter().map(|s| s.to_string()));
        }
    }

    if steps.is_empty() {
        let stem = worker
            .capabilities
            .iter()
            .next()
            .map(|c| c.replace('-', "_"))
            .unwrap_or_else(|| "general".to_string());
        steps.push(format!("{}_deliverable", stem));
    }

    steps
}

/// Append items not already present, preserving order
pub(crate) fn push_unique(target: &mut Vec<String>, items: impl IntoIterator<Item = String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}
