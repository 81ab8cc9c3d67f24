//! Capability-matched worker selection

use maestro_core::{
    capabilities, ComplexityLevel, ComplexityProfile, DomainProfile, Factor, MaestroError,
    Priority, ResourceTier, Result, WorkerDescriptor, WorkerRecommendation, WorkerSource,
};
use maestro_registry::builtin_worker;
use tracing::{debug, info, warn};

use crate::classifier::{count_matches, tokenize};

const IMPLEMENTATION_SIGNALS: &[&str] = &[
    "implement", "build", "create", "develop", "code", "write", "add", "fix", "refactor",
    "deploy",
];

const VERIFICATION_SIGNALS: &[&str] = &["test", "verify", "validat", "qa", "quality", "check"];

const COORDINATION_SIGNALS: &[&str] = &[
    "coordinat",
    "manage",
    "team",
    "milestone",
    "roadmap",
    "stakeholder",
    "schedule",
];

const IMPLEMENTATION_DOMAINS: &[&str] = &[
    "web-development",
    "mobile-development",
    "backend-development",
];

/// Chooses workers for a task from the available descriptors
pub struct WorkerSelector {
    available: Vec<WorkerDescriptor>,
    strict: bool,
}

impl WorkerSelector {
    /// `available` is typically the registry listing, already sorted by name
    pub fn new(available: Vec<WorkerDescriptor>) -> Self {
        Self {
            available,
            strict: false,
        }
    }

    /// Fail instead of falling back when explicit names resolve to nothing
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Select workers, honouring an explicit name list when one is given
    ///
    /// An empty explicit list counts as no list.
    pub fn select(
        &self,
        complexity: &ComplexityProfile,
        domain: &DomainProfile,
        task_text: &str,
        explicit: Option<&[String]>,
    ) -> Result<Vec<WorkerRecommendation>> {
        match explicit {
            Some(names) if !names.is_empty() => self.select_explicit(names, complexity),
            _ => Ok(self.recommend(complexity, domain, task_text)),
        }
    }

    /// Heuristic selection from the classifier output
    pub fn recommend(
        &self,
        complexity: &ComplexityProfile,
        domain: &DomainProfile,
        task_text: &str,
    ) -> Vec<WorkerRecommendation> {
        let tokens = tokenize(task_text);
        let level = complexity.level;
        let complex = level == ComplexityLevel::Complex;
        let mut picks = Vec::new();

        self.push(
            &mut picks,
            capabilities::REQUIREMENTS_ANALYSIS,
            Priority::High,
            "Every task starts with requirements analysis",
            complexity,
        );

        if level != ComplexityLevel::Simple {
            let priority = if complex { Priority::High } else { Priority::Medium };
            self.push(
                &mut picks,
                capabilities::DESIGN,
                priority,
                &format!("{} task needs an explicit design", level),
                complexity,
            );
        }

        let implementation_domain = IMPLEMENTATION_DOMAINS.contains(&domain.primary.as_str());
        if count_matches(&tokens, IMPLEMENTATION_SIGNALS) > 0 || implementation_domain {
            let reason = if implementation_domain {
                format!("{} work requires implementation", domain.primary)
            } else {
                "Task asks for something to be built".to_string()
            };
            self.push(
                &mut picks,
                capabilities::IMPLEMENTATION,
                Priority::High,
                &reason,
                complexity,
            );
        }

        if complex || count_matches(&tokens, VERIFICATION_SIGNALS) > 0 {
            let priority = match level {
                ComplexityLevel::Complex => Priority::High,
                ComplexityLevel::Medium => Priority::Medium,
                ComplexityLevel::Simple => Priority::Low,
            };
            self.push(
                &mut picks,
                capabilities::TESTING,
                priority,
                "Result needs verification",
                complexity,
            );
        }

        if complexity.factor(Factor::DocumentationNeed) > 0.0 || complex {
            self.push(
                &mut picks,
                capabilities::DOCUMENTATION,
                Priority::Medium,
                "Task calls for documentation",
                complexity,
            );
        }

        if complex || count_matches(&tokens, COORDINATION_SIGNALS) > 0 {
            self.push(
                &mut picks,
                capabilities::PROJECT_MANAGEMENT,
                Priority::Medium,
                "Work needs coordination",
                complexity,
            );
        }

        sort_by_priority(&mut picks);
        debug!(
            "Recommended workers: {:?}",
            picks.iter().map(|r| r.worker.name.as_str()).collect::<Vec<_>>()
        );
        picks
    }

    /// Resolve an explicit worker list against the available descriptors
    pub fn select_explicit(
        &self,
        names: &[String],
        complexity: &ComplexityProfile,
    ) -> Result<Vec<WorkerRecommendation>> {
        let mut picks: Vec<WorkerRecommendation> = Vec::new();
        let mut unknown = Vec::new();

        for name in names {
            if picks.iter().any(|r| &r.worker.name == name) {
                continue;
            }
            match self.available.iter().find(|w| &w.name == name) {
                Some(worker) => picks.push(WorkerRecommendation {
                    worker: worker.clone(),
                    priority: Priority::High,
                    reason: "Explicitly requested".to_string(),
                    confidence: 1.0,
                    source: WorkerSource::Registry,
                }),
                None => {
                    warn!("Dropping unknown worker '{}'", name);
                    unknown.push(name.as_str());
                }
            }
        }

        if !picks.is_empty() {
            return Ok(picks);
        }

        if self.strict {
            return Err(MaestroError::InvalidInput(format!(
                "None of the selected workers exist: {}",
                unknown.join(", ")
            )));
        }

        info!("Explicit selection resolved to nothing, using default triad");
        for capability in capabilities::DEFAULT_TRIAD {
            let priority = if capability == capabilities::DESIGN {
                Priority::Medium
            } else {
                Priority::High
            };
            self.push(
                &mut picks,
                capability,
                priority,
                "Default fallback for unresolved selection",
                complexity,
            );
        }
        sort_by_priority(&mut picks);
        Ok(picks)
    }

    /// Best worker for a capability: registry first, then the built-in catalogue
    ///
    /// Complex tasks prefer premium-tier workers, everything else prefers
    /// standard tier; ties go to name order.
    fn resolve(
        &self,
        capability: &str,
        level: ComplexityLevel,
    ) -> Option<(WorkerDescriptor, WorkerSource)> {
        let preferred = if level == ComplexityLevel::Complex {
            ResourceTier::Premium
        } else {
            ResourceTier::Standard
        };

        let mut candidates = self
            .available
            .iter()
            .filter(|w| w.has_capability(capability));

        let first = candidates.next();
        let chosen = first
            .into_iter()
            .chain(candidates)
            .find(|w| w.resource_tier == preferred)
            .or(first);

        match chosen {
            Some(worker) => Some((worker.clone(), WorkerSource::Registry)),
            None => builtin_worker(capability).map(|w| (w, WorkerSource::Builtin)),
        }
    }

    fn push(
        &self,
        picks: &mut Vec<WorkerRecommendation>,
        capability: &str,
        priority: Priority,
        reason: &str,
        complexity: &ComplexityProfile,
    ) {
        let Some((worker, source)) = self.resolve(capability, complexity.level) else {
            warn!("No worker available for capability '{}'", capability);
            return;
        };

        // One worker covering several capabilities is recommended once
        if let Some(existing) = picks.iter_mut().find(|r| r.worker.name == worker.name) {
            if priority.rank() > existing.priority.rank() {
                existing.priority = priority;
            }
            existing.reason = format!("{}; {}", existing.reason, reason);
            return;
        }

        let confidence = match source {
            WorkerSource::Registry => complexity.confidence,
            WorkerSource::Builtin => complexity.confidence * 0.9,
        };

        picks.push(WorkerRecommendation {
            worker,
            priority,
            reason: reason.to_string(),
            confidence,
            source,
        });
    }
}

/// Descending by priority rank; equal ranks keep insertion order
fn sort_by_priority(picks: &mut [WorkerRecommendation]) {
    picks.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));
}
