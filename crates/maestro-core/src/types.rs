//! Core type definitions for task analysis and worker selection

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Canonical worker capabilities understood by the selector and plan builder
pub mod capabilities {
    pub const REQUIREMENTS_ANALYSIS: &str = "requirements-analysis";
    pub const DESIGN: &str = "design";
    pub const IMPLEMENTATION: &str = "implementation";
    pub const TESTING: &str = "testing";
    pub const DOCUMENTATION: &str = "documentation";
    pub const PROJECT_MANAGEMENT: &str = "project-management";

    /// All canonical capabilities in workflow order
    pub const ALL: [&str; 6] = [
        REQUIREMENTS_ANALYSIS,
        DESIGN,
        IMPLEMENTATION,
        TESTING,
        DOCUMENTATION,
        PROJECT_MANAGEMENT,
    ];

    /// Capabilities used when explicit selection resolves to nothing
    pub const DEFAULT_TRIAD: [&str; 3] = [REQUIREMENTS_ANALYSIS, DESIGN, IMPLEMENTATION];
}

/// Recommendation and phase priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Numeric rank used for sorting (`high=3, medium=2, low=1`)
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" | "3" => Ok(Self::High),
            "medium" | "2" => Ok(Self::Medium),
            "low" | "1" => Ok(Self::Low),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// Complexity level of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    #[default]
    Simple,
    Medium,
    Complex,
}

impl ComplexityLevel {
    /// Level implied by a raw score (`<4 simple`, `<8 medium`, else complex)
    pub fn from_score(score: f64) -> Self {
        if score < 4.0 {
            Self::Simple
        } else if score < 8.0 {
            Self::Medium
        } else {
            Self::Complex
        }
    }
}

impl std::fmt::Display for ComplexityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Medium => write!(f, "medium"),
            Self::Complex => write!(f, "complex"),
        }
    }
}

impl std::str::FromStr for ComplexityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" | "low" => Ok(Self::Simple),
            "medium" | "moderate" => Ok(Self::Medium),
            "complex" | "high" => Ok(Self::Complex),
            _ => Err(format!("Invalid complexity level: {}", s)),
        }
    }
}

/// Duration scaling tier derived from a complexity profile
///
/// `High` is reserved for complex tasks that are also urgent or
/// integration-heavy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationTier {
    Simple,
    #[default]
    Medium,
    Complex,
    High,
}

impl DurationTier {
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Simple => 0.8,
            Self::Medium => 1.0,
            Self::Complex => 1.5,
            Self::High => 1.8,
        }
    }
}

/// Keyword families contributing to the complexity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    TechnicalDepth,
    ScopeSize,
    IntegrationComplexity,
    TimeSensitivity,
    DocumentationNeed,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::TechnicalDepth,
        Factor::ScopeSize,
        Factor::IntegrationComplexity,
        Factor::TimeSensitivity,
        Factor::DocumentationNeed,
    ];
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TechnicalDepth => write!(f, "technical_depth"),
            Self::ScopeSize => write!(f, "scope_size"),
            Self::IntegrationComplexity => write!(f, "integration_complexity"),
            Self::TimeSensitivity => write!(f, "time_sensitivity"),
            Self::DocumentationNeed => write!(f, "documentation_need"),
        }
    }
}

/// The free-text unit of work submitted for orchestration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub content: String,
    pub complexity_hint: Option<ComplexityLevel>,
    pub domain_hint: Option<String>,
}

impl Task {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            complexity_hint: None,
            domain_hint: None,
        }
    }

    pub fn with_complexity_hint(mut self, hint: ComplexityLevel) -> Self {
        self.complexity_hint = Some(hint);
        self
    }

    pub fn with_domain_hint(mut self, hint: impl Into<String>) -> Self {
        self.domain_hint = Some(hint.into());
        self
    }
}

/// Complexity assessment of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityProfile {
    pub level: ComplexityLevel,
    /// Sum of all factor contributions (never negative)
    pub score: f64,
    pub factors: BTreeMap<Factor, f64>,
    /// Confidence in `level`, 0.0 - 1.0
    pub confidence: f64,
    pub duration_tier: DurationTier,
}

impl ComplexityProfile {
    /// Contribution of one keyword family (0.0 when absent)
    pub fn factor(&self, factor: Factor) -> f64 {
        self.factors.get(&factor).copied().unwrap_or(0.0)
    }

    pub fn is_complex(&self) -> bool {
        self.level == ComplexityLevel::Complex
    }
}

/// Domain assessment of a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainProfile {
    pub primary: String,
    pub secondary: Option<String>,
    pub scores: BTreeMap<String, u32>,
    pub confidence: f64,
}

impl DomainProfile {
    /// Domain name used when no keyword matched
    pub const GENERAL: &'static str = "general";

    pub fn is_general(&self) -> bool {
        self.primary == Self::GENERAL
    }
}

/// Resource tier a worker prefers to run on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceTier {
    #[default]
    Standard,
    Premium,
}

impl std::fmt::Display for ResourceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Premium => write!(f, "premium"),
        }
    }
}

impl std::str::FromStr for ResourceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "premium" => Ok(Self::Premium),
            _ => Err(format!("Invalid resource tier: {}", s)),
        }
    }
}

/// A capability-tagged worker owned by the worker registry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkerDescriptor {
    pub name: String,
    pub title: String,
    pub capabilities: BTreeSet<String>,
    #[serde(default)]
    pub resource_tier: ResourceTier,
    /// Free-text instructions block
    #[serde(default)]
    pub instructions: String,
}

impl WorkerDescriptor {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            capabilities: BTreeSet::new(),
            resource_tier: ResourceTier::Standard,
            instructions: String::new(),
        }
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn with_tier(mut self, tier: ResourceTier) -> Self {
        self.resource_tier = tier;
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// First canonical capability this worker carries, in workflow order
    pub fn primary_capability(&self) -> Option<&'static str> {
        capabilities::ALL
            .iter()
            .copied()
            .find(|c| self.has_capability(c))
    }
}

/// Where a recommended worker came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerSource {
    /// Resolved from the worker registry
    Registry,
    /// Taken from the built-in catalogue because the registry had no match
    Builtin,
}

/// A worker proposed for one orchestration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecommendation {
    pub worker: WorkerDescriptor,
    pub priority: Priority,
    pub reason: String,
    pub confidence: f64,
    pub source: WorkerSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_rank() {
        assert_eq!(Priority::High.rank(), 3);
        assert_eq!(Priority::Medium.rank(), 2);
        assert_eq!(Priority::Low.rank(), 1);
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(ComplexityLevel::from_score(0.0), ComplexityLevel::Simple);
        assert_eq!(ComplexityLevel::from_score(3.9), ComplexityLevel::Simple);
        assert_eq!(ComplexityLevel::from_score(4.0), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_score(7.5), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_score(8.0), ComplexityLevel::Complex);
    }

    #[test]
    fn test_level_ordering() {
        assert!(ComplexityLevel::Simple < ComplexityLevel::Medium);
        assert!(ComplexityLevel::Medium < ComplexityLevel::Complex);
    }

    #[test]
    fn test_duration_multipliers() {
        assert_eq!(DurationTier::Simple.multiplier(), 0.8);
        assert_eq!(DurationTier::High.multiplier(), 1.8);
    }

    #[test]
    fn test_primary_capability_follows_workflow_order() {
        let worker = WorkerDescriptor::new("full-stack", "Full-stack engineer")
            .with_capability(capabilities::TESTING)
            .with_capability(capabilities::IMPLEMENTATION);
        assert_eq!(worker.primary_capability(), Some(capabilities::IMPLEMENTATION));

        let odd = WorkerDescriptor::new("translator", "Translator").with_capability("translation");
        assert_eq!(odd.primary_capability(), None);
    }

    #[test]
    fn test_factor_serializes_as_map_key() {
        let mut factors = BTreeMap::new();
        factors.insert(Factor::TechnicalDepth, 4.0);
        let json = serde_json::to_string(&factors).unwrap();
        assert_eq!(json, r#"{"technical_depth":4.0}"#);
    }
}
