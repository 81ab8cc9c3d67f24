//! Heuristic task classification
//!
//! Complexity and domain are scored by counting keyword hits in the
//! lower-cased task text. A keyword hits a token when the token starts with
//! it, so `microservice` matches `microservices` while `api` does not match
//! `rapid`. A keyword ending in `$` must match the whole token, which keeps
//! `spec` from matching `special`.

use maestro_core::{ComplexityLevel, ComplexityProfile, DomainProfile, DurationTier, Factor, Task};
use std::collections::BTreeMap;
use tracing::debug;

/// Keyword families: factor, weight per hit, keyword prefixes
const FAMILIES: [(Factor, f64, &[&str]); 5] = [
    (
        Factor::TechnicalDepth,
        2.0,
        &[
            "architecture",
            "distributed",
            "microservice",
            "algorithm",
            "scalab",
            "performance",
            "security",
            "encrypt",
            "database",
            "api",
            "gateway",
            "infrastructure",
            "concurren",
            "kubernetes",
            "cluster",
            "neural",
            "optimiz",
        ],
    ),
    (
        Factor::ScopeSize,
        1.5,
        &[
            "system",
            "platform",
            "entire",
            "enterprise",
            "multiple",
            "comprehensive",
            "large",
            "full$",
            "complete",
            "suite",
        ],
    ),
    (
        Factor::IntegrationComplexity,
        2.0,
        &[
            "integrat",
            "migrat",
            "legacy",
            "third",
            "webhook",
            "oauth",
            "sync",
            "interoperab",
            "pipeline",
        ],
    ),
    (
        Factor::TimeSensitivity,
        1.0,
        &[
            "urgent",
            "asap",
            "deadline",
            "immediately",
            "critical",
            "quickly",
            "hotfix",
        ],
    ),
    (
        Factor::DocumentationNeed,
        1.0,
        &[
            "document",
            "docs",
            "manual",
            "guide",
            "readme",
            "report",
            "spec$",
            "specs$",
            "specification",
            "tutorial",
        ],
    ),
];

/// Domains in declaration order (ties resolve to the earlier entry)
const DOMAINS: [(&str, &[&str]); 6] = [
    (
        "web-development",
        &[
            "web", "frontend", "html", "css", "javascript", "react", "vue", "angular", "browser",
            "page", "login", "website",
        ],
    ),
    (
        "mobile-development",
        &[
            "mobile",
            "ios",
            "android",
            "swift",
            "kotlin",
            "flutter",
            "tablet",
            "smartphone",
        ],
    ),
    (
        "backend-development",
        &[
            "backend",
            "server",
            "api",
            "database",
            "microservice",
            "endpoint",
            "graphql",
            "gateway",
            "sql",
            "service",
        ],
    ),
    (
        "data-science",
        &[
            "data$",
            "dataset",
            "analytic",
            "machine",
            "learning",
            "statistic",
            "pandas",
            "predict",
            "visualiz",
        ],
    ),
    (
        "devops",
        &[
            "deploy",
            "docker",
            "kubernetes",
            "pipeline",
            "infrastructure",
            "monitor",
            "terraform",
            "cloud",
        ],
    ),
    (
        "security",
        &[
            "security",
            "secure",
            "auth$",
            "authentic",
            "authoriz",
            "encrypt",
            "vulnerab",
            "penetration",
            "firewall",
            "compliance",
        ],
    ),
];

/// Stateless task classifier
pub struct TaskClassifier;

impl TaskClassifier {
    /// Score both complexity and domain
    pub fn classify(task: &Task) -> (ComplexityProfile, DomainProfile) {
        let tokens = tokenize(&task.content);
        let complexity = Self::complexity_from_tokens(&tokens, task);
        let domain = Self::domain_from_tokens(&tokens, task);

        debug!(
            level = %complexity.level,
            score = complexity.score,
            domain = %domain.primary,
            "Classified task"
        );

        (complexity, domain)
    }

    pub fn complexity(task: &Task) -> ComplexityProfile {
        Self::complexity_from_tokens(&tokenize(&task.content), task)
    }

    pub fn domain(task: &Task) -> DomainProfile {
        Self::domain_from_tokens(&tokenize(&task.content), task)
    }

    /// Names of the domains the classifier knows, in declaration order
    pub fn known_domains() -> impl Iterator<Item = &'static str> {
        DOMAINS.iter().map(|(name, _)| *name)
    }

    fn complexity_from_tokens(tokens: &[String], task: &Task) -> ComplexityProfile {
        let mut factors = BTreeMap::new();
        for (factor, weight, keywords) in FAMILIES {
            factors.insert(factor, count_matches(tokens, keywords) as f64 * weight);
        }

        let score: f64 = factors.values().sum();
        let raw = ComplexityLevel::from_score(score);

        let (level, confidence) = match task.complexity_hint {
            None => (raw, 0.8),
            Some(hint) => {
                let level = apply_hint(hint, score);
                let confidence = if hint == raw {
                    0.9
                } else if level == hint {
                    0.7
                } else {
                    0.6
                };
                (level, confidence)
            }
        };

        let compound = factors.get(&Factor::TimeSensitivity).copied().unwrap_or(0.0) > 0.0
            || factors
                .get(&Factor::IntegrationComplexity)
                .copied()
                .unwrap_or(0.0)
                > 0.0;

        let duration_tier = match level {
            ComplexityLevel::Simple => DurationTier::Simple,
            ComplexityLevel::Medium => DurationTier::Medium,
            ComplexityLevel::Complex if compound => DurationTier::High,
            ComplexityLevel::Complex => DurationTier::Complex,
        };

        ComplexityProfile {
            level,
            score,
            factors,
            confidence,
            duration_tier,
        }
    }

    fn domain_from_tokens(tokens: &[String], task: &Task) -> DomainProfile {
        let scores: Vec<(&str, u32)> = DOMAINS
            .iter()
            .map(|(name, keywords)| (*name, count_matches(tokens, keywords)))
            .collect();

        // Stable sort keeps declaration order among equal scores
        let mut ranked: Vec<(&str, u32)> = scores.iter().copied().filter(|(_, s)| *s > 0).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        if let Some(hint) = task.domain_hint.as_deref().map(str::to_lowercase) {
            if let Some(pos) = ranked.iter().position(|(name, _)| *name == hint) {
                let forced = ranked.remove(pos);
                ranked.insert(0, forced);
            } else {
                debug!("Ignoring domain hint '{}' with no keyword support", hint);
            }
        }

        let top_score = ranked.first().map(|(_, s)| *s).unwrap_or(0);

        DomainProfile {
            primary: ranked
                .first()
                .map(|(name, _)| name.to_string())
                .unwrap_or_else(|| DomainProfile::GENERAL.to_string()),
            secondary: ranked.get(1).map(|(name, _)| name.to_string()),
            scores: scores
                .into_iter()
                .map(|(name, s)| (name.to_string(), s))
                .collect(),
            confidence: if top_score > 2 { 0.9 } else { 0.7 },
        }
    }
}

/// Reinterpret the score toward a hint, tolerating one level of disagreement
fn apply_hint(hint: ComplexityLevel, score: f64) -> ComplexityLevel {
    match hint {
        ComplexityLevel::Simple if score >= 8.0 => ComplexityLevel::Medium,
        ComplexityLevel::Complex if score < 4.0 => ComplexityLevel::Medium,
        other => other,
    }
}

/// Lower-case and split on anything that is not a letter or digit
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn keyword_matches(token: &str, keyword: &str) -> bool {
    match keyword.strip_suffix('$') {
        Some(exact) => token == exact,
        None => token.starts_with(keyword),
    }
}

/// Number of tokens matching any of the keywords (each token counts once)
pub(crate) fn count_matches(tokens: &[String], keywords: &[&str]) -> u32 {
    tokens
        .iter()
        .filter(|token| keywords.iter().any(|k| keyword_matches(token, k)))
        .count() as u32
}
