//! Worker document format
//!
//! ```text
//! +++
//! name = "architect"
//! title = "Software Architect"
//! capabilities = ["design"]
//! resource_tier = "premium"
//! +++
//!
//! Free-text instructions for the worker.
//! ```

use maestro_core::{MaestroError, ResourceTier, Result, WorkerDescriptor};
use serde::{Deserialize, Serialize};

/// File extension of worker documents
pub const DOCUMENT_EXTENSION: &str = "md";

const FENCE: &str = "+++";

#[derive(Debug, Serialize, Deserialize)]
struct FrontMatter {
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    capabilities: Vec<String>,
    #[serde(default)]
    resource_tier: ResourceTier,
}

/// Parse a worker document into a descriptor
pub fn parse_worker_document(content: &str) -> Result<WorkerDescriptor> {
    let content = content.trim_start_matches('\u{feff}').trim_start();

    let rest = content
        .strip_prefix(FENCE)
        .ok_or_else(|| MaestroError::Registry("Missing '+++' front matter".to_string()))?;

    let end = rest
        .find(&format!("\n{}", FENCE))
        .ok_or_else(|| MaestroError::Registry("Unterminated front matter".to_string()))?;

    let header = &rest[..end];
    let body = &rest[end + 1 + FENCE.len()..];

    let front: FrontMatter = toml::from_str(header)
        .map_err(|e| MaestroError::Registry(format!("Invalid front matter: {}", e)))?;

    validate_worker_name(&front.name)?;

    let title = front.title.unwrap_or_else(|| front.name.clone());
    let mut descriptor = WorkerDescriptor::new(front.name, title)
        .with_tier(front.resource_tier)
        .with_instructions(body.trim());
    descriptor.capabilities = front
        .capabilities
        .into_iter()
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect();

    Ok(descriptor)
}

/// Render a descriptor as a worker document
pub fn render_worker_document(descriptor: &WorkerDescriptor) -> Result<String> {
    let front = FrontMatter {
        name: descriptor.name.clone(),
        title: Some(descriptor.title.clone()),
        capabilities: descriptor.capabilities.iter().cloned().collect(),
        resource_tier: descriptor.resource_tier,
    };

    let header = toml::to_string(&front)
        .map_err(|e| MaestroError::Registry(format!("Failed to serialize front matter: {}", e)))?;

    Ok(format!(
        "{fence}\n{header}{fence}\n\n{body}\n",
        fence = FENCE,
        header = header,
        body = descriptor.instructions.trim()
    ))
}

/// Worker names double as file stems: ASCII letters, digits, `-` and `_`
pub(crate) fn validate_worker_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(MaestroError::InvalidInput(format!(
            "Invalid worker name '{}'",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARCHITECT: &str = r#"+++
name = "architect"
title = "Software Architect"
capabilities = ["design", " Implementation "]
resource_tier = "premium"
+++

Design systems that are easy to change.
"#;

    #[test]
    fn test_parse_document() {
        let worker = parse_worker_document(ARCHITECT).unwrap();
        assert_eq!(worker.name, "architect");
        assert_eq!(worker.title, "Software Architect");
        assert!(worker.has_capability("design"));
        assert!(worker.has_capability("implementation"));
        assert_eq!(worker.resource_tier, ResourceTier::Premium);
        assert_eq!(worker.instructions, "Design systems that are easy to change.");
    }

    #[test]
    fn test_title_defaults_to_name() {
        let doc = "+++\nname = \"scribe\"\ncapabilities = [\"documentation\"]\n+++\nWrite.";
        let worker = parse_worker_document(doc).unwrap();
        assert_eq!(worker.title, "scribe");
        assert_eq!(worker.resource_tier, ResourceTier::Standard);
    }

    #[test]
    fn test_missing_front_matter() {
        let err = parse_worker_document("# Just markdown").unwrap_err();
        assert!(matches!(err, MaestroError::Registry(_)));
    }

    #[test]
    fn test_unterminated_front_matter() {
        let err = parse_worker_document("+++\nname = \"x\"\n").unwrap_err();
        assert!(err.to_string().contains("Unterminated"));
    }

    #[test]
    fn test_rejects_path_like_names() {
        let doc = "+++\nname = \"../etc\"\n+++\n";
        assert!(matches!(
            parse_worker_document(doc),
            Err(MaestroError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_render_is_parseable() {
        let worker = parse_worker_document(ARCHITECT).unwrap();
        let rendered = render_worker_document(&worker).unwrap();
        assert!(rendered.starts_with("+++\n"));
        assert_eq!(parse_worker_document(&rendered).unwrap(), worker);
    }
}
