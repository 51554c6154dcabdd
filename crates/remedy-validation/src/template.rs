//! Typed fix templates and the on-disk template library

use crate::validator::TemplateValidator;
use remedy_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A before/after code transform for one mined pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixTemplate {
    pub id: String,
    pub name: String,
    /// Confidence (0.0 - 1.0), usually copied from the scored pattern
    pub confidence: f64,
    pub languages: Vec<String>,
    #[serde(default)]
    pub risk_tier: Option<String>,
    /// Free-form evidence block copied from the scored pattern
    #[serde(default)]
    pub evidence: Option<serde_yaml::Value>,
    #[serde(default)]
    pub pattern: Option<TemplatePattern>,
    #[serde(default)]
    pub pr_template: Option<PrTemplate>,
}

impl FixTemplate {
    pub fn supports(&self, language: &str) -> bool {
        self.languages
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language))
    }
}

/// The code transform itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatePattern {
    #[serde(default)]
    pub before: String,
    #[serde(default)]
    pub after: String,
    /// Related edits that must land with the fix (imports, config, tests)
    #[serde(default)]
    pub companion_changes: BTreeMap<String, serde_yaml::Value>,
}

/// Title and body used when the fix is proposed as a PR
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrTemplate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct LoadedTemplate {
    pub path: PathBuf,
    pub template: FixTemplate,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RejectedTemplate {
    pub path: PathBuf,
    pub errors: Vec<String>,
}

/// Every `*.yaml` / `*.yml` template in a directory, validated
#[derive(Debug, Default)]
pub struct TemplateLibrary {
    templates: Vec<LoadedTemplate>,
    rejected: Vec<RejectedTemplate>,
}

impl TemplateLibrary {
    /// Load and validate a template directory; a missing directory is empty
    pub async fn load(dir: &Path) -> Result<Self> {
        let mut library = Self::default();

        if !dir.exists() {
            info!("Templates directory does not exist: {:?}", dir);
            return Ok(library);
        }

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path
                .extension()
                .is_some_and(|e| e == "yaml" || e == "yml")
            {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            library.add_file(path).await;
        }

        info!(
            "Loaded {} templates ({} rejected) from {:?}",
            library.templates.len(),
            library.rejected.len(),
            dir
        );
        Ok(library)
    }

    async fn add_file(&mut self, path: PathBuf) {
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read template {:?}: {}", path, e);
                self.rejected.push(RejectedTemplate {
                    path,
                    errors: vec![format!("Failed to load YAML: {}", e)],
                });
                return;
            }
        };

        let outcome = TemplateValidator::validate_str(&content);
        if !outcome.is_valid() {
            debug!("Rejected template {:?}: {:?}", path, outcome.errors);
            self.rejected.push(RejectedTemplate {
                path,
                errors: outcome.errors,
            });
            return;
        }

        match serde_yaml::from_str::<FixTemplate>(&content) {
            Ok(template) => {
                debug!("Loaded template: {}", template.id);
                self.templates.push(LoadedTemplate {
                    path,
                    template,
                    warnings: outcome.warnings,
                });
            }
            Err(e) => self.rejected.push(RejectedTemplate {
                path,
                errors: vec![format!("Invalid template structure: {}", e)],
            }),
        }
    }

    pub fn templates(&self) -> &[LoadedTemplate] {
        &self.templates
    }

    pub fn rejected(&self) -> &[RejectedTemplate] {
        &self.rejected
    }

    pub fn get(&self, id: &str) -> Option<&FixTemplate> {
        self.templates
            .iter()
            .map(|t| &t.template)
            .find(|t| t.id == id)
    }

    /// Templates applicable to a language
    pub fn for_language(&self, language: &str) -> Vec<&FixTemplate> {
        self.templates
            .iter()
            .map(|t| &t.template)
            .filter(|t| t.supports(language))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FULL: &str = r#"
id: escape-html-output
name: Escape HTML output
confidence: 0.82
languages: [javascript, TypeScript]
risk_tier: low
evidence:
  occurrence_count: 12
  repo_count: 4
pattern:
  before: "el.innerHTML = value"
  after: "el.textContent = value"
  companion_changes:
    tests: add an XSS regression test
pr_template:
  title: "Escape HTML output in {file}"
  body: "Replaces innerHTML with textContent."
"#;

    #[test]
    fn test_parse_full_template() {
        let template: FixTemplate = serde_yaml::from_str(FULL).unwrap();
        assert_eq!(template.id, "escape-html-output");
        assert!(template.supports("typescript"));
        assert!(!template.supports("python"));

        let pattern = template.pattern.unwrap();
        assert_eq!(pattern.after, "el.textContent = value");
        assert!(pattern.companion_changes.contains_key("tests"));
        assert_eq!(
            template.pr_template.unwrap().title,
            "Escape HTML output in {file}"
        );
    }

    #[tokio::test]
    async fn test_library_load() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.yaml"), FULL).await.unwrap();
        tokio::fs::write(
            dir.path().join("b.yml"),
            "id: b\nname: B\nconfidence: 2\nlanguages: [go]\n",
        )
        .await
        .unwrap();
        tokio::fs::write(dir.path().join("notes.txt"), "ignored").await.unwrap();

        let library = TemplateLibrary::load(dir.path()).await.unwrap();
        assert_eq!(library.templates().len(), 1);
        assert_eq!(library.rejected().len(), 1);
        assert!(library.rejected()[0].path.ends_with("b.yml"));

        assert!(library.get("escape-html-output").is_some());
        assert_eq!(library.for_language("javascript").len(), 1);
        assert!(library.for_language("go").is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let library = TemplateLibrary::load(&dir.path().join("none")).await.unwrap();
        assert!(library.templates().is_empty());
        assert!(library.rejected().is_empty());
    }

    #[tokio::test]
    async fn test_structurally_invalid_template_rejected() {
        let dir = tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("c.yaml"),
            "id: c\nname: C\nconfidence: 0.5\nlanguages: [go]\npattern: just text\n",
        )
        .await
        .unwrap();

        let library = TemplateLibrary::load(dir.path()).await.unwrap();
        assert!(library.templates().is_empty());
        assert!(library.rejected()[0].errors[0].starts_with("Invalid template structure"));
    }
}
