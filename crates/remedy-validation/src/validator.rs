//! Fix template schema validation

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Fields every template must carry
pub const REQUIRED_FIELDS: [&str; 4] = ["id", "name", "confidence", "languages"];

/// Recognized top-level fields beyond the required ones
pub const OPTIONAL_FIELDS: [&str; 4] = ["risk_tier", "evidence", "pattern", "pr_template"];

/// Result of validating one template document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    /// Schema violations; empty means valid
    pub errors: Vec<String>,
    /// Unrecognized fields; never affect validity
    pub warnings: Vec<String>,
}

impl ValidationOutcome {
    fn failed(error: String) -> Self {
        Self {
            errors: vec![error],
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validates fix templates against the template schema
pub struct TemplateValidator;

impl TemplateValidator {
    /// Validate a template file; an unreadable file is a single error
    pub async fn validate_file(path: &Path) -> ValidationOutcome {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Self::validate_str(&content),
            Err(e) => ValidationOutcome::failed(format!("Failed to load YAML: {}", e)),
        }
    }

    /// Validate YAML text; a parse failure short-circuits the field checks
    pub fn validate_str(content: &str) -> ValidationOutcome {
        match serde_yaml::from_str::<Value>(content) {
            Ok(document) => Self::validate_value(&document),
            Err(e) => ValidationOutcome::failed(format!("Failed to load YAML: {}", e)),
        }
    }

    pub fn validate_value(document: &Value) -> ValidationOutcome {
        let Some(template) = document.as_mapping() else {
            return ValidationOutcome::failed(format!(
                "Template must be a mapping, got {}",
                kind(document)
            ));
        };

        let mut outcome = ValidationOutcome::default();

        for field in REQUIRED_FIELDS {
            if get(template, field).is_none() {
                outcome
                    .errors
                    .push(format!("Missing required field: {}", field));
            }
        }

        for field in ["id", "name"] {
            if let Some(value) = get(template, field) {
                if !value.as_str().is_some_and(|s| !s.trim().is_empty()) {
                    outcome
                        .errors
                        .push(format!("{} must be a non-empty string", field));
                }
            }
        }

        if let Some(confidence) = get(template, "confidence") {
            let in_range = confidence
                .as_f64()
                .is_some_and(|c| (0.0..=1.0).contains(&c));
            if !in_range {
                outcome.errors.push(format!(
                    "Invalid confidence: {} (must be 0-1)",
                    render(confidence)
                ));
            }
        }

        if let Some(languages) = get(template, "languages") {
            check_languages(languages, &mut outcome.errors);
        }

        for key in template.keys() {
            let known = key.as_str().is_some_and(|k| {
                REQUIRED_FIELDS.contains(&k) || OPTIONAL_FIELDS.contains(&k)
            });
            if !known {
                outcome
                    .warnings
                    .push(format!("Unknown field: {}", render(key)));
            }
        }

        outcome
    }
}

fn check_languages(languages: &Value, errors: &mut Vec<String>) {
    let Some(items) = languages.as_sequence() else {
        errors.push("languages must be a list".to_string());
        return;
    };

    if items.is_empty() {
        errors.push("languages must not be empty".to_string());
    }

    for (i, item) in items.iter().enumerate() {
        if !item.as_str().is_some_and(|s| !s.trim().is_empty()) {
            errors.push(format!("languages[{}] must be a non-empty string", i));
        }
    }
}

fn get<'a>(mapping: &'a Mapping, field: &str) -> Option<&'a Value> {
    mapping.get(field)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "an empty document",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| kind(other).to_string()),
    }
}
