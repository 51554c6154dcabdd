//! Keyword-based security relevance
//!
//! A coarse filter, not ground truth: the default vocabulary includes broad
//! words like "fix" and "dependency" and will flag plenty of ordinary PRs.

use remedy_core::config::default_security_keywords;
use std::collections::HashSet;

/// Flags PRs whose text or labels mention security vocabulary
#[derive(Debug, Clone)]
pub struct SecurityClassifier {
    /// Single-word keywords, matched against whole tokens
    words: HashSet<String>,
    /// Multi-word keywords, matched as substrings
    phrases: Vec<String>,
    /// Every keyword, for label matching
    all: Vec<String>,
}

impl Default for SecurityClassifier {
    fn default() -> Self {
        Self::new(default_security_keywords())
    }
}

impl SecurityClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let all: Vec<String> = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();

        let (phrases, words): (Vec<String>, Vec<String>) = all
            .iter()
            .cloned()
            .partition(|k| k.chars().any(|c| !c.is_alphanumeric()));

        Self {
            words: words.into_iter().collect(),
            phrases,
            all,
        }
    }

    /// Whether a PR with this title, body and labels is security-related
    pub fn classify(&self, title: &str, body: &str, labels: &[String]) -> bool {
        let text = format!("{} {}", title, body).to_lowercase();

        if text
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| self.words.contains(token))
        {
            return true;
        }

        if self.phrases.iter().any(|phrase| text.contains(phrase.as_str())) {
            return true;
        }

        labels.iter().any(|label| {
            let label = label.to_lowercase();
            label == "security" || self.all.iter().any(|k| label.contains(k.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_detection() {
        let classifier = SecurityClassifier::default();
        assert!(classifier.classify(
            "Security: Fix XSS vulnerability",
            "Fixes CVE-2024-1234",
            &[]
        ));
    }

    #[test]
    fn test_non_security_detection() {
        let classifier = SecurityClassifier::default();
        assert!(!classifier.classify("Docs: Update README", "Add examples", &[]));
    }

    #[test]
    fn test_whole_token_match() {
        let classifier = SecurityClassifier::default();
        // "author" contains "auth" but is not the token "auth"
        assert!(!classifier.classify("Credit the author", "", &[]));
        assert!(classifier.classify("Harden auth flow", "", &[]));
    }

    #[test]
    fn test_phrase_match() {
        let classifier = SecurityClassifier::default();
        assert!(classifier.classify("Escape query params", "Prevents SQL injection", &[]));
    }

    #[test]
    fn test_label_match() {
        let classifier = SecurityClassifier::default();
        let labels = vec!["type: Security-Patch".to_string()];
        assert!(classifier.classify("Bump lodash", "", &labels));
        assert!(!classifier.classify("Tidy docs", "", &["docs".to_string()]));
    }

    #[test]
    fn test_custom_vocabulary() {
        let classifier = SecurityClassifier::new(["sandbox", "path traversal"]);
        assert!(classifier.classify("Tighten sandbox", "", &[]));
        assert!(classifier.classify("Guard against path traversal", "", &[]));
        assert!(!classifier.classify("Fix typo", "", &[]));
    }
}
