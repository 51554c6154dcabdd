//! Structural diff fingerprints
//!
//! Two fixes that differ only in literal values or comments should land on
//! the same fingerprint, so the same remediation is recognizable across
//! repositories.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// Placeholder substituted for every string literal
pub const STRING_PLACEHOLDER: &str = "<STRING>";

static STRING_LITERAL: OnceLock<Regex> = OnceLock::new();
static TRAILING_COMMENT: OnceLock<Regex> = OnceLock::new();

fn string_literal() -> &'static Regex {
    STRING_LITERAL.get_or_init(|| {
        Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'|`(?:[^`\\]|\\.)*`"#)
            .expect("string literal pattern is valid")
    })
}

fn trailing_comment() -> &'static Regex {
    TRAILING_COMMENT.get_or_init(|| {
        Regex::new(r"(//.*|\s#.*)$").expect("trailing comment pattern is valid")
    })
}

/// Hashes added/removed lines into a literal-insensitive fingerprint
pub struct DiffFingerprinter;

impl DiffFingerprinter {
    /// SHA-256 over the normalized lines, as 64 lowercase hex characters.
    ///
    /// Added lines are hashed as `+line\n` and removed lines as `-line\n`, so
    /// moving a line from one side to the other changes the fingerprint.
    pub fn fingerprint<A, R>(added: &[A], removed: &[R]) -> String
    where
        A: AsRef<str>,
        R: AsRef<str>,
    {
        let mut hasher = Sha256::new();

        for line in added {
            Self::hash_line(&mut hasher, '+', line.as_ref());
        }
        for line in removed {
            Self::hash_line(&mut hasher, '-', line.as_ref());
        }

        hex::encode(hasher.finalize())
    }

    /// Strip whitespace, replace string literals, drop trailing comments
    pub fn normalize_line(line: &str) -> String {
        let replaced = string_literal().replace_all(line.trim(), STRING_PLACEHOLDER);
        let stripped = trailing_comment().replace(&replaced, "");
        stripped.trim().to_string()
    }

    fn hash_line(hasher: &mut Sha256, marker: char, line: &str) {
        let mut buf = [0u8; 4];
        hasher.update(marker.encode_utf8(&mut buf).as_bytes());
        hasher.update(Self::normalize_line(line).as_bytes());
        hasher.update(b"\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_fingerprint_length_and_determinism() {
        let added = ["const API_KEY = \"abc123\";"];
        let removed = ["const API_KEY = \"hardcoded\";"];

        let first = DiffFingerprinter::fingerprint(&added, &removed);
        assert_eq!(first.len(), 64);
        assert_eq!(first, DiffFingerprinter::fingerprint(&added, &removed));
    }

    #[test]
    fn test_literals_do_not_matter() {
        let none: [&str; 0] = [];
        let a = DiffFingerprinter::fingerprint(&["x=\"abc\""], &none);
        let b = DiffFingerprinter::fingerprint(&["x=\"def\""], &none);
        assert_eq!(a, b);
    }

    #[test]
    fn test_structure_matters() {
        let added = ["let token = env(\"TOKEN\");"];
        let a = DiffFingerprinter::fingerprint(&added, &["let token = \"secret\";"]);
        let c = DiffFingerprinter::fingerprint(&added, &["token = load_token();"]);
        assert_ne!(a, c);
    }

    #[test]
    fn test_side_matters() {
        let none: [&str; 0] = [];
        let added = DiffFingerprinter::fingerprint(&["x = 1"], &none);
        let removed = DiffFingerprinter::fingerprint(&none, &["x = 1"]);
        assert_ne!(added, removed);
    }

    #[test]
    fn test_comments_and_whitespace_ignored() {
        let none: [&str; 0] = [];
        let a = DiffFingerprinter::fingerprint(&["  foo(bar);  // old call"], &none);
        let b = DiffFingerprinter::fingerprint(&["foo(bar);"], &none);
        let c = DiffFingerprinter::fingerprint(&["foo(bar)  # python style"], &none);
        let d = DiffFingerprinter::fingerprint(&["foo(bar)"], &none);
        assert_eq!(a, b);
        assert_eq!(c, d);
    }

    #[test]
    fn test_empty_input() {
        let none: [&str; 0] = [];
        assert_eq!(DiffFingerprinter::fingerprint(&none, &none), EMPTY_SHA256);
    }

    #[test]
    fn test_normalize_line() {
        let normalized = DiffFingerprinter::normalize_line("  const x = \"value\";  // comment");
        assert_eq!(normalized, "const x = <STRING>;");
        assert!(!normalized.contains("value"));
        assert!(!normalized.contains("comment"));
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        let normalized = DiffFingerprinter::normalize_line("url = \"http://example.com\"");
        assert_eq!(normalized, "url = <STRING>");
    }

    #[test]
    fn test_escaped_quotes() {
        let normalized = DiffFingerprinter::normalize_line(r#"say("he said \"hi\"")"#);
        assert_eq!(normalized, "say(<STRING>)");
    }
}
