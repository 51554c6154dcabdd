//! Authentication for the GitHub API
//!
//! The token is resolved once at startup. A missing token is a configuration
//! error and stops the process before any request is made.

use remedy_core::{RemedyError, Result};
use std::env;

/// Bearer credential for the GitHub REST API
#[derive(Clone)]
pub struct GitHubCredentials {
    token: String,
}

impl GitHubCredentials {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(RemedyError::Auth("GitHub token is empty".to_string()));
        }
        Ok(Self { token })
    }

    /// Read the token from the named environment variable
    pub fn from_env(var: &str) -> Result<Self> {
        match env::var(var) {
            Ok(token) if !token.trim().is_empty() => {
                tracing::info!("Using GitHub token from {}", var);
                Ok(Self { token })
            }
            _ => Err(RemedyError::Auth(format!(
                "{} not set. Set it in .env or export {}='ghp_...'",
                var, var
            ))),
        }
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for GitHubCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubCredentials")
            .field("token", &"<redacted>")
            .finish()
    }
}
