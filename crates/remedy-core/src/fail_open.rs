//! Per-item failure isolation
//!
//! A collection run walks hundreds of PRs. A provider error on one of them
//! must cost exactly that PR, never the run. Wrap such per-item work in
//! [`fail_open`].
//!
//! DO NOT use fail-open for:
//! - Writing records (losing output silently is worse than stopping)
//! - Configuration and credential checks (those are fatal at startup)

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation whose failure should skip the item, not abort the run
///
/// Logs the error via `tracing::warn!` on failure and returns `None`.
///
/// # Usage
///
/// ```no_run
/// use remedy_core::fail_open::fail_open;
/// use remedy_core::Result;
///
/// async fn fetch_detail() -> Result<u64> {
///     Ok(42)
/// }
///
/// async fn example() {
///     let detail = fail_open("fetch owner/repo#42", || fetch_detail()).await;
///     // detail is None if the fetch failed
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Option<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Some(val),
        Err(e) => {
            warn!("{} failed, skipping: {}", operation_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RemedyError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", || async { Ok::<_, RemedyError>(42) }).await;
        assert_eq!(result, Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_provider_failure() {
        let result = fail_open("fetch owner/repo#1", || async {
            Err::<i32, _>(RemedyError::Provider {
                status: 500,
                url: "https://api.github.com/repos/owner/repo/pulls/1".to_string(),
            })
        })
        .await;
        assert_eq!(result, None);
    }
}
