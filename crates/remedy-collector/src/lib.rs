//! # remedy-collector
//!
//! GitHub pull request collector for Remedy.
//!
//! Walks the closed PRs of each configured repository, keeps merged PRs that
//! pass the merge-time floor and (optionally) the security filter, looks for a
//! later revert, and appends one [`remedy_core::PrRecord`] per line to the
//! JSONL store.
//!
//! ## Rate limits
//!
//! A rate-limited response waits until the provider's reset time plus a
//! buffer, then re-issues the same request. Retries are bounded; time and
//! sleeping go through [`Clock`] and [`Sleeper`] so tests never wait.

mod auth;
mod client;
mod collector;
mod pacing;
mod security;
mod types;

pub use auth::GitHubCredentials;
pub use client::{GitHubClient, ReqwestTransport, Transport, PER_PAGE};
pub use collector::{find_revert, Fetched, PrCollector, SkipReason};
pub use pacing::{rate_limit_wait, Clock, Sleeper, SystemClock, TokioSleeper};
pub use security::SecurityClassifier;
pub use types::*;
