// crates/cloudcheck-introspect/src/fetch.rs
// ============================================================================
// Module: Expression Fetcher
// Description: Retry-tolerant HTTP GET of an introspection document.
// Purpose: Fetch the raw environment document of a running service.
// Dependencies: cloudcheck-core, reqwest, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! [`ExpressionFetcher::fetch`] issues GET requests until one of three things
//! happens: a document is returned, a fatal error occurs, or the overall
//! deadline passes. Only per-attempt timeouts are retried, after a fixed
//! backoff; each attempt is bounded by `min(attempt_timeout_cap, remaining)`.
//! A 404 means the service does not expose its resolved environment and
//! yields an empty document when `empty_if_404` is set. Any other non-2xx
//! status, transport failure, or unparseable body is fatal.
//!
//! Security posture: introspection responses are untrusted and size-limited.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use cloudcheck_core::RetryOutcome;
use cloudcheck_core::RetryPolicy;
use cloudcheck_core::Step;
use cloudcheck_core::retry_until;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::redirect::Policy;
use serde_json::Value;
use thiserror::Error;
use tokio::time::Instant;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::expression::ExpressionDict;
use crate::resolver::PrecedenceResolver;
use crate::source::RawConfigDocument;

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Default upper bound on a single attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT_CAP: Duration = Duration::from_secs(10);
/// Default backoff after a timed-out attempt.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
/// Default response size limit (16 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Fetch behavior.
///
/// # Invariants
/// - `attempt_timeout_cap` is non-zero.
/// - `max_response_bytes` is a hard limit on response bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Upper bound on a single attempt.
    pub attempt_timeout_cap: Duration,
    /// Sleep after a timed-out attempt.
    pub backoff: Duration,
    /// Treat 404 as "introspection unsupported" and return an empty document.
    pub empty_if_404: bool,
    /// Largest accepted response body.
    pub max_response_bytes: usize,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            attempt_timeout_cap: DEFAULT_ATTEMPT_TIMEOUT_CAP,
            backoff: DEFAULT_BACKOFF,
            empty_if_404: true,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Introspection fetch errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Every attempt timed out before the deadline.
    #[error("introspection of {url} timed out after {attempts} attempt(s) within {timeout_ms} ms")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Attempts made.
        attempts: u32,
        /// Overall timeout in milliseconds.
        timeout_ms: u64,
    },
    /// The endpoint returned 404 and 404s are not tolerated.
    #[error("introspection endpoint {url} returned 404")]
    NotFound {
        /// Requested URL.
        url: String,
    },
    /// The endpoint returned a non-2xx status.
    #[error("introspection of {url} returned HTTP {status}: {body}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// Connection, TLS, or protocol failure.
    #[error("introspection transport failure for {url}: {message}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Failure detail.
        message: String,
    },
    /// The body was not a JSON object.
    #[error("introspection response from {url} is not a JSON object: {message}")]
    Parse {
        /// Requested URL.
        url: String,
        /// Failure detail.
        message: String,
    },
    /// The body exceeded the size limit.
    #[error("introspection response from {url} exceeds {limit} bytes")]
    TooLarge {
        /// Requested URL.
        url: String,
        /// Size limit in bytes.
        limit: usize,
    },
    /// The fetch was configured with unusable limits.
    #[error("invalid fetch policy: {0}")]
    InvalidPolicy(String),
}

/// Classification of one failed attempt.
enum AttemptError {
    /// The attempt hit its timeout; retry if budget remains.
    TimedOut(String),
    /// The attempt failed in a way retrying cannot fix.
    Fatal(FetchError),
}

// ============================================================================
// SECTION: Fetcher
// ============================================================================

/// Fetches raw introspection documents.
#[derive(Debug, Clone)]
pub struct ExpressionFetcher {
    /// Shared HTTP client.
    client: Client,
    /// Fetch behavior.
    policy: FetchPolicy,
}

impl ExpressionFetcher {
    /// Builds a fetcher.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidPolicy`] when the policy is unusable or
    /// the HTTP client cannot be constructed.
    pub fn new(policy: FetchPolicy) -> Result<Self, FetchError> {
        if policy.attempt_timeout_cap.is_zero() {
            return Err(FetchError::InvalidPolicy(
                "attempt timeout cap must be greater than zero".to_string(),
            ));
        }
        if policy.max_response_bytes == 0 {
            return Err(FetchError::InvalidPolicy(
                "max response bytes must be greater than zero".to_string(),
            ));
        }
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|err| FetchError::InvalidPolicy(format!("http client: {err}")))?;
        Ok(Self {
            client,
            policy,
        })
    }

    /// Returns the fetch policy.
    #[must_use]
    pub const fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Fetches the document at `url`, retrying timeouts until `timeout`
    /// has elapsed.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the deadline passes, the endpoint answers
    /// with an untolerated status, the transport fails, or the body is not a
    /// JSON object.
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<RawConfigDocument, FetchError> {
        if timeout.is_zero() {
            return Err(FetchError::InvalidPolicy("timeout must be greater than zero".to_string()));
        }
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Err(FetchError::InvalidPolicy("timeout is too large".to_string()));
        };

        let outcome = retry_until(deadline, RetryPolicy::fixed(self.policy.backoff), move |attempt| {
            async move {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let limit = self.policy.attempt_timeout_cap.min(remaining).max(Duration::from_millis(1));
                match self.attempt(url, limit).await {
                    Ok(document) => Step::Done(document),
                    Err(AttemptError::TimedOut(message)) => {
                        info!(url, attempt, error = %message, "introspection attempt timed out, retrying");
                        Step::Retry(message)
                    }
                    Err(AttemptError::Fatal(err)) => Step::Abort(err),
                }
            }
        })
        .await;

        match outcome {
            RetryOutcome::Done {
                value, ..
            } => Ok(value),
            RetryOutcome::Exhausted {
                attempts, ..
            } => {
                let err = FetchError::Timeout {
                    url: url.to_string(),
                    attempts,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                };
                error!(url, error = %err, "introspection failed");
                Err(err)
            }
            RetryOutcome::Aborted {
                error: err, ..
            } => {
                error!(url, error = %err, "introspection failed");
                Err(err)
            }
        }
    }

    /// Fetches `url` and resolves the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the fetch fails.
    pub async fn scrape(&self, url: &str, timeout: Duration) -> Result<ExpressionDict, FetchError> {
        let raw = self.fetch(url, timeout).await?;
        Ok(PrecedenceResolver::new().infer(&raw))
    }

    /// Issues one GET bounded by `limit`.
    async fn attempt(&self, url: &str, limit: Duration) -> Result<RawConfigDocument, AttemptError> {
        let response = self
            .client
            .get(url)
            .timeout(limit)
            .send()
            .await
            .map_err(|err| classify(url, &err))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if self.policy.empty_if_404 {
                warn!(url, "introspection endpoint returned 404, treating as empty");
                return Ok(RawConfigDocument::empty());
            }
            return Err(AttemptError::Fatal(FetchError::NotFound {
                url: url.to_string(),
            }));
        }
        let body = read_body_with_limit(url, response, self.policy.max_response_bytes).await?;
        if !status.is_success() {
            return Err(AttemptError::Fatal(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).trim().to_string(),
            }));
        }
        parse_document(url, &body).map_err(AttemptError::Fatal)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps a client error onto a retryable timeout or a fatal transport error.
fn classify(url: &str, err: &reqwest::Error) -> AttemptError {
    if err.is_timeout() {
        AttemptError::TimedOut(err.to_string())
    } else {
        AttemptError::Fatal(FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

/// Reads a response body while enforcing a hard byte limit.
async fn read_body_with_limit(
    url: &str,
    mut response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, AttemptError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|err| classify(url, &err))? {
        if body.len().saturating_add(chunk.len()) > limit {
            return Err(AttemptError::Fatal(FetchError::TooLarge {
                url: url.to_string(),
                limit,
            }));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Parses a body that must be a JSON object.
fn parse_document(url: &str, body: &[u8]) -> Result<RawConfigDocument, FetchError> {
    let value: Value = serde_json::from_slice(body).map_err(|err| FetchError::Parse {
        url: url.to_string(),
        message: err.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(RawConfigDocument::from(map)),
        other => Err(FetchError::Parse {
            url: url.to_string(),
            message: format!("expected an object, found {}", json_kind(&other)),
        }),
    }
}

/// Names the JSON type of `value`.
const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
