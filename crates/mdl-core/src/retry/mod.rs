//! Per-request retry for segment fetches.
//!
//! A failed request is turned into a [`FetchError`], classified into an
//! [`ErrorKind`], and the [`RetryPolicy`] decides whether to sleep and try
//! again. Every kind is retried with the same fixed delay, storage failures
//! included; only cancellation stops the loop early. The kind is also logged
//! with each retried attempt.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::run_with_retry;
