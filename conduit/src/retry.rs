//! The retry engine (`spec.md` §4.2). It sits above the middleware
//! pipeline: it invokes the composed chain once per attempt, classifies
//! the outcome, and either accepts it or records the attempt, sleeps the
//! configured delay and re-invokes with a fresh transport entry. User
//! middleware observe each individual attempt; the retry engine only ever
//! sees the final outcome of an attempt, never its internals.

use std::sync::Arc;
use std::time::Duration;

use crate::context::{Context, RetryAttempt};
use crate::error::{Error, Result};
use crate::middleware::{Middleware, Next};
use crate::transport::Transport;

/// Classification of an attempt's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryable {
    /// Might resolve on a subsequent attempt.
    Transient,
    /// Success, or an unresolvable failure; never re-attempted.
    Terminal,
}

/// Whether `err` is one the default policy considers transient: a
/// transport timeout, or a middleware-raised [`Error::HttpStatus`] with a
/// server-class (`>= 500`) status code. 4xx is always terminal. This is
/// exactly the rule `spec.md` §4.2 calls "Classification", exposed as a
/// free function so other crates (e.g. the logger plugin) can ask "would
/// the engine retry this?" without re-registering as a [`RetryClassifier`].
pub fn is_retryable(err: &Error) -> bool {
    matches!(err, Error::Timeout { .. })
        || matches!(err, Error::HttpStatus { status_code, .. } if *status_code >= 500)
}

/// Pluggable outcome classifier. The default implementation is
/// [`DefaultRetryClassifier`]; callers needing different rules (e.g. to
/// also retry on a particular `Decode` failure) can supply their own via
/// `ClientBuilder::retry_classifier`.
pub trait RetryClassifier: Send + Sync {
    fn classify(&self, outcome: &Result<()>) -> Retryable;
}

/// Implements `spec.md` §4.2's classification rule verbatim: success or a
/// budget-exhausted/4xx/decode/etc. failure is terminal; a timeout or a
/// >=500 `HttpStatus` is transient.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultRetryClassifier;

impl RetryClassifier for DefaultRetryClassifier {
    fn classify(&self, outcome: &Result<()>) -> Retryable {
        match outcome {
            Ok(()) => Retryable::Terminal,
            Err(err) if is_retryable(err) => Retryable::Transient,
            Err(_) => Retryable::Terminal,
        }
    }
}

/// Runs `chain` against `ctx` to completion, retrying transient failures
/// per `ctx.retry_policy` (`max` re-attempts beyond the first, `delay_ms`
/// fixed delay between attempts). `ctx.retries` accumulates one
/// [`RetryAttempt`] per retry; on return it holds `max` entries or fewer
/// (fewer than `max` exactly when a later attempt terminated the call).
pub(crate) async fn execute_with_retry(
    ctx: &mut Context,
    chain: &[Arc<dyn Middleware>],
    transport: &dyn Transport,
    classifier: &dyn RetryClassifier,
) -> Result<()> {
    loop {
        let outcome = Next::new(chain, transport).run(ctx).await;

        if classifier.classify(&outcome) == Retryable::Transient
            && (ctx.retries.len() as u32) < ctx.retry_policy.max
        {
            let err = match outcome {
                Err(err) => err,
                Ok(()) => unreachable!("a Transient classification always carries an Err"),
            };
            ctx.retries.push(RetryAttempt {
                status_code: err.status_code(),
                reason: err.to_string(),
            });
            ctx.res = None;
            tracing::debug!(attempt = ctx.retries.len(), delay_ms = ctx.retry_policy.delay_ms, "retrying request");
            if ctx.retry_policy.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(ctx.retry_policy.delay_ms)).await;
            }
            continue;
        }

        return outcome;
    }
}
