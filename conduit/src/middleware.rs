//! The onion-style middleware pipeline.
//!
//! A [`Middleware`] wraps the remainder of the chain via [`Next`]: it may
//! run code before calling `next.run(ctx)` (pre-phase), after it resolves
//! (post-phase), or both. Not calling `next` at all short-circuits the
//! call — later middleware and the transport never run.

use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;
use crate::transport::Transport;

#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<()>;
}

/// The remainder of a composed chain: zero or more middleware followed by
/// the transport leaf. Registration order is entry order — `m1` wraps `m2`
/// wraps ... wraps the transport; post-phases unwind in reverse.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], transport: &'a dyn Transport) -> Self {
        Self { chain, transport }
    }

    /// Runs the remainder of the chain (including the transport), returning
    /// once every inner layer has finished mutating `ctx`.
    pub async fn run(self, ctx: &mut Context) -> Result<()> {
        match self.chain.split_first() {
            Some((middleware, rest)) => {
                let next = Next::new(rest, self.transport);
                middleware.handle(ctx, next).await
            }
            None => self.transport.execute(ctx).await,
        }
    }
}

/// Folds `chain` and `transport` into a single `(ctx) -> Result<()>`
/// operation and runs it once. Used directly by callers that don't need
/// retry (e.g. plugin tests); the retry engine calls this once per attempt.
pub async fn run_once(
    ctx: &mut Context,
    chain: &[Arc<dyn Middleware>],
    transport: &dyn Transport,
) -> Result<()> {
    Next::new(chain, transport).run(ctx).await
}
