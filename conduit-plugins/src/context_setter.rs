//! Pre-phase plugin: assigns a fixed value at a dotted path within the
//! context before the rest of the chain runs. See [`conduit::set_path`]
//! for which paths are supported and why.

use conduit::{set_path, Context, Middleware, Next, Result};

/// Factory-constructed middleware: `ContextSetter::new(value, "opts.time")`
/// pre-assigns `value` at `dottedPath` every time it runs.
pub struct ContextSetter {
    value: serde_json::Value,
    path: String,
}

impl ContextSetter {
    pub fn new(value: impl Into<serde_json::Value>, path: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            path: path.into(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for ContextSetter {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<()> {
        set_path(ctx, &self.path, self.value.clone())?;
        next.run(ctx).await
    }
}
