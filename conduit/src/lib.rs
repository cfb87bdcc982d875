//! `conduit` is a composable HTTP client: a middleware pipeline, a retry
//! policy engine and a fluent per-request builder, orchestrating calls to
//! an underlying transport (by default, [`reqwest`]).
//!
//! ```no_run
//! use conduit::{Client, Middleware, Next, Result};
//!
//! struct LoggingMiddleware;
//!
//! #[async_trait::async_trait]
//! impl Middleware for LoggingMiddleware {
//!     async fn handle(
//!         &self,
//!         ctx: &mut conduit::Context,
//!         next: Next<'_>,
//!     ) -> Result<()> {
//!         println!("request started {} {}", ctx.req.method, ctx.req.url);
//!         let result = next.run(ctx).await;
//!         println!("request finished: {:?}", ctx.res.as_ref().map(|r| r.status));
//!         result
//!     }
//! }
//!
//! async fn run() -> Result<()> {
//!     let client = Client::builder().with(LoggingMiddleware).build();
//!     let response = client
//!         .get("https://example.com".parse().unwrap())
//!         .retry(2)
//!         .as_response()
//!         .await?;
//!     println!("status: {}", response.status);
//!     Ok(())
//! }
//! ```

mod client;
mod context;
mod error;
mod middleware;
mod retry;
mod transport;

pub use client::{Client, ClientBuilder, RequestBuilder, Response};
pub use context::{
    set_path, Body, Context, Opts, RequestPart, ResponseBody, ResponsePart, RetryAttempt,
    RetryPolicy,
};
pub use error::{Error, Result};
pub use middleware::{run_once, Middleware, Next};
pub use retry::{is_retryable, DefaultRetryClassifier, Retryable, RetryClassifier};
pub use transport::{ReqwestTransport, Transport};

pub use reqwest;
