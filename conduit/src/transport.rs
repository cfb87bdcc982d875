//! The transport adapter contract (`spec.md` §6) and the default
//! implementation backed by [`reqwest`].
//!
//! A transport reads `ctx.req.{method,url,headers,query,body,timeout}`,
//! performs one HTTP exchange, and on success populates
//! `ctx.res.{status,headers,body}` (and `ctx.res.elapsed` unless
//! `ctx.opts.time == Some(false)`). A socket timeout must be reported as
//! [`crate::Error::Timeout`]; any other transport failure as
//! [`crate::Error::Transport`].

use std::time::Instant;

use crate::context::{Body, Context, ResponseBody, ResponsePart};
use crate::error::{Error, Result};

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, ctx: &mut Context) -> Result<()>;
}

/// The library-provided transport: one HTTP exchange via a shared
/// [`reqwest::Client`]. Safe for concurrent use; retains no per-call state
/// outside the [`Context`] it is given.
#[derive(Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(inner: reqwest::Client) -> Self {
        Self { inner }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait::async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, ctx: &mut Context) -> Result<()> {
        let method = ctx.req.method.clone();
        let url = ctx.req.url.clone();

        let mut builder = self
            .inner
            .request(method.clone(), url.clone())
            .headers(ctx.req.headers.clone());

        if !ctx.req.query.is_empty() {
            builder = builder.query(&ctx.req.query);
        }
        if let Some(timeout) = ctx.req.timeout {
            builder = builder.timeout(timeout);
        }
        builder = match &ctx.req.body {
            Some(Body::Bytes(bytes)) => builder.body(bytes.clone()),
            Some(Body::Json(value)) => builder.json(value),
            None => builder,
        };

        tracing::trace!(%method, %url, "entering transport");
        let start = Instant::now();
        let send_result = builder.send().await;
        let elapsed = start.elapsed();

        let response = send_result.map_err(|err| {
            if err.is_timeout() {
                Error::Timeout {
                    method: method.clone(),
                    url: url.clone(),
                }
            } else {
                Error::Transport {
                    method: method.clone(),
                    url: url.clone(),
                    source: anyhow::Error::from(err),
                }
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(|err| Error::Transport {
            method: method.clone(),
            url: url.clone(),
            source: anyhow::Error::from(err),
        })?;

        ctx.res = Some(ResponsePart {
            status,
            headers,
            body: ResponseBody::Bytes(bytes),
            elapsed: ctx.opts.capture_elapsed().then_some(elapsed),
        });

        Ok(())
    }
}
