//! The [`Context`] is the single value threaded through a pipeline run: it
//! carries the outgoing request, the incoming response (once the transport
//! has been entered), the record of prior retry attempts, the resolved
//! retry policy and an open bag of plugin-scoped options.

use std::time::Duration;

use http::HeaderMap;
use reqwest::{Method, StatusCode, Url};

/// Opaque request body. A plugin (or the caller) may hand over raw bytes or
/// a structured value to be serialized by the transport.
#[derive(Debug, Clone)]
pub enum Body {
    Bytes(bytes::Bytes),
    Json(serde_json::Value),
}

impl From<bytes::Bytes> for Body {
    fn from(bytes: bytes::Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Bytes(bytes::Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(bytes::Bytes::from(s.into_bytes()))
    }
}

/// The outgoing half of a [`Context`].
#[derive(Debug, Clone)]
pub struct RequestPart {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Ordered; a name may repeat if the caller appended it more than once.
    pub query: Vec<(String, String)>,
    pub body: Option<Body>,
    /// Per-request socket-timeout override, read by the transport adapter.
    pub timeout: Option<Duration>,
}

impl RequestPart {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }
}

/// A response body, possibly transformed in place by a post-phase plugin
/// (e.g. the JSON decoder turning raw bytes into a parsed [`serde_json::Value`]).
#[derive(Debug, Clone)]
pub enum ResponseBody {
    Bytes(bytes::Bytes),
    Json(serde_json::Value),
}

impl ResponseBody {
    pub fn as_bytes(&self) -> Option<&bytes::Bytes> {
        match self {
            ResponseBody::Bytes(b) => Some(b),
            ResponseBody::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            ResponseBody::Bytes(_) => None,
        }
    }
}

/// The incoming half of a [`Context`]. Undefined (`Context::res` is `None`)
/// until the transport adapter has been entered at least once.
#[derive(Debug, Clone)]
pub struct ResponsePart {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
    /// Milliseconds spent inside the transport call. `None` when
    /// `opts.time == Some(false)`.
    pub elapsed: Option<Duration>,
}

/// One prior failed attempt, recorded by the retry engine before it sleeps
/// and re-invokes the pipeline.
#[derive(Debug, Clone, Default)]
pub struct RetryAttempt {
    pub status_code: Option<u16>,
    pub reason: String,
}

/// `{max, delayMs}` resolved from per-request, then client, then library
/// defaults (`max = 0`, `delay_ms = 100`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max: u32,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max: 0,
            delay_ms: 100,
        }
    }
}

/// Open mapping of plugin-scoped options. `time` is the one option the core
/// crate itself reads (elapsed-time capture); everything else is free-form
/// and only meaningful to the plugins that read it.
#[derive(Debug, Clone, Default)]
pub struct Opts {
    pub time: Option<bool>,
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Opts {
    /// Whether the transport adapter should record `ResponsePart::elapsed`.
    /// Defaults to `true`.
    pub fn capture_elapsed(&self) -> bool {
        self.time.unwrap_or(true)
    }
}

/// The value threaded through one call (which may span multiple retry
/// attempts). Created at request-builder finalization, mutated by
/// middleware and the transport, and discarded once the call settles.
/// Contexts are never shared across top-level calls.
#[derive(Debug, Clone)]
pub struct Context {
    pub req: RequestPart,
    pub res: Option<ResponsePart>,
    pub retries: Vec<RetryAttempt>,
    pub retry_policy: RetryPolicy,
    pub opts: Opts,
}

impl Context {
    pub fn new(req: RequestPart, retry_policy: RetryPolicy, opts: Opts) -> Self {
        Self {
            req,
            res: None,
            retries: Vec::new(),
            retry_policy,
            opts,
        }
    }
}

/// Assigns `value` at a dotted path within the context, creating
/// intermediate mappings under `opts` as needed.
///
/// Because [`Context`] is a statically-typed struct rather than an open
/// object, only the paths that have a meaningful typed target are
/// supported: `"opts"` (merges a JSON object into `ctx.opts`, recognising
/// the `time` key specially and stashing the rest in `ctx.opts.extra`),
/// `"opts.<key>"` (sets one key, again special-casing `time`), and
/// `"req._timeout"` (sets `ctx.req.timeout` from a millisecond count).
/// Any other path is a plugin-author error, not a silent no-op.
pub fn set_path(ctx: &mut Context, path: &str, value: serde_json::Value) -> crate::Result<()> {
    let segments: Vec<&str> = path.split('.').collect();
    match segments.as_slice() {
        ["opts"] => {
            let serde_json::Value::Object(map) = value else {
                return Err(crate::Error::Middleware(anyhow::anyhow!(
                    "context path \"opts\" expects an object value"
                )));
            };
            for (key, val) in map {
                set_opt(ctx, &key, val);
            }
            Ok(())
        }
        ["opts", rest @ ..] => {
            set_opt(ctx, &rest.join("."), value);
            Ok(())
        }
        ["req", "_timeout"] => {
            let ms = value.as_u64().ok_or_else(|| {
                crate::Error::Middleware(anyhow::anyhow!(
                    "context path \"req._timeout\" expects a millisecond count"
                ))
            })?;
            ctx.req.timeout = Some(Duration::from_millis(ms));
            Ok(())
        }
        _ => Err(crate::Error::Middleware(anyhow::anyhow!(
            "unsupported context path: {path}"
        ))),
    }
}

fn set_opt(ctx: &mut Context, key: &str, value: serde_json::Value) {
    if key == "time" {
        ctx.opts.time = value.as_bool();
    } else {
        ctx.opts.extra.insert(key.to_string(), value);
    }
}
