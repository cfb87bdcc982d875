//! The fluent [`RequestBuilder`], and the [`Client`]/[`ClientBuilder`] pair
//! that hold client-wide defaults (`spec.md` §4.3–§4.4).

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderValue};
use reqwest::{Method, Url};

use crate::context::{Body, Context, Opts, RequestPart, ResponseBody, RetryPolicy};
use crate::error::{Error, Result};
use crate::middleware::Middleware;
use crate::retry::{execute_with_retry, DefaultRetryClassifier, RetryClassifier};
use crate::transport::{ReqwestTransport, Transport};

const LIBRARY_NAME: &str = env!("CARGO_PKG_NAME");
const LIBRARY_VERSION: &str = env!("CARGO_PKG_VERSION");

fn default_user_agent() -> String {
    format!("{LIBRARY_NAME}/{LIBRARY_VERSION}")
}

/// Accumulates client-wide defaults and produces a [`Client`].
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    user_agent: String,
    middlewares: Vec<Arc<dyn Middleware>>,
    retry_policy: RetryPolicy,
    retry_classifier: Arc<dyn RetryClassifier>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            transport: Arc::new(ReqwestTransport::default()),
            user_agent: default_user_agent(),
            middlewares: Vec::new(),
            retry_policy: RetryPolicy::default(),
            retry_classifier: Arc::new(DefaultRetryClassifier),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the transport adapter (default: a library-provided one
    /// backed by [`reqwest`]).
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Overrides the default `User-Agent` (default: `"<crate>/<version>"`).
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Appends global middleware, run before any per-request middleware.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Sets the client-wide retry budget (re-attempts beyond the first).
    pub fn retries(mut self, max: u32) -> Self {
        self.retry_policy.max = max;
        self
    }

    /// Sets the client-wide fixed inter-attempt delay.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_policy.delay_ms = delay.as_millis() as u64;
        self
    }

    /// Overrides how attempt outcomes are classified as transient/terminal
    /// (default: [`DefaultRetryClassifier`]).
    pub fn retry_classifier(mut self, classifier: impl RetryClassifier + 'static) -> Self {
        self.retry_classifier = Arc::new(classifier);
        self
    }

    pub fn build(self) -> Client {
        Client {
            inner: Arc::new(ClientInner {
                transport: self.transport,
                user_agent: self.user_agent,
                middlewares: self.middlewares,
                retry_policy: self.retry_policy,
                retry_classifier: self.retry_classifier,
            }),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        ClientBuilder::default().build()
    }
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    user_agent: String,
    middlewares: Vec<Arc<dyn Middleware>>,
    retry_policy: RetryPolicy,
    retry_classifier: Arc<dyn RetryClassifier>,
}

/// Holds client-wide defaults (user-agent, global middleware, retry
/// defaults, transport) and produces [`RequestBuilder`]s pre-seeded with
/// them. Cheap to clone; clones share the same configuration.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        RequestBuilder::new(self.clone(), Some(method), Some(url))
    }

    pub fn get(&self, url: Url) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: Url) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: Url) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    pub fn patch(&self, url: Url) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    pub fn delete(&self, url: Url) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    pub fn head(&self, url: Url) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// A request builder with no verb set yet, enabling
    /// `client.use_middleware(mw).get(url)...`.
    pub fn use_middleware(&self, middleware: impl Middleware + 'static) -> RequestBuilder {
        RequestBuilder::new(self.clone(), None, None).use_middleware(middleware)
    }
}

/// The finalized response view returned by [`RequestBuilder::as_response`].
#[derive(Debug, Clone)]
pub struct Response {
    pub status: reqwest::StatusCode,
    pub headers: HeaderMap,
    pub body: ResponseBody,
    pub elapsed: Option<Duration>,
    pub retries: Vec<crate::context::RetryAttempt>,
}

impl Response {
    fn from_context(ctx: Context) -> Result<Self> {
        let res = ctx.res.ok_or_else(|| {
            Error::Middleware(anyhow::anyhow!(
                "pipeline succeeded without the transport populating a response"
            ))
        })?;
        Ok(Self {
            status: res.status,
            headers: res.headers,
            body: res.body,
            elapsed: res.elapsed,
            retries: ctx.retries,
        })
    }
}

/// Fluent, chainable per-request configuration. Each setter consumes and
/// returns `self`; `as_response`/`as_body` consume `self` to run the
/// pipeline and retry engine, which also means — by construction, since
/// ownership has moved — that a finalized builder cannot be mutated
/// further (`spec.md` §9's "forbid post-terminal mutation" resolved by the
/// type system rather than a runtime flag).
pub struct RequestBuilder {
    client: Client,
    method: Option<Method>,
    url: Option<Url>,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Body>,
    timeout: Option<Duration>,
    retry_policy: RetryPolicy,
    middlewares: Vec<Arc<dyn Middleware>>,
    opts: Opts,
}

impl RequestBuilder {
    pub(crate) fn new(client: Client, method: Option<Method>, url: Option<Url>) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&client.inner.user_agent) {
            headers.insert(http::header::USER_AGENT, value);
        }
        let retry_policy = client.inner.retry_policy;
        Self {
            client,
            method,
            url,
            headers,
            query: Vec::new(),
            body: None,
            timeout: None,
            retry_policy,
            middlewares: Vec::new(),
            opts: Opts::default(),
        }
    }

    fn method(mut self, method: Method, url: Url) -> Self {
        self.method = Some(method);
        self.url = Some(url);
        self
    }

    pub fn get(self, url: Url) -> Self {
        self.method(Method::GET, url)
    }

    pub fn post(self, url: Url) -> Self {
        self.method(Method::POST, url)
    }

    pub fn put(self, url: Url) -> Self {
        self.method(Method::PUT, url)
    }

    pub fn patch(self, url: Url) -> Self {
        self.method(Method::PATCH, url)
    }

    pub fn delete(self, url: Url) -> Self {
        self.method(Method::DELETE, url)
    }

    pub fn head(self, url: Url) -> Self {
        self.method(Method::HEAD, url)
    }

    /// Merges `headers` into the request's headers (case-insensitive; the
    /// last assignment for a name wins). An empty map is a no-op.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn header(mut self, name: http::header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends one query parameter. Call repeatedly for a name that should
    /// carry multiple values.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Appends every pair in `params`. An empty iterator is a no-op.
    pub fn query_pairs(mut self, params: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(params);
        self
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json(mut self, value: impl serde::Serialize) -> Result<Self> {
        let value = serde_json::to_value(value).map_err(|e| Error::Middleware(e.into()))?;
        self.body = Some(Body::Json(value));
        Ok(self)
    }

    /// Per-request socket-timeout override, read by the transport adapter.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the attempt budget for this request only.
    pub fn retry(mut self, max: u32) -> Self {
        self.retry_policy.max = max;
        self
    }

    /// Overrides the inter-attempt delay for this request only.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_policy.delay_ms = delay.as_millis() as u64;
        self
    }

    /// Appends per-request middleware, run after global middleware.
    pub fn use_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Sets `ctx.opts.time` (elapsed-time capture), default `true`.
    pub fn capture_elapsed(mut self, capture: bool) -> Self {
        self.opts.time = Some(capture);
        self
    }

    fn into_context(self) -> Result<(Context, Client, Vec<Arc<dyn Middleware>>)> {
        let method = self.method.ok_or_else(|| {
            Error::Middleware(anyhow::anyhow!(
                "no HTTP method set; call get/post/put/patch/delete/head before sending"
            ))
        })?;
        let url = self.url.ok_or_else(|| {
            Error::Middleware(anyhow::anyhow!(
                "no URL set; call get/post/put/patch/delete/head before sending"
            ))
        })?;

        let mut req = RequestPart::new(method, url);
        req.headers = self.headers;
        req.query = self.query;
        req.body = self.body;
        req.timeout = self.timeout;

        let ctx = Context::new(req, self.retry_policy, self.opts);

        let mut chain = self.client.inner.middlewares.clone();
        chain.extend(self.middlewares);

        Ok((ctx, self.client, chain))
    }

    /// Finalizes the builder: runs the middleware pipeline and retry
    /// engine, returning the full response view.
    pub async fn as_response(self) -> Result<Response> {
        let (mut ctx, client, chain) = self.into_context()?;
        execute_with_retry(
            &mut ctx,
            &chain,
            client.inner.transport.as_ref(),
            client.inner.retry_classifier.as_ref(),
        )
        .await?;
        Response::from_context(ctx)
    }

    /// Finalizes the builder, returning only the response body.
    pub async fn as_body(self) -> Result<ResponseBody> {
        self.as_response().await.map(|response| response.body)
    }

    /// Alias for [`RequestBuilder::as_response`]; lets a verb call double
    /// as the terminal call (`client.delete(url).send().await`).
    pub async fn send(self) -> Result<Response> {
        self.as_response().await
    }
}
