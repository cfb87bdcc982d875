//! End-to-end scenarios mirroring the ones in `spec.md` §8 (S1-S6).
//!
//! `ToError` below is the illustrative "convert a 4xx/5xx response into an
//! error" middleware `spec.md` §4.2 refers to by example; it's explicitly
//! out of this library's three shipped reference plugins, so it lives only
//! in these tests, the way the spec itself only ever shows it as a sketch.

use std::time::{Duration, Instant};

use conduit::{Client, Context, Error, Middleware, Next, Result};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct ToError;

#[async_trait::async_trait]
impl Middleware for ToError {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<()> {
        next.run(ctx).await?;
        let res = ctx.res.as_ref().expect("transport populated a response");
        if res.status.is_client_error() || res.status.is_server_error() {
            let reason = format!("something bad happend. ({})", res.status);
            return Err(Error::http_status(
                res.status.as_u16(),
                res.headers.clone(),
                reason,
            ));
        }
        Ok(())
    }
}

fn url(server: &MockServer, path: &str) -> reqwest::Url {
    format!("{}{}", server.uri(), path).parse().unwrap()
}

#[tokio::test]
async fn s1_simple_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Illegitimi non carborundum"))
        .mount(&server)
        .await;

    let client = Client::builder().build();
    let response = client.get(url(&server, "/")).as_response().await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(
        response.body.as_bytes().unwrap().as_ref(),
        b"Illegitimi non carborundum"
    );
    assert_eq!(response.retries.len(), 0);
}

#[tokio::test]
async fn s2_default_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = Client::builder().build();
    let expected = format!("conduit/{}", env!("CARGO_PKG_VERSION"));

    for _ in 0..2 {
        let response = client.get(url(&server, "/")).as_response().await.unwrap();
        assert_eq!(response.status, 200);
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for request in requests {
        assert_eq!(
            request.headers.get("user-agent").unwrap().to_str().unwrap(),
            expected
        );
    }
}

#[tokio::test]
async fn s3_retry_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = Client::builder().with(ToError).build();
    let response = client
        .get(url(&server, "/flaky"))
        .retry(2)
        .as_response()
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.retries.len(), 2);
    assert_eq!(response.retries[0].status_code, Some(500));
    assert!(response.retries[0].reason.contains("something bad"));
}

#[tokio::test]
async fn s4_retry_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = Client::builder().with(ToError).build();
    let start = Instant::now();
    let err = client
        .get(url(&server, "/broken"))
        .retry(0)
        .retry_delay(Duration::from_millis(10_000))
        .as_response()
        .await
        .unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.to_string().contains("something bad happend."));
    assert!(elapsed < Duration::from_millis(10_000));
}

#[tokio::test]
async fn s5_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1000)))
        .mount(&server)
        .await;

    let client = Client::builder().build();
    let target = url(&server, "/");
    let err = client
        .get(target.clone())
        .timeout(Duration::from_millis(20))
        .as_response()
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        format!("Request failed for GET {target}: ESOCKETTIMEDOUT")
    );
}

struct PrefixGlobal;

#[async_trait::async_trait]
impl Middleware for PrefixGlobal {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<()> {
        next.run(ctx).await?;
        if let Some(res) = ctx.res.as_mut() {
            let body = format!("global {}", String::from_utf8_lossy(res.body.as_bytes().unwrap()));
            res.body = conduit::ResponseBody::Bytes(bytes::Bytes::from(body));
        }
        Ok(())
    }
}

struct ReplacePerRequest;

#[async_trait::async_trait]
impl Middleware for ReplacePerRequest {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<()> {
        next.run(ctx).await?;
        if let Some(res) = ctx.res.as_mut() {
            res.body = conduit::ResponseBody::Bytes(bytes::Bytes::from_static(b"request"));
        }
        Ok(())
    }
}

#[tokio::test]
async fn s6_global_and_per_request_ordering() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x"))
        .mount(&server)
        .await;

    let client = Client::builder().with(PrefixGlobal).build();
    let response = client
        .get(url(&server, "/"))
        .use_middleware(ReplacePerRequest)
        .as_response()
        .await
        .unwrap();

    assert_eq!(response.body.as_bytes().unwrap().as_ref(), b"global request");
}

#[tokio::test]
async fn retry_budget_elapsed_floor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = Client::builder().with(ToError).build();
    let start = Instant::now();
    let _ = client
        .get(url(&server, "/"))
        .retry(3)
        .retry_delay(Duration::from_millis(20))
        .as_response()
        .await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(3 * 20));
}

#[tokio::test]
async fn a_4xx_failure_is_never_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = Client::builder().with(ToError).build();
    let response = client
        .get(url(&server, "/"))
        .retry(5)
        .as_response()
        .await;

    let err = response.unwrap_err();
    assert_eq!(err.status_code(), Some(404));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn empty_headers_call_is_a_noop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = Client::builder().build();
    let expected_ua = format!("conduit/{}", env!("CARGO_PKG_VERSION"));
    let response = client
        .get(url(&server, "/"))
        .headers(http::HeaderMap::new())
        .as_response()
        .await
        .unwrap();
    assert_eq!(response.status, 200);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].headers.get("user-agent").unwrap().to_str().unwrap(),
        expected_ua
    );
}

#[tokio::test]
async fn later_header_assignment_wins_case_insensitively() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let mut first = http::HeaderMap::new();
    first.insert("X-Trace", "a".parse().unwrap());
    let mut second = http::HeaderMap::new();
    second.insert("x-trace", "b".parse().unwrap());

    let client = Client::builder().build();
    client
        .get(url(&server, "/"))
        .headers(first)
        .headers(second)
        .as_response()
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].headers.get("x-trace").unwrap().to_str().unwrap(),
        "b"
    );
}
