//! Post-phase plugin: logs one line per successful attempt, and a warn
//! line for every attempt that the retry engine is about to retry.

use std::sync::Arc;

use conduit::{is_retryable, Context, Middleware, Next, Result};

/// The sink a [`Logger`] writes lines to. Defaults to [`TracingLogger`],
/// which stands in for "the process's standard output info logger" of
/// `spec.md` §4.5 — whatever subscriber the embedding application installs
/// decides where these lines actually go.
pub trait LineLogger: Send + Sync {
    fn info(&self, line: &str);
    fn warn(&self, line: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl LineLogger for TracingLogger {
    fn info(&self, line: &str) {
        tracing::info!("{line}");
    }

    fn warn(&self, line: &str) {
        tracing::warn!("{line}");
    }
}

/// Logs `"<METHOD> <URL> <status> <elapsed> ms"` at info level on success
/// (omitting `<elapsed> ms` when `ctx.opts.time == Some(false)`), and
/// `"Attempt <k> <METHOD> <URL> <status> <elapsed> ms"` at warn level for
/// every attempt the retry engine is about to re-try.
///
/// `Logger` runs once per attempt, like any middleware; it has no direct
/// view of the retry engine's decision, so it re-derives "is this
/// retryable, and is there budget left" from the same rule the engine
/// itself uses ([`conduit::is_retryable`]) plus `ctx.retries`/
/// `ctx.retry_policy`, which at this point in the chain still describe the
/// attempt in progress (the engine only appends to `ctx.retries` after the
/// chain returns).
pub struct Logger {
    logger: Arc<dyn LineLogger>,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            logger: Arc::new(TracingLogger),
        }
    }
}

impl Logger {
    pub fn new(logger: impl LineLogger + 'static) -> Self {
        Self {
            logger: Arc::new(logger),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for Logger {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<()> {
        let method = ctx.req.method.clone();
        let url = ctx.req.url.clone();

        let result = next.run(ctx).await;

        match &result {
            Ok(()) => {
                if let Some(res) = &ctx.res {
                    let status = res.status.as_u16();
                    let line = match res.elapsed {
                        Some(elapsed) => {
                            format!("{method} {url} {status} {} ms", elapsed.as_millis())
                        }
                        None => format!("{method} {url} {status}"),
                    };
                    self.logger.info(&line);
                }
            }
            Err(err) => {
                let will_retry = is_retryable(err) && (ctx.retries.len() as u32) < ctx.retry_policy.max;
                if will_retry {
                    let attempt_number = ctx.retries.len() + 1;
                    let status = err
                        .status_code()
                        .map(|code| code.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let elapsed_part = ctx
                        .res
                        .as_ref()
                        .and_then(|res| res.elapsed)
                        .map(|elapsed| format!(" {} ms", elapsed.as_millis()))
                        .unwrap_or_default();
                    self.logger.warn(&format!(
                        "Attempt {attempt_number} {method} {url} {status}{elapsed_part}"
                    ));
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit::{Client, Error, ResponsePart, Transport};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingLogger {
        info: Mutex<Vec<String>>,
        warn: Mutex<Vec<String>>,
    }

    impl LineLogger for RecordingLogger {
        fn info(&self, line: &str) {
            self.info.lock().unwrap().push(line.to_string());
        }

        fn warn(&self, line: &str) {
            self.warn.lock().unwrap().push(line.to_string());
        }
    }

    struct FlakyTransport {
        fail_times: std::sync::atomic::AtomicUsize,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Transport for FlakyTransport {
        async fn execute(&self, ctx: &mut Context) -> Result<()> {
            use std::sync::atomic::Ordering;
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_times.load(Ordering::SeqCst) {
                return Err(Error::http_status(500, http::HeaderMap::new(), "boom"));
            }
            ctx.res = Some(ResponsePart {
                status: reqwest::StatusCode::OK,
                headers: http::HeaderMap::new(),
                body: conduit::ResponseBody::Bytes(bytes::Bytes::new()),
                elapsed: Some(std::time::Duration::from_millis(5)),
            });
            Ok(())
        }
    }

    #[tokio::test]
    async fn default_sink_routes_through_tracing() {
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::fmt().with_test_writer().finish(),
        );

        let client = Client::builder()
            .transport(FlakyTransport {
                fail_times: std::sync::atomic::AtomicUsize::new(0),
                calls: std::sync::atomic::AtomicUsize::new(0),
            })
            .with(Logger::default())
            .build();

        let response = client
            .get("http://example.com".parse().unwrap())
            .as_response()
            .await
            .unwrap();

        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn logs_info_line_on_success() {
        let logger = Arc::new(RecordingLogger::default());
        let client = Client::builder()
            .transport(FlakyTransport {
                fail_times: std::sync::atomic::AtomicUsize::new(0),
                calls: std::sync::atomic::AtomicUsize::new(0),
            })
            .with(LoggerWithSharedSink(logger.clone()))
            .build();

        client
            .get("http://example.com".parse().unwrap())
            .as_response()
            .await
            .unwrap();

        let info = logger.info.lock().unwrap();
        assert_eq!(info.len(), 1);
        assert!(info[0].contains("200"));
        assert!(info[0].ends_with("ms"));
    }

    #[tokio::test]
    async fn logs_warn_for_each_retry_triggering_attempt() {
        let logger = Arc::new(RecordingLogger::default());
        let client = Client::builder()
            .transport(FlakyTransport {
                fail_times: std::sync::atomic::AtomicUsize::new(2),
                calls: std::sync::atomic::AtomicUsize::new(0),
            })
            .with(LoggerWithSharedSink(logger.clone()))
            .build();

        client
            .get("http://example.com".parse().unwrap())
            .retry(2)
            .retry_delay(std::time::Duration::from_millis(0))
            .as_response()
            .await
            .unwrap();

        let warn = logger.warn.lock().unwrap();
        assert_eq!(warn.len(), 2);
        assert!(warn[0].starts_with("Attempt 1 "));
        assert!(warn[1].starts_with("Attempt 2 "));
    }

    // Wraps a shared `RecordingLogger` behind `Logger`'s `Arc<dyn LineLogger>`
    // without double-boxing; lets tests keep a handle to assert against.
    struct LoggerWithSharedSink(Arc<RecordingLogger>);

    #[async_trait::async_trait]
    impl Middleware for LoggerWithSharedSink {
        async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<()> {
            Logger {
                logger: self.0.clone(),
            }
            .handle(ctx, next)
            .await
        }
    }
}
