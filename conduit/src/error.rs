use http::HeaderMap;
use reqwest::{Method, Url};
use thiserror::Error;

/// The error kinds from `spec.md` §7, one variant each.
#[derive(Debug, Error)]
pub enum Error {
    /// A non-callable middleware was registered. In this crate `use_middleware`
    /// is generic over `M: Middleware + 'static`, so the compiler rejects a
    /// non-middleware value before this variant could ever be constructed on
    /// that path; it is kept for completeness (dynamic plugin registration,
    /// parity with the source) and constructed explicitly where needed.
    #[error("Plugin is not a function")]
    InvalidPlugin,

    /// A transport-layer socket timeout. Retryable.
    #[error("Request failed for {method} {url}: ESOCKETTIMEDOUT")]
    Timeout { method: Method, url: Url },

    /// Any other transport-level failure. Not retried (no status code).
    #[error("Request failed for {method} {url}: {source}")]
    Transport {
        method: Method,
        url: Url,
        #[source]
        source: anyhow::Error,
    },

    /// Synthesized by user middleware (e.g. a `toError`-style response-to-error
    /// adapter) from a 4xx/5xx response. Retryable only when `status_code >= 500`.
    #[error("{message}")]
    HttpStatus {
        status_code: u16,
        headers: HeaderMap,
        message: String,
    },

    /// A plugin post-phase decode failure (e.g. malformed JSON). Not retried.
    #[error("failed to decode response body")]
    Decode(#[source] anyhow::Error),

    /// Catch-all for middleware-raised errors that don't fit one of the
    /// kinds above.
    #[error(transparent)]
    Middleware(#[from] anyhow::Error),
}

impl Error {
    /// The status code carried by an [`Error::HttpStatus`], if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    pub fn http_status(status_code: u16, headers: HeaderMap, message: impl Into<String>) -> Self {
        Error::HttpStatus {
            status_code,
            headers,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
