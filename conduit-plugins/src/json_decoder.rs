//! Post-phase plugin: if the response carries a JSON content-type, parse
//! its body into a [`serde_json::Value`] and replace it in place.

use conduit::{Context, Error, Middleware, Next, Result, ResponseBody};
use http::HeaderMap;

/// Decodes a JSON response body. Malformed JSON surfaces as
/// [`conduit::Error::Decode`]; a non-JSON content-type is left untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonDecoder;

#[async_trait::async_trait]
impl Middleware for JsonDecoder {
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<()> {
        next.run(ctx).await?;

        let Some(res) = ctx.res.as_mut() else {
            return Ok(());
        };
        if !is_json_content_type(&res.headers) {
            return Ok(());
        }
        let ResponseBody::Bytes(bytes) = &res.body else {
            return Ok(());
        };
        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| Error::Decode(e.into()))?;
        res.body = ResponseBody::Json(value);
        Ok(())
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.contains("application/json"))
        .unwrap_or(false)
}
