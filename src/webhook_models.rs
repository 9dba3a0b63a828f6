use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
    Form,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Webhook body as sent by the form tool, JSON or form-urlencoded.
///
/// Never rejects on shape: an unparseable or empty body becomes an empty object so
/// the normalizer can fall back to defaults. Only transport failures (e.g. body
/// over the size limit) are surfaced.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload(pub Value);

impl RawPayload {
    /// Shared secret passed in the body instead of the header.
    pub fn secret(&self) -> Option<&str> {
        self.0.get("secret").and_then(Value::as_str)
    }

    /// First 300 characters of the payload, for logging.
    pub fn preview(&self) -> String {
        self.0.to_string().chars().take(300).collect()
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::empty();
        }
        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self(value),
            Err(e) => {
                tracing::warn!("Webhook body is not valid JSON, treating as empty: {}", e);
                Self::empty()
            }
        }
    }

    pub fn from_form_fields(fields: HashMap<String, String>) -> Self {
        Self(Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect(),
        ))
    }

    fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }
}

#[async_trait]
impl<S> FromRequest<S> for RawPayload
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            return match Form::<HashMap<String, String>>::from_request(req, state).await {
                Ok(Form(fields)) => Ok(Self::from_form_fields(fields)),
                Err(rejection) => {
                    tracing::warn!("Unreadable form body, treating as empty: {}", rejection);
                    Ok(Self::empty())
                }
            };
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        Ok(Self::from_json_bytes(&bytes))
    }
}
