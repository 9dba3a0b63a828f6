use crate::config::Config;
use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::WebhookResponse;
use crate::normalizer::{normalize, payload_scorecard};
use crate::webhook_models::RawPayload;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Header carrying the shared secret.
pub const SECRET_HEADER: &str = "X-Webhook-Secret";

/// POST /webhook/scoreapp and POST /webhook/scoreapp/:scorecard_id
///
/// Receives one lead submission from the form tool, normalizes it and appends it to
/// the store. The scorecard comes from the path segment, else from the body
/// (`scorecardId` / `scorecard_id`), else `default`.
///
/// Authentication: `X-Webhook-Secret` header or body `secret` must match
/// `WEBHOOK_SECRET` when one is configured.
pub async fn scoreapp_webhook(
    State(state): State<Arc<AppState>>,
    scorecard: Option<Path<String>>,
    headers: HeaderMap,
    payload: RawPayload,
) -> Result<Json<WebhookResponse>, AppError> {
    validate_webhook_secret(&state.config, &headers, payload.secret())?;

    tracing::debug!("Webhook received: {}", payload.preview());

    let (body_scorecard_id, body_scorecard_name) = payload_scorecard(&payload.0);
    let scorecard_id = scorecard.map(|Path(id)| id).or(body_scorecard_id);

    let lead = normalize(
        &payload.0,
        scorecard_id.as_deref(),
        body_scorecard_name.as_deref(),
    );

    tracing::info!(
        "Lead stored: {} | scorecard: {} | UTM: {}/{}",
        lead.name,
        lead.scorecard_id,
        lead.utm_source,
        lead.utm_campaign
    );

    let response = WebhookResponse {
        success: true,
        id: lead.id.clone(),
        scorecard_id: lead.scorecard_id.clone(),
    };

    state.store.write().await.append(lead);

    Ok(Json(response))
}

/// Checks the shared secret from the `X-Webhook-Secret` header, falling back to
/// `body_secret`. Passes everything when no secret is configured.
pub fn validate_webhook_secret(
    config: &Config,
    headers: &HeaderMap,
    body_secret: Option<&str>,
) -> Result<(), AppError> {
    let Some(ref expected_secret) = config.webhook_secret else {
        return Ok(());
    };

    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(body_secret)
        .ok_or_else(|| AppError::Unauthorized("Missing webhook secret".to_string()))?;

    if !secrets_match(provided, expected_secret) {
        return Err(AppError::Unauthorized("Invalid webhook secret".to_string()));
    }

    Ok(())
}

/// Constant-time comparison over SHA-256 digests, so neither content nor length leaks.
fn secrets_match(a: &str, b: &str) -> bool {
    let a = Sha256::digest(a.as_bytes());
    let b = Sha256::digest(b.as_bytes());

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config_with_secret(secret: Option<&str>) -> Config {
        Config {
            webhook_secret: secret.map(str::to_string),
            ..Config::default()
        }
    }

    #[test]
    fn test_no_secret_configured_is_open() {
        let config = config_with_secret(None);
        assert!(validate_webhook_secret(&config, &HeaderMap::new(), None).is_ok());
    }

    #[test]
    fn test_secret_from_header_or_body() {
        let config = config_with_secret(Some("hunter2"));

        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, HeaderValue::from_static("hunter2"));
        assert!(validate_webhook_secret(&config, &headers, None).is_ok());

        assert!(validate_webhook_secret(&config, &HeaderMap::new(), Some("hunter2")).is_ok());
    }

    #[test]
    fn test_wrong_or_missing_secret_rejected() {
        let config = config_with_secret(Some("hunter2"));

        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, HeaderValue::from_static("hunter3"));
        assert!(matches!(
            validate_webhook_secret(&config, &headers, Some("hunter2")),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            validate_webhook_secret(&config, &HeaderMap::new(), None),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("abc", "abc"));
        assert!(!secrets_match("abc", "abcd"));
        assert!(!secrets_match("", "abc"));
    }
}
