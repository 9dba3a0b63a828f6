use crate::config::Config;
use crate::errors::AppError;
use crate::import::ImportOptions;
use crate::models::*;
use crate::normalizer::normalize;
use crate::stats::{compute_stats, filter_by_scorecard, scorecard_summaries, Period};
use crate::store::LeadStore;
use crate::webhook_handler::validate_webhook_secret;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, Uri},
    Json,
};
use rand::seq::SliceRandom;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Shared application state injected into handlers.
pub struct AppState {
    /// The lead collection; written by the webhook, import, delete and test-lead routes.
    pub store: RwLock<LeadStore>,
    /// Application configuration.
    pub config: Config,
    /// Process start, reported as uptime by the status route.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(store: LeadStore, config: Config) -> Self {
        Self {
            store: RwLock::new(store),
            config,
            started_at: Instant::now(),
        }
    }
}

const TEST_SOURCES: &[&str] = &["linkedin", "meta", "google", "email"];
const TEST_CAMPAIGNS: &[&str] = &[
    "lead-gen-q1",
    "retargeting-feb",
    "brand-awareness",
    "webinar-2026",
];
const TEST_MEDIUMS: &[&str] = &["cpc", "social", "email", "organic"];

/// GET /
///
/// Service status with lead count, scorecard groups and uptime.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.store.read().await;

    Json(json!({
        "status": "online",
        "service": "ScoreApp Webhook Server",
        "leads": store.len(),
        "scorecards": scorecard_summaries(store.leads()),
        "lastUpdated": store.last_updated().as_ref().map(format_timestamp),
        "uptime": format!("{}s", state.started_at.elapsed().as_secs()),
    }))
}

/// GET /api/stats?period=&scorecardId=
///
/// Aggregated metrics for one period (`dag`, `uge`, `maaned`, anything else = all time),
/// optionally restricted to one scorecard.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `params` - Period (default `maaned`) and optional scorecard filter.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsQueryParams>,
) -> Json<Value> {
    let period = params
        .period
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "maaned".to_string());
    let scorecard_id = params.scorecard_id.filter(|s| !s.is_empty());
    let store = state.store.read().await;

    let scoped: Vec<&Lead> = filter_by_scorecard(store.leads(), scorecard_id.as_deref()).collect();
    let stats = compute_stats(
        scoped.iter().copied(),
        Period::from_query(&period).window_days(),
        state.config.recent_leads_limit,
    );

    Json(json!({
        "ok": true,
        "period": period,
        "scorecardId": scorecard_id,
        "lastUpdated": store.last_updated().as_ref().map(format_timestamp),
        "totalLeads": store.len(),
        "filteredLeads": scoped.len(),
        "scorecards": scorecard_summaries(store.leads()),
        "stats": stats,
    }))
}

/// GET /api/leads?limit=&offset=&scorecardId=
///
/// Raw leads, newest first. `total` counts the leads matching the scorecard filter.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadsQueryParams>,
) -> Json<Value> {
    let limit = params
        .limit
        .as_deref()
        .and_then(|l| l.trim().parse::<usize>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(state.config.leads_page_size);
    let offset = params
        .offset
        .as_deref()
        .and_then(|o| o.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let store = state.store.read().await;
    let scoped: Vec<&Lead> =
        filter_by_scorecard(store.leads(), params.scorecard_id.as_deref().filter(|s| !s.is_empty()))
            .collect();
    let page: Vec<&Lead> = scoped.iter().rev().skip(offset).take(limit).copied().collect();

    Json(json!({
        "ok": true,
        "total": scoped.len(),
        "leads": page,
    }))
}

/// GET /api/scorecards
pub async fn list_scorecards(State(state): State<Arc<AppState>>) -> Json<Value> {
    let store = state.store.read().await;
    Json(json!({
        "ok": true,
        "scorecards": scorecard_summaries(store.leads()),
    }))
}

/// DELETE /api/leads?scorecardId=
///
/// Purges every lead, or only one scorecard's. Requires the `X-Webhook-Secret` header
/// when a secret is configured.
pub async fn delete_leads(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ScorecardQueryParams>,
) -> Result<Json<Value>, AppError> {
    validate_webhook_secret(&state.config, &headers, None)?;

    let scorecard_id = params.scorecard_id.filter(|s| !s.is_empty());
    let mut store = state.store.write().await;
    let removed = store.purge(scorecard_id.as_deref());

    tracing::info!(
        "Deleted {} lead(s) from {}",
        removed,
        scorecard_id.as_deref().unwrap_or("all scorecards")
    );

    Ok(Json(json!({
        "ok": true,
        "removed": removed,
        "remaining": store.len(),
    })))
}

/// POST /api/import
///
/// Bulk import of historical leads.
///
/// Body: `{"leads": [...], "scorecardId"?, "scorecardName"?, "overwrite"?, "secret"?}`.
/// Leads already present (same email or id on the same day) are skipped.
///
/// # Returns
///
/// * `{ok, imported, skipped, total}` or 400 when `leads` is not an array.
pub async fn import_leads(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    validate_webhook_secret(
        &state.config,
        &headers,
        body.get("secret").and_then(Value::as_str),
    )?;

    let raws = body
        .get("leads")
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::BadRequest("leads must be an array".to_string()))?;

    let options = ImportOptions {
        scorecard_id: body
            .get("scorecardId")
            .and_then(Value::as_str)
            .map(str::to_string),
        scorecard_name: body
            .get("scorecardName")
            .and_then(Value::as_str)
            .map(str::to_string),
        overwrite: body.get("overwrite").and_then(Value::as_bool).unwrap_or(false),
    };

    let summary = state.store.write().await.import(raws, &options);

    tracing::info!(
        "Import into '{}': {} imported, {} skipped, {} total",
        options.target_scorecard(),
        summary.imported,
        summary.skipped,
        summary.total
    );

    Ok(Json(json!({
        "ok": true,
        "imported": summary.imported,
        "skipped": summary.skipped,
        "total": summary.total,
    })))
}

/// POST /api/test-lead?scorecardId=
///
/// Adds one synthetic lead with random attribution, for checking the dashboard wiring.
pub async fn create_test_lead(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ScorecardQueryParams>,
) -> Json<Value> {
    let (source, campaign, medium) = {
        let mut rng = rand::thread_rng();
        (
            TEST_SOURCES.choose(&mut rng).copied().unwrap_or("google"),
            TEST_CAMPAIGNS.choose(&mut rng).copied().unwrap_or("lead-gen-q1"),
            TEST_MEDIUMS.choose(&mut rng).copied().unwrap_or("cpc"),
        )
    };

    let now = chrono::Utc::now();
    let payload = json!({
        "id": format!("test-{}", now.timestamp_millis()),
        "name": "Test Person",
        "email": "test@example.com",
        "company": "Test Company A/S",
        "utm_source": source,
        "utm_medium": medium,
        "utm_campaign": campaign,
        "utm_content": "ad-variant-a",
    });

    let mut lead = normalize(&payload, params.scorecard_id.as_deref(), None);
    lead.raw = json!({});

    state.store.write().await.append(lead.clone());
    tracing::info!("Test lead added: {} ({}/{})", lead.id, source, campaign);

    Json(json!({
        "ok": true,
        "message": "Test lead added",
        "lead": lead,
    }))
}

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
