//! Maps raw form-tool payloads onto the canonical [`Lead`].
//!
//! Every canonical field is resolved from an ordered list of input keys; the first
//! key holding a non-falsy value wins. Nothing here fails: a field that cannot be
//! resolved falls back to its default.

use chrono::{DateTime, Utc};
use rand::{distributions::Alphanumeric, Rng};
use serde_json::Value;

use crate::models::{
    parse_timestamp, Lead, ScoreCategory, DEFAULT_SCORECARD_ID, DEFAULT_SCORECARD_NAME,
};

// Alias tables, highest priority first.
pub const ID_KEYS: &[&str] = &["id", "submission_id"];
pub const NAME_KEYS: &[&str] = &["name", "full_name"];
pub const EMAIL_KEYS: &[&str] = &["email", "contact_email"];
pub const PHONE_KEYS: &[&str] = &["phone", "contact_phone"];
pub const COMPANY_KEYS: &[&str] = &["company", "company_name", "organisation"];
pub const UTM_SOURCE_KEYS: &[&str] = &["utm_source", "utmSource", "source"];
pub const UTM_MEDIUM_KEYS: &[&str] = &["utm_medium", "utmMedium", "medium"];
pub const UTM_CAMPAIGN_KEYS: &[&str] = &["utm_campaign", "utmCampaign", "campaign"];
pub const UTM_CONTENT_KEYS: &[&str] = &["utm_content", "utmContent", "content"];
pub const UTM_TERM_KEYS: &[&str] = &["utm_term", "utmTerm", "term"];
pub const SOURCE_KEYS: &[&str] = &["utm_source", "source"];
pub const SCORE_KEYS: &[&str] = &["score", "total_score"];
pub const SCORE_LABEL_KEYS: &[&str] = &["score_label", "result_label"];
pub const MEETING_KEYS: &[&str] = &["meeting_booked", "meetingBooked"];
pub const SCORECARD_ID_KEYS: &[&str] = &["scorecardId", "scorecard_id"];
pub const SCORECARD_NAME_KEYS: &[&str] = &["scorecardName", "scorecard_name"];
/// Event time of historical leads, consulted on import only.
pub const RECEIVED_AT_KEYS: &[&str] = &[
    "receivedAt",
    "received_at",
    "createdAt",
    "created_at",
    "submitted_at",
    "date",
];

/// Name used when the payload has no usable name fields.
pub const UNKNOWN_NAME: &str = "Unknown";
/// `source` when neither `utm_source` nor `source` is present.
pub const DEFAULT_SOURCE: &str = "ScoreApp";

/// Normalizes a live webhook payload received now.
pub fn normalize(raw: &Value, scorecard_id: Option<&str>, scorecard_name: Option<&str>) -> Lead {
    normalize_at(raw, scorecard_id, scorecard_name, Utc::now())
}

/// Normalizes `raw` as if it arrived at `received_at`.
pub fn normalize_at(
    raw: &Value,
    scorecard_id: Option<&str>,
    scorecard_name: Option<&str>,
    received_at: DateTime<Utc>,
) -> Lead {
    let score = resolve_score(raw);

    Lead {
        id: resolve_str(raw, ID_KEYS).unwrap_or_else(|| synthesize_id(&received_at)),
        received_at,
        scorecard_id: non_blank(scorecard_id).unwrap_or(DEFAULT_SCORECARD_ID).to_string(),
        scorecard_name: non_blank(scorecard_name)
            .unwrap_or(DEFAULT_SCORECARD_NAME)
            .to_string(),

        name: resolve_name(raw),
        email: resolve_or_empty(raw, EMAIL_KEYS),
        phone: resolve_or_empty(raw, PHONE_KEYS),
        company: resolve_or_empty(raw, COMPANY_KEYS),

        utm_source: resolve_or_empty(raw, UTM_SOURCE_KEYS),
        utm_medium: resolve_or_empty(raw, UTM_MEDIUM_KEYS),
        utm_campaign: resolve_or_empty(raw, UTM_CAMPAIGN_KEYS),
        utm_content: resolve_or_empty(raw, UTM_CONTENT_KEYS),
        utm_term: resolve_or_empty(raw, UTM_TERM_KEYS),
        source: resolve_str(raw, SOURCE_KEYS).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),

        score,
        score_label: resolve_or_empty(raw, SCORE_LABEL_KEYS),
        score_category: score
            .map(|s| ScoreCategory::from_score(s).label().to_string())
            .unwrap_or_default(),

        meeting_booked: resolve_meeting_booked(raw),
        imported: false,
        raw: raw.clone(),
    }
}

/// Normalizes a historical lead for bulk import.
///
/// The lead keeps its own event time when the payload carries a parseable one,
/// otherwise `now` is used.
pub fn normalize_imported(
    raw: &Value,
    scorecard_id: Option<&str>,
    scorecard_name: Option<&str>,
    now: DateTime<Utc>,
) -> Lead {
    let received_at = resolve_received_at(raw).unwrap_or(now);
    let mut lead = normalize_at(raw, scorecard_id, scorecard_name, received_at);
    lead.imported = true;
    lead
}

/// Scorecard identity carried inside the payload body, if any.
pub fn payload_scorecard(raw: &Value) -> (Option<String>, Option<String>) {
    (
        resolve_str(raw, SCORECARD_ID_KEYS),
        resolve_str(raw, SCORECARD_NAME_KEYS),
    )
}

/// First non-falsy value among `keys`, rendered as a string.
///
/// Falsy means null, `false`, `""`, or numeric zero. Arrays and objects are skipped.
pub fn resolve_str(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find_map(scalar_to_string)
}

fn resolve_or_empty(raw: &Value, keys: &[&str]) -> String {
    resolve_str(raw, keys).unwrap_or_default()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn resolve_name(raw: &Value) -> String {
    if let Some(name) = resolve_str(raw, NAME_KEYS) {
        return name;
    }

    let joined = ["first_name", "last_name"]
        .iter()
        .filter_map(|key| raw.get(*key).and_then(scalar_to_string))
        .collect::<Vec<_>>()
        .join(" ");

    if joined.is_empty() {
        UNKNOWN_NAME.to_string()
    } else {
        joined
    }
}

/// Score from the first alias holding a non-falsy value.
///
/// A numeric zero only counts when no later alias supplies something else, so
/// `{"score": 0}` is `Some(0)` while `{"score": 0, "total_score": 70}` is 70.
fn resolve_score(raw: &Value) -> Option<i64> {
    let mut zero_seen = false;

    for value in SCORE_KEYS.iter().filter_map(|key| raw.get(*key)) {
        match value {
            Value::Null | Value::Bool(false) => continue,
            Value::Number(n) if n.as_f64() == Some(0.0) => {
                zero_seen = true;
                continue;
            }
            Value::String(s) if s.trim().is_empty() => continue,
            _ => return score_value(value),
        }
    }

    zero_seen.then_some(0)
}

fn score_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

/// Parses an optional sign followed by digits, ignoring whatever trails them
/// (`"85 points"` is 85, `"72.9"` is 72).
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Only a literal boolean `true` or the exact string `"true"` counts.
fn resolve_meeting_booked(raw: &Value) -> bool {
    MEETING_KEYS
        .iter()
        .filter_map(|key| raw.get(*key))
        .find(|v| !v.is_null())
        .is_some_and(|v| matches!(v, Value::Bool(true)) || v.as_str() == Some("true"))
}

fn resolve_received_at(raw: &Value) -> Option<DateTime<Utc>> {
    RECEIVED_AT_KEYS
        .iter()
        .filter_map(|key| raw.get(*key).and_then(Value::as_str))
        .find_map(parse_timestamp)
}

fn synthesize_id(at: &DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect();
    format!("{}-{}", at.timestamp_millis(), suffix)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
