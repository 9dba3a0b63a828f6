use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Scorecard id used when neither the route nor the payload names one.
pub const DEFAULT_SCORECARD_ID: &str = "default";
/// Display name paired with [`DEFAULT_SCORECARD_ID`].
pub const DEFAULT_SCORECARD_NAME: &str = "Standard";

// ============ Lead Models ============

/// Canonical lead record produced by the normalizer.
///
/// Leads are append-only: once stored they are never edited, only purged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Identifier supplied by the form tool, or synthesized at ingestion.
    pub id: String,
    /// Ingestion instant, or the original event time for imported leads.
    #[serde(with = "iso_millis")]
    pub received_at: DateTime<Utc>,
    /// Logical group (form or campaign) the lead belongs to.
    #[serde(default = "default_scorecard_id")]
    pub scorecard_id: String,
    /// Display name of the scorecard.
    #[serde(default = "default_scorecard_name")]
    pub scorecard_name: String,

    // Contact
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub company: String,

    // Attribution
    #[serde(default)]
    pub utm_source: String,
    #[serde(default)]
    pub utm_medium: String,
    #[serde(default)]
    pub utm_campaign: String,
    #[serde(default)]
    pub utm_content: String,
    #[serde(default)]
    pub utm_term: String,
    /// `utm_source`, else the bare `source` field, else the form tool's name.
    #[serde(default)]
    pub source: String,

    // Scoring
    /// Score reported by the form tool; `None` when the payload carried none.
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub score_label: String,
    /// Label from [`ScoreCategory`], empty when `score` is `None`.
    #[serde(default)]
    pub score_category: String,

    #[serde(default)]
    pub meeting_booked: bool,
    /// Set for historical leads brought in through bulk import.
    #[serde(default)]
    pub imported: bool,

    /// Untouched payload as received.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

impl Lead {
    pub fn has_contact(&self) -> bool {
        !self.email.is_empty() || !self.phone.is_empty()
    }

    /// Calendar date (UTC) of `received_at`, formatted `YYYY-MM-DD`.
    pub fn received_date(&self) -> String {
        self.received_at.format("%Y-%m-%d").to_string()
    }

    /// Compound key used to recognise the same submission twice: email (or id when
    /// the lead has no email) plus the day it was received.
    pub fn dedup_key(&self) -> (String, String) {
        let identity = if self.email.is_empty() {
            self.id.clone()
        } else {
            self.email.clone()
        };
        (identity, self.received_date())
    }
}

fn default_scorecard_id() -> String {
    DEFAULT_SCORECARD_ID.to_string()
}

fn default_scorecard_name() -> String {
    DEFAULT_SCORECARD_NAME.to_string()
}

/// Buying-readiness classification derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreCategory {
    ReadyToBuy,
    Considering,
    EarlyStage,
    NotReady,
}

impl ScoreCategory {
    pub fn from_score(score: i64) -> Self {
        if score >= 80 {
            ScoreCategory::ReadyToBuy
        } else if score >= 60 {
            ScoreCategory::Considering
        } else if score >= 40 {
            ScoreCategory::EarlyStage
        } else {
            ScoreCategory::NotReady
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreCategory::ReadyToBuy => "ready to buy",
            ScoreCategory::Considering => "considering",
            ScoreCategory::EarlyStage => "early stage",
            ScoreCategory::NotReady => "not ready",
        }
    }

    /// Bucket name used by the `scoreDist` distribution.
    pub fn bucket(self) -> &'static str {
        match self {
            ScoreCategory::ReadyToBuy => "80–100",
            ScoreCategory::Considering => "60–79",
            ScoreCategory::EarlyStage => "40–59",
            ScoreCategory::NotReady => "Under 40",
        }
    }

    pub const ALL: [ScoreCategory; 4] = [
        ScoreCategory::NotReady,
        ScoreCategory::EarlyStage,
        ScoreCategory::Considering,
        ScoreCategory::ReadyToBuy,
    ];
}

// ============ Aggregation Models ============

/// Summary statistics over a filtered set of leads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    /// Number of leads in the window.
    pub completed: usize,
    /// Leads with an email or phone number.
    pub leads_with_contact: usize,
    pub meetings: usize,
    /// `completed / max(completed * 1.8, 1) * 100`, one decimal.
    pub completion_rate: String,
    /// `leads_with_contact / completed * 100`, one decimal.
    pub lead_rate: String,
    /// `meetings / leads_with_contact * 100`, one decimal.
    pub meeting_rate: String,
    pub score_dist: BTreeMap<String, usize>,
    pub utm_sources: BTreeMap<String, usize>,
    pub utm_campaigns: BTreeMap<String, usize>,
    pub utm_mediums: BTreeMap<String, usize>,
    /// Daily counts, oldest day first, one entry per day of the window.
    pub series: Vec<usize>,
    /// Newest leads first.
    pub recent_leads: Vec<Lead>,
}

/// One scorecard group as exposed by `/api/scorecards`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScorecardSummary {
    pub id: String,
    pub name: String,
    pub count: usize,
}

// ============ Request/Response Models ============

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQueryParams {
    pub period: Option<String>,
    pub scorecard_id: Option<String>,
}

/// Paging values are kept as strings so garbage falls back to defaults instead of a 400.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadsQueryParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub scorecard_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScorecardQueryParams {
    pub scorecard_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub success: bool,
    pub id: String,
    pub scorecard_id: String,
}

/// Outcome of one bulk import call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    /// Store size after the import.
    pub total: usize,
}

// ============ Timestamps ============

/// Parses the timestamp shapes seen in stored documents and imported payloads.
///
/// RFC 3339 first, then space-separated and naive forms (assumed UTC), then a bare date
/// (midnight UTC).
pub fn parse_timestamp(timestamp_str: &str) -> Option<DateTime<Utc>> {
    let s = timestamp_str.trim();
    if s.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z").map(|dt| dt.with_timezone(&Utc))
        })
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|ndt| ndt.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|ndt| ndt.and_utc())
        })
}

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g. `2026-03-01T09:30:00.000Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw)))
    }
}

pub mod iso_millis_option {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        ts: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_str(&super::format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => super::parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp '{}'", raw))),
            None => Ok(None),
        }
    }
}
