//! Aggregated lead analytics: windowing, rates, distributions and daily series.
//!
//! All functions are pure over the lead slice they are handed. "Now" is sampled
//! once per call, or passed in explicitly through the `*_at` variants.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;

use crate::models::{Lead, ScoreCategory, ScorecardSummary, Stats};

/// `utmSources` key when a lead has neither `utmSource` nor `source`.
pub const NO_SOURCE: &str = "Direct";
/// `utmCampaigns` key for leads without a campaign.
pub const NO_CAMPAIGN: &str = "no campaign";
/// `utmMediums` key for leads without a medium.
pub const NO_MEDIUM: &str = "unknown";

/// Reporting period as named by the dashboard's `period` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
    AllTime,
}

impl Period {
    /// `dag`, `uge` and `maaned` select a window; anything else means all time.
    pub fn from_query(period: &str) -> Self {
        match period {
            "dag" => Period::Day,
            "uge" => Period::Week,
            "maaned" => Period::Month,
            _ => Period::AllTime,
        }
    }

    /// Window length in days, 0 for all time.
    pub fn window_days(self) -> u32 {
        match self {
            Period::Day => 1,
            Period::Week => 7,
            Period::Month => 30,
            Period::AllTime => 0,
        }
    }
}

/// Leads belonging to `scorecard_id`, or every lead when no filter is given.
pub fn filter_by_scorecard<'a>(
    leads: &'a [Lead],
    scorecard_id: Option<&'a str>,
) -> impl Iterator<Item = &'a Lead> + 'a {
    leads
        .iter()
        .filter(move |lead| scorecard_id.map_or(true, |id| lead.scorecard_id == id))
}

/// Groups leads by scorecard in order of first appearance.
///
/// The display name is taken from the most recent lead of each group.
pub fn scorecard_summaries(leads: &[Lead]) -> Vec<ScorecardSummary> {
    let mut summaries: Vec<ScorecardSummary> = Vec::new();
    let mut index: BTreeMap<&str, usize> = BTreeMap::new();

    for lead in leads {
        match index.get(lead.scorecard_id.as_str()) {
            Some(&i) => {
                let summary = &mut summaries[i];
                summary.count += 1;
                summary.name.clone_from(&lead.scorecard_name);
            }
            None => {
                index.insert(lead.scorecard_id.as_str(), summaries.len());
                summaries.push(ScorecardSummary {
                    id: lead.scorecard_id.clone(),
                    name: lead.scorecard_name.clone(),
                    count: 1,
                });
            }
        }
    }

    summaries
}

/// Counts items per key.
pub fn count_by<'a, T, I, F>(items: I, key: F) -> BTreeMap<String, usize>
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
    F: Fn(&'a T) -> &'a str,
{
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(key(item).to_string()).or_insert(0) += 1;
    }
    counts
}

pub fn compute_stats<'a, I>(leads: I, window_days: u32, recent_limit: usize) -> Stats
where
    I: IntoIterator<Item = &'a Lead>,
{
    compute_stats_at(leads, window_days, recent_limit, Utc::now())
}

/// Computes [`Stats`] for the leads received within `window_days` of `now`
/// (`0` = all time), keeping at most `recent_limit` leads in `recent_leads`.
///
/// The window is an instant cutoff while `series` covers whole calendar days, so a
/// lead from the partial oldest day counts in `completed` but in no series bucket:
/// `series.iter().sum() <= completed`.
pub fn compute_stats_at<'a, I>(
    leads: I,
    window_days: u32,
    recent_limit: usize,
    now: DateTime<Utc>,
) -> Stats
where
    I: IntoIterator<Item = &'a Lead>,
{
    let filtered: Vec<&Lead> = if window_days == 0 {
        leads.into_iter().collect()
    } else {
        let cutoff = now - Duration::days(i64::from(window_days));
        leads
            .into_iter()
            .filter(|lead| lead.received_at >= cutoff)
            .collect()
    };

    let completed = filtered.len();
    let leads_with_contact = filtered.iter().filter(|l| l.has_contact()).count();
    let meetings = filtered.iter().filter(|l| l.meeting_booked).count();

    // TODO: revisit completion_rate once the real funnel size (form views) is tracked;
    // the 1.8 factor is an assumed views-per-completion ratio.
    let completion_rate = if completed > 0 {
        format_rate(completed as f64 / (completed as f64 * 1.8).max(1.0))
    } else {
        ZERO_RATE.to_string()
    };

    Stats {
        completed,
        leads_with_contact,
        meetings,
        completion_rate,
        lead_rate: rate(leads_with_contact, completed),
        meeting_rate: rate(meetings, leads_with_contact),
        score_dist: score_distribution(&filtered),
        utm_sources: count_by(filtered.iter().copied(), source_key),
        utm_campaigns: count_by(filtered.iter().copied(), |l| {
            non_empty_or(&l.utm_campaign, NO_CAMPAIGN)
        }),
        utm_mediums: count_by(filtered.iter().copied(), |l| {
            non_empty_or(&l.utm_medium, NO_MEDIUM)
        }),
        series: daily_series(&filtered, window_days, now),
        recent_leads: filtered
            .iter()
            .rev()
            .take(recent_limit)
            .map(|l| (*l).clone())
            .collect(),
    }
}

const ZERO_RATE: &str = "0.0";

fn rate(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        return ZERO_RATE.to_string();
    }
    format_rate(numerator as f64 / denominator as f64)
}

fn format_rate(fraction: f64) -> String {
    format!("{:.1}", fraction * 100.0)
}

fn source_key(lead: &Lead) -> &str {
    if !lead.utm_source.is_empty() {
        &lead.utm_source
    } else {
        non_empty_or(&lead.source, NO_SOURCE)
    }
}

fn non_empty_or<'a>(value: &'a str, fallback: &'static str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

/// All four buckets are always present; a missing score lands in the lowest one.
fn score_distribution(leads: &[&Lead]) -> BTreeMap<String, usize> {
    let mut dist: BTreeMap<String, usize> = ScoreCategory::ALL
        .iter()
        .map(|c| (c.bucket().to_string(), 0))
        .collect();
    for lead in leads {
        let bucket = ScoreCategory::from_score(lead.score.unwrap_or(0)).bucket();
        *dist.entry(bucket.to_string()).or_insert(0) += 1;
    }
    dist
}

/// One count per calendar day (UTC) from `window_days - 1` days ago through today.
///
/// Every day is seeded before counting so empty days show up as zero.
pub fn daily_series(leads: &[&Lead], window_days: u32, now: DateTime<Utc>) -> Vec<usize> {
    let days = series_days(window_days, now);
    let mut counts: BTreeMap<NaiveDate, usize> = days.iter().map(|d| (*d, 0)).collect();

    for lead in leads {
        if let Some(count) = counts.get_mut(&lead.received_at.date_naive()) {
            *count += 1;
        }
    }

    days.iter().map(|d| counts[d]).collect()
}

/// Dates covered by [`daily_series`], oldest first.
pub fn series_days(window_days: u32, now: DateTime<Utc>) -> Vec<NaiveDate> {
    (0..i64::from(window_days))
        .rev()
        .map(|offset| (now - Duration::days(offset)).date_naive())
        .collect()
}
