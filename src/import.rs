//! Bulk import of historical leads with same-day deduplication.
//!
//! Works on a plain `Vec<Lead>` so it can run against the live store or a scratch
//! copy; persisting the result is the caller's job.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;

use crate::models::{ImportSummary, Lead, DEFAULT_SCORECARD_ID};
use crate::normalizer::normalize_imported;

/// Target scorecard and options for one import call.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub scorecard_id: Option<String>,
    pub scorecard_name: Option<String>,
    /// Purge every existing lead of the target scorecard first.
    pub overwrite: bool,
}

impl ImportOptions {
    /// Scorecard the batch lands in, `default` when none was named.
    pub fn target_scorecard(&self) -> &str {
        self.scorecard_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SCORECARD_ID)
    }
}

/// Normalizes `raws` into `leads`, skipping any whose dedup key (email or id, plus
/// the day received) is already in the store or earlier in the same batch.
///
/// The whole store is re-sorted by `received_at` afterwards.
pub fn import_batch(
    leads: &mut Vec<Lead>,
    raws: &[Value],
    options: &ImportOptions,
    now: DateTime<Utc>,
) -> ImportSummary {
    let target = options.target_scorecard().to_string();

    if options.overwrite {
        let before = leads.len();
        leads.retain(|lead| lead.scorecard_id != target);
        tracing::info!(
            "Overwrite import: purged {} lead(s) from scorecard '{}'",
            before - leads.len(),
            target
        );
    }

    let mut seen: HashSet<(String, String)> = leads.iter().map(Lead::dedup_key).collect();
    let mut imported = 0;
    let mut skipped = 0;

    for raw in raws {
        let lead = normalize_imported(
            raw,
            Some(&target),
            options.scorecard_name.as_deref(),
            now,
        );

        if seen.insert(lead.dedup_key()) {
            leads.push(lead);
            imported += 1;
        } else {
            tracing::debug!("Skipping duplicate import: id={}", lead.id);
            skipped += 1;
        }
    }

    leads.sort_by_key(|lead| lead.received_at);

    ImportSummary {
        imported,
        skipped,
        total: leads.len(),
    }
}
