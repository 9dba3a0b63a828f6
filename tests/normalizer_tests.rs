/// Tests for payload normalization across the form tool's payload dialects
use chrono::{TimeZone, Utc};
use rust_scoreapp_api::normalizer::{normalize, normalize_at, normalize_imported};
use serde_json::json;

#[cfg(test)]
mod dialect_tests {
    use super::*;

    #[test]
    fn test_snake_case_dialect() {
        let lead = normalize(
            &json!({
                "submission_id": "sub-991",
                "full_name": "Anna Berg",
                "contact_email": "anna@berg.dk",
                "contact_phone": "+4520304050",
                "company_name": "Berg ApS",
                "utm_source": "linkedin",
                "utm_medium": "social",
                "utm_campaign": "webinar-2026",
                "utm_content": "carousel",
                "utm_term": "crm",
                "total_score": 64,
                "result_label": "Warm"
            }),
            Some("b2b"),
            Some("B2B"),
        );

        assert_eq!(lead.id, "sub-991");
        assert_eq!(lead.name, "Anna Berg");
        assert_eq!(lead.email, "anna@berg.dk");
        assert_eq!(lead.phone, "+4520304050");
        assert_eq!(lead.company, "Berg ApS");
        assert_eq!(lead.utm_source, "linkedin");
        assert_eq!(lead.utm_medium, "social");
        assert_eq!(lead.utm_campaign, "webinar-2026");
        assert_eq!(lead.utm_content, "carousel");
        assert_eq!(lead.utm_term, "crm");
        assert_eq!(lead.source, "linkedin");
        assert_eq!(lead.score, Some(64));
        assert_eq!(lead.score_label, "Warm");
        assert_eq!(lead.score_category, "considering");
    }

    #[test]
    fn test_camel_case_dialect() {
        let lead = normalize(
            &json!({
                "name": "Bo Jensen",
                "email": "bo@example.com",
                "organisation": "Kommune",
                "utmSource": "meta",
                "utmMedium": "cpc",
                "utmCampaign": "retargeting-feb",
                "score": "38",
                "score_label": "Cold"
            }),
            None,
            None,
        );

        assert_eq!(lead.company, "Kommune");
        assert_eq!(lead.utm_source, "meta");
        // source only looks at utm_source and source
        assert_eq!(lead.source, "ScoreApp");
        assert_eq!(lead.score, Some(38));
        assert_eq!(lead.score_category, "not ready");
    }

    #[test]
    fn test_bare_dialect() {
        let lead = normalize(
            &json!({
                "source": "newsletter",
                "medium": "email",
                "campaign": "brand-awareness",
                "content": "header",
                "term": "scoring"
            }),
            None,
            None,
        );

        assert_eq!(lead.utm_source, "newsletter");
        assert_eq!(lead.source, "newsletter");
        assert_eq!(lead.utm_medium, "email");
        assert_eq!(lead.utm_campaign, "brand-awareness");
        assert_eq!(lead.utm_content, "header");
        assert_eq!(lead.utm_term, "scoring");
    }

    #[test]
    fn test_empty_strings_fall_through_to_next_alias() {
        let lead = normalize(
            &json!({"email": "", "contact_email": "fallback@example.com", "name": ""}),
            None,
            None,
        );
        assert_eq!(lead.email, "fallback@example.com");
        assert_eq!(lead.name, "Unknown");
    }
}

#[cfg(test)]
mod scoring_tests {
    use super::*;

    #[test]
    fn test_absent_score_is_null() {
        let lead = normalize(&json!({"email": "a@b.com"}), None, None);
        assert_eq!(lead.score, None);
        assert_eq!(lead.score_category, "");
    }

    #[test]
    fn test_category_boundaries() {
        let cases = [
            (100, "ready to buy"),
            (80, "ready to buy"),
            (79, "considering"),
            (60, "considering"),
            (59, "early stage"),
            (40, "early stage"),
            (39, "not ready"),
            (0, "not ready"),
        ];
        for (score, expected) in cases {
            let lead = normalize(&json!({ "score": score }), None, None);
            assert_eq!(lead.score_category, expected, "score {}", score);
        }
    }

    #[test]
    fn test_falsy_score_falls_through_to_total_score() {
        let lead = normalize(&json!({"score": false, "total_score": 70}), None, None);
        assert_eq!(lead.score, Some(70));
        assert_eq!(lead.score_category, "considering");

        let lead = normalize(&json!({"score": 0, "total_score": 70}), None, None);
        assert_eq!(lead.score, Some(70));
        assert_eq!(lead.score_category, "considering");

        let lead = normalize(&json!({"score": "", "total_score": "82"}), None, None);
        assert_eq!(lead.score, Some(82));
    }

    #[test]
    fn test_lone_zero_score_is_kept() {
        let lead = normalize(&json!({"score": 0, "total_score": null}), None, None);
        assert_eq!(lead.score, Some(0));
        assert_eq!(lead.score_category, "not ready");

        let lead = normalize(&json!({"score": false}), None, None);
        assert_eq!(lead.score, None);
        assert_eq!(lead.score_category, "");
    }

    #[test]
    fn test_fractional_score_truncates() {
        let lead = normalize(&json!({"score": 79.9}), None, None);
        assert_eq!(lead.score, Some(79));
        assert_eq!(lead.score_category, "considering");
    }
}

#[cfg(test)]
mod meeting_tests {
    use super::*;

    #[test]
    fn test_only_true_values_count() {
        for (value, expected) in [
            (json!(true), true),
            (json!("true"), true),
            (json!("yes"), false),
            (json!("1"), false),
            (json!(false), false),
            (json!(null), false),
        ] {
            let lead = normalize(&json!({ "meeting_booked": value }), None, None);
            assert_eq!(lead.meeting_booked, expected, "value {}", value);
        }
    }
}

#[cfg(test)]
mod identity_tests {
    use super::*;

    #[test]
    fn test_synthesized_ids_are_unique() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let a = normalize_at(&json!({}), None, None, at);
        let b = normalize_at(&json!({}), None, None, at);
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with(&at.timestamp_millis().to_string()));
    }

    #[test]
    fn test_blank_scorecard_uses_default() {
        let lead = normalize(&json!({}), Some("  "), Some(""));
        assert_eq!(lead.scorecard_id, "default");
        assert_eq!(lead.scorecard_name, "Standard");
    }

    #[test]
    fn test_imported_flag_and_raw_kept() {
        let raw = json!({"email": "a@b.com", "received_at": "2026-01-15 09:00:00"});
        let lead = normalize_imported(&raw, None, None, Utc::now());
        assert!(lead.imported);
        assert_eq!(lead.received_date(), "2026-01-15");
        assert_eq!(lead.raw, raw);
    }
}
