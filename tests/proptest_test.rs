//! Property-based tests for window detection and the statusline inputs

use ccline::cli::LineSelection;
use ccline::statusline::ContextMetrics;
use ccline_core::types::{ConversationUsage, Record, RecordType, TokenCounts};
use ccline_core::window::{WindowDetector, floor_to_hour};
use chrono::{DateTime, TimeDelta, TimeZone, Timelike, Utc};
use proptest::prelude::*;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
}

prop_compose! {
    fn arb_token_counts()(
        input in 0u64..100_000,
        output in 0u64..50_000,
        cache_creation in 0u64..20_000,
        cache_read in 0u64..500_000,
    ) -> TokenCounts {
        TokenCounts::new(input, output, cache_creation, cache_read)
    }
}

prop_compose! {
    fn arb_record()(
        offset_secs in 0i64..3 * 24 * 3600,
        session in prop::sample::select(vec!["s1", "s2", "s3"]),
        record_type in prop::sample::select(vec![
            RecordType::Assistant,
            RecordType::Assistant,
            RecordType::User,
            RecordType::Error,
        ]),
        tokens in arb_token_counts(),
        request in prop::option::of(0u32..50),
    ) -> Record {
        let mut record = Record::new(base() + TimeDelta::seconds(offset_secs), record_type)
            .with_session(session)
            .with_usage(tokens);
        if let Some(id) = request {
            record = record.with_ids(format!("msg_{id}"), format!("req_{id}"));
        }
        record
    }
}

fn sorted_records() -> impl Strategy<Value = Vec<Record>> {
    prop::collection::vec(arb_record(), 0..200).prop_map(|mut records| {
        records.sort_by_key(|r| r.timestamp);
        records
    })
}

proptest! {
    #[test]
    fn every_record_lands_in_one_window(records in sorted_records()) {
        let count = records.len();
        let now = base() + TimeDelta::days(4);
        let windows = WindowDetector::new(TimeDelta::hours(5)).detect(records, now);

        prop_assert_eq!(windows.iter().map(|w| w.records.len()).sum::<usize>(), count);
        for window in &windows {
            prop_assert!(!window.records.is_empty());
            prop_assert_eq!(window.start.minute(), 0);
            prop_assert_eq!(window.start.second(), 0);
            prop_assert_eq!(window.nominal_end - window.start, TimeDelta::hours(5));
        }
        for pair in windows.windows(2) {
            prop_assert!(pair[0].nominal_end <= pair[1].start);
        }
    }

    #[test]
    fn detection_is_idempotent(records in sorted_records(), now_offset in 0i64..5 * 24 * 3600) {
        let now = base() + TimeDelta::seconds(now_offset);
        let detector = WindowDetector::new(TimeDelta::hours(5));
        prop_assert_eq!(detector.detect(records.clone(), now), detector.detect(records, now));
    }

    #[test]
    fn floor_to_hour_is_a_lower_bound(secs in 0i64..4_000_000_000, nanos in 0u32..1_000_000_000) {
        let instant = Utc.timestamp_opt(secs, nanos).unwrap();
        let floored = floor_to_hour(instant);
        prop_assert!(floored <= instant);
        prop_assert!(instant - floored < TimeDelta::hours(1));
        prop_assert_eq!((floored.minute(), floored.second(), floored.nanosecond()), (0, 0, 0));
        prop_assert_eq!(floor_to_hour(floored), floored);
    }

    #[test]
    fn context_metrics_stay_in_range(
        tokens in arb_token_counts(),
        window_size in prop::option::of(0u64..2_000_000),
        reported in prop::option::of(-10.0f64..250.0),
    ) {
        let usage = ConversationUsage { tokens, ..ConversationUsage::default() };
        let metrics = ContextMetrics::compute(&usage, window_size, reported);
        prop_assert!(metrics.percentage <= 100);
        prop_assert!(metrics.window_size > 0);
        prop_assert!((0.0..=100.0).contains(&metrics.cache_ratio));
    }

    #[test]
    fn line_selection_accepts_digit_lists(lines in prop::collection::btree_set(1u8..=4, 1..=4)) {
        let text = lines.iter().map(u8::to_string).collect::<Vec<_>>().join(",");
        let selection: LineSelection = text.parse().unwrap();
        for line in 1..=4u8 {
            prop_assert_eq!(selection.contains(line), lines.contains(&line));
        }
    }

    #[test]
    fn line_selection_rejects_out_of_range(line in 5u8..=9) {
        prop_assert!(line.to_string().parse::<LineSelection>().is_err());
    }
}
