//! Property-based tests for key derivation

#![allow(clippy::unwrap_used, missing_docs)]

use chartcache_cache::{KeyDeriver, RenderRequest};
use chrono::{Days, NaiveDate};
use proptest::prelude::*;

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    // 1900-01-01 plus up to ~275 years
    (0u64..100_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(1900, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(offset))
            .unwrap()
    })
}

fn arb_request() -> impl Strategy<Value = RenderRequest> {
    (any::<u32>(), ".{0,40}", arb_date())
        .prop_map(|(count, label, date)| RenderRequest::new(count, label, date))
}

proptest! {
    #[test]
    fn key_is_deterministic(request in arb_request(), salt in "[a-z0-9.-]{0,12}") {
        let a = KeyDeriver::new(salt.clone()).derive(&request);
        let b = KeyDeriver::new(salt).derive(&request.clone());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn key_is_sensitive_to_count(request in arb_request(), delta in 1u32..1000) {
        let deriver = KeyDeriver::new("chart-v1");
        let bumped = RenderRequest::new(
            request.count().wrapping_add(delta),
            request.label(),
            request.date(),
        );
        prop_assert_ne!(deriver.derive(&request), deriver.derive(&bumped));
    }

    #[test]
    fn key_is_sensitive_to_label(request in arb_request(), suffix in ".{1,8}") {
        let deriver = KeyDeriver::new("chart-v1");
        let relabeled = RenderRequest::new(
            request.count(),
            format!("{}{suffix}", request.label()),
            request.date(),
        );
        prop_assert_ne!(deriver.derive(&request), deriver.derive(&relabeled));
    }

    #[test]
    fn key_is_sensitive_to_date(request in arb_request(), days in 1u64..3650) {
        let deriver = KeyDeriver::new("chart-v1");
        let moved = RenderRequest::new(
            request.count(),
            request.label(),
            request.date().checked_add_days(Days::new(days)).unwrap(),
        );
        prop_assert_ne!(deriver.derive(&request), deriver.derive(&moved));
    }

    #[test]
    fn digits_split_between_count_and_label_do_not_collide(
        digits in "[1-9][0-9]{1,8}",
        split in 1usize..9,
    ) {
        prop_assume!(split < digits.len());
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let deriver = KeyDeriver::new("");
        let (head, tail) = digits.split_at(split);
        let (count, label) = digits.split_at(digits.len() - 1);
        let whole = RenderRequest::new(count.parse().unwrap(), label, date);
        let parts = RenderRequest::new(head.parse().unwrap(), tail, date);
        prop_assume!(whole != parts);
        prop_assert_ne!(deriver.derive(&whole), deriver.derive(&parts));
    }

    #[test]
    fn parsed_and_typed_requests_share_a_key(request in arb_request()) {
        let reparsed = RenderRequest::from_parts(
            i64::from(request.count()),
            request.label(),
            &request.canonical_date(),
        )
        .unwrap();
        let deriver = KeyDeriver::new("chart-v1");
        prop_assert_eq!(deriver.derive(&request), deriver.derive(&reparsed));
    }
}
