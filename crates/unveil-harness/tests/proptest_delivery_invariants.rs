//! Property-based invariants for simulated intersection delivery.
//!
//! 1. Every report carries a ratio in `[0, 1]`, and a non-intersecting
//!    report carries ratio 0.
//! 2. Two consecutive reports for one observer never fall in the same
//!    threshold bucket.
//! 3. The last report matches the geometry at the final scroll position.
//! 4. At most one report per scroll step, plus the initial report.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use unveil_core::geometry::{Rect, RootMargin, intersection_ratio};
use unveil_core::host::{IntersectionEntry, IntersectionHost, IntersectionOptions};
use unveil_harness::SimHost;

const VIEWPORT: (f64, f64) = (800.0, 600.0);
const TARGET: Rect = Rect {
    x: 0.0,
    y: 900.0,
    width: 800.0,
    height: 300.0,
};

fn bucket_of(thresholds: &[f64], entry: &IntersectionEntry) -> Option<usize> {
    if !entry.is_intersecting {
        return None;
    }
    Some(thresholds.iter().filter(|&&t| entry.ratio >= t).count())
}

fn expected_bucket(thresholds: &[f64], margin: &RootMargin, scroll_y: f64) -> Option<usize> {
    let root = Rect::new(0.0, 0.0, VIEWPORT.0, VIEWPORT.1);
    let in_view = TARGET.offset(0.0, -scroll_y);
    intersection_ratio(&in_view, &root, margin)
        .map(|ratio| thresholds.iter().filter(|&&t| ratio >= t).count())
}

// ── Strategies ────────────────────────────────────────────────────────────

fn thresholds_strategy() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(0.0f64..=1.0, 1..=4).prop_map(|mut ts| {
        ts.sort_by(f64::total_cmp);
        ts.dedup();
        ts
    })
}

fn margin_strategy() -> impl Strategy<Value = RootMargin> {
    prop_oneof![
        Just("0px"),
        Just("0px 0px -25% 0px"),
        Just("100px"),
        Just("-60%"),
    ]
    .prop_map(|text| text.parse::<RootMargin>().unwrap_or_default())
}

fn scrolls_strategy() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(prop_oneof![Just(0.0), Just(600.0), 0.0f64..=1600.0], 0..=20)
}

// ── Delivery ──────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn reports_follow_bucket_crossings(
        thresholds in thresholds_strategy(),
        margin in margin_strategy(),
        scrolls in scrolls_strategy(),
    ) {
        let host = SimHost::new(VIEWPORT.0, VIEWPORT.1);
        let el = host.add_element(TARGET);
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let options = IntersectionOptions {
            thresholds: thresholds.clone(),
            root_margin: margin,
        };
        let _handle = host
            .observe(&el, &options, Box::new(move |e| sink.borrow_mut().push(e)))
            .unwrap();
        host.flush();
        for &y in &scrolls {
            host.scroll_to(0.0, y);
        }

        let log = log.borrow();
        prop_assert!(!log.is_empty());
        prop_assert!(log.len() <= scrolls.len() + 1);

        for entry in log.iter() {
            prop_assert!((0.0..=1.0).contains(&entry.ratio));
            if !entry.is_intersecting {
                prop_assert_eq!(entry.ratio, 0.0);
            }
        }

        let buckets: Vec<_> = log.iter().map(|e| bucket_of(&thresholds, e)).collect();
        for pair in buckets.windows(2) {
            prop_assert_ne!(pair[0], pair[1]);
        }

        let final_y = scrolls.last().copied().unwrap_or(0.0);
        prop_assert_eq!(
            buckets.last().copied().flatten(),
            expected_bucket(&thresholds, &margin, final_y)
        );
    }
}
