// Property-based tests for the reconciliation engine.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use proptest::prelude::*;
use tabdiff_recon::engine::{numeric_delta, structural_diff};
use tabdiff_recon::model::{ColumnPair, Dataset, Key, Record};
use tabdiff_recon::progress::RunHooks;
use tabdiff_recon::UnionOrder;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Small key space so both sides overlap and duplicate.
fn arb_key() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"[0-9]{1,2}",
        1 => r"[a-c]",
        1 => Just("".to_string()),
    ]
}

/// Arbitrary value: mostly numeric, sometimes text, sometimes empty.
fn arb_value() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"-?[0-9]{1,4}(\.[0-9]{1,2})?",
        1 => r"[a-zA-Z ]{0,6}",
        1 => Just("".to_string()),
    ]
}

/// Dataset with columns `key_col`, `c1`, `c2`; a value may be left out entirely.
fn arb_dataset(key_col: &'static str, c1: &'static str, c2: &'static str) -> impl Strategy<Value = Dataset> {
    proptest::collection::vec(
        (arb_key(), proptest::option::of(arb_value()), proptest::option::of(arb_value())),
        0..40,
    )
    .prop_map(move |rows| {
        let records = rows
            .into_iter()
            .map(|(key, v1, v2)| {
                let mut record = Record::new();
                record.insert(key_col, key);
                if let Some(v) = v1 {
                    record.insert(c1, v);
                }
                if let Some(v) = v2 {
                    record.insert(c2, v);
                }
                record
            })
            .collect();
        Dataset::new(vec![key_col.into(), c1.into(), c2.into()], records)
    })
}

fn arb_pair() -> impl Strategy<Value = (Dataset, Dataset)> {
    (arb_dataset("id", "x", "y"), arb_dataset("ref", "p", "q"))
}

fn mapping() -> Vec<ColumnPair> {
    vec![ColumnPair::new("x", "p"), ColumnPair::new("y", "q")]
}

fn keys(data: &Dataset, key_col: &str) -> HashSet<Key> {
    data.records.iter().map(|r| r.key(key_col)).collect()
}

// ---------------------------------------------------------------------------
// Structural
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn structural_rows_differ_or_are_one_sided((a, b) in arb_pair()) {
        let keys_a = keys(&a, "id");
        let keys_b = keys(&b, "ref");
        let rows = structural_diff(&a, &b, "id", "ref", &mapping(), &mut RunHooks::new())
            .completed()
            .unwrap();

        for row in &rows {
            let one_sided = keys_a.contains(&row.key) != keys_b.contains(&row.key);
            prop_assert!(
                row.value_a != row.value_b || one_sided,
                "row {:?} neither differs nor is one-sided", row
            );
            if !keys_b.contains(&row.key) {
                prop_assert_eq!(&row.value_b, "");
            }
            if !keys_a.contains(&row.key) {
                prop_assert_eq!(&row.value_a, "");
            }
        }
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn structural_walk_is_b_order_then_residual((a, b) in arb_pair()) {
        let keys_b = keys(&b, "ref");
        let rows = structural_diff(&a, &b, "id", "ref", &mapping(), &mut RunHooks::new())
            .completed()
            .unwrap();

        // Once the first A-only row appears, no row for a B key follows.
        let first_residual = rows.iter().position(|r| !keys_b.contains(&r.key));
        if let Some(i) = first_residual {
            prop_assert!(rows[i..].iter().all(|r| !keys_b.contains(&r.key)));
        }
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn structural_is_idempotent((a, b) in arb_pair()) {
        let m = mapping();
        let r1 = structural_diff(&a, &b, "id", "ref", &m, &mut RunHooks::new());
        let r2 = structural_diff(&a, &b, "id", "ref", &m, &mut RunHooks::new());
        prop_assert_eq!(r1, r2);
    }
}

// ---------------------------------------------------------------------------
// Delta
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn delta_has_one_row_per_union_key((a, b) in arb_pair(), first_seen in any::<bool>()) {
        let order = if first_seen { UnionOrder::FirstSeen } else { UnionOrder::Sorted };
        let m = mapping();
        let rows = numeric_delta(&a, &b, "id", "ref", &m, order, &mut RunHooks::new())
            .completed()
            .unwrap();

        let universe: HashSet<Key> = keys(&a, "id").union(&keys(&b, "ref")).cloned().collect();
        prop_assert_eq!(rows.len(), universe.len());
        let emitted: HashSet<Key> = rows.iter().map(|r| r.key.clone()).collect();
        prop_assert_eq!(emitted, universe);
        for row in &rows {
            prop_assert_eq!(row.deltas.len(), m.len());
        }
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn delta_sorted_order_is_ascending((a, b) in arb_pair()) {
        let rows = numeric_delta(&a, &b, "id", "ref", &mapping(), UnionOrder::Sorted, &mut RunHooks::new())
            .completed()
            .unwrap();
        prop_assert!(rows.windows(2).all(|w| w[0].key < w[1].key));
    }
}

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn delta_is_idempotent((a, b) in arb_pair()) {
        let m = mapping();
        let r1 = numeric_delta(&a, &b, "id", "ref", &m, UnionOrder::FirstSeen, &mut RunHooks::new());
        let r2 = numeric_delta(&a, &b, "id", "ref", &m, UnionOrder::FirstSeen, &mut RunHooks::new());
        prop_assert_eq!(r1, r2);
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]
    #[test]
    fn progress_is_monotone_and_final((a, b) in arb_pair()) {
        let mut seen = Vec::new();
        {
            let mut hooks = RunHooks::new().on_progress(|p| seen.push(p));
            structural_diff(&a, &b, "id", "ref", &mapping(), &mut hooks);
        }
        prop_assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        prop_assert_eq!(seen.last(), Some(&100));
    }
}
