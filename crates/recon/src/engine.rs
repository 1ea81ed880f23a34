use log::debug;

use crate::compare;
use crate::index::RecordIndex;
use crate::model::{
    ColumnPair, Dataset, DeltaRow, DiffRow, Outcome, ReconMeta, ReconMode, ReconOutput,
    ReconReport, ReconRequest, ReconSummary, SubtractRow, SubtractTable,
};
use crate::progress::{RunHooks, Tracker};
use crate::universe::{resolve, JoinPolicy, UnionOrder};

/// Per-key counters gathered during a walk.
#[derive(Debug, Default)]
struct KeyTally {
    walked: usize,
    matched: usize,
    only_a: usize,
    only_b: usize,
    with_differences: usize,
}

/// Run reconciliation per request. Returns rows + summary, or the abort point.
pub fn run(
    request: &ReconRequest,
    a: &Dataset,
    b: &Dataset,
    hooks: &mut RunHooks<'_>,
) -> Outcome<ReconReport> {
    let (key_a, key_b) = (request.key_a.as_str(), request.key_b.as_str());

    let walked = match request.mode {
        ReconMode::Structural => structural_walk(a, b, key_a, key_b, &request.mapping, hooks)
            .map(|(rows, tally)| (ReconOutput::Structural(rows), tally)),
        ReconMode::Delta => {
            delta_walk(a, b, key_a, key_b, &request.mapping, request.order, hooks)
                .map(|(rows, tally)| (ReconOutput::Delta(rows), tally))
        }
        ReconMode::Subtract => match request.mapping.first() {
            Some(pair) => subtract_walk(a, b, key_a, key_b, pair, hooks)
                .map(|(table, tally)| (ReconOutput::Subtract(table), tally)),
            None => Outcome::Completed((
                ReconOutput::Subtract(SubtractTable {
                    key_column: request.key_a.clone(),
                    value_column: String::new(),
                    rows: Vec::new(),
                }),
                KeyTally::default(),
            )),
        },
    };

    walked.map(|(results, tally)| {
        let summary = ReconSummary {
            rows_a: a.len(),
            rows_b: b.len(),
            keys_walked: tally.walked,
            matched: tally.matched,
            only_a: tally.only_a,
            only_b: tally.only_b,
            keys_with_differences: tally.with_differences,
            result_rows: results.len(),
        };
        ReconReport {
            meta: ReconMeta {
                name: request.name.clone(),
                mode: request.mode,
                key_a: request.key_a.clone(),
                key_b: request.key_b.clone(),
                mapping: request.mapping.clone(),
                order: (request.mode == ReconMode::Delta).then_some(request.order),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            summary,
            results,
        }
    })
}

/// Field-level diff: B records in order, then A keys absent from B.
///
/// Keys on both sides emit one row per mapping entry whose values differ.
/// B-only keys emit one row per entry with an empty `value_a`; A-only keys
/// one row per entry with an empty `value_b`. Rows name the B column,
/// except A-only rows, which have no B record and name the A column.
pub fn structural_diff(
    a: &Dataset,
    b: &Dataset,
    key_a: &str,
    key_b: &str,
    mapping: &[ColumnPair],
    hooks: &mut RunHooks<'_>,
) -> Outcome<Vec<DiffRow>> {
    structural_walk(a, b, key_a, key_b, mapping, hooks).map(|(rows, _)| rows)
}

/// Numeric deltas over A ∪ B keys: one row per key, always emitted.
pub fn numeric_delta(
    a: &Dataset,
    b: &Dataset,
    key_a: &str,
    key_b: &str,
    mapping: &[ColumnPair],
    order: UnionOrder,
    hooks: &mut RunHooks<'_>,
) -> Outcome<Vec<DeltaRow>> {
    delta_walk(a, b, key_a, key_b, mapping, order, hooks).map(|(rows, _)| rows)
}

/// `a - b` for one column pair, one row per A record in A order. B is
/// indexed last-write-wins; a missing B record contributes 0.
pub fn subtract_column(
    a: &Dataset,
    b: &Dataset,
    key_a: &str,
    key_b: &str,
    pair: &ColumnPair,
    hooks: &mut RunHooks<'_>,
) -> Outcome<SubtractTable> {
    subtract_walk(a, b, key_a, key_b, pair, hooks).map(|(table, _)| table)
}

fn structural_walk(
    a: &Dataset,
    b: &Dataset,
    key_a: &str,
    key_b: &str,
    mapping: &[ColumnPair],
    hooks: &mut RunHooks<'_>,
) -> Outcome<(Vec<DiffRow>, KeyTally)> {
    let visits = resolve(JoinPolicy::BDrivenWithResidual, a, key_a, b, key_b);
    let mut tracker = Tracker::new(hooks, visits.len());
    if tracker.cancelled() {
        return tracker.aborted();
    }

    let mut rows = Vec::new();
    let mut tally = KeyTally::default();

    for visit in &visits {
        match (visit.a, visit.b) {
            (Some(ra), Some(rb)) => {
                tally.matched += 1;
                let before = rows.len();
                for pair in mapping {
                    let (va, vb) = (ra.get(&pair.a), rb.get(&pair.b));
                    if compare::differs(va, vb) {
                        rows.push(DiffRow {
                            key: visit.key.clone(),
                            column: pair.b.clone(),
                            value_a: compare::normalize(va).into_owned(),
                            value_b: compare::normalize(vb).into_owned(),
                        });
                    }
                }
                if rows.len() > before {
                    tally.with_differences += 1;
                }
            }
            (None, Some(rb)) => {
                tally.only_b += 1;
                rows.extend(mapping.iter().map(|pair| DiffRow {
                    key: visit.key.clone(),
                    column: pair.b.clone(),
                    value_a: String::new(),
                    value_b: compare::normalize(rb.get(&pair.b)).into_owned(),
                }));
            }
            (Some(ra), None) => {
                tally.only_a += 1;
                rows.extend(mapping.iter().map(|pair| DiffRow {
                    key: visit.key.clone(),
                    column: pair.a.clone(),
                    value_a: compare::normalize(ra.get(&pair.a)).into_owned(),
                    value_b: String::new(),
                }));
            }
            (None, None) => {}
        }
        tally.walked += 1;
        if !tracker.advance() {
            return tracker.aborted();
        }
    }

    tracker.finish();
    debug!("structural walk: {} visits, {} diff rows", visits.len(), rows.len());
    Outcome::Completed((rows, tally))
}

fn delta_walk(
    a: &Dataset,
    b: &Dataset,
    key_a: &str,
    key_b: &str,
    mapping: &[ColumnPair],
    order: UnionOrder,
    hooks: &mut RunHooks<'_>,
) -> Outcome<(Vec<DeltaRow>, KeyTally)> {
    let visits = resolve(JoinPolicy::Union(order), a, key_a, b, key_b);
    let mut tracker = Tracker::new(hooks, visits.len());
    if tracker.cancelled() {
        return tracker.aborted();
    }

    let fields: Vec<String> = mapping.iter().map(ColumnPair::delta_field).collect();
    let mut rows = Vec::with_capacity(visits.len());
    let mut tally = KeyTally::default();

    for visit in &visits {
        match (visit.a, visit.b) {
            (Some(_), Some(_)) => tally.matched += 1,
            (Some(_), None) => tally.only_a += 1,
            (None, Some(_)) => tally.only_b += 1,
            (None, None) => {}
        }

        let deltas: Vec<(String, f64)> = mapping
            .iter()
            .zip(&fields)
            .map(|(pair, field)| {
                let va = visit.a.and_then(|r| r.get(&pair.a));
                let vb = visit.b.and_then(|r| r.get(&pair.b));
                (field.clone(), compare::delta(va, vb))
            })
            .collect();
        if deltas.iter().any(|(_, d)| *d != 0.0) {
            tally.with_differences += 1;
        }

        rows.push(DeltaRow {
            key: visit.key.clone(),
            deltas,
        });
        tally.walked += 1;
        if !tracker.advance() {
            return tracker.aborted();
        }
    }

    tracker.finish();
    debug!("delta walk: {} keys, {} delta fields each", rows.len(), fields.len());
    Outcome::Completed((rows, tally))
}

fn subtract_walk(
    a: &Dataset,
    b: &Dataset,
    key_a: &str,
    key_b: &str,
    pair: &ColumnPair,
    hooks: &mut RunHooks<'_>,
) -> Outcome<(SubtractTable, KeyTally)> {
    let b_index = RecordIndex::build(b, key_b);
    let mut tracker = Tracker::new(hooks, a.len());
    if tracker.cancelled() {
        return tracker.aborted();
    }

    let mut rows = Vec::with_capacity(a.len());
    let mut tally = KeyTally::default();

    for record in &a.records {
        let key = record.key(key_a);
        let rb = b_index.get(&key);
        match rb {
            Some(_) => tally.matched += 1,
            None => tally.only_a += 1,
        }

        let value_a = compare::lenient_number(record.get(&pair.a));
        let value_b = rb.map_or(0.0, |r| compare::lenient_number(r.get(&pair.b)));
        let value = value_a - value_b;
        if value != 0.0 {
            tally.with_differences += 1;
        }

        rows.push(SubtractRow { key, value });
        tally.walked += 1;
        if !tracker.advance() {
            return tracker.aborted();
        }
    }

    tracker.finish();
    Outcome::Completed((
        SubtractTable {
            key_column: key_a.to_string(),
            value_column: pair.subtract_label(),
            rows,
        },
        tally,
    ))
}
