//! Key universe resolution: which keys a walk visits, in which order, and
//! which record represents each side of a key.

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::index::RecordIndex;
use crate::model::{Dataset, Key, Record};

/// Iteration order of the union keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnionOrder {
    /// Natural key order: numeric keys by value, then text keys.
    #[default]
    Sorted,
    /// A keys in A order, then B-only keys in B order.
    FirstSeen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPolicy {
    /// Every key appearing on either side, once.
    Union(UnionOrder),
    /// B records in B order, then A keys absent from B in A order.
    BDrivenWithResidual,
}

/// One step of a walk: a key and the record representing it on each side.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit<'a> {
    pub key: Key,
    pub a: Option<&'a Record>,
    pub b: Option<&'a Record>,
}

/// Deduplicated A ∪ B keys in the requested order.
pub fn union_keys(
    a: &Dataset,
    key_a: &str,
    b: &Dataset,
    key_b: &str,
    order: UnionOrder,
) -> Vec<Key> {
    let mut seen = HashSet::with_capacity(a.len() + b.len());
    let mut keys = Vec::with_capacity(a.len() + b.len());
    let side_a = a.records.iter().map(|r| r.key(key_a));
    let side_b = b.records.iter().map(|r| r.key(key_b));
    for key in side_a.chain(side_b) {
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }
    if order == UnionOrder::Sorted {
        keys.sort();
    }
    keys
}

/// Resolve the visits of a walk under `policy`.
///
/// Under the union policy the A side is indexed last-write-wins and the B
/// side first-wins. Under the B-driven policy every B record is visited in
/// order (duplicates included), and each residual A key is visited once,
/// represented by its last-write-wins record, at its first position in A.
pub fn resolve<'a>(
    policy: JoinPolicy,
    a: &'a Dataset,
    key_a: &str,
    b: &'a Dataset,
    key_b: &str,
) -> Vec<Visit<'a>> {
    let a_index = RecordIndex::build(a, key_a);
    let visits = match policy {
        JoinPolicy::Union(order) => {
            let b_index = RecordIndex::build_first_wins(b, key_b);
            union_keys(a, key_a, b, key_b, order)
                .into_iter()
                .map(|key| Visit {
                    a: a_index.get(&key),
                    b: b_index.get(&key),
                    key,
                })
                .collect::<Vec<_>>()
        }
        JoinPolicy::BDrivenWithResidual => b_driven_with_residual(&a_index, a, key_a, b, key_b),
    };
    debug!("resolved {} visits under {:?}", visits.len(), policy);
    visits
}

fn b_driven_with_residual<'a>(
    a_index: &RecordIndex<'a>,
    a: &'a Dataset,
    key_a: &str,
    b: &'a Dataset,
    key_b: &str,
) -> Vec<Visit<'a>> {
    let mut visits = Vec::with_capacity(b.len());
    let mut b_keys = HashSet::with_capacity(b.len());

    for record in &b.records {
        let key = record.key(key_b);
        b_keys.insert(key.clone());
        visits.push(Visit {
            a: a_index.get(&key),
            b: Some(record),
            key,
        });
    }

    let mut residual_seen = HashSet::new();
    for record in &a.records {
        let key = record.key(key_a);
        if b_keys.contains(&key) || !residual_seen.insert(key.clone()) {
            continue;
        }
        visits.push(Visit {
            a: Some(a_index.get(&key).unwrap_or(record)),
            b: None,
            key,
        });
    }

    visits
}
