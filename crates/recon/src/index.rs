use std::collections::HashMap;

use log::debug;

use crate::model::{Dataset, Key, Record};

/// Lookup from canonical key to one representative record.
///
/// Duplicate keys collapse: [`RecordIndex::build`] keeps the last record seen
/// for a key, silently dropping earlier ones from comparison.
#[derive(Debug)]
pub struct RecordIndex<'a> {
    by_key: HashMap<Key, &'a Record>,
}

impl<'a> RecordIndex<'a> {
    /// Last-write-wins index of `dataset` by `key_column`.
    pub fn build(dataset: &'a Dataset, key_column: &str) -> Self {
        let mut by_key = HashMap::with_capacity(dataset.len());
        for record in &dataset.records {
            by_key.insert(record.key(key_column), record);
        }
        log_built(dataset, key_column, by_key.len());
        Self { by_key }
    }

    /// First-wins index: the first record carrying a key represents it.
    pub fn build_first_wins(dataset: &'a Dataset, key_column: &str) -> Self {
        let mut by_key = HashMap::with_capacity(dataset.len());
        for record in &dataset.records {
            by_key.entry(record.key(key_column)).or_insert(record);
        }
        log_built(dataset, key_column, by_key.len());
        Self { by_key }
    }

    pub fn get(&self, key: &Key) -> Option<&'a Record> {
        self.by_key.get(key).copied()
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

fn log_built(dataset: &Dataset, key_column: &str, keys: usize) {
    let collapsed = dataset.len() - keys;
    if collapsed > 0 {
        debug!(
            "indexed {} records by '{key_column}' into {keys} keys ({collapsed} duplicates collapsed)",
            dataset.len()
        );
    } else {
        debug!("indexed {} records by '{key_column}'", dataset.len());
    }
}
