use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ReconError;
use crate::universe::UnionOrder;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A raw cell as handed over by a parser.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

impl CellValue {
    /// Text form used for structural comparison and key canonicalization.
    /// Empty cells render as `""`, numbers via [`format_number`].
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Empty => Cow::Borrowed(""),
            Self::Text(s) => Cow::Borrowed(s.as_str()),
            Self::Number(n) => Cow::Owned(format_number(*n)),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            Self::Number(_) => false,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Number(n) => serializer.serialize_f64(*n),
        }
    }
}

/// Canonical number rendering: integral values print without a fractional
/// part, everything else uses the shortest round-trip decimal.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// One flat record: column name to raw cell. Columns not present read as absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: HashMap<String, CellValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields.get(column)
    }

    /// Join identity of this record under `key_column`.
    pub fn key(&self, key_column: &str) -> Key {
        Key::from_cell(self.get(key_column))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.insert(column, value);
        }
        record
    }
}

/// Ordered records plus the advisory header list the parser saw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, records: Vec<Record>) -> Self {
        Self { headers, records }
    }

    /// Build a dataset whose headers are the sorted union of record columns.
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut headers: Vec<String> = records
            .iter()
            .flat_map(|r| r.columns().map(str::to_string))
            .collect();
        headers.sort();
        headers.dedup();
        Self { headers, records }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Canonical string form of a key cell. The number `1` and the text `"1"`
/// are the same key; `"1.0"` is a different one. Absent and empty cells
/// share the empty key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn from_cell(cell: Option<&CellValue>) -> Self {
        match cell {
            Some(value) => Self(value.as_text().into_owned()),
            None => Self::default(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn numeric(&self) -> Option<f64> {
        let trimmed = self.0.trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
    }
}

/// Natural order: numeric keys first, by value; then text keys, by string.
/// Ties between equal numbers with different spellings fall back to the string.
impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.total_cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::A => "A",
            Side::B => "B",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declares that column `a` of dataset A corresponds to column `b` of dataset B.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnPair {
    pub a: String,
    pub b: String,
}

impl ColumnPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self { a: a.into(), b: b.into() }
    }

    pub fn is_complete(&self) -> bool {
        !self.a.is_empty() && !self.b.is_empty()
    }

    /// Field name carrying this pair's value in a delta row.
    pub fn delta_field(&self) -> String {
        format!("{}_diff", self.b)
    }

    /// Column label of the single-column subtraction table.
    pub fn subtract_label(&self) -> String {
        format!("{} - {}", self.a, self.b)
    }
}

/// Parses `a=b`, or a bare `name` meaning the same column on both sides.
impl FromStr for ColumnPair {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = match s.split_once('=') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (s.trim(), s.trim()),
        };
        if a.is_empty() || b.is_empty() {
            return Err(ReconError::InvalidColumnPair(s.to_string()));
        }
        Ok(Self::new(a, b))
    }
}

impl fmt::Display for ColumnPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.a, self.b)
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconMode {
    /// Long-format field mismatches, B-driven walk with an A residual pass.
    #[default]
    Structural,
    /// Wide-format numeric deltas over the union of keys.
    Delta,
    /// A-driven single-column subtraction using the first mapping entry.
    Subtract,
}

impl ReconMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Structural => "structural",
            Self::Delta => "delta",
            Self::Subtract => "subtract",
        }
    }
}

impl fmt::Display for ReconMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the engine needs besides the two datasets.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconRequest {
    pub name: Option<String>,
    pub mode: ReconMode,
    pub key_a: String,
    pub key_b: String,
    pub mapping: Vec<ColumnPair>,
    pub order: UnionOrder,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One field-level disagreement, or one field of a one-sided key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRow {
    pub key: Key,
    /// B-side column name of the mapping entry; the A-side name on rows
    /// for keys absent from B.
    pub column: String,
    #[serde(rename = "valueA")]
    pub value_a: String,
    #[serde(rename = "valueB")]
    pub value_b: String,
}

/// One key of the union keyspace with a delta per mapping entry.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRow {
    pub key: Key,
    /// `(<b>_diff, a - b)` in mapping order.
    pub deltas: Vec<(String, f64)>,
}

impl DeltaRow {
    pub fn get(&self, field: &str) -> Option<f64> {
        self.deltas.iter().find(|(name, _)| name == field).map(|(_, v)| *v)
    }
}

impl Serialize for DeltaRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.deltas.len() + 1))?;
        map.serialize_entry("key", &self.key)?;
        for (field, value) in &self.deltas {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtractRow {
    pub key: Key,
    pub value: f64,
}

/// Single-column subtraction: one row per A record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtractTable {
    pub key_column: String,
    pub value_column: String,
    pub rows: Vec<SubtractRow>,
}

/// Result of a walk that may have been cancelled.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Aborted { processed: usize, total: usize },
}

impl<T> Outcome<T> {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Aborted { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Completed(value) => Outcome::Completed(f(value)),
            Self::Aborted { processed, total } => Outcome::Aborted { processed, total },
        }
    }

    pub fn into_result(self) -> Result<T, ReconError> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Aborted { processed, total } => Err(ReconError::Aborted { processed, total }),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReconOutput {
    Structural(Vec<DiffRow>),
    Delta(Vec<DeltaRow>),
    Subtract(SubtractTable),
}

impl ReconOutput {
    pub fn len(&self) -> usize {
        match self {
            Self::Structural(rows) => rows.len(),
            Self::Delta(rows) => rows.len(),
            Self::Subtract(table) => table.rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mode: ReconMode,
    pub key_a: String,
    pub key_b: String,
    pub mapping: Vec<ColumnPair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<UnionOrder>,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub rows_a: usize,
    pub rows_b: usize,
    /// Units walked: B records plus residual A keys (structural), union keys
    /// (delta) or A records (subtract).
    pub keys_walked: usize,
    pub matched: usize,
    pub only_a: usize,
    pub only_b: usize,
    pub keys_with_differences: usize,
    pub result_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub results: ReconOutput,
}

impl ReconReport {
    /// True when the datasets disagree: any structural row, any one-sided key,
    /// or any non-zero delta.
    pub fn has_differences(&self) -> bool {
        let s = &self.summary;
        match self.results {
            ReconOutput::Structural(ref rows) => !rows.is_empty(),
            ReconOutput::Delta(_) | ReconOutput::Subtract(_) => {
                s.only_a > 0 || s.only_b > 0 || s.keys_with_differences > 0
            }
        }
    }
}
