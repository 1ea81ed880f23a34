//! Flat tabular view of a report, shared by the preview and file exporters.

use crate::model::{CellValue, ColumnPair, ReconOutput, ReconReport};

/// Header of the structural long format.
pub const STRUCTURAL_HEADERS: [&str; 4] = ["key", "column", "valueA", "valueB"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl ResultTable {
    pub fn from_report(report: &ReconReport) -> Self {
        match &report.results {
            ReconOutput::Structural(rows) => Self {
                headers: STRUCTURAL_HEADERS.iter().map(|h| h.to_string()).collect(),
                rows: rows
                    .iter()
                    .map(|r| {
                        vec![
                            CellValue::from(r.key.as_str()),
                            CellValue::from(r.column.as_str()),
                            CellValue::from(r.value_a.as_str()),
                            CellValue::from(r.value_b.as_str()),
                        ]
                    })
                    .collect(),
            },
            ReconOutput::Delta(rows) => {
                let headers = std::iter::once("key".to_string())
                    .chain(report.meta.mapping.iter().map(ColumnPair::delta_field))
                    .collect();
                let rows = rows
                    .iter()
                    .map(|r| {
                        std::iter::once(CellValue::from(r.key.as_str()))
                            .chain(r.deltas.iter().map(|(_, d)| CellValue::Number(*d)))
                            .collect()
                    })
                    .collect();
                Self { headers, rows }
            }
            ReconOutput::Subtract(table) => Self {
                headers: vec![table.key_column.clone(), table.value_column.clone()],
                rows: table
                    .rows
                    .iter()
                    .map(|r| vec![CellValue::from(r.key.as_str()), CellValue::Number(r.value)])
                    .collect(),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First `n` rows; the headers are kept.
    pub fn head(&self, n: usize) -> ResultTable {
        Self {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DeltaRow, DiffRow, Key, ReconMeta, ReconMode, ReconSummary, SubtractRow, SubtractTable,
    };

    fn report(mapping: Vec<ColumnPair>, results: ReconOutput) -> ReconReport {
        ReconReport {
            meta: ReconMeta {
                name: None,
                mode: ReconMode::Structural,
                key_a: "id".into(),
                key_b: "id".into(),
                mapping,
                order: None,
                engine_version: "test".into(),
                run_at: "now".into(),
            },
            summary: ReconSummary::default(),
            results,
        }
    }

    #[test]
    fn structural_long_format() {
        let r = report(
            vec![ColumnPair::new("x", "y")],
            ReconOutput::Structural(vec![DiffRow {
                key: Key::from("1"),
                column: "y".into(),
                value_a: "a".into(),
                value_b: "".into(),
            }]),
        );
        let t = ResultTable::from_report(&r);
        assert_eq!(t.headers, vec!["key", "column", "valueA", "valueB"]);
        assert_eq!(t.rows[0][3], CellValue::from(""));
    }

    #[test]
    fn delta_headers_follow_mapping_even_when_empty() {
        let r = report(
            vec![ColumnPair::new("q", "qty"), ColumnPair::new("p", "price")],
            ReconOutput::Delta(Vec::new()),
        );
        let t = ResultTable::from_report(&r);
        assert_eq!(t.headers, vec!["key", "qty_diff", "price_diff"]);
        assert!(t.is_empty());
    }

    #[test]
    fn delta_rows_are_numbers() {
        let r = report(
            vec![ColumnPair::new("q", "qty")],
            ReconOutput::Delta(vec![DeltaRow {
                key: Key::from("k"),
                deltas: vec![("qty_diff".into(), -2.5)],
            }]),
        );
        let t = ResultTable::from_report(&r);
        assert_eq!(t.rows[0], vec![CellValue::from("k"), CellValue::Number(-2.5)]);
    }

    #[test]
    fn subtract_uses_key_and_label() {
        let r = report(
            vec![ColumnPair::new("amt", "paid")],
            ReconOutput::Subtract(SubtractTable {
                key_column: "id".into(),
                value_column: "amt - paid".into(),
                rows: vec![
                    SubtractRow { key: Key::from("1"), value: 4.0 },
                    SubtractRow { key: Key::from("2"), value: 0.0 },
                ],
            }),
        );
        let t = ResultTable::from_report(&r);
        assert_eq!(t.headers, vec!["id", "amt - paid"]);
        assert_eq!(t.head(1).len(), 1);
        assert_eq!(t.head(10).len(), 2);
    }
}
