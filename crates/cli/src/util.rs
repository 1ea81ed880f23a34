use tabdiff_recon::ResultTable;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Widest a preview column may grow before its cells are truncated.
pub(crate) const MAX_COLUMN_WIDTH: usize = 40;

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if width < 3 {
        // First char if it fits, else empty
        return s
            .chars()
            .next()
            .filter(|ch| UnicodeWidthChar::width(*ch).unwrap_or(0) <= width)
            .map(String::from)
            .unwrap_or_default();
    }

    if display_width(s) <= width {
        return s.to_string();
    }

    // Leave room for ".."
    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            end_byte = i;
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }

    format!("{}..", &s[..end_byte])
}

/// Pad or truncate a string to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", s, " ".repeat(width - sw))
    }
}

/// Aligned text rendering of a result table: header, rule, rows.
/// Columns are separated by two spaces; trailing blanks are trimmed.
pub(crate) fn render_table(table: &ResultTable) -> String {
    let cells: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.as_text().into_owned()).collect())
        .collect();

    let widths: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .map(|(col, header)| {
            let widest = cells
                .iter()
                .filter_map(|row| row.get(col))
                .map(|c| display_width(c))
                .fold(display_width(header), usize::max);
            widest.min(MAX_COLUMN_WIDTH)
        })
        .collect();

    let mut out = String::new();
    push_line(&mut out, table.headers.iter().map(String::as_str), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for row in &cells {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, values: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let padded: Vec<String> = values.zip(widths).map(|(v, w)| pad_right(v, *w)).collect();
    out.push_str(padded.join("  ").trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabdiff_recon::CellValue;

    #[test]
    fn display_width_cjk() {
        assert_eq!(display_width("hello"), 5);
        assert_eq!(display_width("\u{4e16}\u{754c}"), 4); // "世界"
    }

    #[test]
    fn truncate_cuts() {
        assert_eq!(truncate_display("abc", 3), "abc");
        assert_eq!(truncate_display("abcdef", 5), "abc..");
        assert_eq!(truncate_display("abc", 2), "a");
        assert_eq!(truncate_display("", 0), "");
    }

    #[test]
    fn truncate_cjk_boundary() {
        let s = "\u{4e16}\u{754c}\u{4f60}\u{597d}";
        let t = truncate_display(s, 6);
        assert_eq!(t, "\u{4e16}\u{754c}..");
        assert!(display_width(&t) <= 6);
    }

    #[test]
    fn pad_right_pads_or_truncates() {
        assert_eq!(pad_right("ab", 5), "ab   ");
        assert_eq!(pad_right("abcde", 5), "abcde");
        assert_eq!(pad_right("abcdef", 5), "abc..");
    }

    #[test]
    fn render_aligns_columns() {
        let table = ResultTable {
            headers: vec!["key".into(), "qty_diff".into()],
            rows: vec![
                vec![CellValue::from("10"), CellValue::Number(-2.5)],
                vec![CellValue::from("7"), CellValue::Number(0.0)],
            ],
        };
        assert_eq!(
            render_table(&table),
            "key  qty_diff\n---  --------\n10   -2.5\n7    0\n"
        );
    }

    #[test]
    fn render_truncates_wide_cells() {
        let long = "x".repeat(MAX_COLUMN_WIDTH + 10);
        let table = ResultTable {
            headers: vec!["key".into()],
            rows: vec![vec![CellValue::from(long.as_str())]],
        };
        let rendered = render_table(&table);
        let last = rendered.lines().last().unwrap();
        assert_eq!(display_width(last), MAX_COLUMN_WIDTH);
        assert!(last.ends_with(".."));
    }

    #[test]
    fn render_empty_table_keeps_header() {
        let table = ResultTable {
            headers: vec!["key".into(), "column".into()],
            rows: vec![],
        };
        assert_eq!(render_table(&table), "key  column\n---  ------\n");
    }
}
