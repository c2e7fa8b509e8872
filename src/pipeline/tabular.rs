use tracing::debug;

use crate::domain::{FieldValue, Row};

/// Parse raw delimited text into rows. First line is the header; each data
/// line is split strictly on the delimiter and paired positionally with the
/// header names. Values empty after trimming become null; missing trailing
/// fields become null; extra trailing fields are ignored. Header-only or
/// empty input yields no rows.
pub fn parse_delimited(text: &str, delimiter: char) -> Vec<Row> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header: Vec<String> = match lines.next() {
        Some(line) => split_line(line, delimiter)
            .into_iter()
            .map(|f| f.trim().to_string())
            .collect(),
        None => return Vec::new(),
    };

    let mut rows = Vec::new();
    for line in lines {
        let values = split_line(line, delimiter);
        let mut row = Row::new();
        for (i, name) in header.iter().enumerate() {
            let value = match values.get(i) {
                Some(raw) if !raw.trim().is_empty() => {
                    FieldValue::Text(raw.trim().to_string())
                }
                _ => FieldValue::Null,
            };
            row.set(name.clone(), value);
        }
        rows.push(row);
    }

    debug!(rows = rows.len(), columns = header.len(), "parsed delimited text");
    rows
}

/// Render rows back to delimited text. The header is the union of field
/// names across all rows in first-seen order; nulls render as empty, and any
/// value containing the delimiter is quote-wrapped.
pub fn render_delimited(rows: &[Row], delimiter: char) -> String {
    let mut header: Vec<&str> = Vec::new();
    for row in rows {
        for name in row.field_names() {
            if !header.contains(&name) {
                header.push(name);
            }
        }
    }

    let mut out = String::new();
    out.push_str(
        &header
            .iter()
            .map(|name| quote_if_needed(name, delimiter))
            .collect::<Vec<_>>()
            .join(&delimiter.to_string()),
    );
    out.push('\n');

    for row in rows {
        let line = header
            .iter()
            .map(|name| match row.get(name) {
                Some(FieldValue::Text(s)) => quote_if_needed(s, delimiter),
                Some(FieldValue::Number(n)) => n.to_string(),
                Some(FieldValue::Null) | None => String::new(),
            })
            .collect::<Vec<_>>()
            .join(&delimiter.to_string());
        out.push_str(&line);
        out.push('\n');
    }

    out
}

/// Strict split: no escaping, no quoted delimiters. A single pair of
/// surrounding double quotes per field is stripped after the split.
fn split_line(line: &str, delimiter: char) -> Vec<String> {
    line.trim_end_matches('\r')
        .split(delimiter)
        .map(|field| strip_surrounding_quotes(field.trim()).to_string())
        .collect()
}

fn strip_surrounding_quotes(field: &str) -> &str {
    if field.len() >= 2 && field.starts_with('"') && field.ends_with('"') {
        &field[1..field.len() - 1]
    } else {
        field
    }
}

fn quote_if_needed(value: &str, delimiter: char) -> String {
    if value.contains(delimiter) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_rows_positionally() {
        let text = "item_id,item_name,inventory_qty\nA1,Widget,100\nB2,Gear,\n";
        let rows = parse_delimited(text, ',');
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text("item_id"), Some("A1"));
        assert_eq!(rows[0].text("inventory_qty"), Some("100"));
        assert_eq!(rows[1].get("inventory_qty"), Some(&FieldValue::Null));
    }

    #[test]
    fn empty_and_header_only_inputs_yield_no_rows() {
        assert!(parse_delimited("", ',').is_empty());
        assert!(parse_delimited("item_id,item_name\n", ',').is_empty());
        assert!(parse_delimited("\n\n", ',').is_empty());
    }

    #[test]
    fn missing_trailing_fields_become_null_and_extras_are_ignored() {
        let rows = parse_delimited("a,b,c\n1,2\nx,y,z,extra\n", ',');
        assert_eq!(rows[0].get("c"), Some(&FieldValue::Null));
        assert_eq!(rows[1].text("c"), Some("z"));
        assert_eq!(rows[1].len(), 3);
    }

    #[test]
    fn strips_a_single_pair_of_surrounding_quotes() {
        let rows = parse_delimited("a,b\n\"hello\",\"\"wrapped\"\"\n", ',');
        assert_eq!(rows[0].text("a"), Some("hello"));
        // Only one pair is stripped.
        assert_eq!(rows[0].text("b"), Some("\"wrapped\""));
    }

    #[test]
    fn handles_crlf_line_endings() {
        let rows = parse_delimited("a,b\r\n1,2\r\n", ',');
        assert_eq!(rows[0].text("b"), Some("2"));
    }

    #[test]
    fn renders_union_header_nulls_and_delimiter_quoting() {
        let rows = vec![
            Row::from_pairs([
                ("item_id", FieldValue::Text("A1".into())),
                ("note", FieldValue::Text("red, large".into())),
            ]),
            Row::from_pairs([
                ("item_id", FieldValue::Text("B2".into())),
                ("inventory_qty", FieldValue::Number(7.0)),
            ]),
        ];
        let text = render_delimited(&rows, ',');
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("item_id,note,inventory_qty"));
        assert_eq!(lines.next(), Some("A1,\"red, large\","));
        assert_eq!(lines.next(), Some("B2,,7"));
    }

    #[test]
    fn render_parse_round_trip_recovers_values() {
        let rows = vec![
            Row::from_pairs([
                ("item_id", FieldValue::Text("A1".into())),
                ("inventory_qty", FieldValue::Number(100.0)),
                ("last_updated", FieldValue::Text("2024-01-01".into())),
            ]),
            Row::from_pairs([
                ("item_id", FieldValue::Text("B2".into())),
                ("inventory_qty", FieldValue::Null),
                ("last_updated", FieldValue::Text("2024-01-02".into())),
            ]),
        ];
        let reparsed = parse_delimited(&render_delimited(&rows, ','), ',');
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[0].text("item_id"), Some("A1"));
        assert_eq!(reparsed[0].text("inventory_qty"), Some("100"));
        assert_eq!(reparsed[1].get("inventory_qty"), Some(&FieldValue::Null));
        assert_eq!(reparsed[1].text("last_updated"), Some("2024-01-02"));
    }
}
