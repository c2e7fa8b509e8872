use crate::domain::{field, FieldValue, Row};

/// Identifier/text fields that get trimmed and upper-cased when present and
/// string-typed.
const IDENTIFIER_FIELDS: [&str; 4] = [
    field::ITEM_ID,
    field::ITEM_NAME,
    field::ORDER_ID,
    field::RETURN_ID,
];

/// Normalize a parsed source. Quantity-like fields (name contains "qty",
/// case-insensitive) become finite numbers or null; identifier fields are
/// trimmed and upper-cased. Everything else is left untouched. The caller's
/// rows are never mutated.
pub fn clean_rows(rows: &[Row]) -> Vec<Row> {
    rows.iter().map(clean_row).collect()
}

fn clean_row(row: &Row) -> Row {
    let mut cleaned = Row::new();
    for (name, value) in row.iter() {
        let value = if is_quantity_field(name) {
            coerce_quantity(value)
        } else if IDENTIFIER_FIELDS.contains(&name) {
            canonicalize_identifier(value)
        } else {
            value.clone()
        };
        cleaned.set(name, value);
    }
    cleaned
}

fn is_quantity_field(name: &str) -> bool {
    name.to_ascii_lowercase().contains("qty")
}

/// `""`, null, and `"NA"` become null; anything else is parsed as a number,
/// and values that do not parse to a finite number become null. Quantities
/// never retain a string value.
fn coerce_quantity(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::Null => FieldValue::Null,
        FieldValue::Number(n) if n.is_finite() => FieldValue::Number(*n),
        FieldValue::Number(_) => FieldValue::Null,
        FieldValue::Text(raw) => {
            let raw = raw.trim();
            if raw.is_empty() || raw.eq_ignore_ascii_case("na") {
                return FieldValue::Null;
            }
            match raw.parse::<f64>() {
                Ok(n) if n.is_finite() => FieldValue::Number(n),
                _ => FieldValue::Null,
            }
        }
    }
}

fn canonicalize_identifier(value: &FieldValue) -> FieldValue {
    match value {
        FieldValue::Text(raw) => FieldValue::Text(raw.trim().to_uppercase()),
        other => other.clone(),
    }
}
