use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::domain::{field, FieldValue, Inconsistency, Row};

pub const INVENTORY_QTY_DISCREPANCY: &str = "Inventory Quantity Discrepancy";
pub const ORDER_QTY_DISCREPANCY: &str = "Order Quantity Discrepancy";

/// Compare the two peer sources on shared keys and flag quantity mismatches.
/// A pair is flagged only when both sides carry a quantity and the values
/// differ; missing-on-one-side is the disruption analyzer's concern. Returns
/// at most one entry per discrepancy type, omitted when no rows qualify.
pub fn detect(legacy: &[Row], spreadsheet: &[Row]) -> Vec<Inconsistency> {
    let mut inconsistencies = Vec::new();

    let inventory = joined_discrepancies(
        legacy,
        spreadsheet,
        field::ITEM_ID,
        field::INVENTORY_QTY,
    );
    if !inventory.is_empty() {
        inconsistencies.push(Inconsistency {
            kind: INVENTORY_QTY_DISCREPANCY.to_string(),
            details: inventory,
        });
    }

    let orders = joined_discrepancies(legacy, spreadsheet, field::ORDER_ID, field::ORDER_QTY);
    if !orders.is_empty() {
        inconsistencies.push(Inconsistency {
            kind: ORDER_QTY_DISCREPANCY.to_string(),
            details: orders,
        });
    }

    debug!(classes = inconsistencies.len(), "inconsistency detection complete");
    inconsistencies
}

/// Full-outer join of the two sources on `key_field`, comparing `qty_field`.
/// Each mismatch produces a detail row holding the key plus both sides'
/// quantities under source-suffixed names.
fn joined_discrepancies(
    legacy: &[Row],
    spreadsheet: &[Row],
    key_field: &str,
    qty_field: &str,
) -> Vec<Row> {
    let legacy_entries = first_occurrence_by_key(legacy, key_field, qty_field);
    let spreadsheet_entries = first_occurrence_by_key(spreadsheet, key_field, qty_field);
    let spreadsheet_lookup: HashMap<&str, Option<f64>> = spreadsheet_entries
        .iter()
        .map(|(key, qty)| (key.as_str(), *qty))
        .collect();

    let mut details = Vec::new();
    for (key, legacy_qty) in &legacy_entries {
        let spreadsheet_qty = spreadsheet_lookup.get(key.as_str()).copied().flatten();
        if let (Some(a), Some(b)) = (legacy_qty, spreadsheet_qty) {
            if *a != b {
                let mut detail = Row::new();
                detail.set(key_field, FieldValue::Text(key.clone()));
                detail.set(format!("{qty_field}_legacy"), FieldValue::Number(*a));
                detail.set(format!("{qty_field}_spreadsheet"), FieldValue::Number(b));
                details.push(detail);
            }
        }
    }
    // Keys only present in the spreadsheet can never pair, so the outer join
    // adds no further discrepancies; both-sided keys were all visited above.
    details
}

/// Key → quantity for the first occurrence of each key within one source.
fn first_occurrence_by_key(
    rows: &[Row],
    key_field: &str,
    qty_field: &str,
) -> Vec<(String, Option<f64>)> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for row in rows {
        let Some(key) = row.text(key_field) else {
            continue;
        };
        if seen.insert(key.to_string()) {
            entries.push((key.to_string(), row.number(qty_field)));
        }
    }
    entries
}
