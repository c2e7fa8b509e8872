use std::collections::HashMap;

use tracing::debug;

use crate::domain::{field, CorrectedBundle, Row, SourceBundle};

const INVENTORY_WRITE_BACK: [&str; 3] =
    [field::ITEM_NAME, field::INVENTORY_QTY, field::LAST_UPDATED];
const ORDER_WRITE_BACK: [&str; 2] = [field::ORDER_QTY, field::LAST_UPDATED];

/// Write corrected field values back into the per-source rows of the two
/// peer sources. Supplier and reverse-logistics rows are ground truth and
/// are never rewritten; the historical backup is likewise carried through
/// untouched. Operates on a deep copy of the caller's bundle.
pub fn merge_corrections(sources: &SourceBundle, corrected: &CorrectedBundle) -> SourceBundle {
    let inventory_by_id = index_by(&corrected.consolidated_inventory, field::ITEM_ID);
    let orders_by_id = index_by(&corrected.consolidated_orders, field::ORDER_ID);

    let mut merged = sources.clone();
    let mut touched = 0usize;
    for rows in [&mut merged.legacy, &mut merged.spreadsheet] {
        for row in rows.iter_mut() {
            touched += merge_row(row, &inventory_by_id, &orders_by_id);
        }
    }

    debug!(rows_updated = touched, "correction merge complete");
    merged
}

/// Apply any matching inventory and order corrections to one source row.
/// Returns 1 when the row was modified.
fn merge_row(
    row: &mut Row,
    inventory_by_id: &HashMap<&str, &Row>,
    orders_by_id: &HashMap<&str, &Row>,
) -> usize {
    let mut changed = false;

    if let Some(corrected) = row.text(field::ITEM_ID).and_then(|id| inventory_by_id.get(id)) {
        changed |= overwrite_fields(row, corrected, &INVENTORY_WRITE_BACK);
    }
    if let Some(corrected) = row.text(field::ORDER_ID).and_then(|id| orders_by_id.get(id)) {
        changed |= overwrite_fields(row, corrected, &ORDER_WRITE_BACK);
    }

    usize::from(changed)
}

/// Overwrite only the known overlapping fields, and only those the corrected
/// row actually carries.
fn overwrite_fields(row: &mut Row, corrected: &Row, fields: &[&str]) -> bool {
    let mut changed = false;
    for name in fields {
        if let Some(value) = corrected.get(name) {
            if row.get(name) != Some(value) {
                row.set(*name, value.clone());
                changed = true;
            }
        }
    }
    changed
}

fn index_by<'a>(rows: &'a [Row], key_field: &str) -> HashMap<&'a str, &'a Row> {
    let mut index = HashMap::new();
    for row in rows {
        if let Some(key) = row.text(key_field) {
            index.entry(key).or_insert(row);
        }
    }
    index
}
