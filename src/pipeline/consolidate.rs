use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{field, ConsolidatedView, FieldValue, ManualOverride, Row, SourceTag};
use crate::pipeline::parse_record_date;

/// Merge the cleaned sources into one inventory list, one order list, and
/// one returns list. Rows lacking a key or a parsable update date are
/// dropped; among same-key survivors the most recent `last_updated` wins,
/// with ties broken by source encounter order (legacy, spreadsheet,
/// supplier). Source *priority* weighting is the correction collaborator's
/// job, not this component's; the sole local tie-break is recency.
pub fn consolidate(
    legacy: &[Row],
    spreadsheet: &[Row],
    supplier: &[Row],
    returns: &[Row],
) -> ConsolidatedView {
    let mut inventory = Vec::new();
    inventory.extend(project_inventory(legacy, SourceTag::Legacy));
    inventory.extend(project_inventory(spreadsheet, SourceTag::Spreadsheet));
    inventory.extend(project_supplier_inventory(supplier));
    let inventory = keep_most_recent(inventory, field::ITEM_ID);

    let mut orders = Vec::new();
    orders.extend(project_orders(legacy, SourceTag::Legacy));
    orders.extend(project_orders(spreadsheet, SourceTag::Spreadsheet));
    let orders = keep_most_recent(orders, field::ORDER_ID);

    let returns = returns
        .iter()
        .map(|row| {
            let mut tagged = row.clone();
            tagged.set(field::SOURCE, SourceTag::ReverseLogistics.as_str());
            tagged
        })
        .collect();

    let view = ConsolidatedView {
        inventory,
        orders,
        returns,
    };
    debug!(
        inventory = view.inventory.len(),
        orders = view.orders.len(),
        returns = view.returns.len(),
        "consolidation complete"
    );
    view
}

/// Overlay caller-supplied per-item corrections on top of consolidated
/// inventory. Touched rows are re-tagged `Manual`. The input list is never
/// mutated; overrides for unknown items are ignored.
pub fn apply_manual_overrides(
    inventory: &[Row],
    overrides: &HashMap<String, ManualOverride>,
) -> Vec<Row> {
    inventory
        .iter()
        .map(|row| {
            let Some(id) = row.text(field::ITEM_ID) else {
                return row.clone();
            };
            let Some(patch) = overrides.get(id) else {
                return row.clone();
            };
            let mut patched = row.clone();
            if let Some(qty) = patch.inventory_qty {
                patched.set(field::INVENTORY_QTY, qty);
            }
            if let Some(level) = patch.reorder_level {
                patched.set(field::REORDER_LEVEL, level);
            }
            patched.set(field::SOURCE, SourceTag::Manual.as_str());
            patched
        })
        .collect()
}

fn project_inventory(rows: &[Row], tag: SourceTag) -> Vec<(NaiveDate, Row)> {
    project(
        rows,
        tag,
        field::ITEM_ID,
        &[
            (field::ITEM_ID, field::ITEM_ID),
            (field::ITEM_NAME, field::ITEM_NAME),
            (field::INVENTORY_QTY, field::INVENTORY_QTY),
            (field::LAST_UPDATED, field::LAST_UPDATED),
        ],
        field::LAST_UPDATED,
    )
}

/// The supplier feed describes incoming shipments: `shipment_qty` and
/// `shipment_date` stand in for `inventory_qty` and `last_updated`.
fn project_supplier_inventory(rows: &[Row]) -> Vec<(NaiveDate, Row)> {
    project(
        rows,
        SourceTag::Supplier,
        field::ITEM_ID,
        &[
            (field::ITEM_ID, field::ITEM_ID),
            (field::ITEM_NAME, field::ITEM_NAME),
            (field::SHIPMENT_QTY, field::INVENTORY_QTY),
            (field::SHIPMENT_DATE, field::LAST_UPDATED),
        ],
        field::SHIPMENT_DATE,
    )
}

fn project_orders(rows: &[Row], tag: SourceTag) -> Vec<(NaiveDate, Row)> {
    project(
        rows,
        tag,
        field::ORDER_ID,
        &[
            (field::ORDER_ID, field::ORDER_ID),
            (field::ORDER_QTY, field::ORDER_QTY),
            (field::LAST_UPDATED, field::LAST_UPDATED),
        ],
        field::LAST_UPDATED,
    )
}

/// Project one source into the consolidated shape, dropping rows without a
/// usable key or update date. The parsed date is carried alongside for the
/// recency sort; the rendered row keeps the source's original date text.
fn project(
    rows: &[Row],
    tag: SourceTag,
    key_field: &str,
    mapping: &[(&str, &str)],
    date_field: &str,
) -> Vec<(NaiveDate, Row)> {
    rows.iter()
        .filter_map(|row| {
            if !row.has_value(key_field) {
                return None;
            }
            let updated = row.text(date_field).and_then(parse_record_date)?;
            let mut projected = Row::new();
            for (from, to) in mapping {
                projected.set(
                    *to,
                    row.get(from).cloned().unwrap_or(FieldValue::Null),
                );
            }
            projected.set(field::SOURCE, tag.as_str());
            Some((updated, projected))
        })
        .collect()
}

/// Stable-sort by date descending and keep the first row seen per key.
/// Stability preserves source encounter order for equal dates.
fn keep_most_recent(mut entries: Vec<(NaiveDate, Row)>, key_field: &str) -> Vec<Row> {
    entries.sort_by(|(a, _), (b, _)| b.cmp(a));

    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for (_, row) in entries {
        let Some(key) = row.text(key_field).map(str::to_string) else {
            continue;
        };
        if seen.insert(key) {
            kept.push(row);
        }
    }
    kept
}
