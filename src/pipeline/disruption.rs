use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{field, DisruptionAnalysis, MissingDataStats, Row};
use crate::pipeline::parse_record_date;

/// Default trailing window for classifying supplier shipments as in transit.
pub const DEFAULT_IN_TRANSIT_WINDOW_DAYS: i64 = 14;

const INVENTORY_REQUIRED: [&str; 3] =
    [field::ITEM_ID, field::INVENTORY_QTY, field::LAST_UPDATED];
const ORDER_REQUIRED: [&str; 3] = [field::ORDER_ID, field::ORDER_QTY, field::LAST_UPDATED];

/// Compute missing-field rates across the two peer sources and flag supplier
/// shipments still plausibly in transit. These are statistics, not errors:
/// the analyzer always succeeds.
pub fn analyze(
    legacy: &[Row],
    spreadsheet: &[Row],
    supplier: &[Row],
    window_days: i64,
    evaluated_at: DateTime<Utc>,
) -> DisruptionAnalysis {
    let combined: Vec<&Row> = legacy.iter().chain(spreadsheet.iter()).collect();

    let missing_inventory_data =
        missing_stats(&combined, field::ITEM_ID, &INVENTORY_REQUIRED);
    let missing_order_data = missing_stats(&combined, field::ORDER_ID, &ORDER_REQUIRED);
    let in_transit_orders = in_transit(supplier, window_days, evaluated_at);

    debug!(
        missing_inventory = missing_inventory_data.count,
        missing_orders = missing_order_data.count,
        in_transit = in_transit_orders.len(),
        "disruption analysis complete"
    );

    DisruptionAnalysis {
        missing_inventory_data,
        missing_order_data,
        in_transit_orders,
    }
}

/// Over all rows carrying `key_field`, count those missing at least one
/// required field. Percentage is rounded to one decimal and is 0 when the
/// population is empty.
fn missing_stats(rows: &[&Row], key_field: &str, required: &[&str]) -> MissingDataStats {
    let mut total = 0;
    let mut count = 0;
    for row in rows.iter().filter(|r| r.has_value(key_field)) {
        total += 1;
        if required.iter().any(|f| !row.has_value(f)) {
            count += 1;
        }
    }

    let percentage = if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64 * 1000.0).round() / 10.0
    };

    MissingDataStats {
        count,
        total,
        percentage,
    }
}

/// A supplier shipment is in transit when its `shipment_date` falls within
/// the trailing window ending at the evaluation instant. Unparsable dates
/// are excluded, never treated as in transit.
fn in_transit(supplier: &[Row], window_days: i64, evaluated_at: DateTime<Utc>) -> Vec<Row> {
    let today = evaluated_at.date_naive();
    supplier
        .iter()
        .filter(|row| {
            row.text(field::SHIPMENT_DATE)
                .and_then(parse_record_date)
                .is_some_and(|shipped| {
                    let age_days = (today - shipped).num_days();
                    (0..=window_days).contains(&age_days)
                })
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FieldValue;
    use chrono::Duration;

    fn eval_time() -> DateTime<Utc> {
        "2024-06-15T12:00:00Z".parse().unwrap()
    }

    fn shipment(days_before: i64) -> Row {
        let date = (eval_time() - Duration::days(days_before))
            .date_naive()
            .format("%m/%d/%Y")
            .to_string();
        Row::from_pairs([
            ("item_id", FieldValue::Text("A1".into())),
            ("shipment_date", FieldValue::Text(date)),
        ])
    }

    #[test]
    fn counts_rows_missing_required_fields() {
        let legacy = vec![
            Row::from_pairs([
                ("item_id", FieldValue::Text("A1".into())),
                ("inventory_qty", FieldValue::Number(10.0)),
                ("last_updated", FieldValue::Text("2024-01-01".into())),
            ]),
            Row::from_pairs([
                ("item_id", FieldValue::Text("B2".into())),
                ("inventory_qty", FieldValue::Null),
                ("last_updated", FieldValue::Text("2024-01-01".into())),
            ]),
        ];
        let spreadsheet = vec![Row::from_pairs([
            ("item_id", FieldValue::Text("C3".into())),
            ("inventory_qty", FieldValue::Number(5.0)),
        ])];

        let analysis = analyze(&legacy, &spreadsheet, &[], 14, eval_time());
        assert_eq!(analysis.missing_inventory_data.total, 3);
        assert_eq!(analysis.missing_inventory_data.count, 2);
        assert_eq!(analysis.missing_inventory_data.percentage, 66.7);
    }

    #[test]
    fn empty_population_reports_zero_percentage() {
        let analysis = analyze(&[], &[], &[], 14, eval_time());
        assert_eq!(analysis.missing_inventory_data.total, 0);
        assert_eq!(analysis.missing_inventory_data.percentage, 0.0);
        assert_eq!(analysis.missing_order_data.percentage, 0.0);
    }

    #[test]
    fn percentages_stay_within_bounds() {
        let legacy = vec![Row::from_pairs([("order_id", FieldValue::Text("O1".into()))])];
        let analysis = analyze(&legacy, &[], &[], 14, eval_time());
        let pct = analysis.missing_order_data.percentage;
        assert!((0.0..=100.0).contains(&pct));
        assert_eq!(pct, 100.0);
    }

    #[test]
    fn shipments_inside_the_window_are_in_transit() {
        let supplier = vec![shipment(10), shipment(20)];
        let analysis = analyze(&[], &[], &supplier, 14, eval_time());
        assert_eq!(analysis.in_transit_orders.len(), 1);
        assert_eq!(
            analysis.in_transit_orders[0].text("shipment_date"),
            supplier[0].text("shipment_date")
        );
    }

    #[test]
    fn iso_dates_are_also_recognized() {
        let supplier = vec![Row::from_pairs([(
            "shipment_date",
            FieldValue::Text("2024-06-10".into()),
        )])];
        let analysis = analyze(&[], &[], &supplier, 14, eval_time());
        assert_eq!(analysis.in_transit_orders.len(), 1);
    }

    #[test]
    fn unparsable_dates_are_never_in_transit() {
        let supplier = vec![
            Row::from_pairs([("shipment_date", FieldValue::Text("soon".into()))]),
            Row::from_pairs([("shipment_date", FieldValue::Null)]),
            Row::from_pairs([("item_id", FieldValue::Text("A1".into()))]),
        ];
        let analysis = analyze(&[], &[], &supplier, 14, eval_time());
        assert!(analysis.in_transit_orders.is_empty());
    }

    #[test]
    fn future_dated_shipments_are_outside_the_trailing_window() {
        let supplier = vec![shipment(-3)];
        let analysis = analyze(&[], &[], &supplier, 14, eval_time());
        assert!(analysis.in_transit_orders.is_empty());
    }
}
