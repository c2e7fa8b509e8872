use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Result;

/// Well-known field names understood by the downstream pipeline stages.
/// The parser itself enforces no schema; these are the names consumers
/// look up.
pub mod field {
    pub const ITEM_ID: &str = "item_id";
    pub const ITEM_NAME: &str = "item_name";
    pub const INVENTORY_QTY: &str = "inventory_qty";
    pub const ORDER_ID: &str = "order_id";
    pub const ORDER_QTY: &str = "order_qty";
    pub const RETURN_ID: &str = "return_id";
    pub const RETURNED_QTY: &str = "returned_qty";
    pub const RETURN_DATE: &str = "return_date";
    pub const LAST_UPDATED: &str = "last_updated";
    pub const SHIPMENT_DATE: &str = "shipment_date";
    pub const SHIPMENT_QTY: &str = "shipment_qty";
    pub const REORDER_LEVEL: &str = "reorder_level";

    /// Provenance tag attached to every consolidated row.
    pub const SOURCE: &str = "_source";
    /// Free-text explanation attached by the correction collaborator when a
    /// non-trivial fix was made.
    pub const AI_EXPLANATION: &str = "_ai_explanation";
}

/// A single field value: string, number, or null. Quantities are numbers
/// after cleaning; everything else stays a string until a consumer parses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

/// An ordered mapping of field name to value. Field sets legitimately differ
/// per source, so rows carry whatever the export contained rather than a
/// fixed struct. Insertion order is preserved through JSON round trips.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, FieldValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<FieldValue>,
    {
        let mut row = Row::new();
        for (name, value) in pairs {
            row.set(name, value);
        }
        row
    }

    /// Set a field, replacing an existing value in place (position kept) or
    /// appending a new field at the end.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter().position(|(n, _)| *n == name) {
            Some(index) => self.fields[index].1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// The field exists and holds a non-null value.
    pub fn has_value(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_null())
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_number)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RowVisitor;

        impl<'de> Visitor<'de> for RowVisitor {
            type Value = Row;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a map of field names to string/number/null values")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Row, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut row = Row::new();
                while let Some((name, value)) = access.next_entry::<String, FieldValue>()? {
                    row.set(name, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RowVisitor)
    }
}

/// Record provenance. Attached to consolidated rows as `_source`; never
/// present on raw source rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceTag {
    Legacy,
    Spreadsheet,
    Supplier,
    ReverseLogistics,
    Historical,
    Manual,
    #[serde(rename = "AI-Corrected")]
    AiCorrected,
    Unknown,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Legacy => "Legacy",
            SourceTag::Spreadsheet => "Spreadsheet",
            SourceTag::Supplier => "Supplier",
            SourceTag::ReverseLogistics => "ReverseLogistics",
            SourceTag::Historical => "Historical",
            SourceTag::Manual => "Manual",
            SourceTag::AiCorrected => "AI-Corrected",
            SourceTag::Unknown => "Unknown",
        }
    }

    /// Parse a `_source` value coming back from the collaborator. Anything
    /// unrecognized maps to `Unknown` rather than failing the row.
    pub fn parse(value: &str) -> SourceTag {
        match value {
            "Legacy" => SourceTag::Legacy,
            "Spreadsheet" => SourceTag::Spreadsheet,
            "Supplier" => SourceTag::Supplier,
            "ReverseLogistics" => SourceTag::ReverseLogistics,
            "Historical" => SourceTag::Historical,
            "Manual" => SourceTag::Manual,
            "AI-Corrected" => SourceTag::AiCorrected,
            _ => SourceTag::Unknown,
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The cleaned per-source row sets for one reconciliation run. Optional
/// sources are present as empty lists when not provided.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBundle {
    pub legacy: Vec<Row>,
    pub spreadsheet: Vec<Row>,
    pub supplier: Vec<Row>,
    pub reverse_logistics: Vec<Row>,
    #[serde(rename = "historicalBackup")]
    pub historical: Vec<Row>,
}

/// One class of detected cross-source mismatch, with the joined rows that
/// disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inconsistency {
    #[serde(rename = "type")]
    pub kind: String,
    pub details: Vec<Row>,
}

/// Missing-field statistics over one population of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingDataStats {
    pub count: usize,
    pub total: usize,
    /// `count / total` in percent, rounded to one decimal; 0 when total is 0.
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisruptionAnalysis {
    pub missing_inventory_data: MissingDataStats,
    pub missing_order_data: MissingDataStats,
    pub in_transit_orders: Vec<Row>,
}

/// Locally consolidated view: one row per key, provenance-tagged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedView {
    pub inventory: Vec<Row>,
    pub orders: Vec<Row>,
    pub returns: Vec<Row>,
}

/// Caller-supplied per-item overlay. Applied on top of consolidated
/// inventory, never written back into source data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    pub inventory_qty: Option<f64>,
    pub reorder_level: Option<f64>,
}

/// Three-section executive report produced by the correction collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconReport {
    pub fixes_applied: Vec<String>,
    pub root_cause_analysis: Vec<String>,
    pub recommendations: Vec<String>,
}

impl<'de> Deserialize<'de> for ReconReport {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Collaborators occasionally return the report as a bare string;
        // coerce that into a one-line fixesApplied section.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Bare(String),
            Structured {
                #[serde(default, rename = "fixesApplied")]
                fixes_applied: Vec<String>,
                #[serde(default, rename = "rootCauseAnalysis")]
                root_cause_analysis: Vec<String>,
                #[serde(default)]
                recommendations: Vec<String>,
            },
        }

        Ok(match Shape::deserialize(deserializer)? {
            Shape::Bare(line) => ReconReport {
                fixes_applied: vec![line],
                root_cause_analysis: Vec::new(),
                recommendations: Vec::new(),
            },
            Shape::Structured {
                fixes_applied,
                root_cause_analysis,
                recommendations,
            } => ReconReport {
                fixes_applied,
                root_cause_analysis,
                recommendations,
            },
        })
    }
}

/// The corrected consolidated view returned by the collaborator. This is the
/// full accepted-response contract: a response that does not deserialize into
/// this shape is a contract violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectedBundle {
    pub consolidated_inventory: Vec<Row>,
    pub consolidated_orders: Vec<Row>,
    pub consolidated_returns: Vec<Row>,
    pub report: ReconReport,
}

/// The structured request sent to the correction collaborator: the cleaned
/// source rows as-is, the locally detected inconsistencies, and the
/// natural-language correction instruction.
#[derive(Debug, Clone, Serialize)]
pub struct CorrectionRequest {
    pub sources: SourceBundle,
    pub inconsistencies: Vec<Inconsistency>,
    pub instruction: String,
}

/// The fixed correction policy the collaborator must apply.
const CORRECTION_INSTRUCTION: &str = "\
Audit, clean, and consolidate the datasets into authoritative \
'consolidatedInventory', 'consolidatedOrders', and 'consolidatedReturns' \
lists by applying these rules universally:
1. Standardize all date-like fields to YYYY-MM-DD.
2. Resolve gaps and conflicts by source priority: Supplier > Spreadsheet > Legacy > Historical.
3. For conflicts within the same priority level, prefer the record with the most recent last_updated date.
4. If reverse logistics data exists, subtract returned_qty from inventory_qty; negative inventory is allowed and acts as an over-return flag.
5. Tag every produced row with a '_source' field indicating its final origin.
6. For any inventory record you significantly corrected, add a concise '_ai_explanation' field.
7. Produce a structured report object with three sections: fixesApplied, rootCauseAnalysis, recommendations.";

impl CorrectionRequest {
    pub fn new(sources: SourceBundle, inconsistencies: Vec<Inconsistency>) -> Self {
        Self {
            sources,
            inconsistencies,
            instruction: CORRECTION_INSTRUCTION.to_string(),
        }
    }

    /// Render the full collaborator prompt: dataset JSON blocks, detected
    /// inconsistencies, the correction instruction, and the exact output
    /// shape the response must take.
    pub fn render_prompt(&self) -> Result<String> {
        let optional_block = |rows: &Vec<Row>| -> Result<String> {
            if rows.is_empty() {
                Ok("Not provided.".to_string())
            } else {
                Ok(serde_json::to_string_pretty(rows)?)
            }
        };

        let inconsistencies_block = if self.inconsistencies.is_empty() {
            "None automatically detected. A full audit is still required.".to_string()
        } else {
            serde_json::to_string_pretty(&self.inconsistencies)?
        };

        Ok(format!(
            r#"You are a supply chain crisis management expert acting as the core of a data reconciliation and visibility engine. The primary ERP/SCM system has failed; the datasets below are fragmented exports and manual spreadsheets being used to restore visibility. Perform a comprehensive audit, consolidate the data into a single source of truth, and provide a clear, actionable report.

**Input Datasets:**
*   **Legacy Data:** {legacy}
*   **Spreadsheet Data:** {spreadsheet}
*   **Supplier Data:** {supplier}
*   **Reverse Logistics Data:** {reverse_logistics}
*   **Historical Backup Data:** {historical}

**Potential Inconsistencies Detected:**
{inconsistencies}

**Your Required Tasks:**
{instruction}

**Output Format:**
Return a single, valid JSON object with NO markdown fences, strictly adhering to this structure:
{{
  "consolidatedInventory": [
    {{ "item_id": "string", "item_name": "string", "inventory_qty": "number", "last_updated": "string (YYYY-MM-DD)", "_source": "string", "_ai_explanation": "string (optional)" }}
  ],
  "consolidatedOrders": [
    {{ "order_id": "string", "order_qty": "number", "last_updated": "string (YYYY-MM-DD)", "_source": "string" }}
  ],
  "consolidatedReturns": [
    {{ "return_id": "string", "item_id": "string", "returned_qty": "number", "return_date": "string (YYYY-MM-DD)", "_source": "string" }}
  ],
  "report": {{
    "fixesApplied": ["string"],
    "rootCauseAnalysis": ["string"],
    "recommendations": ["string"]
  }}
}}"#,
            legacy = serde_json::to_string_pretty(&self.sources.legacy)?,
            spreadsheet = serde_json::to_string_pretty(&self.sources.spreadsheet)?,
            supplier = serde_json::to_string_pretty(&self.sources.supplier)?,
            reverse_logistics = optional_block(&self.sources.reverse_logistics)?,
            historical = optional_block(&self.sources.historical)?,
            inconsistencies = inconsistencies_block,
            instruction = self.instruction,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_set_replaces_in_place() {
        let mut row = Row::from_pairs([("item_id", "A1"), ("item_name", "Widget")]);
        row.set("item_id", "B2");
        let names: Vec<&str> = row.field_names().collect();
        assert_eq!(names, vec!["item_id", "item_name"]);
        assert_eq!(row.text("item_id"), Some("B2"));
    }

    #[test]
    fn row_json_round_trip_preserves_order_and_types() {
        let mut row = Row::new();
        row.set("item_id", "A1");
        row.set("inventory_qty", 42.0);
        row.set("note", FieldValue::Null);

        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"item_id":"A1","inventory_qty":42.0,"note":null}"#);

        let back: Row = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn row_deserializes_integer_quantities_as_numbers() {
        let row: Row = serde_json::from_str(r#"{"inventory_qty": 100}"#).unwrap();
        assert_eq!(row.number("inventory_qty"), Some(100.0));
    }

    #[test]
    fn source_tag_round_trips_through_field_text() {
        for tag in [
            SourceTag::Legacy,
            SourceTag::ReverseLogistics,
            SourceTag::AiCorrected,
        ] {
            assert_eq!(SourceTag::parse(tag.as_str()), tag);
        }
        assert_eq!(SourceTag::parse("something else"), SourceTag::Unknown);
    }

    #[test]
    fn report_coerces_bare_string() {
        let report: ReconReport = serde_json::from_str(r#""all clean""#).unwrap();
        assert_eq!(report.fixes_applied, vec!["all clean".to_string()]);
        assert!(report.root_cause_analysis.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn corrected_bundle_requires_all_lists() {
        let missing_orders = r#"{
            "consolidatedInventory": [],
            "consolidatedReturns": [],
            "report": {"fixesApplied": [], "rootCauseAnalysis": [], "recommendations": []}
        }"#;
        assert!(serde_json::from_str::<CorrectedBundle>(missing_orders).is_err());
    }

    #[test]
    fn prompt_marks_absent_optional_sources() {
        let bundle = SourceBundle {
            legacy: vec![Row::from_pairs([("item_id", "A1")])],
            spreadsheet: vec![Row::from_pairs([("item_id", "A1")])],
            supplier: Vec::new(),
            reverse_logistics: Vec::new(),
            historical: Vec::new(),
        };
        let prompt = CorrectionRequest::new(bundle, Vec::new())
            .render_prompt()
            .unwrap();
        assert!(prompt.contains("Not provided."));
        assert!(prompt.contains("Supplier > Spreadsheet > Legacy > Historical"));
        assert!(prompt.contains("None automatically detected"));
    }
}
