use std::collections::HashMap;

use crate::app::reconcile_use_case::ReconOutcome;
use crate::domain::{ManualOverride, Row};
use crate::pipeline::consolidate::apply_manual_overrides;

/// In-memory state for one reconciliation session. A new run supersedes the
/// previous outcome entirely and clears any manual overrides; overrides are
/// an overlay on the consolidated inventory and never reach source data.
#[derive(Default)]
pub struct ReconSession {
    outcome: Option<ReconOutcome>,
    overrides: HashMap<String, ManualOverride>,
}

impl ReconSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a fresh run outcome, discarding prior results and overrides.
    pub fn begin_run(&mut self, outcome: ReconOutcome) {
        self.outcome = Some(outcome);
        self.overrides.clear();
    }

    pub fn outcome(&self) -> Option<&ReconOutcome> {
        self.outcome.as_ref()
    }

    pub fn set_override(&mut self, item_id: impl Into<String>, patch: ManualOverride) {
        self.overrides.insert(item_id.into(), patch);
    }

    /// The consolidated inventory with any manual overrides applied.
    pub fn inventory_view(&self) -> Vec<Row> {
        match &self.outcome {
            Some(outcome) => {
                apply_manual_overrides(&outcome.consolidated.inventory, &self.overrides)
            }
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::reconcile_use_case::SourceRowCounts;
    use crate::domain::{ConsolidatedView, FieldValue};
    use uuid::Uuid;

    fn outcome_with_item(qty: f64) -> ReconOutcome {
        ReconOutcome {
            run_id: Uuid::new_v4(),
            row_counts: SourceRowCounts::default(),
            sources: Default::default(),
            inconsistencies: Vec::new(),
            disruption: Default::default(),
            consolidated: ConsolidatedView {
                inventory: vec![Row::from_pairs([
                    ("item_id", FieldValue::Text("A1".into())),
                    ("inventory_qty", FieldValue::Number(qty)),
                ])],
                orders: Vec::new(),
                returns: Vec::new(),
            },
        }
    }

    #[test]
    fn overrides_overlay_the_view_only() {
        let mut session = ReconSession::new();
        session.begin_run(outcome_with_item(10.0));
        session.set_override(
            "A1",
            ManualOverride {
                inventory_qty: Some(42.0),
                reorder_level: None,
            },
        );

        let view = session.inventory_view();
        assert_eq!(view[0].number("inventory_qty"), Some(42.0));
        assert_eq!(view[0].text("_source"), Some("Manual"));
        // The stored outcome is untouched.
        let stored = &session.outcome().unwrap().consolidated.inventory[0];
        assert_eq!(stored.number("inventory_qty"), Some(10.0));
    }

    #[test]
    fn a_new_run_clears_overrides() {
        let mut session = ReconSession::new();
        session.begin_run(outcome_with_item(10.0));
        session.set_override(
            "A1",
            ManualOverride {
                inventory_qty: Some(42.0),
                reorder_level: None,
            },
        );
        session.begin_run(outcome_with_item(11.0));

        let view = session.inventory_view();
        assert_eq!(view[0].number("inventory_qty"), Some(11.0));
        assert!(view[0].get("_source").is_none());
    }
}
