use metrics::histogram;
use tracing::{info, instrument};

use crate::app::ports::CorrectionPort;
use crate::app::reconcile_use_case::ReconOutcome;
use crate::domain::{CorrectedBundle, CorrectionRequest, SourceBundle};
use crate::error::Result;
use crate::pipeline::correction;

/// The corrected view plus the original sources with the fixes written back.
#[derive(Debug, Clone)]
pub struct CorrectionResult {
    pub corrected: CorrectedBundle,
    pub merged_sources: SourceBundle,
}

/// Use case for the correction round trip: build the request payload, call
/// the collaborator, and merge the accepted response back into the
/// per-source rows. Failures leave the caller's pre-correction outcome
/// untouched.
pub struct CorrectionUseCase {
    port: Box<dyn CorrectionPort>,
}

impl CorrectionUseCase {
    pub fn new(port: Box<dyn CorrectionPort>) -> Self {
        Self { port }
    }

    #[instrument(skip_all, fields(run_id = %outcome.run_id))]
    pub async fn run(&self, outcome: &ReconOutcome) -> Result<CorrectionResult> {
        let request = CorrectionRequest::new(
            outcome.sources.clone(),
            outcome.inconsistencies.clone(),
        );

        let t_call = std::time::Instant::now();
        let corrected = self.port.correct(&request).await?;
        histogram!("dracve_correction_duration_seconds").record(t_call.elapsed().as_secs_f64());

        info!(
            inventory = corrected.consolidated_inventory.len(),
            orders = corrected.consolidated_orders.len(),
            returns = corrected.consolidated_returns.len(),
            fixes = corrected.report.fixes_applied.len(),
            "collaborator returned a corrected view"
        );

        let merged_sources = correction::merge_corrections(&outcome.sources, &corrected);
        Ok(CorrectionResult {
            corrected,
            merged_sources,
        })
    }
}
