use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::app::ports::SourceReaderPort;
use crate::config::ReconcileConfig;
use crate::domain::{
    ConsolidatedView, DisruptionAnalysis, Inconsistency, Row, SourceBundle,
};
use crate::error::{ReconError, Result};
use crate::pipeline::{clean, consolidate, disruption, inconsistency, tabular};

/// File locations for one reconciliation run. Legacy, spreadsheet, and
/// supplier are mandatory; the returns feed and historical backup are
/// optional.
#[derive(Debug, Clone, Default)]
pub struct SourceFileSet {
    pub legacy: Option<PathBuf>,
    pub spreadsheet: Option<PathBuf>,
    pub supplier: Option<PathBuf>,
    pub reverse_logistics: Option<PathBuf>,
    pub historical: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceRowCounts {
    pub legacy: usize,
    pub spreadsheet: usize,
    pub supplier: usize,
    pub reverse_logistics: usize,
    pub historical: usize,
}

/// Everything one local reconciliation run produces. Rebuilt from scratch on
/// every run; a new run supersedes the previous outcome entirely.
#[derive(Debug, Clone)]
pub struct ReconOutcome {
    pub run_id: Uuid,
    pub row_counts: SourceRowCounts,
    /// The cleaned per-source rows, kept for the correction round trip.
    pub sources: SourceBundle,
    pub inconsistencies: Vec<Inconsistency>,
    pub disruption: DisruptionAnalysis,
    pub consolidated: ConsolidatedView,
}

impl fmt::Display for ReconOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reconciliation run {}", self.run_id)?;
        writeln!(
            f,
            "Rows: legacy={} spreadsheet={} supplier={} returns={} historical={}",
            self.row_counts.legacy,
            self.row_counts.spreadsheet,
            self.row_counts.supplier,
            self.row_counts.reverse_logistics,
            self.row_counts.historical
        )?;

        writeln!(f, "\n=== Inconsistencies ===")?;
        if self.inconsistencies.is_empty() {
            writeln!(f, "None detected between legacy and spreadsheet data")?;
        } else {
            for entry in &self.inconsistencies {
                writeln!(f, "- {}: {} row(s)", entry.kind, entry.details.len())?;
            }
        }

        writeln!(f, "\n=== Disruption ===")?;
        let inv = &self.disruption.missing_inventory_data;
        let ord = &self.disruption.missing_order_data;
        writeln!(f, "Missing inventory fields: {}/{} ({}%)", inv.count, inv.total, inv.percentage)?;
        writeln!(f, "Missing order fields: {}/{} ({}%)", ord.count, ord.total, ord.percentage)?;
        writeln!(f, "In-transit shipments: {}", self.disruption.in_transit_orders.len())?;

        writeln!(f, "\n=== Consolidated ===")?;
        writeln!(
            f,
            "Inventory items: {} | Open orders: {} | Returns: {}",
            self.consolidated.inventory.len(),
            self.consolidated.orders.len(),
            self.consolidated.returns.len()
        )?;
        Ok(())
    }
}

/// Use case for the local half of the pipeline: read the source files,
/// parse and clean them, then detect, analyze, and consolidate.
pub struct ReconcileUseCase {
    reader: Box<dyn SourceReaderPort>,
    config: ReconcileConfig,
}

impl ReconcileUseCase {
    pub fn new(reader: Box<dyn SourceReaderPort>, config: ReconcileConfig) -> Self {
        Self { reader, config }
    }

    pub async fn run(&self, files: &SourceFileSet) -> Result<ReconOutcome> {
        self.run_at(files, Utc::now()).await
    }

    /// Run with an explicit evaluation instant for the in-transit window.
    #[instrument(skip(self, files))]
    pub async fn run_at(
        &self,
        files: &SourceFileSet,
        evaluated_at: DateTime<Utc>,
    ) -> Result<ReconOutcome> {
        let run_id = Uuid::new_v4();
        counter!("dracve_recon_runs_total").increment(1);
        let t_run = std::time::Instant::now();
        info!(%run_id, "starting reconciliation run");

        let legacy_path = mandatory(&files.legacy, "legacy")?;
        let spreadsheet_path = mandatory(&files.spreadsheet, "spreadsheet")?;
        let supplier_path = mandatory(&files.supplier, "supplier")?;

        // The reads are independent; issue them concurrently.
        let (legacy_text, spreadsheet_text, supplier_text, returns_text, historical_text) =
            tokio::try_join!(
                self.read_source("legacy", legacy_path),
                self.read_source("spreadsheet", spreadsheet_path),
                self.read_source("supplier", supplier_path),
                self.read_optional("reverseLogistics", files.reverse_logistics.as_deref()),
                self.read_optional("historicalBackup", files.historical.as_deref()),
            )?;

        let sources = SourceBundle {
            legacy: self.ingest("legacy", &legacy_text),
            spreadsheet: self.ingest("spreadsheet", &spreadsheet_text),
            supplier: self.ingest("supplier", &supplier_text),
            reverse_logistics: self.ingest_optional("reverseLogistics", returns_text.as_deref()),
            historical: self.ingest_optional("historicalBackup", historical_text.as_deref()),
        };
        let row_counts = SourceRowCounts {
            legacy: sources.legacy.len(),
            spreadsheet: sources.spreadsheet.len(),
            supplier: sources.supplier.len(),
            reverse_logistics: sources.reverse_logistics.len(),
            historical: sources.historical.len(),
        };

        let inconsistencies = inconsistency::detect(&sources.legacy, &sources.spreadsheet);
        counter!("dracve_inconsistencies_found_total")
            .increment(inconsistencies.iter().map(|i| i.details.len() as u64).sum());

        let disruption = disruption::analyze(
            &sources.legacy,
            &sources.spreadsheet,
            &sources.supplier,
            self.config.in_transit_window_days,
            evaluated_at,
        );

        let consolidated = consolidate::consolidate(
            &sources.legacy,
            &sources.spreadsheet,
            &sources.supplier,
            &sources.reverse_logistics,
        );

        histogram!("dracve_recon_duration_seconds").record(t_run.elapsed().as_secs_f64());
        info!(
            %run_id,
            inconsistency_classes = inconsistencies.len(),
            inventory = consolidated.inventory.len(),
            orders = consolidated.orders.len(),
            "reconciliation run complete"
        );

        Ok(ReconOutcome {
            run_id,
            row_counts,
            sources,
            inconsistencies,
            disruption,
            consolidated,
        })
    }

    async fn read_source(&self, name: &str, path: &Path) -> Result<String> {
        self.reader
            .read(path)
            .await
            .map_err(|e| ReconError::SourceUnreadable {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    async fn read_optional(&self, name: &str, path: Option<&Path>) -> Result<Option<String>> {
        match path {
            Some(path) => Ok(Some(self.read_source(name, path).await?)),
            None => Ok(None),
        }
    }

    fn ingest(&self, name: &str, text: &str) -> Vec<Row> {
        let rows = tabular::parse_delimited(text, self.config.delimiter);
        counter!("dracve_rows_parsed_total", "source" => name.to_string())
            .increment(rows.len() as u64);
        clean::clean_rows(&rows)
    }

    fn ingest_optional(&self, name: &str, text: Option<&str>) -> Vec<Row> {
        match text {
            Some(text) => self.ingest(name, text),
            None => Vec::new(),
        }
    }
}

fn mandatory<'a>(path: &'a Option<PathBuf>, name: &str) -> Result<&'a Path> {
    path.as_deref()
        .ok_or_else(|| ReconError::MissingSource(name.to_string()))
}
