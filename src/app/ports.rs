use std::path::Path;

use async_trait::async_trait;

use crate::domain::{CorrectedBundle, CorrectionRequest};
use crate::error::Result;

/// Read one source payload from wherever it lives. Reads are independent of
/// each other and may be issued concurrently.
#[async_trait]
pub trait SourceReaderPort: Send + Sync {
    async fn read(&self, path: &Path) -> Result<String>;
}

/// The external correction collaborator, modeled as an opaque function from
/// source bundle plus inconsistencies to a corrected bundle. Implementations
/// must distinguish transport failures from contract violations in the
/// errors they return.
#[async_trait]
pub trait CorrectionPort: Send + Sync {
    async fn correct(&self, request: &CorrectionRequest) -> Result<CorrectedBundle>;
}
