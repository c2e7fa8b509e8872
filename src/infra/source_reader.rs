use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use crate::app::ports::SourceReaderPort;
use crate::error::Result;

/// Filesystem-backed source ingestion.
pub struct FsSourceReader;

#[async_trait]
impl SourceReaderPort for FsSourceReader {
    async fn read(&self, path: &Path) -> Result<String> {
        let body = tokio::fs::read_to_string(path).await?;
        debug!(path = %path.display(), bytes = body.len(), "read source file");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "item_id,inventory_qty\nA1,5\n").unwrap();

        let body = FsSourceReader.read(file.path()).await.unwrap();
        assert!(body.starts_with("item_id"));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let result = FsSourceReader.read(Path::new("no-such-file.csv")).await;
        assert!(result.is_err());
    }
}
