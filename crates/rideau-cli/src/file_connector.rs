//! JSON batch-file connector.
//!
//! Stands in for the site-specific scrapers: anything able to write a JSON
//! array of candidate records can feed the pipeline through it.

use std::path::PathBuf;

use rideau_core::connector::Connector;
use rideau_core::error::RideauError;
use rideau_core::models::CandidateRecord;

pub struct FileConnector {
    path: PathBuf,
    source: String,
}

impl FileConnector {
    pub fn new(path: PathBuf, source: Option<String>) -> Self {
        let source = source.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".into())
        });
        Self { path, source }
    }
}

impl Connector for FileConnector {
    fn source(&self) -> &str {
        &self.source
    }

    /// Read the batch, preserving file order, and stamp the source on
    /// records that do not carry one.
    async fn produce(&self) -> Result<Vec<CandidateRecord>, RideauError> {
        let content = std::fs::read_to_string(&self.path)?;
        let mut records: Vec<CandidateRecord> = serde_json::from_str(&content)
            .map_err(|e| RideauError::Connector(format!("{}: {e}", self.path.display())))?;
        for record in &mut records {
            if record.source.is_empty() {
                record.source = self.source.clone();
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_and_stamps_source() {
        let dir = std::env::temp_dir();
        let path = dir.join("rideau_file_connector_test.json");
        std::fs::write(
            &path,
            r#"[
                {"date": "2026-04-10", "titre": "Hamlet", "theatre_nom": "BRASS"},
                {"date": "2026-04-11", "titre": "La Mouette", "source": "explicit"}
            ]"#,
        )
        .unwrap();

        let connector = FileConnector::new(path.clone(), Some("siteA".into()));
        let records = connector.produce().await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source, "siteA");
        assert_eq!(records[1].source, "explicit");
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        let dir = std::env::temp_dir();
        let path = dir.join("rideau_file_connector_bad.json");
        std::fs::write(&path, "{not json").unwrap();

        let connector = FileConnector::new(path.clone(), None);
        let result = connector.produce().await;
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
