//! Record sources
//!
//! Reports never talk to storage directly. A [`RecordSource`] hands over
//! the four record collections; [`load_dataset`] fetches them in parallel.

use std::path::Path;
use tracing::info;

use crate::reports::{Contact, Dataset, Deal, Interaction, Organization};
use crate::types::{ReportError, Result};

/// Read access to the CRM store - allows swapping implementations
/// (a JSON snapshot today, a database-backed source later)
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    async fn organizations(&self) -> Result<Vec<Organization>>;
    async fn contacts(&self) -> Result<Vec<Contact>>;
    async fn interactions(&self) -> Result<Vec<Interaction>>;
    async fn deals(&self) -> Result<Vec<Deal>>;
}

/// Fetch every collection concurrently. Fails if any single read fails.
pub async fn load_dataset(source: &dyn RecordSource) -> Result<Dataset> {
    let (organizations, contacts, interactions, deals) = tokio::try_join!(
        source.organizations(),
        source.contacts(),
        source.interactions(),
        source.deals(),
    )?;

    Ok(Dataset {
        organizations,
        contacts,
        interactions,
        deals,
    })
}

/// In-memory source backed by a dataset loaded once
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    dataset: Dataset,
}

impl SnapshotSource {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a `{organizations, contacts, interactions, deals}` JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ReportError::Source(format!("Failed to read dataset {}: {}", path.display(), e))
        })?;
        let dataset: Dataset = serde_json::from_str(&raw).map_err(|e| {
            ReportError::Source(format!("Invalid dataset {}: {}", path.display(), e))
        })?;

        info!(
            path = %path.display(),
            organizations = dataset.organizations.len(),
            contacts = dataset.contacts.len(),
            interactions = dataset.interactions.len(),
            deals = dataset.deals.len(),
            "Dataset snapshot loaded"
        );
        Ok(Self::new(dataset))
    }
}

#[async_trait::async_trait]
impl RecordSource for SnapshotSource {
    async fn organizations(&self) -> Result<Vec<Organization>> {
        Ok(self.dataset.organizations.clone())
    }

    async fn contacts(&self) -> Result<Vec<Contact>> {
        Ok(self.dataset.contacts.clone())
    }

    async fn interactions(&self) -> Result<Vec<Interaction>> {
        Ok(self.dataset.interactions.clone())
    }

    async fn deals(&self) -> Result<Vec<Deal>> {
        Ok(self.dataset.deals.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct BrokenDeals;

    #[async_trait::async_trait]
    impl RecordSource for BrokenDeals {
        async fn organizations(&self) -> Result<Vec<Organization>> {
            Ok(vec![])
        }
        async fn contacts(&self) -> Result<Vec<Contact>> {
            Ok(vec![])
        }
        async fn interactions(&self) -> Result<Vec<Interaction>> {
            Ok(vec![])
        }
        async fn deals(&self) -> Result<Vec<Deal>> {
            Err(ReportError::Source("deals table unavailable".into()))
        }
    }

    const SNAPSHOT: &str = r#"{
        "organizations": [
            {"id": "o1", "name": "Acme", "accountManager": "Dana", "state": "CA",
             "createdAt": "2026-01-01T00:00:00Z", "updatedAt": "2026-01-02T00:00:00Z"}
        ],
        "deals": [
            {"id": "d1", "organizationId": "o1", "status": "won", "amount": 100,
             "createdAt": "2026-01-01T00:00:00Z", "updatedAt": "2026-01-05T00:00:00Z"}
        ]
    }"#;

    #[tokio::test]
    async fn test_snapshot_from_file() {
        let path = std::env::temp_dir().join(format!("snapshot-{}.json", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();
        drop(file);

        let source = SnapshotSource::from_file(&path).unwrap();
        let dataset = load_dataset(&source).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(dataset.organizations.len(), 1);
        assert_eq!(dataset.organizations[0].manager(), Some("Dana"));
        assert!(dataset.contacts.is_empty());
        assert_eq!(dataset.deals[0].amount, 100.0);
    }

    #[test]
    fn test_missing_file_is_source_error() {
        let err = SnapshotSource::from_file(Path::new("/nonexistent/dataset.json")).unwrap_err();
        assert!(matches!(err, ReportError::Source(_)));
    }

    #[tokio::test]
    async fn test_any_failed_read_fails_the_load() {
        let err = load_dataset(&BrokenDeals).await.unwrap_err();
        assert!(matches!(err, ReportError::Source(_)));
    }
}
