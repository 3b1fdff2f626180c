//! File-backed cast store
//!
//! Serves key-value lookups from a local JSON file holding an array of row
//! objects. The table identifier and key attribute come from configuration,
//! not from the file — they are operating parameters, exactly like the
//! environment variables a tool server receives.

use std::path::Path;

use async_trait::async_trait;

use callsheet_application::ports::cast_store::{CastStorePort, LookupError, Row};

/// Cast store backed by a JSON array file.
#[derive(Debug)]
pub struct JsonFileCastStore {
    table: String,
    key_attribute: String,
    rows: Vec<Row>,
}

impl JsonFileCastStore {
    /// Load the table file. Failures name the table they concern.
    pub fn open(
        table: impl Into<String>,
        key_attribute: impl Into<String>,
        path: &Path,
    ) -> Result<Self, LookupError> {
        let table = table.into();
        let raw = std::fs::read_to_string(path).map_err(|e| LookupError::Backend {
            table: table.clone(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        let rows: Vec<Row> = serde_json::from_str(&raw).map_err(|e| LookupError::Malformed {
            table: table.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            table,
            key_attribute: key_attribute.into(),
            rows,
        })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[async_trait]
impl CastStorePort for JsonFileCastStore {
    fn table(&self) -> &str {
        &self.table
    }

    async fn query_by_key(&self, key: &str) -> Result<Vec<Row>, LookupError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| {
                row.get(&self.key_attribute).and_then(|v| v.as_str()) == Some(key)
            })
            .cloned()
            .collect())
    }
}
