//! Cast store port — the structured key-value lookup boundary
//!
//! Rows are looked up by partition key against a named table. Lookup
//! failures always name the table, so a failed run can say which backing
//! store broke.

use async_trait::async_trait;
use thiserror::Error;

/// A single row: attribute name → value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Errors from the key-value lookup backend
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Lookup against table `{table}` failed: {reason}")]
    Backend { table: String, reason: String },

    #[error("Table `{table}` is malformed: {reason}")]
    Malformed { table: String, reason: String },
}

impl LookupError {
    /// The table this failure concerns.
    pub fn table(&self) -> &str {
        match self {
            LookupError::Backend { table, .. } => table,
            LookupError::Malformed { table, .. } => table,
        }
    }
}

/// Port to the key-value store
#[async_trait]
pub trait CastStorePort: Send + Sync {
    /// The table identifier this store serves.
    fn table(&self) -> &str;

    /// Return all rows whose partition key equals `key`, or an empty list.
    async fn query_by_key(&self, key: &str) -> Result<Vec<Row>, LookupError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_error_names_table() {
        let err = LookupError::Backend {
            table: "cast-info".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.table(), "cast-info");
        assert!(err.to_string().contains("cast-info"));
    }
}
