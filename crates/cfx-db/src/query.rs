//! Query service: read/delete access to persisted countries with typed
//! not-found errors.

use std::fmt;
use std::sync::Arc;

use cfx_schemas::{CountryRecord, ListQuery, StatusSummary};
use tracing::info;

use crate::store::CountryStore;

#[derive(Debug)]
pub enum QueryError {
    /// No row matches `name` case-insensitively.
    NotFound { name: String },
    Storage(anyhow::Error),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::NotFound { name } => write!(f, "country '{name}' not found"),
            QueryError::Storage(e) => write!(f, "storage error: {e:#}"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueryError::NotFound { .. } => None,
            QueryError::Storage(e) => Some(e.as_ref()),
        }
    }
}

impl From<anyhow::Error> for QueryError {
    fn from(e: anyhow::Error) -> Self {
        QueryError::Storage(e)
    }
}

#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn CountryStore>,
}

impl QueryService {
    pub fn new(store: Arc<dyn CountryStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<CountryRecord>, QueryError> {
        Ok(self.store.list(query).await?)
    }

    pub async fn get_by_name(&self, name: &str) -> Result<CountryRecord, QueryError> {
        self.store
            .find_by_name(name)
            .await?
            .ok_or_else(|| QueryError::NotFound {
                name: name.to_string(),
            })
    }

    /// Delete by name and return the row as it was before removal.
    pub async fn delete_by_name(&self, name: &str) -> Result<CountryRecord, QueryError> {
        let deleted = self
            .store
            .delete_by_name(name)
            .await?
            .ok_or_else(|| QueryError::NotFound {
                name: name.to_string(),
            })?;
        info!(id = deleted.id, name = %deleted.name, "country deleted");
        Ok(deleted)
    }

    pub async fn status(&self) -> Result<StatusSummary, QueryError> {
        Ok(self.store.status().await?)
    }
}
