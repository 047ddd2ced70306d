//! # Content Catalog
//!
//! Where published content lives, as far as the core is concerned: a
//! lookup from `(token, contract)` to the two secrets that matter — the
//! opaque object key in blob storage and the content encryption key.
//!
//! The real catalog is a database owned by the publishing pipeline; the
//! core reads exactly these fields and writes nothing. [`MemoryCatalog`]
//! backs tests and local stacks.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The slice of a catalog row the access protocol reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRecord {
    /// Catalog identifier, carried into audit records.
    pub id: String,
    /// Opaque object key in blob storage. Never exposed to callers
    /// directly — it only travels inside signed locators.
    pub object_key: String,
    /// Hex-encoded 256-bit content encryption key. This is the secret
    /// the whole protocol exists to protect.
    pub encryption_key: String,
}

/// Errors a catalog lookup can raise.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("content catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the content catalog.
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Resolve the content published under `(token_id, contract_address)`.
    /// `Ok(None)` means the pair is simply not in the catalog — an error
    /// means the catalog itself could not answer.
    async fn lookup(
        &self,
        token_id: u64,
        contract_address: &str,
    ) -> Result<Option<ContentRecord>, CatalogError>;
}

/// In-memory catalog for tests and local stacks.
#[derive(Default)]
pub struct MemoryCatalog {
    records: DashMap<(String, u64), ContentRecord>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or republish) a record under `(contract, token)`.
    pub fn publish(&self, contract_address: &str, token_id: u64, record: ContentRecord) {
        self.records
            .insert((contract_address.to_string(), token_id), record);
    }

    /// Number of published records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ContentCatalog for MemoryCatalog {
    async fn lookup(
        &self,
        token_id: u64,
        contract_address: &str,
    ) -> Result<Option<ContentRecord>, CatalogError> {
        Ok(self
            .records
            .get(&(contract_address.to_string(), token_id))
            .map(|r| r.value().clone()))
    }
}
