//! # Access Audit Trail
//!
//! Every access attempt — both phases, both outcomes — produces one
//! [`AuditRecord`]. The sink behind the trait is append-only storage
//! owned by the deployment (a database table, a log pipeline); the core
//! only ever writes.
//!
//! Denials are recorded too. An audit trail that only remembers the
//! successes is a guest book, not an audit trail.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which half of the handshake produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPhase {
    Initiate,
    Verify,
}

/// One access attempt, granted or denied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Which phase was attempted.
    pub phase: AccessPhase,
    /// Catalog id of the content involved, when it resolved.
    pub content_id: Option<String>,
    /// The wallet address that made the attempt.
    pub requester_address: String,
    pub token_id: u64,
    pub contract_address: String,
    /// When the attempt completed, epoch milliseconds.
    pub timestamp_ms: u64,
    pub success: bool,
    /// Stable error kind on denial (`not_owner`, `response_mismatch`, ...).
    pub error_kind: Option<String>,
}

/// Errors the sink can raise.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Durable, append-only record of access attempts.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError>;
}

/// Keeps records in memory. For tests and local stacks.
#[derive(Default)]
pub struct MemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, oldest first.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        self.records.write().push(record);
        Ok(())
    }
}

/// Emits each record as a structured log line. Useful when the deployment
/// already ships logs somewhere durable.
#[derive(Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, record: AuditRecord) -> Result<(), AuditError> {
        tracing::info!(
            target: "ledgerbound::audit",
            phase = ?record.phase,
            content_id = record.content_id.as_deref().unwrap_or("-"),
            requester = %record.requester_address,
            token_id = record.token_id,
            contract = %record.contract_address,
            success = record.success,
            error_kind = record.error_kind.as_deref().unwrap_or("-"),
            "access attempt"
        );
        Ok(())
    }
}
