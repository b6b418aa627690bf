//! Persisted State Capability
//!
//! Durable keyed storage for the tracked order and its rendered line
//! positions, so lines survive page reloads and navigation. The store only
//! moves bytes; staleness (TTL) is judged by the restore path.

use crate::domain::entities::order::{OrderRecord, RenderedLineState};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The persisted payload: the order, where its lines were last drawn, and
/// when it was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredState {
    pub order: OrderRecord,
    pub lines: RenderedLineState,
    pub saved_at: DateTime<Utc>,
}

impl StoredState {
    pub fn new(order: OrderRecord, lines: RenderedLineState) -> Self {
        Self {
            order,
            lines,
            saved_at: Utc::now(),
        }
    }

    /// Whether the snapshot is older than `ttl`
    pub fn is_stale(&self, ttl: Duration) -> bool {
        Utc::now() - self.saved_at > ttl
    }
}

/// Errors from the persisted store
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(String),
    #[error("Stored payload unreadable: {0}")]
    Corrupt(String),
}

/// Capability interface for durable order-state storage
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save(&self, state: &StoredState) -> Result<(), StoreError>;

    /// None when nothing has been saved or the previous save was cleared
    async fn load(&self) -> Result<Option<StoredState>, StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}
