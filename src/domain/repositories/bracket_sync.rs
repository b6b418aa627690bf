//! Outbound Bracket Sync Capability
//!
//! One operation: push the current risk/reward dollar pair to the platform
//! so its own bracket orders follow the dragged lines. Callers debounce;
//! implementations issue exactly one request per invocation and never retry
//! on their own (a later drag or recompute naturally re-triggers the sync).

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the outbound bracket update call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    #[error("Bracket update rejected: HTTP {status}")]
    Rejected { status: u16 },
    #[error("Bracket update failed: {0}")]
    Transport(String),
}

/// Capability interface for the platform's bracket-update endpoint
#[async_trait]
pub trait BracketSyncClient: Send + Sync {
    /// Update the platform-side brackets for `account_id`.
    ///
    /// `risk_dollars` and `reward_dollars` are whole currency units; callers
    /// round before invoking.
    async fn update_brackets(
        &self,
        account_id: i64,
        risk_dollars: i64,
        reward_dollars: i64,
        auto_apply: bool,
    ) -> Result<(), SyncError>;
}
