//! REST bracket sync client
//!
//! Pushes the risk/reward dollar pair to the platform's
//! `setPositionBrackets` endpoint. One POST per call, no retries: the
//! reconciler owns debouncing and a later drag re-triggers the sync
//! naturally if this one fails.

use crate::domain::repositories::bracket_sync::{BracketSyncClient, SyncError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

/// Request body for the bracket update endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BracketUpdateBody {
    account_id: i64,
    auto_apply: bool,
    risk: i64,
    to_make: i64,
}

/// HTTP implementation of [`BracketSyncClient`]
pub struct RestSyncClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RestSyncClient {
    /// `base_url` without a trailing slash, e.g. "https://userapi.example.com"
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            auth_token,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/TradingAccount/setPositionBrackets",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl BracketSyncClient for RestSyncClient {
    async fn update_brackets(
        &self,
        account_id: i64,
        risk_dollars: i64,
        reward_dollars: i64,
        auto_apply: bool,
    ) -> Result<(), SyncError> {
        let body = BracketUpdateBody {
            account_id,
            auto_apply,
            risk: risk_dollars,
            to_make: reward_dollars,
        };
        debug!("POST {}: {:?}", self.endpoint(), body);

        let mut request = self
            .client
            .post(self.endpoint())
            .header("Accept", "application/json")
            .json(&body);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SyncError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
