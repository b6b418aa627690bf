//! In-memory capability implementations
//!
//! A simulated chart surface, an in-memory state store, and a recording
//! sync client. The replay harness drives the engine against these, and
//! the integration tests assert against their recorded calls.

use crate::domain::repositories::bracket_sync::{BracketSyncClient, SyncError};
use crate::domain::repositories::chart_surface::{
    ChartSurface, LineId, LineStyle, SurfaceError,
};
use crate::domain::repositories::state_store::{StateStore, StoreError, StoredState};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

/// One rendered line on the simulated chart
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedLine {
    pub price: f64,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Default)]
struct ChartInner {
    available: bool,
    next_id: u64,
    lines: HashMap<LineId, SimulatedLine>,
    created: usize,
    removed: usize,
}

/// Simulated [`ChartSurface`]: lines live in a map, availability is a
/// switch, and tests move prices to fake a user drag.
#[derive(Debug, Default)]
pub struct SimulatedChart {
    inner: Mutex<ChartInner>,
}

impl SimulatedChart {
    pub fn new() -> Self {
        let chart = Self::default();
        chart.set_available(true);
        chart
    }

    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        let mut inner = self.inner.lock().expect("chart lock");
        inner.available = available;
        if !available {
            // the host page tears the widget down with its lines
            inner.lines.clear();
        }
    }

    /// Simulate the user dragging a line to a new price
    pub fn drag_line(&self, id: &LineId, price: f64) -> bool {
        let mut inner = self.inner.lock().expect("chart lock");
        match inner.lines.get_mut(id) {
            Some(line) => {
                line.price = price;
                true
            }
            None => false,
        }
    }

    /// Current lines sorted by creation id
    pub fn lines(&self) -> Vec<(LineId, SimulatedLine)> {
        let inner = self.inner.lock().expect("chart lock");
        let mut lines: Vec<_> = inner
            .lines
            .iter()
            .map(|(id, line)| (id.clone(), line.clone()))
            .collect();
        lines.sort_by(|a, b| a.0.cmp(&b.0));
        lines
    }

    /// The line id currently closest to `price`, if any line exists
    pub fn line_near(&self, price: f64) -> Option<LineId> {
        self.lines()
            .into_iter()
            .min_by(|a, b| {
                (a.1.price - price)
                    .abs()
                    .total_cmp(&(b.1.price - price).abs())
            })
            .map(|(id, _)| id)
    }

    pub fn created_count(&self) -> usize {
        self.inner.lock().expect("chart lock").created
    }

    pub fn removed_count(&self) -> usize {
        self.inner.lock().expect("chart lock").removed
    }
}

#[async_trait]
impl ChartSurface for SimulatedChart {
    async fn find_surface(&self, max_wait: Duration) -> bool {
        let step = Duration::from_millis(25);
        let mut waited = Duration::ZERO;
        loop {
            if self.inner.lock().expect("chart lock").available {
                return true;
            }
            if waited >= max_wait {
                return false;
            }
            sleep(step).await;
            waited += step;
        }
    }

    async fn is_available(&self) -> bool {
        self.inner.lock().expect("chart lock").available
    }

    async fn create_line(&self, price: f64, style: &LineStyle) -> Result<LineId, SurfaceError> {
        let mut inner = self.inner.lock().expect("chart lock");
        if !inner.available {
            return Err(SurfaceError::NotConnected);
        }
        inner.next_id += 1;
        let id = format!("line-{}", inner.next_id);
        inner.lines.insert(
            id.clone(),
            SimulatedLine {
                price,
                label: style.label.clone(),
                color: style.color.clone(),
            },
        );
        inner.created += 1;
        Ok(id)
    }

    async fn remove_line(&self, id: &LineId) -> Result<(), SurfaceError> {
        let mut inner = self.inner.lock().expect("chart lock");
        match inner.lines.remove(id) {
            Some(_) => {
                inner.removed += 1;
                Ok(())
            }
            None => Err(SurfaceError::LineNotFound(id.clone())),
        }
    }

    async fn line_price(&self, id: &LineId) -> Result<f64, SurfaceError> {
        let inner = self.inner.lock().expect("chart lock");
        inner
            .lines
            .get(id)
            .map(|line| line.price)
            .ok_or_else(|| SurfaceError::LineNotFound(id.clone()))
    }

    async fn set_line_label(&self, id: &LineId, text: &str) -> Result<(), SurfaceError> {
        let mut inner = self.inner.lock().expect("chart lock");
        match inner.lines.get_mut(id) {
            Some(line) => {
                line.label = text.to_string();
                Ok(())
            }
            None => Err(SurfaceError::LineNotFound(id.clone())),
        }
    }
}

/// In-memory [`StateStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<StoredState>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed the store, e.g. to test the restore path
    pub fn seeded(state: StoredState) -> Self {
        let store = Self::default();
        *store.state.lock().expect("store lock") = Some(state);
        store
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().expect("store lock")
    }

    pub fn current(&self) -> Option<StoredState> {
        self.state.lock().expect("store lock").clone()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn save(&self, state: &StoredState) -> Result<(), StoreError> {
        *self.state.lock().expect("store lock") = Some(state.clone());
        *self.saves.lock().expect("store lock") += 1;
        Ok(())
    }

    async fn load(&self) -> Result<Option<StoredState>, StoreError> {
        Ok(self.state.lock().expect("store lock").clone())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.state.lock().expect("store lock") = None;
        Ok(())
    }
}

/// One recorded bracket update
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBracketCall {
    pub account_id: i64,
    pub risk_dollars: i64,
    pub reward_dollars: i64,
    pub auto_apply: bool,
}

/// Recording [`BracketSyncClient`]; optionally fails every call
#[derive(Debug, Default)]
pub struct RecordingSyncClient {
    calls: Mutex<Vec<RecordedBracketCall>>,
    fail: Mutex<bool>,
}

impl RecordingSyncClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().expect("sync lock") = fail;
    }

    pub fn calls(&self) -> Vec<RecordedBracketCall> {
        self.calls.lock().expect("sync lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("sync lock").len()
    }
}

#[async_trait]
impl BracketSyncClient for RecordingSyncClient {
    async fn update_brackets(
        &self,
        account_id: i64,
        risk_dollars: i64,
        reward_dollars: i64,
        auto_apply: bool,
    ) -> Result<(), SyncError> {
        self.calls.lock().expect("sync lock").push(RecordedBracketCall {
            account_id,
            risk_dollars,
            reward_dollars,
            auto_apply,
        });
        if *self.fail.lock().expect("sync lock") {
            return Err(SyncError::Transport("simulated failure".to_string()));
        }
        Ok(())
    }
}
