//! Chart Surface Capability
//!
//! Abstraction over the host platform's chart widget: create/move/remove a
//! horizontal price line, read a line's current price, set its label text.
//! The production widget offers no drag events, only entity lookups, which
//! is why the reconciler samples line prices instead of subscribing; a
//! widget with real drag callbacks could satisfy this same contract by
//! pushing into the poll path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Opaque handle to a rendered line
pub type LineId = String;

/// Dash pattern for a rendered line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinePattern {
    Solid,
    Dotted,
    Dashed,
}

/// Visual styling for one line
#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    /// CSS-style hex color, e.g. "#FF0000"
    pub color: String,
    pub width: u32,
    pub pattern: LinePattern,
    /// Initial label text; updated later via `set_line_label`
    pub label: String,
}

/// Errors from chart surface operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SurfaceError {
    #[error("Chart surface not connected")]
    NotConnected,
    #[error("Line not found: {0}")]
    LineNotFound(LineId),
    #[error("Chart operation failed: {0}")]
    Operation(String),
}

/// Capability interface to the platform chart widget
#[async_trait]
pub trait ChartSurface: Send + Sync {
    /// Wait for the chart widget to become reachable, polling roughly once
    /// per second. Returns false when `max_wait` elapses first.
    async fn find_surface(&self, max_wait: Duration) -> bool;

    /// Cheap liveness probe used by the watchdog. A previously-connected
    /// surface can go away when the host page rebuilds the widget.
    async fn is_available(&self) -> bool;

    async fn create_line(&self, price: f64, style: &LineStyle) -> Result<LineId, SurfaceError>;

    async fn remove_line(&self, id: &LineId) -> Result<(), SurfaceError>;

    /// Current price of a line, which the user may have dragged since it
    /// was created.
    async fn line_price(&self, id: &LineId) -> Result<f64, SurfaceError>;

    async fn set_line_label(&self, id: &LineId, text: &str) -> Result<(), SurfaceError>;
}
