//! Normalized order signals
//!
//! Every ingestion source (network extractor, DOM scanner, replay harness)
//! reduces whatever it saw to an [`OrderSignal`] and submits it to the
//! reconciler. Sources never touch reconciler state directly; the signal is
//! the whole interface. The dedup window lives here too so all sources get
//! identical retry suppression.

use crate::domain::entities::order::{OrderType, Side};
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Lifecycle action a signal reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    Create,
    /// Price-only edit of the entry order (distinct from SL/TP line drags)
    Modify,
    Cancel,
    /// Venue reported execution; terminal
    Fill,
}

/// Which ingestion path produced a signal. Network data wins conflicts;
/// DOM data is a lower-confidence fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    Network,
    Dom,
}

impl SignalSource {
    /// Rank used when ordering a drained batch: higher applies later and
    /// therefore wins field conflicts.
    pub fn rank(&self) -> u8 {
        match self {
            SignalSource::Dom => 0,
            SignalSource::Network => 1,
        }
    }
}

/// One normalized order-update event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSignal {
    pub action: SignalAction,
    pub source: SignalSource,
    pub symbol: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<u32>,
    pub side: Option<Side>,
    pub order_type: Option<OrderType>,
    pub order_id: Option<String>,
    pub account_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

impl OrderSignal {
    pub fn new(action: SignalAction, source: SignalSource) -> Self {
        Self {
            action,
            source,
            symbol: None,
            price: None,
            quantity: None,
            side: None,
            order_type: None,
            order_id: None,
            account_id: None,
            timestamp: Utc::now(),
        }
    }
}

/// Dedup key: the (action, price, symbol) triple, with the price quantized
/// so float formatting differences cannot defeat the match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    action: SignalAction,
    price_micros: Option<i64>,
    symbol: Option<String>,
}

impl DedupKey {
    fn of(signal: &OrderSignal) -> Self {
        Self {
            action: signal.action,
            price_micros: signal.price.map(|p| (p * 1_000_000.0).round() as i64),
            symbol: signal.symbol.clone(),
        }
    }
}

const DEDUP_CAPACITY: usize = 128;

/// Suppresses repeat processing of an identical signal triple observed
/// within a short window, so retried platform calls are counted once.
pub struct DedupWindow {
    window: Duration,
    seen: LruCache<DedupKey, Instant>,
}

impl DedupWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: LruCache::new(
                NonZeroUsize::new(DEDUP_CAPACITY).expect("dedup capacity is nonzero"),
            ),
        }
    }

    /// Returns true when this signal's triple was already seen inside the
    /// window. Records the signal either way, so a burst of retries keeps
    /// being suppressed until it goes quiet for a full window.
    pub fn is_duplicate(&mut self, signal: &OrderSignal) -> bool {
        let key = DedupKey::of(signal);
        let now = Instant::now();
        let duplicate = match self.seen.get(&key) {
            Some(last) => now.duration_since(*last) <= self.window,
            None => false,
        };
        self.seen.put(key, now);
        duplicate
    }
}
