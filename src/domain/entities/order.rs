//! Tracked order entity and rendered-line bookkeeping

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of the tracked position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Map a venue order-type string ("buy"/"sell" in any casing) to a side.
    /// Defaults to long when the string is ambiguous.
    pub fn detect(order_type: &str) -> Side {
        let lower = order_type.to_lowercase();
        if lower.contains("sell") {
            Side::Short
        } else {
            Side::Long
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// Order type as reported by the venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Stop,
    /// Executes immediately; never holds bracket lines
    Market,
}

/// Lifecycle status of the tracked order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Active,
    Cancelled,
    Filled,
}

/// The single tracked order with its derived bracket levels.
///
/// Invariant: `sl_price`/`tp_price` are consistent with `entry_price`,
/// `side` and the instrument tick parameters as of the last recompute --
/// long keeps SL below entry and TP above, short inverts both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub account_id: Option<i64>,
    /// Base instrument root, e.g. "MNQ"
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub entry_price: f64,
    pub quantity: u32,
    pub sl_price: f64,
    pub tp_price: f64,
    pub sl_dollars: f64,
    pub tp_dollars: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Whether this record still represents a live order.
    /// Cancelled and filled orders are terminal.
    pub fn is_live(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Active)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Last prices at which each line was programmatically set.
///
/// This is what lets the drag poll tell the reconciler's own writes apart
/// from user drags: a poll reading that matches the rendered price (within
/// half a tick) is ours, anything further moved under the user's mouse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedLineState {
    pub sl_price: Option<f64>,
    pub tp_price: Option<f64>,
}

impl RenderedLineState {
    pub fn clear(&mut self) {
        self.sl_price = None;
        self.tp_price = None;
    }

    /// True when a polled price differs from the last rendered price by more
    /// than the tolerance (half a tick guards against float jitter).
    pub fn moved(last_rendered: Option<f64>, polled: f64, tick_size: f64) -> bool {
        match last_rendered {
            Some(rendered) => (polled - rendered).abs() > 0.5 * tick_size,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: OrderStatus) -> OrderRecord {
        OrderRecord {
            order_id: "1001".to_string(),
            account_id: Some(42),
            symbol: "MNQ".to_string(),
            side: Side::Long,
            order_type: OrderType::Limit,
            entry_price: 21450.0,
            quantity: 10,
            sl_price: 21400.0,
            tp_price: 21550.0,
            sl_dollars: 100.0,
            tp_dollars: 200.0,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_side_detect() {
        assert_eq!(Side::detect("Buy"), Side::Long);
        assert_eq!(Side::detect("SELL"), Side::Short);
        assert_eq!(Side::detect("sell limit"), Side::Short);
        assert_eq!(Side::detect(""), Side::Long);
    }

    #[test]
    fn test_is_live() {
        assert!(record(OrderStatus::Pending).is_live());
        assert!(record(OrderStatus::Active).is_live());
        assert!(!record(OrderStatus::Cancelled).is_live());
        assert!(!record(OrderStatus::Filled).is_live());
    }

    #[test]
    fn test_moved_respects_half_tick_tolerance() {
        let tick = 0.25;
        // 0.4 ticks of drift is jitter, not a drag
        assert!(!RenderedLineState::moved(Some(21400.0), 21400.0 + 0.4 * tick, tick));
        // 0.6 ticks is a drag
        assert!(RenderedLineState::moved(Some(21400.0), 21400.0 + 0.6 * tick, tick));
        // no rendered price yet means nothing to compare against
        assert!(!RenderedLineState::moved(None, 21400.0, tick));
    }

    #[test]
    fn test_record_serde_round_trip() {
        let rec = record(OrderStatus::Active);
        let json = serde_json::to_string(&rec).unwrap();
        let back: OrderRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rec);
        assert!(json.contains("\"side\":\"long\""));
        assert!(json.contains("\"status\":\"active\""));
    }
}
