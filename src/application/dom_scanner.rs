//! DOM signal scanning
//!
//! Low-confidence fallback source: polls whatever the host page's
//! order-entry panel currently shows and reports changes as normalized
//! signals. Field heuristics stay behind the [`PanelProbe`] capability;
//! this module only validates, diffs, and forwards. Side readings from the
//! panel are advisory — hover states flip them spuriously — so the
//! reconciler ignores them once a network signal has fixed the side.

use crate::application::reconciler::ReconcilerMessage;
use crate::application::signal::{OrderSignal, SignalAction, SignalSource};
use crate::domain::entities::instrument;
use crate::domain::entities::order::Side;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info};

/// Raw field texts scraped from the order-entry panel. Every field is
/// best-effort; absent means the probe could not find it this tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelFields {
    pub symbol: Option<String>,
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub side: Option<String>,
}

/// Capability interface over the host page's visible order-entry fields
#[async_trait]
pub trait PanelProbe: Send + Sync {
    async fn read_fields(&self) -> PanelFields;
}

#[async_trait]
impl<T: PanelProbe + ?Sized> PanelProbe for std::sync::Arc<T> {
    async fn read_fields(&self) -> PanelFields {
        (**self).read_fields().await
    }
}

/// Parsed panel values the scanner is currently aware of
#[derive(Debug, Clone, Default, PartialEq)]
struct PanelData {
    symbol: Option<String>,
    price: Option<f64>,
    quantity: Option<u32>,
    side: Option<Side>,
}

/// Polls the panel probe and submits a signal whenever a field changes
pub struct DomScanner<P: PanelProbe> {
    probe: P,
    poll_interval: Duration,
    tx: mpsc::Sender<ReconcilerMessage>,
    current: PanelData,
}

impl<P: PanelProbe + 'static> DomScanner<P> {
    pub fn new(probe: P, poll_interval: Duration, tx: mpsc::Sender<ReconcilerMessage>) -> Self {
        Self {
            probe,
            poll_interval,
            tx,
            current: PanelData::default(),
        }
    }

    /// Spawn the scan loop. The task ends when the reconciler channel
    /// closes; abort the handle for an earlier teardown.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!("DOM scanner started, polling every {:?}", self.poll_interval);
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let fields = self.probe.read_fields().await;
            if let Some(signal) = self.scan(&fields) {
                if self.tx.send(ReconcilerMessage::Signal(signal)).await.is_err() {
                    info!("Reconciler channel closed, DOM scanner stopping");
                    break;
                }
            }
        }
    }

    /// Validate the raw fields, diff against the last reading, and build a
    /// signal when something changed.
    fn scan(&mut self, fields: &PanelFields) -> Option<OrderSignal> {
        let mut changed = false;

        if let Some(symbol) = fields.symbol.as_deref().and_then(parse_symbol) {
            if self.current.symbol.as_deref() != Some(symbol.as_str()) {
                debug!("panel symbol changed: {}", symbol);
                self.current.symbol = Some(symbol);
                changed = true;
            }
        }
        if let Some(price) = fields.price.as_deref().and_then(parse_price) {
            if self.current.price != Some(price) {
                debug!("panel price changed: {}", price);
                self.current.price = Some(price);
                changed = true;
            }
        }
        if let Some(quantity) = fields.quantity.as_deref().and_then(parse_quantity) {
            if self.current.quantity != Some(quantity) {
                debug!("panel quantity changed: {}", quantity);
                self.current.quantity = Some(quantity);
                changed = true;
            }
        }
        // only a definitive reading may flip the side
        if let Some(side) = fields.side.as_deref().and_then(parse_side) {
            if self.current.side != Some(side) {
                debug!("panel side changed: {}", side);
                self.current.side = Some(side);
                changed = true;
            }
        }

        if !changed {
            return None;
        }
        Some(OrderSignal {
            symbol: self.current.symbol.clone(),
            price: self.current.price,
            quantity: self.current.quantity,
            side: self.current.side,
            ..OrderSignal::new(SignalAction::Create, SignalSource::Dom)
        })
    }
}

/// Accept only texts that look like a contract code ("MNQZ25", "ES") with a
/// catalogue-resolvable letter prefix.
fn parse_symbol(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.len() < 2 || trimmed.len() > 8 {
        return None;
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase()) {
        return None;
    }
    instrument::extract_root(trimmed)?;
    Some(trimmed.to_string())
}

fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().replace([',', '$'], "");
    match cleaned.parse::<f64>() {
        Ok(price) if price > 0.0 && price.is_finite() => Some(price),
        _ => None,
    }
}

fn parse_quantity(text: &str) -> Option<u32> {
    match text.trim().parse::<u32>() {
        Ok(quantity) if quantity >= 1 => Some(quantity),
        _ => None,
    }
}

fn parse_side(text: &str) -> Option<Side> {
    let lower = text.to_lowercase();
    if lower.contains("buy") {
        Some(Side::Long)
    } else if lower.contains("sell") {
        Some(Side::Short)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskConfig;

    struct StaticProbe;

    #[async_trait]
    impl PanelProbe for StaticProbe {
        async fn read_fields(&self) -> PanelFields {
            PanelFields::default()
        }
    }

    fn scanner() -> DomScanner<StaticProbe> {
        let (tx, _rx) = mpsc::channel(8);
        DomScanner::new(
            StaticProbe,
            Duration::from_millis(RiskConfig::default().dom_poll_ms),
            tx,
        )
    }

    #[test]
    fn test_parse_symbol() {
        assert_eq!(parse_symbol(" MNQZ25 "), Some("MNQZ25".to_string()));
        assert_eq!(parse_symbol("ES"), Some("ES".to_string()));
        assert_eq!(parse_symbol("mnqz25"), None);
        assert_eq!(parse_symbol("123"), None);
        assert_eq!(parse_symbol(""), None);
        assert_eq!(parse_symbol("TOOLONGSYMBOL"), None);
    }

    #[test]
    fn test_parse_price_and_quantity() {
        assert_eq!(parse_price("21,450.25"), Some(21450.25));
        assert_eq!(parse_price("$98.50"), Some(98.5));
        assert_eq!(parse_price("-5"), None);
        assert_eq!(parse_price("abc"), None);
        assert_eq!(parse_quantity("10"), Some(10));
        assert_eq!(parse_quantity("0"), None);
    }

    #[test]
    fn test_parse_side_requires_definitive_text() {
        assert_eq!(parse_side("Buy MNQ"), Some(Side::Long));
        assert_eq!(parse_side("SELL"), Some(Side::Short));
        assert_eq!(parse_side("submit"), None);
    }

    #[test]
    fn test_scan_emits_only_on_change() {
        let mut scanner = scanner();
        let fields = PanelFields {
            symbol: Some("MNQZ25".to_string()),
            price: Some("21450".to_string()),
            quantity: Some("2".to_string()),
            side: Some("Buy".to_string()),
        };

        let signal = scanner.scan(&fields).expect("first reading should emit");
        assert_eq!(signal.action, SignalAction::Create);
        assert_eq!(signal.source, SignalSource::Dom);
        assert_eq!(signal.symbol.as_deref(), Some("MNQZ25"));
        assert_eq!(signal.price, Some(21450.0));
        assert_eq!(signal.quantity, Some(2));
        assert_eq!(signal.side, Some(Side::Long));

        // identical reading: no new signal
        assert!(scanner.scan(&fields).is_none());

        // one field moves: full current snapshot re-emitted
        let moved = PanelFields {
            price: Some("21460".to_string()),
            ..fields
        };
        let signal = scanner.scan(&moved).expect("price change should emit");
        assert_eq!(signal.price, Some(21460.0));
        assert_eq!(signal.symbol.as_deref(), Some("MNQZ25"));
    }

    #[test]
    fn test_scan_ignores_unparseable_fields() {
        let mut scanner = scanner();
        let fields = PanelFields {
            symbol: Some("not a symbol!".to_string()),
            price: Some("n/a".to_string()),
            quantity: None,
            side: Some("hover".to_string()),
        };
        assert!(scanner.scan(&fields).is_none());
    }
}
