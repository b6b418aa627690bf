//! Reconciler End-to-End Tests
//!
//! Drives the reconciler actor through full scenarios against the simulated
//! chart surface, in-memory store, and recording sync client:
//! create/modify/cancel flows, market-order clearing, duplicate-signal
//! suppression, DOM advisory merging, restore with TTL, and chart-surface
//! loss/recreation.

use bracketline::application::reconciler::{Reconciler, ReconcilerMessage, ReconcilerStatus};
use bracketline::application::signal::{OrderSignal, SignalAction, SignalSource};
use bracketline::config::RiskConfig;
use bracketline::domain::entities::order::{
    OrderRecord, OrderStatus, OrderType, RenderedLineState, Side,
};
use bracketline::domain::repositories::state_store::StoredState;
use bracketline::infrastructure::memory::{MemoryStore, RecordingSyncClient, SimulatedChart};
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Short intervals so scenarios settle quickly
fn test_config() -> RiskConfig {
    RiskConfig {
        drag_poll_ms: 40,
        watchdog_ms: 80,
        sync_debounce_ms: 250,
        persist_debounce_ms: 250,
        surface_wait_secs: 1,
        ..RiskConfig::default()
    }
}

struct Harness {
    chart: Arc<SimulatedChart>,
    store: Arc<MemoryStore>,
    #[allow(dead_code)]
    sync: Arc<RecordingSyncClient>,
    tx: mpsc::Sender<ReconcilerMessage>,
}

impl Harness {
    fn spawn_with(config: RiskConfig, chart: SimulatedChart, store: MemoryStore) -> Self {
        let chart = Arc::new(chart);
        let store = Arc::new(store);
        let sync = Arc::new(RecordingSyncClient::new());
        let tx = Reconciler::spawn(config, chart.clone(), store.clone(), sync.clone());
        Self {
            chart,
            store,
            sync,
            tx,
        }
    }

    fn spawn() -> Self {
        Self::spawn_with(test_config(), SimulatedChart::new(), MemoryStore::new())
    }

    async fn send(&self, signal: OrderSignal) {
        self.tx
            .send(ReconcilerMessage::Signal(signal))
            .await
            .expect("reconciler alive");
    }

    async fn status(&self) -> ReconcilerStatus {
        let (reply, mut rx) = mpsc::channel(1);
        self.tx
            .send(ReconcilerMessage::GetStatus { reply })
            .await
            .expect("reconciler alive");
        rx.recv().await.expect("status reply")
    }

    /// Poll the chart until `check` passes or fail after the timeout
    async fn wait_chart<F>(&self, mut check: F)
    where
        F: FnMut(&SimulatedChart) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            if check(&self.chart) {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
        assert!(check(&self.chart), "chart condition not met within 2s");
    }

    /// Poll the reconciler status until the tracked order satisfies `check`
    async fn wait_order<F>(&self, mut check: F) -> OrderRecord
    where
        F: FnMut(&OrderRecord) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let state = self.status().await;
            if let Some(order) = state.order {
                if check(&order) {
                    return order;
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "order condition not met within 2s"
            );
            sleep(Duration::from_millis(20)).await;
        }
    }

    fn line_prices(&self) -> Vec<f64> {
        self.chart.lines().iter().map(|(_, l)| l.price).collect()
    }

    fn line_labels(&self) -> Vec<String> {
        self.chart.lines().iter().map(|(_, l)| l.label.clone()).collect()
    }
}

fn network_create(symbol: &str, price: f64, quantity: u32, side: Side) -> OrderSignal {
    OrderSignal {
        symbol: Some(symbol.to_string()),
        price: Some(price),
        quantity: Some(quantity),
        side: Some(side),
        order_type: Some(OrderType::Limit),
        order_id: Some("9001".to_string()),
        account_id: Some(42),
        ..OrderSignal::new(SignalAction::Create, SignalSource::Network)
    }
}

#[tokio::test]
async fn test_network_create_renders_bracket_lines() {
    let harness = Harness::spawn();
    harness
        .send(network_create("MNQZ25", 21_450.0, 10, Side::Long))
        .await;

    harness.wait_chart(|chart| chart.lines().len() == 2).await;

    let state = harness.status().await;
    assert!(state.has_active_order);
    let order = state.order.expect("order tracked");
    assert_eq!(order.symbol, "MNQZ25");
    assert_eq!(order.sl_price, 21_400.0);
    assert_eq!(order.tp_price, 21_550.0);
    assert_eq!(order.quantity, 10);
    // dollar totals cover the full quantity
    assert_eq!(order.sl_dollars, 1_000.0);
    assert_eq!(order.tp_dollars, 2_000.0);
    assert_eq!(order.status, OrderStatus::Active);

    let prices = harness.line_prices();
    assert!(prices.contains(&21_400.0));
    assert!(prices.contains(&21_550.0));
    let labels = harness.line_labels();
    assert!(labels.contains(&"SL -$1000 (10x)".to_string()));
    assert!(labels.contains(&"TP +$2000 (10x)".to_string()));

    // create persists immediately
    let stored = harness.store.current().expect("state persisted");
    assert_eq!(stored.order.sl_price, 21_400.0);
    assert_eq!(stored.lines.sl_price, Some(21_400.0));
}

#[tokio::test]
async fn test_short_create_inverts_levels() {
    let harness = Harness::spawn();
    harness
        .send(network_create("MNQZ25", 21_450.0, 10, Side::Short))
        .await;

    harness.wait_chart(|chart| chart.lines().len() == 2).await;

    let order = harness.status().await.order.expect("order tracked");
    assert_eq!(order.sl_price, 21_500.0);
    assert_eq!(order.tp_price, 21_350.0);
}

#[tokio::test]
async fn test_duplicate_create_processed_once() {
    let harness = Harness::spawn();
    harness
        .send(network_create("MNQZ25", 21_450.0, 10, Side::Long))
        .await;
    harness
        .send(network_create("MNQZ25", 21_450.0, 10, Side::Long))
        .await;

    harness.wait_chart(|chart| chart.lines().len() == 2).await;
    sleep(Duration::from_millis(200)).await;

    // the retry was suppressed: one render pass, two lines total
    assert_eq!(harness.chart.created_count(), 2);
    assert_eq!(harness.store.save_count(), 1);
}

#[tokio::test]
async fn test_market_order_clears_everything() {
    let harness = Harness::spawn();
    harness
        .send(network_create("MNQZ25", 21_450.0, 10, Side::Long))
        .await;
    harness.wait_chart(|chart| chart.lines().len() == 2).await;

    let market = OrderSignal {
        symbol: Some("MNQZ25".to_string()),
        order_type: Some(OrderType::Market),
        quantity: Some(1),
        ..OrderSignal::new(SignalAction::Create, SignalSource::Network)
    };
    harness.send(market).await;

    harness.wait_chart(|chart| chart.lines().is_empty()).await;
    let state = harness.status().await;
    assert!(!state.has_active_order);
    assert!(state.order.is_none());
    assert_eq!(state.rendered, RenderedLineState::default());
    assert!(harness.store.current().is_none());
}

#[tokio::test]
async fn test_cancel_clears_lines_and_store() {
    let harness = Harness::spawn();
    harness
        .send(network_create("ESU25", 5_850.0, 2, Side::Long))
        .await;
    harness.wait_chart(|chart| chart.lines().len() == 2).await;

    harness
        .send(OrderSignal::new(SignalAction::Cancel, SignalSource::Network))
        .await;

    harness.wait_chart(|chart| chart.lines().is_empty()).await;
    assert!(!harness.status().await.has_active_order);
    assert!(harness.store.current().is_none());
}

#[tokio::test]
async fn test_fill_is_terminal() {
    let harness = Harness::spawn();
    harness
        .send(network_create("MNQZ25", 21_450.0, 1, Side::Long))
        .await;
    harness.wait_chart(|chart| chart.lines().len() == 2).await;

    harness
        .send(OrderSignal::new(SignalAction::Fill, SignalSource::Network))
        .await;

    harness.wait_chart(|chart| chart.lines().is_empty()).await;
    assert!(!harness.status().await.has_active_order);
    // filled orders are not restorable
    assert!(harness.store.current().is_none());
}

#[tokio::test]
async fn test_entry_modify_recomputes_levels() {
    let harness = Harness::spawn();
    harness
        .send(network_create("MNQZ25", 21_450.0, 10, Side::Long))
        .await;
    harness.wait_chart(|chart| chart.lines().len() == 2).await;

    let modify = OrderSignal {
        price: Some(21_500.0),
        order_id: Some("9001".to_string()),
        ..OrderSignal::new(SignalAction::Modify, SignalSource::Network)
    };
    harness.send(modify).await;

    let order = harness
        .wait_order(|order| order.entry_price == 21_500.0)
        .await;
    assert_eq!(order.sl_price, 21_450.0);
    assert_eq!(order.tp_price, 21_600.0);
}

#[tokio::test]
async fn test_dom_side_is_advisory_once_network_sets_it() {
    let harness = Harness::spawn();
    harness
        .send(network_create("MNQZ25", 21_450.0, 10, Side::Long))
        .await;
    harness.wait_chart(|chart| chart.lines().len() == 2).await;

    // hover flipped the panel side; the quantity genuinely changed
    let dom = OrderSignal {
        symbol: Some("MNQZ25".to_string()),
        price: Some(21_450.0),
        quantity: Some(5),
        side: Some(Side::Short),
        ..OrderSignal::new(SignalAction::Create, SignalSource::Dom)
    };
    harness.send(dom).await;

    let order = harness.wait_order(|order| order.quantity == 5).await;
    // DOM side ignored, DOM quantity accepted
    assert_eq!(order.side, Side::Long);
    assert_eq!(order.sl_price, 21_400.0);
    assert_eq!(order.sl_dollars, 500.0);
}

#[tokio::test]
async fn test_dom_only_data_does_not_activate_by_default() {
    let harness = Harness::spawn();
    let dom = OrderSignal {
        symbol: Some("MNQZ25".to_string()),
        price: Some(21_450.0),
        quantity: Some(2),
        side: Some(Side::Long),
        ..OrderSignal::new(SignalAction::Create, SignalSource::Dom)
    };
    harness.send(dom).await;
    sleep(Duration::from_millis(200)).await;

    let state = harness.status().await;
    assert!(!state.has_active_order);
    assert!(harness.chart.lines().is_empty());
}

#[tokio::test]
async fn test_dom_implies_order_policy_activates() {
    let config = RiskConfig {
        dom_implies_order: true,
        ..test_config()
    };
    let harness = Harness::spawn_with(config, SimulatedChart::new(), MemoryStore::new());

    let dom = OrderSignal {
        symbol: Some("MNQZ25".to_string()),
        price: Some(21_450.0),
        quantity: Some(2),
        side: Some(Side::Long),
        ..OrderSignal::new(SignalAction::Create, SignalSource::Dom)
    };
    harness.send(dom).await;

    harness.wait_chart(|chart| chart.lines().len() == 2).await;
    let order = harness.status().await.order.expect("order tracked");
    assert_eq!(order.sl_price, 21_400.0);
}

#[tokio::test]
async fn test_unknown_instrument_stays_unrendered() {
    let harness = Harness::spawn();
    harness
        .send(network_create("XXXZ25", 100.0, 1, Side::Long))
        .await;
    sleep(Duration::from_millis(250)).await;

    let state = harness.status().await;
    // the order is tracked, but without tick data nothing is drawn
    assert!(state.has_active_order);
    assert!(harness.chart.lines().is_empty());
}

fn stored(symbol: &str, age: ChronoDuration, sl: f64, tp: f64) -> StoredState {
    let now = Utc::now();
    let mut state = StoredState::new(
        OrderRecord {
            order_id: "restored-1".to_string(),
            account_id: Some(42),
            symbol: symbol.to_string(),
            side: Side::Long,
            order_type: OrderType::Limit,
            entry_price: 21_450.0,
            quantity: 10,
            sl_price: sl,
            tp_price: tp,
            sl_dollars: 1_400.0,
            tp_dollars: 2_000.0,
            status: OrderStatus::Active,
            created_at: now - age,
            updated_at: now - age,
        },
        RenderedLineState {
            sl_price: Some(sl),
            tp_price: Some(tp),
        },
    );
    state.saved_at = now - age;
    state
}

#[tokio::test]
async fn test_restore_renders_stored_prices_not_recomputed() {
    // the stored SL sits where the user last dragged it, not where the
    // current config would put it
    let seeded =
        MemoryStore::seeded(stored("MNQZ25", ChronoDuration::hours(1), 21_380.0, 21_560.0));
    let harness = Harness::spawn_with(test_config(), SimulatedChart::new(), seeded);

    harness.wait_chart(|chart| chart.lines().len() == 2).await;

    let state = harness.status().await;
    assert!(state.has_active_order);
    let order = state.order.expect("order restored");
    assert_eq!(order.sl_price, 21_380.0);
    assert_eq!(order.tp_price, 21_560.0);
    let prices = harness.line_prices();
    assert!(prices.contains(&21_380.0));
    assert!(prices.contains(&21_560.0));
}

#[tokio::test]
async fn test_restore_discards_stale_state() {
    let seeded =
        MemoryStore::seeded(stored("MNQZ25", ChronoDuration::hours(25), 21_380.0, 21_560.0));
    let harness = Harness::spawn_with(test_config(), SimulatedChart::new(), seeded);
    sleep(Duration::from_millis(300)).await;

    let state = harness.status().await;
    assert!(!state.has_active_order);
    assert!(state.order.is_none());
    assert!(harness.chart.lines().is_empty());
    // stale state is dropped from the store as well
    assert!(harness.store.current().is_none());
}

#[tokio::test]
async fn test_restore_defers_until_surface_appears() {
    let seeded =
        MemoryStore::seeded(stored("MNQZ25", ChronoDuration::hours(1), 21_380.0, 21_560.0));
    let config = RiskConfig {
        surface_wait_secs: 0,
        ..test_config()
    };
    let harness = Harness::spawn_with(config, SimulatedChart::unavailable(), seeded);

    sleep(Duration::from_millis(300)).await;
    assert!(harness.chart.lines().is_empty());

    harness.chart.set_available(true);
    harness.wait_chart(|chart| chart.lines().len() == 2).await;
    let order = harness.status().await.order.expect("order restored late");
    assert_eq!(order.sl_price, 21_380.0);
}

#[tokio::test]
async fn test_surface_recreation_rerenders_current_order() {
    let harness = Harness::spawn();
    harness
        .send(network_create("MNQZ25", 21_450.0, 10, Side::Long))
        .await;
    harness.wait_chart(|chart| chart.lines().len() == 2).await;

    // navigation tears the widget down
    harness.chart.set_available(false);
    harness.wait_chart(|chart| chart.lines().is_empty()).await;

    // and brings a fresh one back; no new signal arrives
    harness.chart.set_available(true);
    harness.wait_chart(|chart| chart.lines().len() == 2).await;
    let prices = harness.line_prices();
    assert!(prices.contains(&21_400.0));
    assert!(prices.contains(&21_550.0));
}

#[tokio::test]
async fn test_config_change_recomputes_levels() {
    let harness = Harness::spawn();
    harness
        .send(network_create("MNQZ25", 21_450.0, 10, Side::Long))
        .await;
    harness.wait_chart(|chart| chart.lines().len() == 2).await;

    let config = RiskConfig {
        default_sl: 200.0,
        ..test_config()
    };
    harness
        .tx
        .send(ReconcilerMessage::ConfigChanged(config))
        .await
        .expect("reconciler alive");

    // $200 at $0.50/tick is 400 ticks = 100 points
    let order = harness.wait_order(|order| order.sl_price == 21_350.0).await;
    assert_eq!(order.tp_price, 21_650.0);
}

#[tokio::test]
async fn test_shutdown_stops_actor() {
    let harness = Harness::spawn();
    harness
        .tx
        .send(ReconcilerMessage::Shutdown)
        .await
        .expect("reconciler alive");
    sleep(Duration::from_millis(100)).await;
    // channel closes once the actor drops its receiver
    assert!(harness.tx.send(ReconcilerMessage::Shutdown).await.is_err());
}
