//! Replay harness binary
//!
//! Drives the reconciler from newline-delimited JSON events on stdin:
//! intercepted network calls, order-panel snapshots, simulated line drags,
//! and status queries. Lines render on a simulated chart surface and state
//! persists to a JSON file, so reload/restore behavior can be exercised by
//! re-running the harness.
//!
//! Event examples:
//!   {"kind":"network","method":"POST","url":"https://userapi.example.com/Order","body":{"symbolId":"F.US.MNQ","type":1,"limitPrice":21450,"positionSize":10,"accountId":42}}
//!   {"kind":"panel","symbol":"MNQZ25","price":"21450","quantity":"10","side":"Buy"}
//!   {"kind":"drag","line":"sl","price":21380.5}
//!   {"kind":"status"}

use bracketline::application::dom_scanner::{DomScanner, PanelFields, PanelProbe};
use bracketline::application::network_extractor::{self, InterceptedCall};
use bracketline::application::reconciler::{Reconciler, ReconcilerMessage, ReconcilerStatus};
use bracketline::config::RiskConfig;
use bracketline::domain::repositories::bracket_sync::BracketSyncClient;
use bracketline::infrastructure::json_store::JsonFileStore;
use bracketline::infrastructure::memory::{RecordingSyncClient, SimulatedChart};
use bracketline::infrastructure::rest_sync::RestSyncClient;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// One harness input line
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum HarnessEvent {
    /// An intercepted order API call
    Network {
        method: String,
        url: String,
        #[serde(default)]
        body: Option<Value>,
    },
    /// A snapshot of the visible order-entry panel
    Panel {
        #[serde(default)]
        symbol: Option<String>,
        #[serde(default)]
        price: Option<String>,
        #[serde(default)]
        quantity: Option<String>,
        #[serde(default)]
        side: Option<String>,
    },
    /// Simulate the user dragging a bracket line
    Drag { line: String, price: f64 },
    /// Log the reconciler's current state
    Status,
}

/// Panel probe fed by harness `panel` events
#[derive(Debug, Default)]
struct HarnessProbe {
    fields: Mutex<PanelFields>,
}

#[async_trait]
impl PanelProbe for HarnessProbe {
    async fn read_fields(&self) -> PanelFields {
        self.fields.lock().expect("probe lock").clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bracketline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RiskConfig::from_env();
    info!(
        "Bracketline replay harness starting (risk mode {:?}, SL ${}, TP ratio {})",
        config.risk_mode, config.default_sl, config.tp_ratio
    );

    let chart = Arc::new(SimulatedChart::new());
    let state_path = std::env::var("BRACKETLINE_STATE_FILE")
        .unwrap_or_else(|_| "bracketline-state.json".to_string());
    let store = Arc::new(JsonFileStore::new(state_path));

    let sync: Arc<dyn BracketSyncClient> = match std::env::var("BRACKETLINE_API_BASE") {
        Ok(base) => {
            info!("Bracket sync target: {base}");
            Arc::new(RestSyncClient::new(
                base,
                std::env::var("BRACKETLINE_API_TOKEN").ok(),
            ))
        }
        Err(_) => {
            info!("No BRACKETLINE_API_BASE set, recording sync calls locally");
            Arc::new(RecordingSyncClient::new())
        }
    };

    let dom_poll = Duration::from_millis(config.dom_poll_ms);
    let tx = Reconciler::spawn(config, chart.clone(), store, sync);

    let probe = Arc::new(HarnessProbe::default());
    let scanner = DomScanner::new(probe.clone(), dom_poll, tx.clone());
    let scanner_handle = scanner.spawn();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event: HarnessEvent = match serde_json::from_str(trimmed) {
            Ok(event) => event,
            Err(e) => {
                warn!("unparseable harness line: {e}");
                continue;
            }
        };
        handle_event(event, &tx, &chart, &probe).await;
    }

    info!("stdin closed, shutting down");
    let _ = tx.send(ReconcilerMessage::Shutdown).await;
    scanner_handle.abort();
    Ok(())
}

async fn handle_event(
    event: HarnessEvent,
    tx: &mpsc::Sender<ReconcilerMessage>,
    chart: &Arc<SimulatedChart>,
    probe: &Arc<HarnessProbe>,
) {
    match event {
        HarnessEvent::Network { method, url, body } => {
            let call = InterceptedCall { method, url, body };
            match network_extractor::extract(&call) {
                Some(signal) => {
                    let _ = tx.send(ReconcilerMessage::Signal(signal)).await;
                }
                None => info!("call ignored (not an order endpoint): {}", call.url),
            }
        }
        HarnessEvent::Panel {
            symbol,
            price,
            quantity,
            side,
        } => {
            let mut fields = probe.fields.lock().expect("probe lock");
            *fields = PanelFields {
                symbol,
                price,
                quantity,
                side,
            };
        }
        HarnessEvent::Drag { line, price } => {
            let Some(status) = query_status(tx).await else {
                warn!("reconciler unavailable");
                return;
            };
            let Some(order) = status.order else {
                warn!("no tracked order, nothing to drag");
                return;
            };
            let anchor = match line.as_str() {
                "sl" => order.sl_price,
                "tp" => order.tp_price,
                other => {
                    warn!("unknown line '{other}' (expected sl|tp)");
                    return;
                }
            };
            match chart.line_near(anchor) {
                Some(id) => {
                    chart.drag_line(&id, price);
                    info!("dragged {line} line to {price}");
                }
                None => warn!("no rendered line to drag"),
            }
        }
        HarnessEvent::Status => {
            if let Some(status) = query_status(tx).await {
                match &status.order {
                    Some(order) => info!(
                        "active={} {} {} entry={} qty={} sl={} (${:.0}) tp={} (${:.0})",
                        status.has_active_order,
                        order.symbol,
                        order.side,
                        order.entry_price,
                        order.quantity,
                        order.sl_price,
                        order.sl_dollars,
                        order.tp_price,
                        order.tp_dollars
                    ),
                    None => info!(
                        "active=false surface_ready={}",
                        status.surface_ready
                    ),
                }
            }
        }
    }
}

async fn query_status(tx: &mpsc::Sender<ReconcilerMessage>) -> Option<ReconcilerStatus> {
    let (reply_tx, mut reply_rx) = mpsc::channel(1);
    tx.send(ReconcilerMessage::GetStatus { reply: reply_tx })
        .await
        .ok()?;
    reply_rx.recv().await
}
