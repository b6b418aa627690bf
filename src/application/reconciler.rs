//! Order State Reconciler
//!
//! The actor that owns the tracked order. Network and DOM sources submit
//! normalized signals through one channel; the reconciler merges them into
//! a single [`OrderRecord`], decides when bracket lines are (re)drawn or
//! cleared, restores state across reloads, detects user line drags, and
//! debounces the outbound bracket sync. Nothing else mutates the order or
//! the rendered-line bookkeeping.
//!
//! State machine: no order -> (create signal) -> active -> cancelled /
//! filled / cleared by a market order. Lines exist only while active.
//! Incomplete data (a DOM reading with no network-confirmed order) stages
//! in `dom_cache` until a create arrives, or activates directly when the
//! `dom_implies_order` policy is enabled.

use crate::application::signal::{DedupWindow, OrderSignal, SignalAction, SignalSource};
use crate::config::RiskConfig;
use crate::domain::entities::instrument::{self, InstrumentSpec};
use crate::domain::entities::order::{
    OrderRecord, OrderStatus, OrderType, RenderedLineState, Side,
};
use crate::domain::errors::BracketError;
use crate::domain::repositories::bracket_sync::BracketSyncClient;
use crate::domain::repositories::chart_surface::{ChartSurface, LineId, LineStyle, SurfaceError};
use crate::domain::repositories::state_store::{StateStore, StoredState};
use crate::domain::services::calculator::{BracketRequest, Calculator};
use crate::domain::services::labels::{format_label, LineKind};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Channel capacity for reconciler messages
const RECONCILER_CHANNEL_CAPACITY: usize = 256;

/// Messages accepted by the reconciler actor
#[derive(Debug)]
pub enum ReconcilerMessage {
    /// A normalized order signal from any ingestion source
    Signal(OrderSignal),
    /// Replace the active configuration and re-render
    ConfigChanged(RiskConfig),
    /// Read back the current state
    GetStatus { reply: mpsc::Sender<ReconcilerStatus> },
    /// Stop the actor
    Shutdown,
}

/// Snapshot of reconciler state for status queries and tests
#[derive(Debug, Clone)]
pub struct ReconcilerStatus {
    pub has_active_order: bool,
    pub order: Option<OrderRecord>,
    pub rendered: RenderedLineState,
    pub surface_ready: bool,
}

/// Latest fields seen from the DOM panel, staged as fallbacks for network
/// signals that arrive incomplete
#[derive(Debug, Clone, Default)]
struct DomCache {
    symbol: Option<String>,
    price: Option<f64>,
    quantity: Option<u32>,
    side: Option<Side>,
}

/// The reconciler actor
pub struct Reconciler {
    config: RiskConfig,
    calc: Calculator,
    chart: Arc<dyn ChartSurface>,
    store: Arc<dyn StateStore>,
    sync: Arc<dyn BracketSyncClient>,

    order: Option<OrderRecord>,
    rendered: RenderedLineState,
    sl_line: Option<LineId>,
    tp_line: Option<LineId>,
    dom_cache: DomCache,
    dedup: DedupWindow,
    /// Side was established by a network signal; DOM side readings are
    /// ignored while set
    network_side_locked: bool,
    /// Sticky account id captured from the most recent signal carrying one
    account_id: Option<i64>,

    surface_ready: bool,
    restore_pending: Option<StoredState>,

    sync_deadline: Option<Instant>,
    persist_deadline: Option<Instant>,
    sl_drag_pending: bool,
    tp_drag_pending: bool,
}

impl Reconciler {
    pub fn new(
        config: RiskConfig,
        chart: Arc<dyn ChartSurface>,
        store: Arc<dyn StateStore>,
        sync: Arc<dyn BracketSyncClient>,
    ) -> Self {
        let dedup = DedupWindow::new(Duration::from_millis(config.dedup_window_ms));
        Self {
            config,
            calc: Calculator::new(),
            chart,
            store,
            sync,
            order: None,
            rendered: RenderedLineState::default(),
            sl_line: None,
            tp_line: None,
            dom_cache: DomCache::default(),
            dedup,
            network_side_locked: false,
            account_id: None,
            surface_ready: false,
            restore_pending: None,
            sync_deadline: None,
            persist_deadline: None,
            sl_drag_pending: false,
            tp_drag_pending: false,
        }
    }

    /// Spawn the actor and return its message channel
    pub fn spawn(
        config: RiskConfig,
        chart: Arc<dyn ChartSurface>,
        store: Arc<dyn StateStore>,
        sync: Arc<dyn BracketSyncClient>,
    ) -> mpsc::Sender<ReconcilerMessage> {
        let (tx, rx) = mpsc::channel(RECONCILER_CHANNEL_CAPACITY);
        let actor = Self::new(config, chart, store, sync);
        tokio::spawn(async move {
            actor.run(rx).await;
        });
        tx
    }

    /// Main actor loop
    pub async fn run(mut self, mut rx: mpsc::Receiver<ReconcilerMessage>) {
        info!("Reconciler started");

        self.load_persisted().await;

        let max_wait = Duration::from_secs(self.config.surface_wait_secs);
        if self.chart.find_surface(max_wait).await {
            self.surface_ready = true;
            info!("Chart surface found");
            if let Some(state) = self.restore_pending.take() {
                self.apply_restore(state).await;
            }
        } else {
            let err = BracketError::SurfaceUnavailable {
                waited_secs: max_wait.as_secs(),
            };
            warn!("{err}; watchdog keeps retrying");
        }

        let mut drag_poll = interval(Duration::from_millis(self.config.drag_poll_ms));
        drag_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut watchdog = interval(Duration::from_millis(self.config.watchdog_ms));
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let sync_deadline = self.sync_deadline;
            let persist_deadline = self.persist_deadline;
            tokio::select! {
                maybe_msg = rx.recv() => {
                    match maybe_msg {
                        Some(first) => {
                            if !self.handle_inbox(first, &mut rx).await {
                                break;
                            }
                        }
                        None => {
                            info!("Reconciler channel closed");
                            break;
                        }
                    }
                }
                _ = drag_poll.tick() => {
                    self.drag_tick().await;
                }
                _ = watchdog.tick() => {
                    self.watchdog_tick().await;
                }
                _ = sleep_until(sync_deadline.unwrap_or_else(Instant::now)),
                    if sync_deadline.is_some() =>
                {
                    self.flush_sync().await;
                }
                _ = sleep_until(persist_deadline.unwrap_or_else(Instant::now)),
                    if persist_deadline.is_some() =>
                {
                    self.flush_persist().await;
                }
            }
        }

        info!("Reconciler stopped");
    }

    /// Drain every message already queued and apply them deterministically:
    /// config changes first, then signals ordered so network data wins same
    /// tick conflicts, then status replies. Returns false on shutdown.
    async fn handle_inbox(
        &mut self,
        first: ReconcilerMessage,
        rx: &mut mpsc::Receiver<ReconcilerMessage>,
    ) -> bool {
        let mut batch = vec![first];
        while let Ok(msg) = rx.try_recv() {
            batch.push(msg);
        }

        let mut signals = Vec::new();
        let mut replies = Vec::new();
        let mut shutdown = false;
        for msg in batch {
            match msg {
                ReconcilerMessage::ConfigChanged(config) => self.apply_config(config).await,
                ReconcilerMessage::Signal(signal) => signals.push(signal),
                ReconcilerMessage::GetStatus { reply } => replies.push(reply),
                ReconcilerMessage::Shutdown => shutdown = true,
            }
        }

        sort_signals(&mut signals);
        for signal in signals {
            self.handle_signal(signal).await;
        }

        for reply in replies {
            let status = self.status();
            if reply.send(status).await.is_err() {
                debug!("status requester went away");
            }
        }

        if shutdown {
            info!("Reconciler received shutdown");
            return false;
        }
        true
    }

    fn status(&self) -> ReconcilerStatus {
        ReconcilerStatus {
            has_active_order: self.order.as_ref().is_some_and(OrderRecord::is_live),
            order: self.order.clone(),
            rendered: self.rendered,
            surface_ready: self.surface_ready,
        }
    }

    async fn apply_config(&mut self, config: RiskConfig) {
        info!("Configuration updated");
        self.dedup = DedupWindow::new(Duration::from_millis(config.dedup_window_ms));
        self.config = config;
        if self.order.as_ref().is_some_and(OrderRecord::is_live) {
            self.recompute_and_render().await;
            self.persist_now().await;
        }
    }

    // ---- signal handling -------------------------------------------------

    async fn handle_signal(&mut self, signal: OrderSignal) {
        // dedup targets retried platform calls; DOM readings are already
        // diffed at the scanner
        if signal.source == SignalSource::Network && self.dedup.is_duplicate(&signal) {
            debug!("duplicate signal suppressed: {:?} {:?}", signal.action, signal.price);
            return;
        }
        if let Some(account_id) = signal.account_id {
            self.account_id = Some(account_id);
        }

        // market orders execute immediately: nothing to bracket, regardless
        // of the reported action or prior state
        if signal.order_type == Some(OrderType::Market) {
            info!("Market order signal: clearing bracket state");
            self.clear_all(None).await;
            return;
        }

        match signal.action {
            SignalAction::Create => self.handle_create(signal).await,
            SignalAction::Modify => self.handle_modify(signal).await,
            SignalAction::Cancel => {
                info!("Cancel signal received");
                self.clear_all(Some(OrderStatus::Cancelled)).await;
            }
            SignalAction::Fill => {
                info!("Fill signal received");
                self.clear_all(Some(OrderStatus::Filled)).await;
            }
        }
    }

    async fn handle_create(&mut self, signal: OrderSignal) {
        match signal.source {
            SignalSource::Dom => self.handle_dom_update(signal).await,
            SignalSource::Network => self.activate(signal).await,
        }
    }

    /// DOM readings stage into the cache and merge into a live order as
    /// lower-confidence fallbacks. They activate an order on their own only
    /// under the `dom_implies_order` policy.
    async fn handle_dom_update(&mut self, signal: OrderSignal) {
        if let Some(symbol) = &signal.symbol {
            self.dom_cache.symbol = Some(symbol.clone());
        }
        if let Some(price) = signal.price {
            self.dom_cache.price = Some(price);
        }
        if let Some(quantity) = signal.quantity {
            self.dom_cache.quantity = Some(quantity);
        }
        if let Some(side) = signal.side {
            self.dom_cache.side = Some(side);
        }

        if self.order.as_ref().is_some_and(OrderRecord::is_live) {
            let mut changed = false;
            if let Some(order) = self.order.as_mut() {
                if let Some(symbol) = &signal.symbol {
                    if order.symbol != *symbol {
                        order.symbol = symbol.clone();
                        changed = true;
                    }
                }
                if let Some(price) = signal.price {
                    if order.entry_price != price {
                        order.entry_price = price;
                        changed = true;
                    }
                }
                if let Some(quantity) = signal.quantity {
                    if order.quantity != quantity {
                        order.quantity = quantity;
                        changed = true;
                    }
                }
                if let Some(side) = signal.side {
                    if self.network_side_locked {
                        // hover states flip the panel side; the network
                        // already told us the truth
                        debug!("ignoring DOM side change to {side}");
                    } else if order.side != side {
                        order.side = side;
                        changed = true;
                    }
                }
                if changed {
                    order.touch();
                }
            }
            if changed {
                self.recompute_and_render().await;
                self.persist_now().await;
            }
        } else if self.config.dom_implies_order
            && self.dom_cache.symbol.is_some()
            && self.dom_cache.price.is_some()
        {
            info!("DOM panel data activates order (dom_implies_order policy)");
            self.activate(signal).await;
        } else {
            debug!("DOM data staged; no network-confirmed order yet");
        }
    }

    /// Create/replace the tracked order from a confirmed create signal,
    /// filling gaps from the DOM cache.
    async fn activate(&mut self, signal: OrderSignal) {
        let symbol = signal.symbol.clone().or_else(|| self.dom_cache.symbol.clone());
        let price = signal.price.or(self.dom_cache.price);
        let (Some(symbol), Some(price)) = (symbol, price) else {
            debug!("create signal incomplete (symbol/price missing), staged only");
            return;
        };

        let quantity = signal
            .quantity
            .or(self.dom_cache.quantity)
            .unwrap_or(1)
            .max(1);
        let side = signal
            .side
            .or(self.dom_cache.side)
            .unwrap_or(Side::Long);
        let order_id = signal
            .order_id
            .clone()
            .unwrap_or_else(|| format!("local-{}", signal.timestamp.timestamp_millis()));

        self.network_side_locked =
            signal.source == SignalSource::Network && signal.side.is_some();

        let now = Utc::now();
        let order = OrderRecord {
            order_id,
            account_id: signal.account_id.or(self.account_id),
            symbol,
            side,
            order_type: signal.order_type.unwrap_or(OrderType::Limit),
            entry_price: price,
            quantity,
            sl_price: 0.0,
            tp_price: 0.0,
            sl_dollars: 0.0,
            tp_dollars: 0.0,
            status: OrderStatus::Active,
            created_at: now,
            updated_at: now,
        };
        info!(
            "Tracking {} {} order: {} @ {} x{}",
            order.side, order_type_name(order.order_type), order.symbol, price, quantity
        );
        self.order = Some(order);
        self.recompute_and_render().await;
        self.persist_now().await;
    }

    /// Price-only edit of the pending entry order
    async fn handle_modify(&mut self, signal: OrderSignal) {
        if !self.order.as_ref().is_some_and(OrderRecord::is_live) {
            debug!("modify signal with no tracked order, ignoring");
            return;
        }
        let Some(price) = signal.price else {
            debug!("modify signal without a price, ignoring");
            return;
        };
        if let Some(order) = self.order.as_mut() {
            info!("Entry price modified: {} -> {}", order.entry_price, price);
            order.entry_price = price;
            order.touch();
        }
        self.recompute_and_render().await;
        self.persist_now().await;
    }

    /// Tear down lines, live record, and persisted state. `terminal` marks
    /// the record before dropping it, for logging only.
    async fn clear_all(&mut self, terminal: Option<OrderStatus>) {
        if let (Some(status), Some(order)) = (terminal, self.order.as_mut()) {
            order.status = status;
            order.touch();
        }
        self.clear_lines().await;
        self.order = None;
        self.network_side_locked = false;
        self.sl_drag_pending = false;
        self.tp_drag_pending = false;
        self.sync_deadline = None;
        self.persist_deadline = None;
        if let Err(e) = self.store.clear().await {
            warn!(
                "{}",
                BracketError::StoreFailure { reason: e.to_string() }
            );
        }
    }

    // ---- calculation + rendering ----------------------------------------

    /// Recompute SL/TP from the current config and entry price, then redraw.
    /// A failed recompute leaves the previously rendered state untouched.
    async fn recompute_and_render(&mut self) {
        let Some(order) = self.order.clone() else {
            return;
        };
        if !order.is_live() {
            return;
        }
        let Some(spec) = instrument::lookup(&order.symbol) else {
            warn!(
                "{}",
                BracketError::UnknownInstrument { symbol: order.symbol.clone() }
            );
            return;
        };

        let request = BracketRequest {
            risk_mode: self.config.risk_mode,
            risk_amount: self.config.risk_amount(),
            account_size: self.config.account_size,
            entry_price: order.entry_price,
            sl_dollars: self.config.default_sl,
            use_ratio: self.config.use_ratio,
            tp_ratio: self.config.tp_ratio,
            tp_dollars: self.config.default_tp,
            tick_value: spec.tick_value,
            tick_size: spec.tick_size,
            side: order.side,
            contract_rounding: self.config.contract_rounding,
            min_contracts: self.config.min_contracts,
            max_contracts: self.config.max_contracts,
        };
        let levels = match self.calc.calculate_all(&request) {
            Ok(levels) => levels,
            Err(e) => {
                warn!("{}", BracketError::from(e));
                return;
            }
        };

        // a side mid-drag keeps its dragged level: record and line must
        // not diverge while the user still owns the mouse
        let quantity = order.quantity;
        let update_sl = !self.sl_drag_pending;
        let update_tp = !self.tp_drag_pending;
        if let Some(order) = self.order.as_mut() {
            if update_sl {
                order.sl_price = levels.sl_price;
                order.sl_dollars = levels.ticks_to_sl * spec.tick_value * quantity as f64;
            }
            if update_tp {
                order.tp_price = levels.tp_price;
                order.tp_dollars = levels.ticks_to_tp * spec.tick_value * quantity as f64;
            }
            order.touch();
        }
        self.render_current().await;
    }

    /// Draw both lines at the record's current levels. Used by recompute,
    /// restore, and surface recreation; restore renders stored prices
    /// unchanged so user drags survive reloads. Lines mid-drag are left
    /// alone.
    async fn render_current(&mut self) {
        if !self.surface_ready {
            return;
        }
        let Some(order) = self.order.clone() else {
            return;
        };
        if !order.is_live() || order.order_type == OrderType::Market {
            return;
        }
        if !self.sl_drag_pending {
            self.render_line(LineKind::StopLoss, &order).await;
        }
        if !self.tp_drag_pending {
            self.render_line(LineKind::TakeProfit, &order).await;
        }
    }

    async fn render_line(&mut self, kind: LineKind, order: &OrderRecord) {
        let (price, dollars, color, pattern) = match kind {
            LineKind::StopLoss => (
                order.sl_price,
                order.sl_dollars,
                self.config.sl_color.clone(),
                self.config.sl_line_pattern,
            ),
            LineKind::TakeProfit => (
                order.tp_price,
                order.tp_dollars,
                self.config.tp_color.clone(),
                self.config.tp_line_pattern,
            ),
        };

        let existing = match kind {
            LineKind::StopLoss => self.sl_line.take(),
            LineKind::TakeProfit => self.tp_line.take(),
        };
        if let Some(id) = existing {
            if let Err(e) = self.chart.remove_line(&id).await {
                debug!("removing stale line {id} failed: {e}");
            }
        }

        let label = if self.config.show_labels {
            format_label(kind, dollars, order.quantity, &self.config.label_prefs())
        } else {
            String::new()
        };
        let style = LineStyle {
            color,
            width: self.config.line_width,
            pattern,
            label,
        };
        match self.chart.create_line(price, &style).await {
            Ok(id) => {
                // prime the rendered state in the same turn so the next
                // drag poll cannot mistake this write for a user drag
                match kind {
                    LineKind::StopLoss => {
                        self.sl_line = Some(id);
                        self.rendered.sl_price = Some(price);
                    }
                    LineKind::TakeProfit => {
                        self.tp_line = Some(id);
                        self.rendered.tp_price = Some(price);
                    }
                }
            }
            Err(e) => {
                warn!("line render failed at {price}: {e}");
            }
        }
    }

    async fn clear_lines(&mut self) {
        for id in [self.sl_line.take(), self.tp_line.take()].into_iter().flatten() {
            if let Err(e) = self.chart.remove_line(&id).await {
                debug!("line removal failed: {e}");
            }
        }
        self.rendered.clear();
    }

    // ---- drag detection --------------------------------------------------

    /// One drag-poll cycle: refresh labels from current line positions and
    /// detect user moves. Errors are logged, never propagated; a bad
    /// reading must not kill the loop.
    async fn drag_tick(&mut self) {
        if !self.surface_ready {
            return;
        }
        let Some(order) = self.order.clone() else {
            return;
        };
        let Some(spec) = instrument::lookup(&order.symbol) else {
            return;
        };
        self.poll_line(LineKind::StopLoss, &order, spec).await;
        self.poll_line(LineKind::TakeProfit, &order, spec).await;
    }

    async fn poll_line(&mut self, kind: LineKind, order: &OrderRecord, spec: &InstrumentSpec) {
        let line_id = match kind {
            LineKind::StopLoss => self.sl_line.clone(),
            LineKind::TakeProfit => self.tp_line.clone(),
        };
        let Some(id) = line_id else {
            return;
        };

        let price = match self.chart.line_price(&id).await {
            Ok(price) => price,
            Err(SurfaceError::LineNotFound(_)) => {
                debug!("{kind:?} line disappeared, dropping handle");
                match kind {
                    LineKind::StopLoss => self.sl_line = None,
                    LineKind::TakeProfit => self.tp_line = None,
                }
                return;
            }
            Err(e) => {
                debug!("line price read failed: {e}");
                return;
            }
        };

        // labels always track the line, dragged or not
        let dollars = self
            .calc
            .dollars_from_price_delta(
                order.entry_price,
                price,
                order.quantity,
                spec.tick_value,
                spec.tick_size,
            )
            .abs();
        if self.config.show_labels {
            let label = format_label(kind, dollars, order.quantity, &self.config.label_prefs());
            if let Err(e) = self.chart.set_line_label(&id, &label).await {
                debug!("label refresh failed: {e}");
            }
        }

        let last_rendered = match kind {
            LineKind::StopLoss => self.rendered.sl_price,
            LineKind::TakeProfit => self.rendered.tp_price,
        };
        if !RenderedLineState::moved(last_rendered, price, spec.tick_size) {
            return;
        }

        let rounded = self.calc.round_to_tick(price, spec.tick_size);
        let rounded_dollars = self
            .calc
            .dollars_from_price_delta(
                order.entry_price,
                rounded,
                order.quantity,
                spec.tick_value,
                spec.tick_size,
            )
            .abs();
        info!("{kind:?} line dragged to {rounded} ({rounded_dollars:.0}$)");

        if let Some(order) = self.order.as_mut() {
            match kind {
                LineKind::StopLoss => {
                    order.sl_price = rounded;
                    order.sl_dollars = rounded_dollars;
                }
                LineKind::TakeProfit => {
                    order.tp_price = rounded;
                    order.tp_dollars = rounded_dollars;
                }
            }
            order.touch();
        }
        match kind {
            LineKind::StopLoss => {
                self.rendered.sl_price = Some(rounded);
                self.sl_drag_pending = true;
            }
            LineKind::TakeProfit => {
                self.rendered.tp_price = Some(rounded);
                self.tp_drag_pending = true;
            }
        }
        self.schedule_sync();
        self.schedule_persist();
    }

    /// Single-slot coalescing timer: a fresh drag replaces the pending
    /// deadline rather than queueing a second call
    fn schedule_sync(&mut self) {
        self.sync_deadline =
            Some(Instant::now() + Duration::from_millis(self.config.sync_debounce_ms));
    }

    fn schedule_persist(&mut self) {
        self.persist_deadline =
            Some(Instant::now() + Duration::from_millis(self.config.persist_debounce_ms));
    }

    // ---- debounced flushes ----------------------------------------------

    async fn flush_sync(&mut self) {
        self.sync_deadline = None;
        self.sl_drag_pending = false;
        self.tp_drag_pending = false;

        let Some(order) = self.order.clone() else {
            return;
        };
        let Some(account_id) = order.account_id.or(self.account_id) else {
            warn!("no account id captured yet, skipping bracket sync");
            return;
        };
        let risk = order.sl_dollars.round() as i64;
        let reward = order.tp_dollars.round() as i64;
        match self
            .sync
            .update_brackets(account_id, risk, reward, self.config.auto_apply_brackets)
            .await
        {
            Ok(()) => info!("Bracket sync complete: risk {risk}, reward {reward}"),
            Err(e) => {
                // local state stays authoritative; a later drag or
                // recompute naturally re-triggers the sync
                warn!(
                    "{}",
                    BracketError::SyncFailure { reason: e.to_string() }
                );
            }
        }
    }

    async fn flush_persist(&mut self) {
        self.persist_deadline = None;
        self.persist_now().await;
    }

    async fn persist_now(&mut self) {
        if !self.config.persist_lines {
            return;
        }
        let Some(order) = self.order.clone() else {
            return;
        };
        if !order.is_live() {
            return;
        }
        let state = StoredState::new(order, self.rendered);
        if let Err(e) = self.store.save(&state).await {
            warn!(
                "{}",
                BracketError::StoreFailure { reason: e.to_string() }
            );
        }
    }

    // ---- restore + watchdog ---------------------------------------------

    async fn load_persisted(&mut self) {
        match self.store.load().await {
            Ok(Some(state)) => {
                let ttl = chrono::Duration::hours(self.config.restore_ttl_hours);
                if state.is_stale(ttl) {
                    let age_hours = (Utc::now() - state.saved_at).num_hours();
                    debug!("{}", BracketError::StaleData { age_hours });
                    if let Err(e) = self.store.clear().await {
                        warn!("clearing stale state failed: {e}");
                    }
                } else if state.order.is_live() {
                    info!(
                        "Persisted order found: {} {} @ {}",
                        state.order.symbol, state.order.side, state.order.entry_price
                    );
                    self.restore_pending = Some(state);
                }
            }
            Ok(None) => debug!("no persisted order state"),
            Err(e) => warn!(
                "{}",
                BracketError::StoreFailure { reason: e.to_string() }
            ),
        }
    }

    /// Re-adopt a persisted order and render the stored levels unchanged:
    /// recomputing here would throw away the user's last drag.
    async fn apply_restore(&mut self, state: StoredState) {
        let mut order = state.order;
        order.status = OrderStatus::Active;
        self.account_id = order.account_id.or(self.account_id);
        // restored side came from a confirmed order; DOM must not flip it
        self.network_side_locked = true;
        self.order = Some(order);
        self.rendered = state.lines;
        self.render_current().await;
        info!("Order state restored from persisted store");
    }

    /// Detect chart surface loss and recreation. The host page rebuilds the
    /// widget on navigation; old line handles die with it.
    async fn watchdog_tick(&mut self) {
        let available = self.chart.is_available().await;
        if available && !self.surface_ready {
            info!("Chart surface (re)acquired");
            self.surface_ready = true;
            self.sl_line = None;
            self.tp_line = None;
            if let Some(state) = self.restore_pending.take() {
                self.apply_restore(state).await;
            } else {
                self.render_current().await;
            }
        } else if !available && self.surface_ready {
            warn!("Chart surface lost, awaiting recreation");
            self.surface_ready = false;
            self.sl_line = None;
            self.tp_line = None;
            self.rendered.clear();
        }
    }
}

fn order_type_name(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Limit => "limit",
        OrderType::Stop => "stop",
        OrderType::Market => "market",
    }
}

/// Order a drained batch so that, for signals landing in the same tick,
/// network-sourced data is applied after (and therefore wins over)
/// DOM-sourced data, and newer timestamps win within a source.
fn sort_signals(signals: &mut [OrderSignal]) {
    signals.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.source.rank().cmp(&b.source.rank()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn signal(source: SignalSource, secs: i64) -> OrderSignal {
        OrderSignal {
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            ..OrderSignal::new(SignalAction::Create, source)
        }
    }

    #[test]
    fn test_sort_signals_network_applied_last_on_tie() {
        let mut batch = vec![
            signal(SignalSource::Network, 100),
            signal(SignalSource::Dom, 100),
        ];
        sort_signals(&mut batch);
        assert_eq!(batch[0].source, SignalSource::Dom);
        assert_eq!(batch[1].source, SignalSource::Network);
    }

    #[test]
    fn test_sort_signals_keeps_time_order_across_sources() {
        let mut batch = vec![
            signal(SignalSource::Network, 100),
            signal(SignalSource::Dom, 200),
        ];
        sort_signals(&mut batch);
        // the DOM signal is genuinely newer, so it still applies last
        assert_eq!(batch[0].source, SignalSource::Network);
        assert_eq!(batch[1].source, SignalSource::Dom);
    }

    #[test]
    fn test_order_type_name() {
        assert_eq!(order_type_name(OrderType::Limit), "limit");
        assert_eq!(order_type_name(OrderType::Stop), "stop");
        assert_eq!(order_type_name(OrderType::Market), "market");
    }
}
