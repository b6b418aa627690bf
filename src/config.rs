//! Runtime configuration
//!
//! Risk settings, rendering preferences, and engine timing. Built-in
//! defaults are always valid; `from_env()` overrides field by field and an
//! invalid value logs a warning and keeps the default instead of failing
//! startup. Runtime changes are broadcast to the reconciler as a
//! `ConfigChanged` event rather than mutated in place.

use crate::domain::errors::BracketError;
use crate::domain::repositories::chart_surface::LinePattern;
use crate::domain::services::calculator::{ContractRounding, RiskMode};
use crate::domain::services::labels::{LabelFormat, LabelPrefs};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// User-editable risk, rendering, and engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    // Risk management
    pub risk_mode: RiskMode,
    pub risk_percent: f64,
    pub risk_fixed: f64,
    pub account_size: f64,
    /// Stop loss budget in dollars per contract
    pub default_sl: f64,
    /// Take profit budget in dollars per contract (ignored when `use_ratio`)
    pub default_tp: f64,
    pub tp_ratio: f64,
    pub use_ratio: bool,

    // Line rendering
    pub sl_color: String,
    pub tp_color: String,
    pub line_width: u32,
    pub sl_line_pattern: LinePattern,
    pub tp_line_pattern: LinePattern,
    pub show_labels: bool,
    pub label_format: LabelFormat,
    pub show_decimals: bool,
    pub show_contracts: bool,
    pub sl_prefix: String,
    pub tp_prefix: String,

    // Contract sizing
    pub contract_rounding: ContractRounding,
    pub min_contracts: u32,
    pub max_contracts: u32,

    // Engine timing
    pub drag_poll_ms: u64,
    pub dom_poll_ms: u64,
    pub watchdog_ms: u64,
    pub sync_debounce_ms: u64,
    pub persist_debounce_ms: u64,
    pub dedup_window_ms: u64,
    pub restore_ttl_hours: i64,
    pub surface_wait_secs: u64,

    // Policy
    /// Whether DOM-only signals (no network-confirmed create) may activate
    /// an order. Kept configurable pending product clarification.
    pub dom_implies_order: bool,
    pub auto_apply_brackets: bool,
    /// Keep line positions across sessions
    pub persist_lines: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_mode: RiskMode::Percent,
            risk_percent: 2.0,
            risk_fixed: 500.0,
            account_size: 50_000.0,
            default_sl: 100.0,
            default_tp: 200.0,
            tp_ratio: 2.0,
            use_ratio: true,

            sl_color: "#FF0000".to_string(),
            tp_color: "#00FF00".to_string(),
            line_width: 1,
            sl_line_pattern: LinePattern::Solid,
            tp_line_pattern: LinePattern::Solid,
            show_labels: true,
            label_format: LabelFormat::Compact,
            show_decimals: false,
            show_contracts: true,
            sl_prefix: "SL".to_string(),
            tp_prefix: "TP".to_string(),

            contract_rounding: ContractRounding::Down,
            min_contracts: 1,
            max_contracts: 100,

            drag_poll_ms: 500,
            dom_poll_ms: 500,
            watchdog_ms: 2_000,
            sync_debounce_ms: 1_000,
            persist_debounce_ms: 1_000,
            dedup_window_ms: 2_000,
            restore_ttl_hours: 24,
            surface_wait_secs: 60,

            dom_implies_order: false,
            auto_apply_brackets: true,
            persist_lines: true,
        }
    }
}

impl RiskConfig {
    /// Load configuration from `BRACKETLINE_*` environment variables on top
    /// of the defaults. Unknown or malformed values warn and keep the
    /// default; this function never fails.
    pub fn from_env() -> RiskConfig {
        let mut config = RiskConfig::default();

        if let Some(mode) = env_str("BRACKETLINE_RISK_MODE") {
            match mode.to_lowercase().as_str() {
                "percent" => config.risk_mode = RiskMode::Percent,
                "fixed" => config.risk_mode = RiskMode::Fixed,
                other => warn_invalid("BRACKETLINE_RISK_MODE", other, "percent|fixed"),
            }
        }
        env_positive_f64("BRACKETLINE_RISK_PERCENT", &mut config.risk_percent);
        env_positive_f64("BRACKETLINE_RISK_FIXED", &mut config.risk_fixed);
        env_positive_f64("BRACKETLINE_ACCOUNT_SIZE", &mut config.account_size);
        env_positive_f64("BRACKETLINE_DEFAULT_SL", &mut config.default_sl);
        env_positive_f64("BRACKETLINE_DEFAULT_TP", &mut config.default_tp);
        env_positive_f64("BRACKETLINE_TP_RATIO", &mut config.tp_ratio);
        env_bool("BRACKETLINE_USE_RATIO", &mut config.use_ratio);

        if let Some(color) = env_str("BRACKETLINE_SL_COLOR") {
            config.sl_color = color;
        }
        if let Some(color) = env_str("BRACKETLINE_TP_COLOR") {
            config.tp_color = color;
        }
        env_parse("BRACKETLINE_LINE_WIDTH", &mut config.line_width);
        if let Some(format) = env_str("BRACKETLINE_LABEL_FORMAT") {
            match format.to_lowercase().as_str() {
                "compact" => config.label_format = LabelFormat::Compact,
                "full" => config.label_format = LabelFormat::Full,
                "minimal" => config.label_format = LabelFormat::Minimal,
                other => warn_invalid("BRACKETLINE_LABEL_FORMAT", other, "compact|full|minimal"),
            }
        }
        env_bool("BRACKETLINE_SHOW_LABELS", &mut config.show_labels);
        env_bool("BRACKETLINE_SHOW_DECIMALS", &mut config.show_decimals);
        env_bool("BRACKETLINE_SHOW_CONTRACTS", &mut config.show_contracts);

        if let Some(rounding) = env_str("BRACKETLINE_CONTRACT_ROUNDING") {
            match rounding.to_lowercase().as_str() {
                "down" => config.contract_rounding = ContractRounding::Down,
                "up" => config.contract_rounding = ContractRounding::Up,
                "nearest" => config.contract_rounding = ContractRounding::Nearest,
                other => warn_invalid("BRACKETLINE_CONTRACT_ROUNDING", other, "down|up|nearest"),
            }
        }
        env_parse("BRACKETLINE_MIN_CONTRACTS", &mut config.min_contracts);
        env_parse("BRACKETLINE_MAX_CONTRACTS", &mut config.max_contracts);
        if config.min_contracts > config.max_contracts {
            tracing::warn!(
                "BRACKETLINE_MIN_CONTRACTS {} exceeds max {}, using defaults",
                config.min_contracts,
                config.max_contracts
            );
            config.min_contracts = 1;
            config.max_contracts = 100;
        }

        env_parse("BRACKETLINE_DRAG_POLL_MS", &mut config.drag_poll_ms);
        env_parse("BRACKETLINE_DOM_POLL_MS", &mut config.dom_poll_ms);
        env_parse("BRACKETLINE_WATCHDOG_MS", &mut config.watchdog_ms);
        env_parse("BRACKETLINE_SYNC_DEBOUNCE_MS", &mut config.sync_debounce_ms);
        env_parse("BRACKETLINE_PERSIST_DEBOUNCE_MS", &mut config.persist_debounce_ms);
        env_parse("BRACKETLINE_DEDUP_WINDOW_MS", &mut config.dedup_window_ms);
        env_parse("BRACKETLINE_RESTORE_TTL_HOURS", &mut config.restore_ttl_hours);
        env_parse("BRACKETLINE_SURFACE_WAIT_SECS", &mut config.surface_wait_secs);

        env_bool("BRACKETLINE_DOM_IMPLIES_ORDER", &mut config.dom_implies_order);
        env_bool("BRACKETLINE_AUTO_APPLY_BRACKETS", &mut config.auto_apply_brackets);
        env_bool("BRACKETLINE_PERSIST_LINES", &mut config.persist_lines);

        config
    }

    /// The active risk amount for the configured mode
    pub fn risk_amount(&self) -> f64 {
        match self.risk_mode {
            RiskMode::Percent => self.risk_percent,
            RiskMode::Fixed => self.risk_fixed,
        }
    }

    /// Label preferences assembled from the flat fields
    pub fn label_prefs(&self) -> LabelPrefs {
        LabelPrefs {
            format: self.label_format,
            show_contracts: self.show_contracts,
            show_decimals: self.show_decimals,
            sl_prefix: self.sl_prefix.clone(),
            tp_prefix: self.tp_prefix.clone(),
        }
    }
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn warn_invalid(key: &str, value: &str, expected: &str) {
    let err = BracketError::Configuration {
        field: key.to_string(),
        reason: format!("'{}' is not one of {}", value, expected),
    };
    tracing::warn!("{err}, using default");
}

fn env_parse<T: FromStr + std::fmt::Display>(key: &str, target: &mut T) {
    if let Some(raw) = env_str(key) {
        match raw.parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => tracing::warn!(
                "Failed to parse {} '{}', using default: {}",
                key,
                raw,
                target
            ),
        }
    }
}

fn env_positive_f64(key: &str, target: &mut f64) {
    if let Some(raw) = env_str(key) {
        match raw.parse::<f64>() {
            Ok(value) if value > 0.0 => *target = value,
            Ok(value) => tracing::warn!(
                "Invalid {} value: {} (must be positive), using default: {}",
                key,
                value,
                target
            ),
            Err(e) => tracing::warn!("Failed to parse {} '{}': {}, using default: {}", key, raw, e, target),
        }
    }
}

fn env_bool(key: &str, target: &mut bool) {
    if let Some(raw) = env_str(key) {
        *target = raw.eq_ignore_ascii_case("true") || raw == "1";
    }
}
