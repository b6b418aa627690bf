//! Line label formatting
//!
//! Renders the dollar annotation shown on each bracket line, driven by the
//! user's label preferences. Labels are refreshed on every drag poll so they
//! track the line while it is being moved.

use serde::{Deserialize, Serialize};

/// Which bracket line a label belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    StopLoss,
    TakeProfit,
}

/// Label verbosity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelFormat {
    /// "SL -$100 (10x)"
    Compact,
    /// "SL -$100.00 (10 contracts)"
    Full,
    /// "-$100"
    Minimal,
}

/// User preferences affecting label text only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelPrefs {
    pub format: LabelFormat,
    pub show_contracts: bool,
    pub show_decimals: bool,
    pub sl_prefix: String,
    pub tp_prefix: String,
}

impl Default for LabelPrefs {
    fn default() -> Self {
        Self {
            format: LabelFormat::Compact,
            show_contracts: true,
            show_decimals: false,
            sl_prefix: "SL".to_string(),
            tp_prefix: "TP".to_string(),
        }
    }
}

/// Format a line label from the dollar magnitude at the line's current price.
///
/// `dollars` is the unsigned P&L magnitude; the sign is implied by the line
/// kind (a stop is always the loss side, a target the profit side).
pub fn format_label(kind: LineKind, dollars: f64, contracts: u32, prefs: &LabelPrefs) -> String {
    let sign = match kind {
        LineKind::StopLoss => '-',
        LineKind::TakeProfit => '+',
    };
    let amount = if prefs.show_decimals || prefs.format == LabelFormat::Full {
        format!("{:.2}", dollars.abs())
    } else {
        format!("{:.0}", dollars.abs())
    };

    match prefs.format {
        LabelFormat::Minimal => format!("{sign}${amount}"),
        LabelFormat::Compact => {
            let prefix = match kind {
                LineKind::StopLoss => &prefs.sl_prefix,
                LineKind::TakeProfit => &prefs.tp_prefix,
            };
            if prefs.show_contracts {
                format!("{prefix} {sign}${amount} ({contracts}x)")
            } else {
                format!("{prefix} {sign}${amount}")
            }
        }
        LabelFormat::Full => {
            let prefix = match kind {
                LineKind::StopLoss => &prefs.sl_prefix,
                LineKind::TakeProfit => &prefs.tp_prefix,
            };
            if prefs.show_contracts {
                format!("{prefix} {sign}${amount} ({contracts} contracts)")
            } else {
                format!("{prefix} {sign}${amount}")
            }
        }
    }
}
