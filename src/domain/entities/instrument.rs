//! Instrument Catalog
//!
//! Static contract specifications for the supported futures instruments.
//! Specs are keyed by root symbol; dated contract codes ("MNQZ25", "GCJ24")
//! resolve through [`extract_root`]. A failed lookup is a hard stop for any
//! price-level computation: without tick data there is nothing safe to draw.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Market segment an instrument trades in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentCategory {
    MicroIndex,
    Index,
    Energy,
    Metals,
    Agricultural,
    Treasury,
    Currency,
}

/// Contract specification for one futures instrument.
///
/// Invariant: `tick_size` and `tick_value` are strictly positive, so
/// `tick_value / tick_size` (dollars per point of price movement per
/// contract) is always defined.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    pub symbol_root: &'static str,
    pub name: &'static str,
    /// Minimum price increment
    pub tick_size: f64,
    /// Dollar value per tick per contract
    pub tick_value: f64,
    /// Dollar value per full point
    pub point_value: f64,
    pub multiplier: f64,
    pub category: InstrumentCategory,
    pub exchange: &'static str,
}

macro_rules! spec {
    ($root:literal, $name:literal, $ts:expr, $tv:expr, $pv:expr, $mult:expr, $cat:ident, $exch:literal) => {
        (
            $root,
            InstrumentSpec {
                symbol_root: $root,
                name: $name,
                tick_size: $ts,
                tick_value: $tv,
                point_value: $pv,
                multiplier: $mult,
                category: InstrumentCategory::$cat,
                exchange: $exch,
            },
        )
    };
}

static CATALOG: Lazy<HashMap<&'static str, InstrumentSpec>> = Lazy::new(|| {
    HashMap::from([
        // Micro E-mini index
        spec!("MNQ", "Micro E-mini Nasdaq-100", 0.25, 0.50, 2.0, 2.0, MicroIndex, "CME"),
        spec!("MES", "Micro E-mini S&P 500", 0.25, 1.25, 5.0, 5.0, MicroIndex, "CME"),
        spec!("MYM", "Micro E-mini Dow", 1.0, 0.50, 0.50, 0.50, MicroIndex, "CBOT"),
        spec!("M2K", "Micro E-mini Russell 2000", 0.10, 0.50, 5.0, 5.0, MicroIndex, "CME"),
        // Full-size E-mini index
        spec!("ES", "E-mini S&P 500", 0.25, 12.50, 50.0, 50.0, Index, "CME"),
        spec!("NQ", "E-mini Nasdaq-100", 0.25, 5.00, 20.0, 20.0, Index, "CME"),
        spec!("YM", "E-mini Dow ($5)", 1.0, 5.00, 5.0, 5.0, Index, "CBOT"),
        spec!("RTY", "E-mini Russell 2000", 0.10, 5.00, 50.0, 50.0, Index, "CME"),
        // Energy
        spec!("CL", "Crude Oil", 0.01, 10.00, 1000.0, 1000.0, Energy, "NYMEX"),
        spec!("NG", "Natural Gas", 0.001, 10.00, 10000.0, 10000.0, Energy, "NYMEX"),
        spec!("RB", "RBOB Gasoline", 0.0001, 4.20, 42000.0, 42000.0, Energy, "NYMEX"),
        spec!("HO", "Heating Oil", 0.0001, 4.20, 42000.0, 42000.0, Energy, "NYMEX"),
        // Metals
        spec!("GC", "Gold", 0.10, 10.00, 100.0, 100.0, Metals, "COMEX"),
        spec!("SI", "Silver", 0.005, 25.00, 5000.0, 5000.0, Metals, "COMEX"),
        spec!("HG", "Copper", 0.0005, 12.50, 25000.0, 25000.0, Metals, "COMEX"),
        spec!("PL", "Platinum", 0.10, 5.00, 50.0, 50.0, Metals, "NYMEX"),
        // Agricultural
        spec!("ZC", "Corn", 0.25, 12.50, 50.0, 50.0, Agricultural, "CBOT"),
        spec!("ZS", "Soybeans", 0.25, 12.50, 50.0, 50.0, Agricultural, "CBOT"),
        spec!("ZW", "Wheat", 0.25, 12.50, 50.0, 50.0, Agricultural, "CBOT"),
        // Treasuries (tick sizes are 1/64, 1/32, 1/128)
        spec!("ZN", "10-Year T-Note", 0.015625, 15.625, 1000.0, 1000.0, Treasury, "CBOT"),
        spec!("ZB", "30-Year T-Bond", 0.03125, 31.25, 1000.0, 1000.0, Treasury, "CBOT"),
        spec!("ZF", "5-Year T-Note", 0.0078125, 7.8125, 1000.0, 1000.0, Treasury, "CBOT"),
        // Currencies
        spec!("EUR", "Euro FX", 0.00005, 6.25, 125000.0, 125000.0, Currency, "CME"),
        spec!("GBP", "British Pound", 0.0001, 6.25, 62500.0, 62500.0, Currency, "CME"),
        spec!("JPY", "Japanese Yen", 0.0000005, 6.25, 12500000.0, 12500000.0, Currency, "CME"),
    ])
});

/// Extract the root symbol from a contract code.
///
/// Takes the leading ASCII-letter prefix: "MNQZ25" → "MNQ", "ESH25" → "ES".
/// Returns None for an empty string or one that does not start with a letter.
pub fn extract_root(symbol: &str) -> Option<&str> {
    let end = symbol
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(symbol.len());
    if end == 0 {
        None
    } else {
        Some(&symbol[..end])
    }
}

/// Look up the spec for a full contract code or bare root symbol.
///
/// Returns None when the root is not in the catalog; callers must treat
/// that as a hard stop for price-level calculations.
pub fn lookup(symbol: &str) -> Option<&'static InstrumentSpec> {
    let root = extract_root(symbol)?;
    CATALOG.get(root)
}

/// Tick value in dollars for a symbol, if known
pub fn tick_value(symbol: &str) -> Option<f64> {
    lookup(symbol).map(|spec| spec.tick_value)
}

/// Minimum price increment for a symbol, if known
pub fn tick_size(symbol: &str) -> Option<f64> {
    lookup(symbol).map(|spec| spec.tick_size)
}

/// Whether a symbol resolves to a catalogued instrument
pub fn is_supported(symbol: &str) -> bool {
    lookup(symbol).is_some()
}

/// All specs in a category, sorted by root symbol
pub fn by_category(category: InstrumentCategory) -> Vec<&'static InstrumentSpec> {
    let mut specs: Vec<_> = CATALOG
        .values()
        .filter(|spec| spec.category == category)
        .collect();
    specs.sort_by_key(|spec| spec.symbol_root);
    specs
}

/// Human-readable name, e.g. "MNQ - Micro E-mini Nasdaq-100".
/// Falls back to the input when the symbol is unknown.
pub fn display_name(symbol: &str) -> String {
    match lookup(symbol) {
        Some(spec) => format!("{} - {}", spec.symbol_root, spec.name),
        None => symbol.to_string(),
    }
}
