//! Domain errors with recovery semantics

use thiserror::Error;

/// Errors raised while reconciling order state and rendering lines.
///
/// Every variant documents how the reconciler recovers: none of these are
/// fatal to the polling loops.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BracketError {
    /// A configuration field was missing or invalid; defaults were substituted
    #[error("Invalid configuration: {field}: {reason}")]
    Configuration { field: String, reason: String },

    /// Symbol root is not in the instrument catalog; render skipped
    #[error("Unknown instrument: {symbol}")]
    UnknownInstrument { symbol: String },

    /// A price-level recompute was rejected; prior rendered state kept
    #[error("Calculation failed: {0}")]
    Calculation(#[from] CalculationError),

    /// Chart surface not found within the wait budget; retried by watchdog
    #[error("Chart surface unavailable after {waited_secs}s")]
    SurfaceUnavailable { waited_secs: u64 },

    /// Outbound bracket update failed; local state stays authoritative
    #[error("Bracket sync failed: {reason}")]
    SyncFailure { reason: String },

    /// Persisted state exceeded its TTL and was discarded
    #[error("Persisted state is stale: {age_hours}h old")]
    StaleData { age_hours: i64 },

    /// Persisted store read/write failed
    #[error("Store operation failed: {reason}")]
    StoreFailure { reason: String },
}

/// Errors from the pure calculation engine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalculationError {
    /// Division by a zero tick value
    #[error("Tick value cannot be zero")]
    ZeroTickValue,

    /// Contract sizing with no distance to the stop
    #[error("Ticks to stop loss cannot be zero")]
    ZeroTickDistance,

    /// Composite validation failed; lists every offending field
    #[error("Invalid inputs: {}", fields.join(", "))]
    InvalidInputs { fields: Vec<String> },
}

/// Severity levels for logging and alerting decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Minor,
    Moderate,
    Critical,
}

impl BracketError {
    /// Get the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            BracketError::StaleData { .. } => ErrorSeverity::Minor,
            BracketError::Configuration { .. } => ErrorSeverity::Minor,
            BracketError::UnknownInstrument { .. } => ErrorSeverity::Moderate,
            BracketError::Calculation(_) => ErrorSeverity::Moderate,
            BracketError::SyncFailure { .. } => ErrorSeverity::Moderate,
            BracketError::StoreFailure { .. } => ErrorSeverity::Moderate,
            BracketError::SurfaceUnavailable { .. } => ErrorSeverity::Critical,
        }
    }

    /// Whether the failed operation will be retried by a later cycle
    /// without user intervention
    pub fn is_retried_naturally(&self) -> bool {
        match self {
            BracketError::SurfaceUnavailable { .. } => true,
            BracketError::SyncFailure { .. } => true,
            BracketError::UnknownInstrument { .. } => true,
            BracketError::StoreFailure { .. } => true,
            BracketError::Configuration { .. } => false,
            BracketError::Calculation(_) => false,
            BracketError::StaleData { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculation_error_display_lists_fields() {
        let err = CalculationError::InvalidInputs {
            fields: vec!["entry_price".to_string(), "tick_value".to_string()],
        };
        assert_eq!(err.to_string(), "Invalid inputs: entry_price, tick_value");
    }

    #[test]
    fn test_surface_unavailable_is_critical() {
        let err = BracketError::SurfaceUnavailable { waited_secs: 60 };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.is_retried_naturally());
    }

    #[test]
    fn test_calculation_error_converts() {
        let err: BracketError = CalculationError::ZeroTickValue.into();
        assert!(matches!(err, BracketError::Calculation(_)));
        assert_eq!(err.severity(), ErrorSeverity::Moderate);
    }
}
