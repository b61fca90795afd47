//! Error taxonomy for the return engine
//!
//! Every failure inside a single instrument's pipeline surfaces as one of these
//! variants. The aggregator records them per ticket and keeps going.

use thiserror::Error;

use crate::market::CurveClass;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, ReturnError>;

/// Errors produced while building, indexing, capitalizing or discounting cash flows
#[derive(Debug, Error)]
pub enum ReturnError {
    /// Instrument structure tag outside {bullet, letra}
    #[error("invalid instrument kind `{0}`: expected `bullet` or `letra`")]
    InvalidInstrumentKind(String),

    /// Linkage tag outside {CER, DL, pesos, DUAL-CER}
    #[error("invalid linkage class `{0}`: expected `CER`, `DL`, `pesos` or `DUAL-CER`")]
    InvalidLinkageClass(String),

    /// A month needed by a computation is absent from a rate path
    #[error("{path} rate path has no observation for {year}-{month:02}")]
    MissingRateObservation {
        path: String,
        year: i32,
        month: u32,
    },

    /// A required date does not line up with a series or schedule
    #[error("date alignment error: {0}")]
    DateAlignment(String),

    /// Proceeds or returns that cannot be expressed as finite percentages
    #[error("degenerate return for {ticket}: {reason}")]
    DegenerateReturn { ticket: String, reason: String },

    /// Horizon on or before the valuation date
    #[error("horizon {horizon} must fall after the valuation date {valuation}")]
    InvalidHorizon {
        horizon: chrono::NaiveDate,
        valuation: chrono::NaiveDate,
    },

    /// No fitted curve for the class an instrument discounts on
    #[error("no fitted yield curve for {0} instruments")]
    MissingCurve(CurveClass),

    /// Dual family that does not collapse to exactly one CPI/FX pair
    #[error("dual instrument family `{root}` has {count} priced member(s), expected one CPI-valued and one FX-valued")]
    UnpairedDualInstrument { root: String, count: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ReturnError {
    pub(crate) fn missing_rate(path: &str, year: i32, month: u32) -> Self {
        ReturnError::MissingRateObservation {
            path: path.to_string(),
            year,
            month,
        }
    }

    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        ReturnError::InvalidInput(reason.into())
    }
}
