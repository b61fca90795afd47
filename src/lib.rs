//! Bond Total Return - expected holding-period returns for Argentine sovereign debt
//!
//! This library provides:
//! - Instrument reference data for peso, CER-linked, dollar-linked and dual bonds and bills
//! - Projected short-rate, inflation and devaluation paths, observed or implied from curves
//! - Cashflow schedules split at an investment horizon
//! - Reinvestment of collected flows and curve-based resale of the rest
//! - A ranked table of annualized returns with their composition

pub mod calendar;
pub mod cashflow;
pub mod error;
pub mod instrument;
pub mod market;
pub mod projection;
pub mod scenario;

// Re-export commonly used types
pub use error::{Result, ReturnError};
pub use instrument::{Instrument, InstrumentKind, Linkage};
pub use market::{CurveClass, CurveSet, LoadedMarket, RatePath};
pub use projection::{AnalysisConfig, MarketData, ReturnEngine, ReturnTable};
pub use scenario::ScenarioRunner;
