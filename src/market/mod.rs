//! Market inputs: rate paths, index series, quote curves
//!
//! Everything here is built once per run and then read by the projection engine.

pub mod curve;
pub mod implied;
pub mod loader;
mod rates;
mod series;
mod survey;

pub use curve::{CurveClass, CurveSet, DurationUnit, QuoteBook, QuotePoint, YieldCurveFit, DAYS_PER_YEAR};
pub use implied::{
    implied_devaluation, implied_inflation, DevaluationSource, LinearScenario, ANNUAL_MONTHS, DEFAULT_IMPLIED_MONTHS,
};
pub use loader::{LoadedMarket, DEFAULT_DATA_PATH};
pub use rates::{RatePath, RatePoint, DEVALUATION_PATH, INFLATION_PATH, INTEREST_PATH};
pub use series::{IndexSeries, SeriesKind};
pub use survey::{survey_monthly_rate, RateSurvey};
