//! Return engine: indexation, reinvestment, resale and ranking

mod capitalize;
mod discount;
mod engine;
mod indexation;
mod results;

pub use capitalize::{CapitalizedRow, CapitalizedSchedule, Capitalizer};
pub use discount::{horizon_rescale, CurveDiscounter, ForwardRow};
pub use engine::{AnalysisConfig, MarketData, ReturnEngine, DEFAULT_INVESTED};
pub use indexation::{lagged_index_factor, IndexAdjuster, CPI_LAG_DAYS, FX_LAG_DAYS, YEAR_BOUNDARY_DAYS};
pub use results::{round2, InstrumentFailure, InstrumentReturn, ReturnRecord, ReturnShares, ReturnTable, TableSummary};
