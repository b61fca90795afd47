//! Instrument reference data and universe loading

mod data;
pub mod loader;

pub use data::{Instrument, InstrumentKind, Linkage, MonthDay, DUAL_SEPARATOR, NOMINAL_BASE};
pub use loader::{load_instruments, load_instruments_from_dir, load_instruments_from_reader, InstrumentTable, RejectedRow};
