//! Cash-flow schedules and their construction

mod builder;
mod schedule;

pub use builder::CashflowBuilder;
pub use schedule::{CashflowRow, CashflowSchedule, FlowKind, HorizonSplit};
