//! Re-indexing flows by projected CER or A3500 paths
//!
//! The index applied to a payment is the one published `lag` days earlier.
//! When the lag stays inside the payment month, the month's rate is applied
//! for `(day - lag) / month_days` of the month. When it reaches back into the
//! previous month, that month's rate is interpolated instead; a lookback from
//! January into December always uses a 31-day base.

use chrono::{Datelike, NaiveDate};
use log::debug;

use crate::calendar::{month_end_day, month_key, shift_month};
use crate::cashflow::{CashflowSchedule, FlowKind};
use crate::error::Result;
use crate::instrument::{Instrument, Linkage};
use crate::market::RatePath;

/// Days between CER publication and payment
pub const CPI_LAG_DAYS: i32 = 10;

/// Days between A3500 fixing and payment
pub const FX_LAG_DAYS: i32 = 3;

/// Day base for a lookback from January into December
pub const YEAR_BOUNDARY_DAYS: f64 = 31.0;

/// Growth of a path's index from today to `lag` days before `date`
pub fn lagged_index_factor(path: &RatePath, date: NaiveDate, lag: i32) -> Result<f64> {
    let month = month_key(date);
    let point = path.point_for(month)?;
    let current = point.gross();
    let offset = date.day() as i32 - lag;

    let correction = if offset >= 0 {
        current.powf(offset as f64 / month_end_day(month.1) as f64) / current
    } else if month.1 == 1 {
        let december = 1.0 + path.rate_for(shift_month(month, -1))?;
        december.powf((YEAR_BOUNDARY_DAYS + offset as f64) / YEAR_BOUNDARY_DAYS) / (current * december)
    } else {
        let previous_month = shift_month(month, -1);
        let base = month_end_day(previous_month.1) as f64;
        let gross = 1.0 + path.rate_for(previous_month)?;
        gross.powf((base + offset as f64) / base) / (current * gross)
    };

    Ok((1.0 + point.cumulative) * correction)
}

/// Applies projected index growth to a linked instrument's flows
pub struct IndexAdjuster<'a> {
    inflation: &'a RatePath,
    devaluation: &'a RatePath,
    cpi_today: f64,
    fx_today: f64,
}

impl<'a> IndexAdjuster<'a> {
    pub fn new(inflation: &'a RatePath, devaluation: &'a RatePath, cpi_today: f64, fx_today: f64) -> Self {
        Self {
            inflation,
            devaluation,
            cpi_today,
            fx_today,
        }
    }

    /// Flows in today's pesos at the projected index of each payment date
    ///
    /// Unlinked instruments come back unchanged. The dual CER leg is converted
    /// from dollars at the issuance exchange rate. Anchor and horizon rows carry
    /// no amount and are never looked up on the path.
    pub fn adjust(&self, instrument: &Instrument, schedule: &CashflowSchedule) -> Result<CashflowSchedule> {
        let (path, lag, scale) = match instrument.linkage {
            Linkage::None => return Ok(schedule.clone()),
            Linkage::Cpi => (
                self.inflation,
                CPI_LAG_DAYS,
                self.cpi_today / instrument.require_issuance_index()?,
            ),
            Linkage::DualCpi => (
                self.inflation,
                CPI_LAG_DAYS,
                self.cpi_today / instrument.require_issuance_index()? * instrument.require_issuance_fx()?,
            ),
            Linkage::Fx => (self.devaluation, FX_LAG_DAYS, self.fx_today),
        };

        debug!(
            "{}: indexing {} flows on the {} path",
            instrument.ticket,
            schedule.len(),
            path.name()
        );

        schedule.try_map(|row| {
            if matches!(row.kind, FlowKind::Anchor | FlowKind::Horizon) {
                return Ok(1.0);
            }
            Ok(scale * lagged_index_factor(path, row.date, lag)?)
        })
    }
}
