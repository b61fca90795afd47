//! Resale price of the flows left after the horizon
//!
//! Yields come from the class curve evaluated at years from the valuation
//! date. Effective rates are chained into one-period forwards starting at the
//! horizon row, so each flow is discounted back to the horizon only.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::month_key;
use crate::cashflow::CashflowSchedule;
use crate::error::{Result, ReturnError};
use crate::instrument::{Instrument, Linkage};
use crate::market::{RatePath, YieldCurveFit, DAYS_PER_YEAR};

/// One row of the forward-rate table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForwardRow {
    pub date: NaiveDate,
    /// Years from the valuation date
    pub years: f64,
    /// Fitted annual yield
    pub annual_yield: f64,
    /// Effective rate from the valuation date
    pub effective: f64,
    /// Rate from the previous row to this one (zero on the first row)
    pub forward: f64,
    /// Compounded forwards from the first row
    pub zero: f64,
}

/// Discounts a post-horizon schedule on one fitted curve
#[derive(Debug, Clone, Copy)]
pub struct CurveDiscounter {
    fit: YieldCurveFit,
    valuation: NaiveDate,
}

impl CurveDiscounter {
    pub fn new(fit: YieldCurveFit, valuation: NaiveDate) -> Self {
        Self { fit, valuation }
    }

    /// Forward table over the given dates, the first being the horizon
    pub fn forward_table(&self, dates: &[NaiveDate]) -> Result<Vec<ForwardRow>> {
        let mut table: Vec<ForwardRow> = Vec::with_capacity(dates.len());

        for &date in dates {
            let days = (date - self.valuation).num_days();
            if days <= 0 {
                return Err(ReturnError::DateAlignment(format!(
                    "flow on {date} is not after the valuation date {}",
                    self.valuation
                )));
            }
            let years = days as f64 / DAYS_PER_YEAR;
            let annual_yield = self.fit.yield_at(years);
            let effective = (1.0 + annual_yield).powf(years) - 1.0;
            if !effective.is_finite() {
                return Err(ReturnError::invalid_input(format!(
                    "fitted yield {annual_yield:.6} at {years:.4} years cannot be compounded"
                )));
            }

            let (forward, zero) = match table.last() {
                Some(prev) => {
                    let forward = (1.0 + effective) / (1.0 + prev.effective) - 1.0;
                    (forward, (1.0 + prev.zero) * (1.0 + forward) - 1.0)
                }
                None => (0.0, 0.0),
            };

            table.push(ForwardRow {
                date,
                years,
                annual_yield,
                effective,
                forward,
                zero,
            });
        }

        Ok(table)
    }

    /// Sum of the flows after the horizon row, each scaled and discounted to the horizon
    pub fn present_value(&self, remaining: &CashflowSchedule, scale: f64) -> Result<f64> {
        let dates: Vec<NaiveDate> = remaining.rows().iter().map(|r| r.date).collect();
        let table = self.forward_table(&dates)?;

        Ok(remaining
            .rows()
            .iter()
            .zip(&table)
            .skip(1)
            .map(|(row, fwd)| row.total() * scale / (1.0 + fwd.zero))
            .sum())
    }
}

/// Factor bringing nominal post-horizon flows to horizon-date pesos
pub fn horizon_rescale(
    instrument: &Instrument,
    inflation: &RatePath,
    devaluation: &RatePath,
    cpi_today: f64,
    fx_today: f64,
    horizon: NaiveDate,
) -> Result<f64> {
    let month = month_key(horizon);
    match instrument.linkage {
        Linkage::None => Ok(1.0),
        Linkage::Cpi => {
            Ok(cpi_today * (1.0 + inflation.cumulative_for(month)?) / instrument.require_issuance_index()?)
        }
        Linkage::DualCpi => Ok(cpi_today * (1.0 + inflation.cumulative_for(month)?)
            / instrument.require_issuance_index()?
            * instrument.require_issuance_fx()?),
        Linkage::Fx => Ok(fx_today * (1.0 + devaluation.cumulative_for(month)?)),
    }
}
