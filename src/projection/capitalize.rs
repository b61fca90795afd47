//! Compounding collected flows forward to the horizon at the short-rate path
//!
//! Months count as 30 days. A flow received on day `d` earns `(30 - d) / 30`
//! of its own month, and the horizon month contributes `d_H / 30`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::{month_key, shift_month};
use crate::cashflow::{CashflowRow, CashflowSchedule, FlowKind};
use crate::error::{Result, ReturnError};
use crate::market::RatePath;

const MONTH_DAYS: f64 = 30.0;

/// A collected flow and its value at the horizon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalizedRow {
    pub row: CashflowRow,
    /// Compounding factor from the flow date to the horizon
    pub factor: f64,
    /// `row.total() * factor`
    pub value: f64,
}

/// Collected segment with horizon values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalizedSchedule {
    pub rows: Vec<CapitalizedRow>,
}

impl CapitalizedSchedule {
    pub fn coupons(&self) -> f64 {
        self.rows.iter().map(|r| r.row.coupon).sum()
    }

    pub fn principal(&self) -> f64 {
        self.rows.iter().map(|r| r.row.principal).sum()
    }

    pub fn horizon_value(&self) -> f64 {
        self.rows.iter().map(|r| r.value).sum()
    }

    /// Interest earned by reinvesting flows until the horizon
    pub fn reinvestment(&self) -> f64 {
        self.horizon_value() - self.coupons() - self.principal()
    }
}

/// Compounds flows at a monthly short-rate path
pub struct Capitalizer<'a> {
    rates: &'a RatePath,
    horizon: NaiveDate,
}

impl<'a> Capitalizer<'a> {
    pub fn new(rates: &'a RatePath, horizon: NaiveDate) -> Self {
        Self { rates, horizon }
    }

    /// Gross factor of a month; the last rate is held flat past the path end
    fn gross(&self, month: (i32, u32)) -> Result<f64> {
        self.rates.rate_or_last(month).map(|r| 1.0 + r)
    }

    /// Factor that carries one unit received on `date` to the horizon
    pub fn factor(&self, date: NaiveDate) -> Result<f64> {
        if date > self.horizon {
            return Err(ReturnError::DateAlignment(format!(
                "flow on {date} is after the horizon {}",
                self.horizon
            )));
        }

        let flow_month = month_key(date);
        let horizon_month = month_key(self.horizon);

        let mut product = 1.0;
        let mut month = flow_month;
        loop {
            product *= self.gross(month)?;
            if month == horizon_month {
                break;
            }
            month = shift_month(month, 1);
        }

        let g_flow = self.gross(flow_month)?;
        let g_horizon = self.gross(horizon_month)?;

        let received = (MONTH_DAYS - date.day() as f64) / MONTH_DAYS;
        let elapsed = self.horizon.day() as f64 / MONTH_DAYS;

        Ok(product / g_flow * g_flow.powf(received) / g_horizon * g_horizon.powf(elapsed))
    }

    /// Horizon value of every collected flow; the anchor row carries no value
    pub fn capitalize(&self, collected: &CashflowSchedule) -> Result<CapitalizedSchedule> {
        let rows = collected
            .rows()
            .iter()
            .map(|row| {
                if row.kind == FlowKind::Anchor {
                    return Ok(CapitalizedRow {
                        row: *row,
                        factor: 0.0,
                        value: 0.0,
                    });
                }
                let factor = self.factor(row.date)?;
                Ok(CapitalizedRow {
                    row: *row,
                    factor,
                    value: row.total() * factor,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CapitalizedSchedule { rows })
    }
}
