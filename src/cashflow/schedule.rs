//! Dated coupon/principal schedule

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ReturnError};

/// What a schedule row represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowKind {
    /// Zero row on the valuation date
    Anchor,
    Coupon,
    Principal,
    /// Last coupon paid together with principal
    CouponAndPrincipal,
    /// Zero row on the horizon date when no event falls there
    Horizon,
}

impl FlowKind {
    pub fn pays_principal(&self) -> bool {
        matches!(self, FlowKind::Principal | FlowKind::CouponAndPrincipal)
    }
}

/// A single dated flow
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashflowRow {
    pub date: NaiveDate,
    pub kind: FlowKind,
    pub coupon: f64,
    pub principal: f64,
}

impl CashflowRow {
    pub fn zero(date: NaiveDate, kind: FlowKind) -> Self {
        Self {
            date,
            kind,
            coupon: 0.0,
            principal: 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        self.coupon + self.principal
    }

    /// Same row with both amounts multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            coupon: self.coupon * factor,
            principal: self.principal * factor,
            ..*self
        }
    }
}

/// Rows with strictly increasing dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashflowSchedule {
    rows: Vec<CashflowRow>,
}

impl CashflowSchedule {
    pub fn new(rows: Vec<CashflowRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(ReturnError::invalid_input("a cash-flow schedule needs at least one row"));
        }
        if let Some(pair) = rows.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(ReturnError::DateAlignment(format!(
                "schedule dates must increase strictly: {} then {}",
                pair[0].date, pair[1].date
            )));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[CashflowRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> &CashflowRow {
        &self.rows[0]
    }

    pub fn last(&self) -> &CashflowRow {
        &self.rows[self.rows.len() - 1]
    }

    pub fn row_on(&self, date: NaiveDate) -> Option<&CashflowRow> {
        self.rows.iter().find(|r| r.date == date)
    }

    /// Sum of coupons and sum of principal
    pub fn totals(&self) -> (f64, f64) {
        self.rows
            .iter()
            .fold((0.0, 0.0), |(c, p), r| (c + r.coupon, p + r.principal))
    }

    /// New schedule with each row rescaled by `factor(row)`
    pub fn try_map<F>(&self, mut factor: F) -> Result<Self>
    where
        F: FnMut(&CashflowRow) -> Result<f64>,
    {
        let rows = self
            .rows
            .iter()
            .map(|row| factor(row).map(|f| row.scaled(f)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rows })
    }

    /// Split into rows dated up to and including `horizon` and rows from `horizon` on
    ///
    /// The horizon row appears in both halves.
    pub fn split_at(&self, horizon: NaiveDate) -> Result<HorizonSplit> {
        if self.row_on(horizon).is_none() {
            return Err(ReturnError::DateAlignment(format!(
                "schedule has no row on the horizon date {horizon}"
            )));
        }
        let collected = self.rows.iter().copied().filter(|r| r.date <= horizon).collect();
        let remaining = self.rows.iter().copied().filter(|r| r.date >= horizon).collect();
        Ok(HorizonSplit {
            horizon,
            collected: Self { rows: collected },
            remaining: Self { rows: remaining },
        })
    }
}

/// A schedule cut at the horizon date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonSplit {
    pub horizon: NaiveDate,
    /// Flows received up to and including the horizon
    pub collected: CashflowSchedule,
    /// Flows from the horizon on, starting with the horizon row
    pub remaining: CashflowSchedule,
}

impl HorizonSplit {
    /// Rejoin both halves, dropping the shared horizon row once
    pub fn combine(&self) -> Result<CashflowSchedule> {
        let boundary = self.remaining.first();
        if self.collected.last() != boundary {
            return Err(ReturnError::DateAlignment(format!(
                "segments do not meet at the horizon {}",
                self.horizon
            )));
        }
        let rows = self
            .collected
            .rows
            .iter()
            .chain(&self.remaining.rows[1..])
            .copied()
            .collect();
        CashflowSchedule::new(rows)
    }
}
