//! Historical daily index series (CER and A3500)

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{month_end_day, month_key, shift_month, MonthKey};
use crate::error::{Result, ReturnError};

/// Which publication window a series uses for its monthly change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesKind {
    /// CER: first day of the month to the convention month end
    Cpi,
    /// A3500: as CPI, but January starts on the 2nd and December runs 2nd to 30th
    Fx,
}

impl SeriesKind {
    /// (start day, end day) of the observation window for `month`
    pub fn window(&self, month: u32) -> (u32, u32) {
        match (self, month) {
            (SeriesKind::Fx, 1) => (2, 31),
            (SeriesKind::Fx, 12) => (2, 30),
            _ => (1, month_end_day(month)),
        }
    }
}

/// Dated index levels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSeries {
    pub name: String,
    pub kind: SeriesKind,
    values: BTreeMap<NaiveDate, f64>,
}

impl IndexSeries {
    pub fn new(name: &str, kind: SeriesKind, points: impl IntoIterator<Item = (NaiveDate, f64)>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            values: points.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Level published on exactly `date`
    pub fn value_on(&self, date: NaiveDate) -> Result<f64> {
        self.values
            .get(&date)
            .copied()
            .ok_or_else(|| ReturnError::DateAlignment(format!("{} series has no value on {date}", self.name)))
    }

    /// Most recent level on or before `date`
    pub fn latest_on_or_before(&self, date: NaiveDate) -> Option<(NaiveDate, f64)> {
        self.values.range(..=date).next_back().map(|(d, v)| (*d, *v))
    }

    /// Observed change over `month`, dated on the window end
    pub fn monthly_change(&self, month: MonthKey) -> Result<(NaiveDate, f64)> {
        let (start_day, end_day) = self.kind.window(month.1);
        let start = window_date(month, start_day)?;
        let end = window_date(month, end_day)?;

        let opening = self.value_on(start)?;
        let closing = self.value_on(end)?;
        if opening <= 0.0 {
            return Err(ReturnError::invalid_input(format!(
                "{} level on {start} is not positive",
                self.name
            )));
        }
        Ok((end, closing / opening - 1.0))
    }

    /// Observed change of the month before the one containing `valuation_date`
    pub fn prior_month_change(&self, valuation_date: NaiveDate) -> Result<(NaiveDate, f64)> {
        self.monthly_change(shift_month(month_key(valuation_date), -1))
    }
}

fn window_date(month: MonthKey, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(month.0, month.1, day)
        .ok_or_else(|| ReturnError::DateAlignment(format!("{}-{:02}-{day:02} is not a date", month.0, month.1)))
}
