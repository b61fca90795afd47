//! Monthly rate paths (short rate, inflation, devaluation)
//!
//! A path is a gapless run of months. Each point carries the period rate and
//! the compounded rate since the start of the path. A path may also carry one
//! observed point for the month before its first projected month; that point
//! is visible to month lookups but does not enter the cumulative chain.
//!
//! Every point is dated on the convention month end of its month, whatever
//! day the input used.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::{month_end, month_key, months_between, shift_month, MonthKey};
use crate::error::{Result, ReturnError};

pub const INTEREST_PATH: &str = "interest";
pub const INFLATION_PATH: &str = "inflation";
pub const DEVALUATION_PATH: &str = "devaluation";

/// One month of a rate path
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    /// Convention month end of the period
    pub date: NaiveDate,
    /// Rate for the month
    pub rate: f64,
    /// Compounded rate from the first projected month through this one
    pub cumulative: f64,
}

impl RatePoint {
    pub fn month(&self) -> MonthKey {
        month_key(self.date)
    }

    /// Gross factor `1 + rate`
    pub fn gross(&self) -> f64 {
        1.0 + self.rate
    }
}

/// Gapless monthly rate path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatePath {
    name: String,
    prior: Option<RatePoint>,
    points: Vec<RatePoint>,
}

impl RatePath {
    /// Build a path from (date, period rate) pairs, computing the cumulative chain
    pub fn from_rates(name: &str, rates: Vec<(NaiveDate, f64)>) -> Result<Self> {
        if rates.is_empty() {
            return Err(ReturnError::invalid_input(format!("{name} rate path is empty")));
        }

        let mut points: Vec<RatePoint> = Vec::with_capacity(rates.len());
        for (date, rate) in rates {
            let date = month_end(date.year(), date.month());
            if !rate.is_finite() || rate <= -1.0 {
                return Err(ReturnError::invalid_input(format!(
                    "{name} rate {rate} on {date} is not a valid period rate"
                )));
            }
            let cumulative = match points.last() {
                Some(prev) => {
                    if months_between(prev.month(), month_key(date)) != 1 {
                        return Err(ReturnError::DateAlignment(format!(
                            "{name} rate path jumps from {} to {date}",
                            prev.date
                        )));
                    }
                    (1.0 + prev.cumulative) * (1.0 + rate) - 1.0
                }
                None => rate,
            };
            points.push(RatePoint { date, rate, cumulative });
        }

        Ok(Self {
            name: name.to_string(),
            prior: None,
            points,
        })
    }

    /// Attach the observed rate of the month before the first projected month
    pub fn with_prior(mut self, date: NaiveDate, rate: f64) -> Result<Self> {
        let expected = shift_month(self.first_month(), -1);
        if month_key(date) != expected {
            return Err(ReturnError::DateAlignment(format!(
                "{} prior observation {date} is not in {}-{:02}",
                self.name, expected.0, expected.1
            )));
        }
        self.prior = Some(RatePoint {
            date: month_end(date.year(), date.month()),
            rate,
            cumulative: 0.0,
        });
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prior(&self) -> Option<&RatePoint> {
        self.prior.as_ref()
    }

    /// Projected points (prior observation excluded)
    pub fn points(&self) -> &[RatePoint] {
        &self.points
    }

    pub fn first(&self) -> &RatePoint {
        &self.points[0]
    }

    pub fn last(&self) -> &RatePoint {
        &self.points[self.points.len() - 1]
    }

    pub fn first_month(&self) -> MonthKey {
        self.first().month()
    }

    pub fn last_month(&self) -> MonthKey {
        self.last().month()
    }

    pub fn last_rate(&self) -> f64 {
        self.last().rate
    }

    /// Point for a month, including the prior observation
    pub fn get(&self, month: MonthKey) -> Option<&RatePoint> {
        let offset = months_between(self.first_month(), month);
        if offset == -1 {
            return self.prior.as_ref();
        }
        if offset < 0 {
            return None;
        }
        self.points.get(offset as usize)
    }

    /// Point for a month or `MissingRateObservation`
    pub fn point_for(&self, month: MonthKey) -> Result<&RatePoint> {
        self.get(month)
            .ok_or_else(|| ReturnError::missing_rate(&self.name, month.0, month.1))
    }

    pub fn rate_for(&self, month: MonthKey) -> Result<f64> {
        self.point_for(month).map(|p| p.rate)
    }

    pub fn cumulative_for(&self, month: MonthKey) -> Result<f64> {
        self.point_for(month).map(|p| p.cumulative)
    }

    /// Rate for a month, holding the last projected rate flat past the end
    pub fn rate_or_last(&self, month: MonthKey) -> Result<f64> {
        if months_between(self.last_month(), month) > 0 {
            return Ok(self.last_rate());
        }
        self.rate_for(month)
    }

    /// Keep only points dated on or before `cutoff`
    pub fn truncate_after(mut self, cutoff: NaiveDate) -> Result<Self> {
        self.points.retain(|p| p.date <= cutoff);
        if self.points.is_empty() {
            return Err(ReturnError::invalid_input(format!(
                "{} rate path has no months on or before {cutoff}",
                self.name
            )));
        }
        Ok(self)
    }

    /// Constant-rate path over the given dates
    pub fn flat(name: &str, dates: &[NaiveDate], rate: f64) -> Result<Self> {
        Self::from_rates(name, dates.iter().map(|d| (*d, rate)).collect())
    }
}
