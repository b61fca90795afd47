//! Short-rate path from the market expectations survey
//!
//! The survey gives the expected BADLAR rate (annual percent, 365-day basis)
//! for the next few months plus one average for the next twelve months. The
//! months the survey does not cover are filled with a constant rate that,
//! compounded after the surveyed months, reaches the twelve-month average.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};

use super::curve::DAYS_PER_YEAR;
use super::rates::RatePath;
use crate::calendar::{month_end, month_key, shift_month};
use crate::error::{Result, ReturnError};

/// Months covered by the twelve-month survey average
const SURVEY_YEAR_MONTHS: usize = 12;

/// Monthly rate from an annual survey percentage, on 30-day months
pub fn survey_monthly_rate(annual_pct: f64) -> f64 {
    annual_pct * 30.0 / DAYS_PER_YEAR / 100.0
}

/// Expected short rates as published by the survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSurvey {
    monthly: Vec<(NaiveDate, f64)>,
    twelve_month: f64,
}

impl RateSurvey {
    /// `monthly` holds (month, annual %) pairs; `twelve_month` is the annual % average
    pub fn new(mut monthly: Vec<(NaiveDate, f64)>, twelve_month: f64) -> Result<Self> {
        if monthly.is_empty() || monthly.len() >= SURVEY_YEAR_MONTHS {
            return Err(ReturnError::invalid_input(format!(
                "rate survey needs between 1 and {} monthly rows, got {}",
                SURVEY_YEAR_MONTHS - 1,
                monthly.len()
            )));
        }
        if !twelve_month.is_finite() || monthly.iter().any(|(_, pct)| !pct.is_finite()) {
            return Err(ReturnError::invalid_input("rate survey holds a non-finite rate"));
        }
        monthly.sort_by_key(|(date, _)| *date);
        Ok(Self { monthly, twelve_month })
    }

    pub fn months(&self) -> usize {
        self.monthly.len()
    }

    /// Constant monthly rate for the months after the surveyed ones
    pub fn deduced_rate(&self) -> f64 {
        let surveyed: f64 = self
            .monthly
            .iter()
            .map(|(_, pct)| 1.0 + survey_monthly_rate(*pct))
            .product();
        let annual = (1.0 + survey_monthly_rate(self.twelve_month)).powf(DAYS_PER_YEAR / 30.0);
        let remaining = (SURVEY_YEAR_MONTHS - self.monthly.len()) as f64;
        (annual / surveyed).powf(1.0 / remaining) - 1.0
    }

    /// Twelve months of short rates: the surveyed months, the deduced rate,
    /// and the twelve-month average itself in the last month
    pub fn to_path(&self, name: &str) -> Result<RatePath> {
        let deduced = self.deduced_rate();
        let estimated = survey_monthly_rate(self.twelve_month);
        let tail = SURVEY_YEAR_MONTHS - self.monthly.len();

        let mut rates: Vec<(NaiveDate, f64)> = self
            .monthly
            .iter()
            .map(|(date, pct)| (*date, survey_monthly_rate(*pct)))
            .collect();

        let last = month_key(self.monthly[self.monthly.len() - 1].0);
        for i in 1..=tail {
            let (year, month) = shift_month(last, i as i32);
            let rate = if i == tail { estimated } else { deduced };
            rates.push((month_end(year, month), rate));
        }

        debug!(
            "{name} survey path: {} surveyed months, deduced {:.5}, last {:.5}",
            self.monthly.len(),
            deduced,
            estimated
        );
        RatePath::from_rates(name, rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_deduced_tail() {
        let survey = RateSurvey::new(
            vec![
                (d(2025, 3, 31), 36.5),
                (d(2025, 4, 30), 36.5),
                (d(2025, 5, 31), 36.5),
                (d(2025, 6, 30), 36.5),
                (d(2025, 7, 31), 36.5),
                (d(2025, 8, 31), 36.5),
            ],
            36.5,
        )
        .unwrap();

        // 36.5% on 30/365 is 3% a month
        let deduced = 1.03f64.powf((365.0 / 30.0 - 6.0) / 6.0) - 1.0;
        assert_relative_eq!(survey.deduced_rate(), deduced, epsilon = 1e-12);

        let path = survey.to_path("interest").unwrap();
        assert_eq!(path.points().len(), 12);
        assert_eq!(path.points()[6].date, d(2025, 9, 30));
        assert_relative_eq!(path.points()[6].rate, deduced, epsilon = 1e-12);
        assert_relative_eq!(path.points()[10].rate, deduced, epsilon = 1e-12);
        assert_eq!(path.last().date, d(2026, 2, 28));
        assert_relative_eq!(path.last().rate, 0.03, epsilon = 1e-12);
        assert_relative_eq!(
            path.last().cumulative,
            1.03f64.powi(7) * (1.0 + deduced).powi(5) - 1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_uneven_survey() {
        let survey = RateSurvey::new(vec![(d(2025, 4, 30), 38.0), (d(2025, 3, 31), 40.0)], 35.0).unwrap();
        let surveyed = (1.0 + 40.0 * 30.0 / 365.0 / 100.0) * (1.0 + 38.0 * 30.0 / 365.0 / 100.0);
        let annual = (1.0 + 35.0 * 30.0 / 365.0 / 100.0f64).powf(365.0 / 30.0);
        let deduced = (annual / surveyed).powf(1.0 / 10.0) - 1.0;
        assert_relative_eq!(survey.deduced_rate(), deduced, epsilon = 1e-12);

        let path = survey.to_path("interest").unwrap();
        assert_eq!(path.first().date, d(2025, 3, 31));
        assert_relative_eq!(path.first().rate, survey_monthly_rate(40.0), epsilon = 1e-12);
        assert_eq!(path.points().len(), 12);
    }

    #[test]
    fn test_survey_size_limits() {
        assert!(RateSurvey::new(Vec::new(), 35.0).is_err());
        let year: Vec<(NaiveDate, f64)> = (1..=12).map(|m| (month_end(2025, m), 35.0)).collect();
        assert!(RateSurvey::new(year, 35.0).is_err());
        assert!(RateSurvey::new(vec![(d(2025, 3, 31), f64::NAN)], 35.0).is_err());
    }
}
