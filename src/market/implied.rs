//! Rate paths derived from market quotes and simple scenarios
//!
//! - Inflation implied by the CER and peso curves (breakeven, 360-day basis)
//! - Devaluation implied by futures, DL-vs-peso or USD-vs-CER quotes
//! - Linear scenarios seeded from any of the above

use chrono::{Datelike, Duration, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};

use super::curve::{CurveClass, CurveSet, QuoteBook, YieldCurveFit};
use super::rates::{RatePath, DEVALUATION_PATH, INFLATION_PATH};
use super::series::IndexSeries;
use crate::calendar::{month_end, month_ends_from};
use crate::error::{Result, ReturnError};

/// Months projected by the market-implied builders unless told otherwise
pub const DEFAULT_IMPLIED_MONTHS: usize = 6;

/// Implied inflation horizon behind the USD-vs-CER devaluation source
pub const ANNUAL_MONTHS: usize = 12;

/// Day basis of the implied-inflation table
pub const INFLATION_DAY_BASIS: f64 = 360.0;

/// Month length on the implied-inflation basis
const BASIS_MONTH_DAYS: f64 = 30.0;

/// Days left in the valuation month on a 30-day basis
///
/// Zero once the valuation day reaches the 30th (the 28th in February).
pub fn first_period_days(valuation: NaiveDate) -> u32 {
    let day = valuation.day();
    if (valuation.month() == 2 && day >= 28) || day >= 30 {
        0
    } else {
        30 - day
    }
}

/// Breakeven monthly inflation from the CER and peso curves, without a prior month
pub fn implied_inflation_rates(
    valuation: NaiveDate,
    cpi_curve: &YieldCurveFit,
    peso_curve: &YieldCurveFit,
    months: usize,
) -> Result<RatePath> {
    let grid = month_ends_from(valuation);
    if months == 0 || months > grid.len() {
        return Err(ReturnError::invalid_input(format!(
            "implied inflation needs between 1 and {} months, got {months}",
            grid.len()
        )));
    }

    let first_days = first_period_days(valuation) as f64;
    let mut rates = Vec::with_capacity(months);

    for (i, date) in grid.iter().take(months).enumerate() {
        let days = i as f64 * BASIS_MONTH_DAYS + first_days;
        let period_days = if i == 0 { first_days } else { BASIS_MONTH_DAYS };
        let rate = if period_days == 0.0 {
            0.0
        } else {
            let years = days / INFLATION_DAY_BASIS;
            let peso = peso_curve.yield_at(years);
            let cpi = cpi_curve.yield_at(years);
            ((1.0 + peso) / (1.0 + cpi)).powf(period_days / INFLATION_DAY_BASIS) - 1.0
        };
        rates.push((*date, rate));
    }

    RatePath::from_rates(INFLATION_PATH, rates)
}

/// Market-implied inflation path with the observed CER change of the prior month
pub fn implied_inflation(
    valuation: NaiveDate,
    curves: &CurveSet,
    months: usize,
    cpi_series: &IndexSeries,
) -> Result<RatePath> {
    let path = implied_inflation_rates(
        valuation,
        curves.get(CurveClass::Cpi)?,
        curves.get(CurveClass::Peso)?,
        months,
    )?;
    let (prior_date, prior_rate) = cpi_series.prior_month_change(valuation)?;
    debug!(
        "implied inflation: {} months, first {:.5}, cumulative {:.5}",
        path.points().len(),
        path.first().rate,
        path.last().cumulative
    );
    path.with_prior(prior_date, prior_rate)
}

/// Where the monthly devaluation rate comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DevaluationSource {
    /// Dollar future against today's A3500 rate
    Futures {
        spot: f64,
        future: f64,
        /// Settlement date of the future contract
        limit: NaiveDate,
    },
    /// Peso bond yield against a dollar-linked bond yield
    DollarLinkedVsPeso { peso_yield: f64, dollar_linked_yield: f64 },
    /// CER bond yield plus implied 12-month inflation against a USD bond yield
    UsdVsCpi {
        cpi_yield: f64,
        usd_yield: f64,
        /// Implied inflation over at least twelve months
        inflation: RatePath,
    },
}

impl DevaluationSource {
    /// DL-vs-peso source from two quoted tickets
    pub fn dollar_linked_vs_peso(book: &QuoteBook, peso_ticket: &str, dl_ticket: &str) -> Result<Self> {
        Ok(DevaluationSource::DollarLinkedVsPeso {
            peso_yield: book.yield_of(CurveClass::Peso, peso_ticket)?,
            dollar_linked_yield: book.yield_of(CurveClass::Fx, dl_ticket)?,
        })
    }

    /// USD-vs-CER source from two quoted tickets and an implied inflation path
    ///
    /// The path is usually [`implied_inflation`] over [`ANNUAL_MONTHS`] months,
    /// carrying the observed CER change of the prior month.
    pub fn usd_vs_cpi(book: &QuoteBook, inflation: RatePath, cpi_ticket: &str, usd_ticket: &str) -> Result<Self> {
        if inflation.points().len() < ANNUAL_MONTHS {
            return Err(ReturnError::invalid_input(format!(
                "USD-vs-CER devaluation needs {ANNUAL_MONTHS} months of implied inflation, got {}",
                inflation.points().len()
            )));
        }
        Ok(DevaluationSource::UsdVsCpi {
            cpi_yield: book.yield_of(CurveClass::Cpi, cpi_ticket)?,
            usd_yield: book.yield_of(CurveClass::Usd, usd_ticket)?,
            inflation,
        })
    }

    /// Full-month devaluation rate
    pub fn monthly_rate(&self, valuation: NaiveDate) -> Result<f64> {
        match self {
            DevaluationSource::Futures { spot, future, limit } => {
                let days = (*limit - valuation).num_days();
                if days <= 0 {
                    return Err(ReturnError::invalid_input(format!(
                        "future settlement {limit} is not after {valuation}"
                    )));
                }
                if !(*spot > 0.0 && *future > 0.0) {
                    return Err(ReturnError::invalid_input("spot and future FX must be positive"));
                }
                Ok((future / spot).powf(BASIS_MONTH_DAYS / days as f64) - 1.0)
            }
            DevaluationSource::DollarLinkedVsPeso {
                peso_yield,
                dollar_linked_yield,
            } => Ok(((1.0 + peso_yield) / (1.0 + dollar_linked_yield)).powf(1.0 / 12.0) - 1.0),
            DevaluationSource::UsdVsCpi {
                cpi_yield,
                usd_yield,
                inflation,
            } => {
                let inflation = annual_implied_inflation(valuation, inflation)?;
                Ok(((1.0 + cpi_yield + inflation) / (1.0 + usd_yield)).powf(1.0 / 12.0) - 1.0)
            }
        }
    }
}

/// Twelve-month implied inflation, rebased for the part of the month already elapsed
///
/// The base month is the observed prior month when the path carries one,
/// otherwise the first projected month. Its rate is taken out of the
/// cumulative and put back compounded over `D / (D - valuation_day)` months.
/// No rebase once the valuation day reaches the base month's end day.
fn annual_implied_inflation(valuation: NaiveDate, inflation: &RatePath) -> Result<f64> {
    let cumulative = inflation
        .points()
        .get(ANNUAL_MONTHS - 1)
        .map(|p| p.cumulative)
        .ok_or_else(|| ReturnError::missing_rate(inflation.name(), valuation.year() + 1, valuation.month()))?;

    let base = inflation.prior().unwrap_or_else(|| inflation.first());
    let month_days = base.date.day() as f64;
    let elapsed = valuation.day() as f64;

    if month_days <= elapsed {
        return Ok(cumulative);
    }
    Ok((1.0 + cumulative) / base.gross() * base.gross().powf(month_days / (month_days - elapsed)) - 1.0)
}

/// Market-implied devaluation path with the observed A3500 change of the prior month
///
/// The first month is prorated for the days left in the valuation month and
/// the path stops `30 * months` days after the valuation date.
pub fn implied_devaluation(
    valuation: NaiveDate,
    source: &DevaluationSource,
    months: usize,
    fx_series: &IndexSeries,
) -> Result<RatePath> {
    let monthly = source.monthly_rate(valuation)?;
    let cutoff = valuation + Duration::days(30 * months as i64);

    let mut rates: Vec<(NaiveDate, f64)> = month_ends_from(valuation).into_iter().map(|d| (d, monthly)).collect();

    if let Some(first) = rates.first_mut() {
        let month_days = first.0.day() as f64;
        let remaining = month_days - valuation.day() as f64;
        first.1 = (1.0 + monthly).powf(remaining / month_days) - 1.0;
    }

    let path = RatePath::from_rates(DEVALUATION_PATH, rates)?.truncate_after(cutoff)?;
    let (prior_date, prior_rate) = fx_series.prior_month_change(valuation)?;
    debug!(
        "implied devaluation: monthly {:.5} over {} months",
        monthly,
        path.points().len()
    );
    path.with_prior(prior_date, prior_rate)
}

/// Linearly drifting monthly rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScenario {
    /// Rate of the second projected month
    pub base: f64,
    /// Added every month after the second
    pub step: f64,
}

impl LinearScenario {
    pub fn new(base: f64, step: f64) -> Self {
        Self { base, step }
    }

    /// Scenario path on the month-end grid, through the horizon month
    ///
    /// The first month keeps the seed's first projected rate and the prior
    /// observation is copied from the seed.
    pub fn build(&self, seed: &RatePath, valuation: NaiveDate, horizon: NaiveDate) -> Result<RatePath> {
        let cutoff = month_end(horizon.year(), horizon.month());
        let mut rates = Vec::new();
        let mut rate = self.base;

        for (i, date) in month_ends_from(valuation).into_iter().enumerate() {
            if date > cutoff {
                break;
            }
            match i {
                0 => rates.push((date, seed.first().rate)),
                1 => rates.push((date, self.base)),
                _ => {
                    rate += self.step;
                    rates.push((date, rate));
                }
            }
        }

        let path = RatePath::from_rates(seed.name(), rates)?;
        match seed.prior() {
            Some(prior) => path.with_prior(prior.date, prior.rate),
            None => Ok(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::series::SeriesKind;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_first_period_days() {
        assert_eq!(first_period_days(d(2024, 3, 10)), 20);
        assert_eq!(first_period_days(d(2024, 3, 30)), 0);
        assert_eq!(first_period_days(d(2024, 3, 31)), 0);
        assert_eq!(first_period_days(d(2024, 2, 28)), 0);
        assert_eq!(first_period_days(d(2024, 2, 27)), 3);
    }

    #[test]
    fn test_implied_inflation_breakeven() {
        // flat curves: 10% CER real yield, 43% peso yield
        let cpi = YieldCurveFit::new(0.10, 0.0);
        let peso = YieldCurveFit::new(0.43, 0.0);
        let path = implied_inflation_rates(d(2024, 3, 10), &cpi, &peso, 6).unwrap();

        assert_eq!(path.points().len(), 6);
        assert_eq!(path.first().date, d(2024, 3, 31));
        let ratio: f64 = 1.43 / 1.10;
        assert_relative_eq!(path.first().rate, ratio.powf(20.0 / 360.0) - 1.0, epsilon = 1e-12);
        assert_relative_eq!(path.points()[1].rate, ratio.powf(30.0 / 360.0) - 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_implied_inflation_on_month_end_starts_flat() {
        let cpi = YieldCurveFit::new(0.05, 0.01);
        let peso = YieldCurveFit::new(0.40, 0.02);
        let path = implied_inflation_rates(d(2024, 4, 30), &cpi, &peso, 3).unwrap();
        assert_eq!(path.first().rate, 0.0);
        assert!(path.points()[1].rate > 0.0);
    }

    #[test]
    fn test_implied_inflation_attaches_prior_month() {
        let curves = CurveSet::new()
            .with_fit(CurveClass::Cpi, YieldCurveFit::new(0.10, 0.0))
            .with_fit(CurveClass::Peso, YieldCurveFit::new(0.40, 0.0));
        let series = IndexSeries::new(
            "CER",
            SeriesKind::Cpi,
            vec![(d(2024, 2, 1), 100.0), (d(2024, 2, 28), 104.0)],
        );
        let path = implied_inflation(d(2024, 3, 10), &curves, 6, &series).unwrap();
        assert_relative_eq!(path.rate_for((2024, 2)).unwrap(), 0.04, epsilon = 1e-12);
    }

    #[test]
    fn test_futures_devaluation() {
        let source = DevaluationSource::Futures {
            spot: 800.0,
            future: 880.0,
            limit: d(2024, 6, 8),
        };
        let valuation = d(2024, 3, 10);
        let monthly = source.monthly_rate(valuation).unwrap();
        assert_relative_eq!(monthly, 1.1f64.powf(30.0 / 90.0) - 1.0, epsilon = 1e-12);

        let series = IndexSeries::new(
            "A3500",
            SeriesKind::Fx,
            vec![(d(2024, 2, 1), 820.0), (d(2024, 2, 28), 840.5)],
        );
        let path = implied_devaluation(valuation, &source, 6, &series).unwrap();

        // March 10 + 180 days = September 6: March through August
        assert_eq!(path.points().len(), 6);
        assert_eq!(path.last().date, d(2024, 8, 31));
        assert_relative_eq!(
            path.first().rate,
            (1.0 + monthly).powf(21.0 / 31.0) - 1.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(path.points()[1].rate, monthly, epsilon = 1e-12);
        assert_relative_eq!(path.rate_for((2024, 2)).unwrap(), 0.025, epsilon = 1e-12);
    }

    #[test]
    fn test_quote_based_devaluation() {
        let dl = DevaluationSource::DollarLinkedVsPeso {
            peso_yield: 0.5,
            dollar_linked_yield: 0.0,
        };
        assert_relative_eq!(
            dl.monthly_rate(d(2024, 3, 10)).unwrap(),
            1.5f64.powf(1.0 / 12.0) - 1.0,
            epsilon = 1e-12
        );

        // with zero inflation the USD-vs-CER source reduces to the yield ratio
        let flat = YieldCurveFit::new(0.1, 0.0);
        let usd = DevaluationSource::UsdVsCpi {
            cpi_yield: 0.05,
            usd_yield: 0.05,
            inflation: implied_inflation_rates(d(2024, 3, 10), &flat, &flat, ANNUAL_MONTHS).unwrap(),
        };
        assert_relative_eq!(usd.monthly_rate(d(2024, 3, 10)).unwrap(), 0.0, epsilon = 1e-12);

        assert!(DevaluationSource::Futures {
            spot: 800.0,
            future: 900.0,
            limit: d(2024, 3, 1),
        }
        .monthly_rate(d(2024, 3, 10))
        .is_err());
    }

    #[test]
    fn test_annual_inflation_rebases_on_prior_month() {
        let valuation = d(2024, 3, 10);
        let cpi = YieldCurveFit::new(0.10, 0.0);
        let peso = YieldCurveFit::new(0.43, 0.0);
        let projected = implied_inflation_rates(valuation, &cpi, &peso, ANNUAL_MONTHS).unwrap();

        // 20 days of March then eleven 30-day months
        let cumulative = 1.3f64.powf(350.0 / 360.0) - 1.0;
        assert_relative_eq!(projected.last().cumulative, cumulative, epsilon = 1e-12);

        // without an observation the first projected month is the base
        let march = 1.3f64.powf(20.0 / 360.0);
        assert_relative_eq!(
            annual_implied_inflation(valuation, &projected).unwrap(),
            (1.0 + cumulative) / march * march.powf(31.0 / 21.0) - 1.0,
            epsilon = 1e-12
        );

        // February observed at 4%: base day 28, valuation day 10
        let observed = projected.with_prior(d(2024, 2, 28), 0.04).unwrap();
        let annual = (1.0 + cumulative) / 1.04 * 1.04f64.powf(28.0 / 18.0) - 1.0;
        assert_relative_eq!(annual_implied_inflation(valuation, &observed).unwrap(), annual, epsilon = 1e-12);

        let book = QuoteBook::new(
            vec![
                crate::market::QuotePoint {
                    class: CurveClass::Cpi,
                    ticket: "TX26".into(),
                    duration: 1.5,
                    annual_yield: 0.05,
                },
                crate::market::QuotePoint {
                    class: CurveClass::Usd,
                    ticket: "GD30".into(),
                    duration: 2.5,
                    annual_yield: 0.08,
                },
            ],
            crate::market::DurationUnit::Years,
        );
        let source = DevaluationSource::usd_vs_cpi(&book, observed, "TX26", "GD30").unwrap();
        assert_relative_eq!(
            source.monthly_rate(valuation).unwrap(),
            ((1.05 + annual) / 1.08).powf(1.0 / 12.0) - 1.0,
            epsilon = 1e-12
        );

        let short = implied_inflation_rates(valuation, &cpi, &peso, 6).unwrap();
        assert!(DevaluationSource::usd_vs_cpi(&book, short, "TX26", "GD30").is_err());
    }

    #[test]
    fn test_linear_scenario() {
        let seed = RatePath::from_rates(
            INFLATION_PATH,
            vec![(d(2024, 3, 31), 0.012), (d(2024, 4, 30), 0.03)],
        )
        .unwrap()
        .with_prior(d(2024, 2, 28), 0.13)
        .unwrap();

        let path = LinearScenario::new(0.04, 0.005)
            .build(&seed, d(2024, 3, 10), d(2024, 7, 15))
            .unwrap();

        let rates: Vec<f64> = path.points().iter().map(|p| p.rate).collect();
        assert_eq!(rates.len(), 5); // March through July
        assert_relative_eq!(rates[0], 0.012);
        assert_relative_eq!(rates[1], 0.04);
        assert_relative_eq!(rates[2], 0.045, epsilon = 1e-12);
        assert_relative_eq!(rates[4], 0.055, epsilon = 1e-12);
        assert_relative_eq!(path.prior().unwrap().rate, 0.13);
        assert_eq!(path.name(), INFLATION_PATH);
    }
}
