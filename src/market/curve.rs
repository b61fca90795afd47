//! Quoted yields and the log-duration yield curve fitted from them
//!
//! Each instrument class gets its own curve:
//! `yield = intercept + slope * ln(duration)`.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ReturnError};

/// Days per year used to convert quoted durations
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Instrument class a curve is fitted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurveClass {
    Cpi,
    Peso,
    Fx,
    Usd,
}

impl CurveClass {
    pub const ALL: [CurveClass; 4] = [CurveClass::Cpi, CurveClass::Peso, CurveClass::Fx, CurveClass::Usd];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurveClass::Cpi => "CER",
            CurveClass::Peso => "pesos",
            CurveClass::Fx => "DL",
            CurveClass::Usd => "USD",
        }
    }
}

impl fmt::Display for CurveClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurveClass {
    type Err = ReturnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "CER" => Ok(CurveClass::Cpi),
            "pesos" => Ok(CurveClass::Peso),
            "DL" => Ok(CurveClass::Fx),
            "USD" => Ok(CurveClass::Usd),
            other => Err(ReturnError::InvalidLinkageClass(other.to_string())),
        }
    }
}

/// Unit of the quoted `DMdias` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DurationUnit {
    /// Already in years
    #[default]
    Years,
    /// Calendar days, divided by 365
    Days,
}

impl DurationUnit {
    pub fn to_years(&self, quoted: f64) -> f64 {
        match self {
            DurationUnit::Years => quoted,
            DurationUnit::Days => quoted / DAYS_PER_YEAR,
        }
    }
}

/// One market quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotePoint {
    pub class: CurveClass,
    pub ticket: String,
    /// Modified duration as quoted
    pub duration: f64,
    /// Annual yield (decimal)
    pub annual_yield: f64,
}

/// Fitted `yield = intercept + slope * ln(years)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldCurveFit {
    pub intercept: f64,
    pub slope: f64,
}

impl YieldCurveFit {
    pub fn new(intercept: f64, slope: f64) -> Self {
        Self { intercept, slope }
    }

    /// Ordinary least squares of yield on ln(duration)
    pub fn fit(durations: &[f64], yields: &[f64]) -> Result<Self> {
        if durations.len() != yields.len() {
            return Err(ReturnError::invalid_input("durations and yields must have the same length"));
        }
        if durations.len() < 2 {
            return Err(ReturnError::invalid_input("a curve fit needs at least two quotes"));
        }
        if let Some(bad) = durations.iter().find(|d| !(**d > 0.0)) {
            return Err(ReturnError::invalid_input(format!(
                "duration {bad} cannot be log-transformed"
            )));
        }

        let n = durations.len() as f64;
        let xs: Vec<f64> = durations.iter().map(|d| d.ln()).collect();
        let x_mean = xs.iter().sum::<f64>() / n;
        let y_mean = yields.iter().sum::<f64>() / n;

        let (sxy, sxx) = xs
            .iter()
            .zip(yields)
            .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
                let dx = x - x_mean;
                (sxy + dx * (y - y_mean), sxx + dx * dx)
            });

        if sxx.abs() < 1e-14 {
            return Err(ReturnError::invalid_input("all quotes share one duration"));
        }

        let slope = sxy / sxx;
        Ok(Self {
            intercept: y_mean - slope * x_mean,
            slope,
        })
    }

    /// Fitted annual yield at `years`
    pub fn yield_at(&self, years: f64) -> f64 {
        self.intercept + self.slope * years.ln()
    }
}

/// Fitted curves keyed by class
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurveSet {
    fits: HashMap<CurveClass, YieldCurveFit>,
}

impl CurveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fit(mut self, class: CurveClass, fit: YieldCurveFit) -> Self {
        self.fits.insert(class, fit);
        self
    }

    pub fn insert(&mut self, class: CurveClass, fit: YieldCurveFit) {
        self.fits.insert(class, fit);
    }

    pub fn get(&self, class: CurveClass) -> Result<&YieldCurveFit> {
        self.fits.get(&class).ok_or(ReturnError::MissingCurve(class))
    }

    pub fn contains(&self, class: CurveClass) -> bool {
        self.fits.contains_key(&class)
    }
}

/// All quotes of one market snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteBook {
    pub quotes: Vec<QuotePoint>,
    pub duration_unit: DurationUnit,
}

impl QuoteBook {
    pub fn new(quotes: Vec<QuotePoint>, duration_unit: DurationUnit) -> Self {
        Self { quotes, duration_unit }
    }

    pub fn for_class(&self, class: CurveClass) -> impl Iterator<Item = &QuotePoint> {
        self.quotes.iter().filter(move |q| q.class == class)
    }

    /// Quoted yield of a specific ticket in a class
    pub fn yield_of(&self, class: CurveClass, ticket: &str) -> Result<f64> {
        self.for_class(class)
            .find(|q| q.ticket == ticket)
            .map(|q| q.annual_yield)
            .ok_or_else(|| ReturnError::invalid_input(format!("no {class} quote for {ticket}")))
    }

    /// Fit one class
    pub fn fit(&self, class: CurveClass) -> Result<YieldCurveFit> {
        let (durations, yields): (Vec<f64>, Vec<f64>) = self
            .for_class(class)
            .map(|q| (self.duration_unit.to_years(q.duration), q.annual_yield))
            .unzip();
        let fit = YieldCurveFit::fit(&durations, &yields)?;
        debug!(
            "{class} curve from {} quotes: intercept {:.6}, slope {:.6}",
            durations.len(),
            fit.intercept,
            fit.slope
        );
        Ok(fit)
    }

    /// Fit every class with enough quotes; classes that cannot be fitted are left out
    pub fn fit_all(&self) -> CurveSet {
        let mut set = CurveSet::new();
        for class in CurveClass::ALL {
            if self.for_class(class).next().is_none() {
                continue;
            }
            match self.fit(class) {
                Ok(fit) => set.insert(class, fit),
                Err(e) => warn!("skipping {class} curve: {e}"),
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_recovers_exact_log_curve() {
        let durations = [0.25, 0.5, 1.0, 2.0, 4.0];
        let yields: Vec<f64> = durations.iter().map(|d: &f64| 0.08 + 0.015 * d.ln()).collect();

        let fit = YieldCurveFit::fit(&durations, &yields).unwrap();
        assert_relative_eq!(fit.intercept, 0.08, epsilon = 1e-12);
        assert_relative_eq!(fit.slope, 0.015, epsilon = 1e-12);
        assert_relative_eq!(fit.yield_at(1.0), 0.08, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_fits() {
        assert!(YieldCurveFit::fit(&[1.0], &[0.1]).is_err());
        assert!(YieldCurveFit::fit(&[1.0, 1.0], &[0.1, 0.2]).is_err());
        assert!(YieldCurveFit::fit(&[0.0, 1.0], &[0.1, 0.2]).is_err());
    }

    #[test]
    fn test_quote_book() {
        let quote = |class, ticket: &str, duration, y| QuotePoint {
            class,
            ticket: ticket.to_string(),
            duration,
            annual_yield: y,
        };
        let book = QuoteBook::new(
            vec![
                quote(CurveClass::Cpi, "TX26", 365.0, 0.05),
                quote(CurveClass::Cpi, "TX28", 730.0, 0.06),
                quote(CurveClass::Usd, "AL30", 1000.0, 0.2),
            ],
            DurationUnit::Days,
        );

        let curves = book.fit_all();
        let cpi = curves.get(CurveClass::Cpi).unwrap();
        assert_relative_eq!(cpi.yield_at(1.0), 0.05, epsilon = 1e-12);
        assert_relative_eq!(cpi.yield_at(2.0), 0.06, epsilon = 1e-12);

        // one USD quote is not enough for a curve
        assert!(matches!(curves.get(CurveClass::Usd), Err(ReturnError::MissingCurve(CurveClass::Usd))));
        assert_relative_eq!(book.yield_of(CurveClass::Usd, "AL30").unwrap(), 0.2);
        assert!(book.yield_of(CurveClass::Peso, "AL30").is_err());
    }
}
