//! Expected total return of each instrument between valuation and horizon

use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::capitalize::Capitalizer;
use super::discount::{horizon_rescale, CurveDiscounter};
use super::indexation::IndexAdjuster;
use super::results::{InstrumentFailure, InstrumentReturn, ReturnShares, ReturnTable};
use crate::cashflow::{CashflowBuilder, CashflowSchedule};
use crate::error::{Result, ReturnError};
use crate::instrument::Instrument;
use crate::market::{CurveSet, RatePath, DAYS_PER_YEAR};

/// Amount invested per instrument unless told otherwise
pub const DEFAULT_INVESTED: f64 = 50_000.0;

/// Configuration for an analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Date prices and curves refer to
    pub valuation: NaiveDate,

    /// Date the position is sold or matures
    pub horizon: NaiveDate,

    /// Pesos put into each instrument
    pub invested: f64,

    /// CER index level on the valuation date
    pub cpi_today: f64,

    /// A3500 exchange rate on the valuation date
    pub fx_today: f64,
}

impl AnalysisConfig {
    /// Config for the given dates with default amounts and unit index levels
    pub fn new(valuation: NaiveDate, horizon: NaiveDate) -> Self {
        Self {
            valuation,
            horizon,
            invested: DEFAULT_INVESTED,
            cpi_today: 1.0,
            fx_today: 1.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon <= self.valuation {
            return Err(ReturnError::InvalidHorizon {
                horizon: self.horizon,
                valuation: self.valuation,
            });
        }
        if !(self.invested > 0.0) {
            return Err(ReturnError::invalid_input(format!(
                "invested amount {} is not positive",
                self.invested
            )));
        }
        if !(self.cpi_today > 0.0 && self.fx_today > 0.0) {
            return Err(ReturnError::invalid_input("today's CER and A3500 levels must be positive"));
        }
        Ok(())
    }

    /// Calendar days from valuation to horizon
    pub fn days_to_horizon(&self) -> i64 {
        (self.horizon - self.valuation).num_days()
    }
}

/// Projected paths and fitted curves shared by every instrument
#[derive(Debug, Clone)]
pub struct MarketData {
    /// Short rate used to reinvest collected flows
    pub interest: RatePath,
    pub inflation: RatePath,
    pub devaluation: RatePath,
    pub curves: CurveSet,
}

/// Main return engine
pub struct ReturnEngine {
    market: MarketData,
    config: AnalysisConfig,
}

impl ReturnEngine {
    /// Create a new engine with given market data and config
    pub fn new(market: MarketData, config: AnalysisConfig) -> Self {
        Self { market, config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn market(&self) -> &MarketData {
        &self.market
    }

    /// Return decomposition for a single instrument
    pub fn evaluate(&self, instrument: &Instrument) -> Result<InstrumentReturn> {
        let config = &self.config;
        config.validate()?;
        if !instrument.kind.is_eligible() {
            return Err(ReturnError::InvalidInstrumentKind(instrument.kind.as_str().to_string()));
        }

        let nominal = instrument.nominal_for(config.invested)?;
        let split = CashflowBuilder::new(config.valuation, config.horizon)?
            .with_face(nominal)
            .build_split(instrument)?;

        // Flows received before the horizon, in pesos, reinvested at the short rate
        let adjuster = IndexAdjuster::new(
            &self.market.inflation,
            &self.market.devaluation,
            config.cpi_today,
            config.fx_today,
        );
        let collected = adjuster.adjust(instrument, &split.collected)?;
        let capitalized = Capitalizer::new(&self.market.interest, config.horizon).capitalize(&collected)?;

        let coupons = capitalized.coupons();
        let principal = capitalized.principal();
        let reinvestment = capitalized.reinvestment();

        let held_to_maturity = config.horizon >= instrument.maturity;
        let capital_or_resale = if held_to_maturity {
            principal
        } else {
            self.resale_price(instrument, &split.remaining)?
        };

        let proceeds = coupons + reinvestment + capital_or_resale;
        let shares = ReturnShares::from_amounts(&instrument.ticket, coupons, reinvestment, capital_or_resale)?;

        let total_return = proceeds / config.invested - 1.0;
        let annualized_return = (1.0 + total_return).powf(DAYS_PER_YEAR / config.days_to_horizon() as f64) - 1.0;
        if !annualized_return.is_finite() {
            return Err(ReturnError::DegenerateReturn {
                ticket: instrument.ticket.clone(),
                reason: format!("holding-period return {total_return} cannot be annualized"),
            });
        }

        debug!(
            "{}: coupons {:.2}, reinvestment {:.2}, capital/resale {:.2}, annualized {:.4}",
            instrument.ticket, coupons, reinvestment, capital_or_resale, annualized_return
        );

        Ok(InstrumentReturn {
            ticket: instrument.ticket.clone(),
            linkage: instrument.linkage,
            dual: instrument.dual,
            nominal,
            coupons,
            principal,
            reinvestment,
            capital_or_resale,
            held_to_maturity,
            proceeds,
            total_return,
            annualized_return,
            shares,
        })
    }

    /// Expected price at the horizon of the flows still to come
    fn resale_price(&self, instrument: &Instrument, remaining: &CashflowSchedule) -> Result<f64> {
        let fit = self.market.curves.get(instrument.linkage.curve_class())?;
        let scale = horizon_rescale(
            instrument,
            &self.market.inflation,
            &self.market.devaluation,
            self.config.cpi_today,
            self.config.fx_today,
            self.config.horizon,
        )?;
        CurveDiscounter::new(*fit, self.config.valuation).present_value(remaining, scale)
    }

    /// Evaluate a universe; failures are recorded and the batch continues
    pub fn run(&self, instruments: &[Instrument]) -> ReturnTable {
        let mut returns = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = Vec::new();

        for instrument in instruments {
            if !instrument.kind.is_eligible() {
                debug!("{}: skipping {} structure", instrument.ticket, instrument.kind.as_str());
                skipped.push(instrument.ticket.clone());
                continue;
            }
            match self.evaluate(instrument) {
                Ok(r) => returns.push(r),
                Err(error) => {
                    warn!("{}: {}", instrument.ticket, error);
                    failures.push(InstrumentFailure {
                        ticket: instrument.ticket.clone(),
                        error,
                    });
                }
            }
        }

        let table = ReturnTable::from_returns(returns, failures, skipped);
        let summary = table.summary();
        info!(
            "horizon {}: {} ranked, {} failed, {} skipped",
            self.config.horizon, summary.ranked, summary.failed, summary.skipped
        );
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::month_end;
    use crate::instrument::{Linkage, MonthDay};
    use crate::market::{CurveClass, YieldCurveFit, DEVALUATION_PATH, INFLATION_PATH, INTEREST_PATH};
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn months(from: (i32, u32), count: usize) -> Vec<NaiveDate> {
        (0..count as i32)
            .map(|i| {
                let (y, m) = crate::calendar::shift_month(from, i);
                month_end(y, m)
            })
            .collect()
    }

    fn market(interest: f64, inflation: f64, devaluation: f64) -> MarketData {
        let dates = months((2024, 1), 36);
        MarketData {
            interest: RatePath::flat(INTEREST_PATH, &dates, interest).unwrap(),
            inflation: RatePath::flat(INFLATION_PATH, &dates, inflation)
                .unwrap()
                .with_prior(month_end(2023, 12), inflation)
                .unwrap(),
            devaluation: RatePath::flat(DEVALUATION_PATH, &dates, devaluation)
                .unwrap()
                .with_prior(month_end(2023, 12), devaluation)
                .unwrap(),
            curves: CurveSet::new()
                .with_fit(CurveClass::Cpi, YieldCurveFit::new(0.05, 0.0))
                .with_fit(CurveClass::Peso, YieldCurveFit::new(0.10, 0.0))
                .with_fit(CurveClass::Fx, YieldCurveFit::new(0.02, 0.0)),
        }
    }

    fn config(valuation: NaiveDate, horizon: NaiveDate) -> AnalysisConfig {
        AnalysisConfig {
            valuation,
            horizon,
            invested: 10_000.0,
            cpi_today: 100.0,
            fx_today: 1_000.0,
        }
    }

    #[test]
    fn test_zero_inflation_cpi_bill_to_maturity() {
        let valuation = d(2024, 1, 15);
        let maturity = d(2025, 1, 15);
        let bill = Instrument::bill("X15E5", maturity, 0.0, Linkage::Cpi, 100.0).with_issuance_index(100.0);

        let engine = ReturnEngine::new(market(0.03, 0.0, 0.0), config(valuation, maturity));
        let r = engine.evaluate(&bill).unwrap();

        assert!(r.held_to_maturity);
        assert_relative_eq!(r.capital_or_resale, 10_000.0, epsilon = 1e-6);
        assert_eq!(r.shares.capital, 100.0);
        assert_eq!(r.shares.coupons, 0.0);
        assert_eq!(r.shares.reinvestment, 0.0);
        assert_relative_eq!(r.annualized_return, 0.0, epsilon = 1e-9);
        assert_eq!(r.record().annualized_return_pct, 0.0);
    }

    #[test]
    fn test_peso_bill_resold_before_maturity() {
        let valuation = d(2024, 1, 1);
        let horizon = d(2024, 12, 31);
        let maturity = d(2025, 12, 31);
        let bill = Instrument::bill("S31D5", maturity, 0.0, Linkage::None, 80.0);

        let engine = ReturnEngine::new(market(0.02, 0.0, 0.0), config(valuation, horizon));
        let r = engine.evaluate(&bill).unwrap();

        // flat 10% curve: resale at 100 / 1.10 per 100 nominal
        let nominal = 10_000.0 / 80.0 * 100.0;
        assert!(!r.held_to_maturity);
        assert_relative_eq!(r.nominal, nominal, epsilon = 1e-9);
        assert_relative_eq!(r.capital_or_resale, nominal / 1.10, epsilon = 1e-6);
        assert_relative_eq!(r.total_return, nominal / 1.10 / 10_000.0 - 1.0, epsilon = 1e-9);
        assert_eq!(r.shares.capital, 100.0);
    }

    #[test]
    fn test_bullet_coupons_are_reinvested() {
        let valuation = d(2024, 1, 15);
        let horizon = d(2024, 12, 20);
        let bullet = Instrument::bullet(
            "T26",
            ("05-09".parse::<MonthDay>().unwrap(), "11-09".parse::<MonthDay>().unwrap()),
            d(2026, 11, 9),
            10.0,
            Linkage::None,
            100.0,
        );

        let engine = ReturnEngine::new(market(0.02, 0.0, 0.0), config(valuation, horizon));
        let r = engine.evaluate(&bullet).unwrap();

        assert_relative_eq!(r.coupons, 1_000.0, epsilon = 1e-9);
        assert!(r.reinvestment > 0.0);
        assert!(r.capital_or_resale > 0.0);
        assert!((r.shares.sum() - 100.0).abs() < 0.01);
        assert!(r.shares.coupons > 0.0 && r.shares.reinvestment > 0.0);
    }

    #[test]
    fn test_run_collects_failures_and_skips() {
        let valuation = d(2024, 1, 15);
        let horizon = d(2024, 7, 15);
        let maturity = d(2025, 1, 15);

        let good = Instrument::bill("S15E5", maturity, 0.0, Linkage::None, 90.0);
        let mut amortizing = good.clone();
        amortizing.ticket = "AMORT".into();
        amortizing.kind = crate::instrument::InstrumentKind::Other("amortizable".into());
        let no_index = Instrument::bill("X15E5", maturity, 0.0, Linkage::Cpi, 90.0);
        let cer_leg = Instrument::bill("TDE25-CER", maturity, 0.0, Linkage::DualCpi, 90.0)
            .with_issuance_index(100.0)
            .with_issuance_fx(1.0)
            .as_dual();
        let dl_leg = Instrument::bill("TDE25-DL", maturity, 0.0, Linkage::Fx, 90.0).as_dual();

        let engine = ReturnEngine::new(market(0.02, 0.01, 0.02), config(valuation, horizon));
        let table = engine.run(&[good, amortizing, no_index, cer_leg, dl_leg]);

        assert_eq!(table.skipped, vec!["AMORT".to_string()]);
        assert_eq!(table.failures.len(), 1);
        assert_eq!(table.failures[0].ticket, "X15E5");
        assert_eq!(table.returns.len(), 2);
        assert!(table.returns.iter().any(|r| r.ticket.starts_with("TDE25")));
        assert!(table.returns[0].annualized_return >= table.returns[1].annualized_return);
    }

    #[test]
    fn test_invalid_configs() {
        let valuation = d(2024, 1, 15);
        let bill = Instrument::bill("S15E5", d(2025, 1, 15), 0.0, Linkage::None, 90.0);

        let engine = ReturnEngine::new(market(0.02, 0.0, 0.0), config(valuation, valuation));
        assert!(matches!(engine.evaluate(&bill), Err(ReturnError::InvalidHorizon { .. })));

        let mut cfg = config(valuation, d(2024, 6, 1));
        cfg.invested = 0.0;
        let engine = ReturnEngine::new(market(0.02, 0.0, 0.0), cfg);
        assert!(matches!(engine.evaluate(&bill), Err(ReturnError::InvalidInput(_))));

        // a curve class with no fit
        let mut m = market(0.02, 0.0, 0.0);
        m.curves = CurveSet::new();
        let engine = ReturnEngine::new(m, config(valuation, d(2024, 6, 1)));
        assert!(matches!(engine.evaluate(&bill), Err(ReturnError::MissingCurve(CurveClass::Peso))));
    }

    #[test]
    fn test_config_for_dates() {
        let cfg = AnalysisConfig::new(d(2024, 1, 15), d(2024, 7, 15));
        assert!(cfg.validate().is_ok());
        assert_relative_eq!(cfg.invested, DEFAULT_INVESTED);
        assert_eq!(cfg.days_to_horizon(), 182);

        assert!(AnalysisConfig::new(d(2024, 1, 15), d(2024, 1, 15)).validate().is_err());
    }
}
