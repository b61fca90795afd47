//! Scenario runner for repeated return analyses
//!
//! Pre-loads the instrument universe and market tables once, then builds the
//! projected paths for each configuration without re-reading CSV files.

use std::path::Path;

use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ReturnError};
use crate::instrument::{load_instruments_from_dir, Instrument, RejectedRow};
use crate::market::{
    implied_devaluation, implied_inflation, DevaluationSource, DurationUnit, LinearScenario, LoadedMarket, RatePath,
    ANNUAL_MONTHS, DEFAULT_DATA_PATH, DEFAULT_IMPLIED_MONTHS,
};
use crate::projection::{AnalysisConfig, MarketData, ReturnEngine, ReturnTable};

/// Where the inflation path comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InflationInput {
    /// `inflacion.csv`
    #[default]
    File,
    /// Breakeven between the CER and peso curves
    Implied,
}

/// Where the devaluation path comes from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum DevaluationInput {
    /// `devaluacion.csv`
    #[default]
    File,
    /// Dollar future against today's A3500 rate
    Futures { future: f64, limit: NaiveDate },
    /// Quoted peso and dollar-linked tickets
    DollarLinkedVsPeso { peso_ticket: String, dl_ticket: String },
    /// Quoted CER and USD tickets
    UsdVsCpi { cpi_ticket: String, usd_ticket: String },
}

/// How to build the projected paths for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSources {
    pub inflation: InflationInput,
    /// Replaces the inflation path after its first month
    pub inflation_scenario: Option<LinearScenario>,
    pub devaluation: DevaluationInput,
    /// Replaces the devaluation path after its first month
    pub devaluation_scenario: Option<LinearScenario>,
    /// Months covered by market-implied paths
    pub implied_months: usize,
}

impl Default for MarketSources {
    fn default() -> Self {
        Self {
            inflation: InflationInput::File,
            inflation_scenario: None,
            devaluation: DevaluationInput::File,
            devaluation_scenario: None,
            implied_months: DEFAULT_IMPLIED_MONTHS,
        }
    }
}

/// Pre-loaded runner for repeated analyses
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::from_default()?;
///
/// for months in [3, 6, 12] {
///     let config = AnalysisConfig { horizon: add_months(valuation, months), ..base.clone() };
///     let table = runner.run(&config, &MarketSources::default())?;
/// }
/// ```
#[derive(Debug)]
pub struct ScenarioRunner {
    instruments: Vec<Instrument>,
    rejected: Vec<RejectedRow>,
    market: LoadedMarket,
}

impl ScenarioRunner {
    /// Create runner from an already-built universe and market
    pub fn new(instruments: Vec<Instrument>, market: LoadedMarket) -> Self {
        Self {
            instruments,
            rejected: Vec::new(),
            market,
        }
    }

    /// Create runner by loading every table from the default data directory
    pub fn from_default() -> Result<Self> {
        Self::from_data_dir(Path::new(DEFAULT_DATA_PATH), DurationUnit::default())
    }

    /// Create runner from a specific data directory
    pub fn from_data_dir(dir: &Path, unit: DurationUnit) -> Result<Self> {
        let table = load_instruments_from_dir(dir)?;
        let market = LoadedMarket::load_from(dir, unit)?;
        info!(
            "loaded {} instruments ({} rejected) from {}",
            table.instruments.len(),
            table.rejected.len(),
            dir.display()
        );
        Ok(Self {
            instruments: table.instruments,
            rejected: table.rejected,
            market,
        })
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    pub fn market(&self) -> &LoadedMarket {
        &self.market
    }

    /// Get mutable reference to the loaded market for customization
    pub fn market_mut(&mut self) -> &mut LoadedMarket {
        &mut self.market
    }

    /// Fitted curves and projected paths for one configuration
    pub fn market_data(&self, config: &AnalysisConfig, sources: &MarketSources) -> Result<MarketData> {
        let curves = self.market.quotes.fit_all();

        let inflation = match sources.inflation {
            InflationInput::File => from_file(&self.market.inflation, "inflation")?,
            InflationInput::Implied => implied_inflation(
                config.valuation,
                &curves,
                sources.implied_months,
                &self.market.cpi_series,
            )?,
        };
        let inflation = with_scenario(inflation, sources.inflation_scenario, config)?;

        let source = match &sources.devaluation {
            DevaluationInput::File => None,
            DevaluationInput::Futures { future, limit } => Some(DevaluationSource::Futures {
                spot: config.fx_today,
                future: *future,
                limit: *limit,
            }),
            DevaluationInput::DollarLinkedVsPeso { peso_ticket, dl_ticket } => Some(
                DevaluationSource::dollar_linked_vs_peso(&self.market.quotes, peso_ticket, dl_ticket)?,
            ),
            DevaluationInput::UsdVsCpi { cpi_ticket, usd_ticket } => {
                let annual = implied_inflation(config.valuation, &curves, ANNUAL_MONTHS, &self.market.cpi_series)?;
                Some(DevaluationSource::usd_vs_cpi(&self.market.quotes, annual, cpi_ticket, usd_ticket)?)
            }
        };
        let devaluation = match source {
            None => from_file(&self.market.devaluation, "devaluation")?,
            Some(source) => implied_devaluation(
                config.valuation,
                &source,
                sources.implied_months,
                &self.market.fx_series,
            )?,
        };
        let devaluation = with_scenario(devaluation, sources.devaluation_scenario, config)?;

        Ok(MarketData {
            interest: self.market.interest.clone(),
            inflation,
            devaluation,
            curves,
        })
    }

    /// Run the universe under one configuration
    pub fn run(&self, config: &AnalysisConfig, sources: &MarketSources) -> Result<ReturnTable> {
        config.validate()?;
        let engine = ReturnEngine::new(self.market_data(config, sources)?, config.clone());
        let rejected = self.rejected.iter().map(|r| r.ticket.clone()).collect();
        Ok(engine.run(&self.instruments).with_rejected(rejected))
    }

    /// Run the universe under several configurations
    pub fn run_batch(&self, configs: &[AnalysisConfig], sources: &MarketSources) -> Result<Vec<ReturnTable>> {
        configs.iter().map(|config| self.run(config, sources)).collect()
    }

    /// Run the universe once per horizon date, other settings unchanged
    pub fn run_horizons(
        &self,
        config: &AnalysisConfig,
        horizons: &[NaiveDate],
        sources: &MarketSources,
    ) -> Result<Vec<(NaiveDate, ReturnTable)>> {
        horizons
            .iter()
            .map(|&horizon| {
                let config = AnalysisConfig {
                    horizon,
                    ..config.clone()
                };
                Ok((horizon, self.run(&config, sources)?))
            })
            .collect()
    }
}

fn from_file(path: &Option<RatePath>, what: &str) -> Result<RatePath> {
    path.clone()
        .ok_or_else(|| ReturnError::invalid_input(format!("no {what} path was loaded; use a market-implied source")))
}

fn with_scenario(path: RatePath, scenario: Option<LinearScenario>, config: &AnalysisConfig) -> Result<RatePath> {
    match scenario {
        Some(scenario) => scenario.build(&path, config.valuation, config.horizon),
        None => Ok(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{month_end, month_key};
    use crate::instrument::Linkage;
    use crate::market::{
        CurveClass, IndexSeries, QuoteBook, QuotePoint, SeriesKind, DEVALUATION_PATH, INFLATION_PATH, INTEREST_PATH,
    };
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn quote(class: CurveClass, ticket: &str, duration: f64, annual_yield: f64) -> QuotePoint {
        QuotePoint {
            class,
            ticket: ticket.to_string(),
            duration,
            annual_yield,
        }
    }

    fn test_market() -> LoadedMarket {
        let dates: Vec<NaiveDate> = (0..24)
            .map(|i| {
                let (y, m) = crate::calendar::shift_month((2024, 3), i);
                month_end(y, m)
            })
            .collect();

        LoadedMarket {
            quotes: QuoteBook::new(
                vec![
                    quote(CurveClass::Cpi, "TX25", 0.5, 0.05),
                    quote(CurveClass::Cpi, "TX26", 2.0, 0.07),
                    quote(CurveClass::Peso, "S31D4", 0.5, 0.40),
                    quote(CurveClass::Peso, "T15E7", 2.0, 0.35),
                    quote(CurveClass::Fx, "D31O4", 0.5, 0.02),
                    quote(CurveClass::Fx, "TV25", 2.0, 0.04),
                    quote(CurveClass::Usd, "AL30", 1.0, 0.10),
                    quote(CurveClass::Usd, "GD35", 3.0, 0.12),
                ],
                DurationUnit::Years,
            ),
            interest: RatePath::flat(INTEREST_PATH, &dates, 0.03).unwrap(),
            inflation: Some(
                RatePath::flat(INFLATION_PATH, &dates, 0.02)
                    .unwrap()
                    .with_prior(month_end(2024, 2), 0.02)
                    .unwrap(),
            ),
            devaluation: Some(
                RatePath::flat(DEVALUATION_PATH, &dates, 0.015)
                    .unwrap()
                    .with_prior(month_end(2024, 2), 0.015)
                    .unwrap(),
            ),
            cpi_series: IndexSeries::new("CER", SeriesKind::Cpi, [(d(2024, 2, 1), 100.0), (d(2024, 2, 28), 113.0)]),
            fx_series: IndexSeries::new("A3500", SeriesKind::Fx, [(d(2024, 2, 1), 800.0), (d(2024, 2, 28), 820.0)]),
        }
    }

    fn runner() -> ScenarioRunner {
        let instruments = vec![
            Instrument::bill("S31D4", d(2024, 12, 31), 0.0, Linkage::None, 80.0),
            Instrument::bill("X18J5", d(2025, 6, 18), 0.0, Linkage::Cpi, 110.0).with_issuance_index(90.0),
            Instrument::bill("D31O4", d(2024, 10, 31), 0.0, Linkage::Fx, 85_000.0),
        ];
        ScenarioRunner::new(instruments, test_market())
    }

    fn config(horizon: NaiveDate) -> AnalysisConfig {
        AnalysisConfig {
            valuation: d(2024, 3, 15),
            horizon,
            invested: 50_000.0,
            cpi_today: 120.0,
            fx_today: 850.0,
        }
    }

    #[test]
    fn test_run_with_file_paths() {
        let table = runner().run(&config(d(2024, 9, 15)), &MarketSources::default()).unwrap();
        assert_eq!(table.returns.len(), 3);
        assert!(table.failures.is_empty());
        assert!(table.returns.windows(2).all(|w| w[0].annualized_return >= w[1].annualized_return));
    }

    #[test]
    fn test_market_implied_paths() {
        let sources = MarketSources {
            inflation: InflationInput::Implied,
            devaluation: DevaluationInput::Futures {
                future: 1_000.0,
                limit: d(2024, 9, 30),
            },
            ..MarketSources::default()
        };
        let cfg = config(d(2024, 7, 31));
        let runner = runner();

        let market = runner.market_data(&cfg, &sources).unwrap();
        assert_eq!(market.inflation.first_month(), (2024, 3));
        assert_eq!(market.inflation.points().len(), DEFAULT_IMPLIED_MONTHS);
        assert_relative_eq!(market.inflation.prior().unwrap().rate, 0.13, epsilon = 1e-12);
        assert_relative_eq!(market.devaluation.prior().unwrap().rate, 0.025, epsilon = 1e-12);

        let table = runner.run(&cfg, &sources).unwrap();
        assert_eq!(table.returns.len(), 3);
    }

    #[test]
    fn test_scenario_overlay() {
        let sources = MarketSources {
            inflation_scenario: Some(LinearScenario::new(0.03, 0.001)),
            ..MarketSources::default()
        };
        let cfg = config(d(2024, 9, 15));
        let market = runner().market_data(&cfg, &sources).unwrap();

        let rates: Vec<f64> = market.inflation.points().iter().map(|p| p.rate).collect();
        assert_relative_eq!(rates[0], 0.02);
        assert_relative_eq!(rates[1], 0.03);
        assert_relative_eq!(rates[2], 0.031, epsilon = 1e-12);
        assert_eq!(market.inflation.last_month(), month_key(cfg.horizon));
        assert!(market.inflation.prior().is_some());
        // devaluation untouched
        assert_eq!(market.devaluation.points().len(), 24);
    }

    #[test]
    fn test_run_horizons() {
        let horizons = [d(2024, 6, 15), d(2024, 9, 15), d(2024, 12, 15)];
        let tables = runner()
            .run_horizons(&config(d(2024, 6, 15)), &horizons, &MarketSources::default())
            .unwrap();

        assert_eq!(tables.len(), 3);
        for ((horizon, table), expected) in tables.iter().zip(horizons) {
            assert_eq!(*horizon, expected);
            assert_eq!(table.returns.len(), 3);
        }
        // D31O4 is held to maturity by the last horizon
        let last = &tables[2].1;
        assert!(last.returns.iter().any(|r| r.ticket == "D31O4" && r.held_to_maturity));
    }

    #[test]
    fn test_missing_path_file() {
        let mut runner = runner();
        runner.market_mut().inflation = None;
        assert!(matches!(
            runner.run(&config(d(2024, 9, 15)), &MarketSources::default()),
            Err(ReturnError::InvalidInput(_))
        ));
        assert!(runner
            .run(&config(d(2024, 3, 15)), &MarketSources::default())
            .is_err());
    }

    #[test]
    fn test_load_sample_data() {
        let runner = ScenarioRunner::from_default().expect("Failed to load sample data");
        assert!(!runner.instruments().is_empty());
        assert!(runner.rejected().is_empty());

        let config = AnalysisConfig {
            valuation: d(2025, 3, 14),
            horizon: d(2025, 9, 30),
            invested: 50_000.0,
            cpi_today: 560.0,
            fx_today: 1_060.0,
        };
        let table = runner.run(&config, &MarketSources::default()).unwrap();
        assert!(table.failures.is_empty(), "{:?}", table.failures);
        assert_eq!(table.skipped, vec!["AL30".to_string()]);
        assert_eq!(table.returns.iter().filter(|r| r.ticket.starts_with("TDJ25")).count(), 1);
        assert_eq!(table.returns.len(), runner.instruments().len() - 2);
    }
}
