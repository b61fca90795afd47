//! Bond Total Return CLI
//!
//! Ranks every eligible instrument in a data directory by expected
//! annualized return between the valuation date and a horizon date.
//!
//! ```bash
//! bond_total_return --horizon 2025-09-30 --inflation-source implied \
//!     --devaluation-source futures --fx-future 1250 --future-limit 2025-09-30
//! ```

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bond_total_return::market::{DurationUnit, LinearScenario, DEFAULT_DATA_PATH, DEFAULT_IMPLIED_MONTHS};
use bond_total_return::projection::{AnalysisConfig, ReturnTable, DEFAULT_INVESTED};
use bond_total_return::scenario::{DevaluationInput, InflationInput, MarketSources, ScenarioRunner};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InflationArg {
    File,
    Implied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DevaluationArg {
    File,
    Futures,
    /// Peso vs dollar-linked quotes
    Dl,
    /// CER vs USD quotes
    Usd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DurationArg {
    Years,
    Days,
}

/// Expected total return of peso, CER-linked and dollar-linked sovereign debt
#[derive(Parser, Debug)]
#[command(name = "bond_total_return")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding instrumentos.csv, curvas.csv and the rate tables
    #[arg(long, default_value = DEFAULT_DATA_PATH)]
    data_dir: PathBuf,

    /// Valuation date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    valuation_date: Option<NaiveDate>,

    /// Sale or maturity date of every position (YYYY-MM-DD)
    #[arg(long)]
    horizon: NaiveDate,

    /// Pesos invested per instrument
    #[arg(long, default_value_t = DEFAULT_INVESTED)]
    invested: f64,

    /// CER level today. Defaults to the latest value in serie_cer.csv.
    #[arg(long)]
    cpi_today: Option<f64>,

    /// A3500 rate today. Defaults to the latest value in serie_a3500.csv.
    #[arg(long)]
    fx_today: Option<f64>,

    #[arg(long, value_enum, default_value = "file")]
    inflation_source: InflationArg,

    /// Linear inflation scenario: second-month rate and monthly step
    #[arg(long, num_args = 2, value_names = ["BASE", "STEP"], allow_negative_numbers = true)]
    inflation_scenario: Option<Vec<f64>>,

    #[arg(long, value_enum, default_value = "file")]
    devaluation_source: DevaluationArg,

    /// Linear devaluation scenario: second-month rate and monthly step
    #[arg(long, num_args = 2, value_names = ["BASE", "STEP"], allow_negative_numbers = true)]
    devaluation_scenario: Option<Vec<f64>>,

    /// Dollar future price, for --devaluation-source futures
    #[arg(long)]
    fx_future: Option<f64>,

    /// Settlement date of the dollar future (YYYY-MM-DD)
    #[arg(long)]
    future_limit: Option<NaiveDate>,

    /// Quoted tickets for --devaluation-source dl (PESO DL) or usd (CER USD)
    #[arg(long, num_args = 2, value_names = ["FIRST", "SECOND"])]
    devaluation_tickets: Option<Vec<String>>,

    /// Months covered by market-implied paths
    #[arg(long, default_value_t = DEFAULT_IMPLIED_MONTHS)]
    implied_months: usize,

    /// Unit of the DMdias column in curvas.csv
    #[arg(long, value_enum, default_value = "years")]
    duration_unit: DurationArg,

    /// Write the table here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit JSON instead of CSV
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn sources(&self) -> Result<MarketSources> {
        let inflation = match self.inflation_source {
            InflationArg::File => InflationInput::File,
            InflationArg::Implied => InflationInput::Implied,
        };

        let devaluation = match self.devaluation_source {
            DevaluationArg::File => DevaluationInput::File,
            DevaluationArg::Futures => {
                let (Some(future), Some(limit)) = (self.fx_future, self.future_limit) else {
                    bail!("--devaluation-source futures needs --fx-future and --future-limit");
                };
                DevaluationInput::Futures { future, limit }
            }
            DevaluationArg::Dl => {
                let [peso_ticket, dl_ticket] = self.tickets()?;
                DevaluationInput::DollarLinkedVsPeso { peso_ticket, dl_ticket }
            }
            DevaluationArg::Usd => {
                let [cpi_ticket, usd_ticket] = self.tickets()?;
                DevaluationInput::UsdVsCpi { cpi_ticket, usd_ticket }
            }
        };

        Ok(MarketSources {
            inflation,
            inflation_scenario: scenario(self.inflation_scenario.as_deref()),
            devaluation,
            devaluation_scenario: scenario(self.devaluation_scenario.as_deref()),
            implied_months: self.implied_months,
        })
    }

    fn tickets(&self) -> Result<[String; 2]> {
        match self.devaluation_tickets.as_deref() {
            Some([first, second]) => Ok([first.clone(), second.clone()]),
            _ => bail!("--devaluation-source {:?} needs --devaluation-tickets", self.devaluation_source),
        }
    }

    fn duration_unit(&self) -> DurationUnit {
        match self.duration_unit {
            DurationArg::Years => DurationUnit::Years,
            DurationArg::Days => DurationUnit::Days,
        }
    }
}

fn scenario(values: Option<&[f64]>) -> Option<LinearScenario> {
    match values {
        Some([base, step]) => Some(LinearScenario::new(*base, *step)),
        _ => None,
    }
}

fn write_table(table: &ReturnTable, json: bool, out: impl Write) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(out, &table.records()).context("writing JSON output")?;
    } else {
        table.write_csv(out).context("writing CSV output")?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let runner = ScenarioRunner::from_data_dir(&cli.data_dir, cli.duration_unit())
        .with_context(|| format!("loading data from {}", cli.data_dir.display()))?;

    let valuation = cli
        .valuation_date
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let market = runner.market();
    let cpi_today = match cli.cpi_today {
        Some(level) => level,
        None => market
            .cpi_series
            .latest_on_or_before(valuation)
            .map(|(_, level)| level)
            .context("no CER level on or before the valuation date; pass --cpi-today")?,
    };
    let fx_today = match cli.fx_today {
        Some(rate) => rate,
        None => market
            .fx_series
            .latest_on_or_before(valuation)
            .map(|(_, rate)| rate)
            .context("no A3500 rate on or before the valuation date; pass --fx-today")?,
    };

    let config = AnalysisConfig {
        valuation,
        horizon: cli.horizon,
        invested: cli.invested,
        cpi_today,
        fx_today,
    };
    info!("valuation {} horizon {} CER {:.4} A3500 {:.4}", valuation, cli.horizon, cpi_today, fx_today);

    let table = runner
        .run(&config, &cli.sources()?)
        .context("building market paths")?;

    for failure in &table.failures {
        eprintln!("skipped {}: {}", failure.ticket, failure.error);
    }

    match &cli.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            write_table(&table, cli.json, file)?;
            info!("wrote {} rows to {}", table.returns.len(), path.display());
        }
        None => write_table(&table, cli.json, io::stdout().lock())?,
    }

    let summary = table.summary();
    if let Some((ticket, rate)) = summary.best {
        info!("best: {} at {:.2}% annualized", ticket, rate * 100.0);
    }
    Ok(())
}
