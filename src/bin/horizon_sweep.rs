//! Run the return analysis for a range of horizon dates
//!
//! Outputs one row per horizon and ranked ticket, for comparing how the
//! ranking shifts as the holding period grows.

use std::fs::File;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use bond_total_return::calendar::add_months;
use bond_total_return::market::{DurationUnit, DEFAULT_DATA_PATH};
use bond_total_return::projection::{round2, AnalysisConfig, DEFAULT_INVESTED};
use bond_total_return::scenario::{InflationInput, MarketSources, ScenarioRunner};
use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;

/// Ranked returns for horizons 1..=N months after the valuation date
#[derive(Parser, Debug)]
#[command(name = "horizon_sweep")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = DEFAULT_DATA_PATH)]
    data_dir: PathBuf,

    /// Valuation date (YYYY-MM-DD)
    #[arg(long)]
    valuation_date: NaiveDate,

    /// Longest horizon, in months after the valuation date
    #[arg(long, default_value_t = 12)]
    months: u32,

    #[arg(long, default_value_t = DEFAULT_INVESTED)]
    invested: f64,

    #[arg(long)]
    cpi_today: f64,

    #[arg(long)]
    fx_today: f64,

    /// Use the CER/peso breakeven instead of inflacion.csv
    #[arg(long)]
    implied_inflation: bool,

    #[arg(short, long, default_value = "horizon_sweep_output.csv")]
    output: PathBuf,
}

/// One ranked ticket at one horizon
#[derive(Debug, Serialize)]
struct SweepRow {
    #[serde(rename = "Horizonte")]
    horizon: NaiveDate,
    #[serde(rename = "Puesto")]
    rank: usize,
    #[serde(rename = "Ticket")]
    ticket: String,
    #[serde(rename = "RT_Anual_Esp")]
    annualized_return_pct: f64,
    #[serde(rename = "RT_Periodo")]
    total_return_pct: f64,
    #[serde(rename = "Al_Vencimiento")]
    held_to_maturity: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    if args.months == 0 {
        bail!("--months must be at least 1");
    }

    let start = Instant::now();
    println!("Loading data from {}...", args.data_dir.display());
    let runner = ScenarioRunner::from_data_dir(&args.data_dir, DurationUnit::default())
        .with_context(|| format!("loading data from {}", args.data_dir.display()))?;
    println!(
        "Loaded {} instruments in {:?}",
        runner.instruments().len(),
        start.elapsed()
    );

    let config = AnalysisConfig {
        valuation: args.valuation_date,
        horizon: add_months(args.valuation_date, 1),
        invested: args.invested,
        cpi_today: args.cpi_today,
        fx_today: args.fx_today,
    };
    let sources = MarketSources {
        inflation: if args.implied_inflation {
            InflationInput::Implied
        } else {
            InflationInput::File
        },
        ..MarketSources::default()
    };
    let horizons: Vec<NaiveDate> = (1..=args.months as i32)
        .map(|n| add_months(args.valuation_date, n))
        .collect();

    println!("Running {} horizons...", horizons.len());
    let tables = runner
        .run_horizons(&config, &horizons, &sources)
        .context("running horizon sweep")?;

    let file = File::create(&args.output).with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    for (horizon, table) in &tables {
        for (i, r) in table.returns.iter().enumerate() {
            writer.serialize(SweepRow {
                horizon: *horizon,
                rank: i + 1,
                ticket: r.ticket.clone(),
                annualized_return_pct: round2(r.annualized_return * 100.0),
                total_return_pct: round2(r.total_return * 100.0),
                held_to_maturity: r.held_to_maturity,
            })?;
        }
    }
    writer.flush()?;
    println!("Output written to {}", args.output.display());

    println!("\nSweep Summary:");
    for (horizon, table) in &tables {
        let summary = table.summary();
        match summary.best {
            Some((ticket, rate)) => println!(
                "  {}: {} ranked, {} failed, best {} at {:.2}%",
                horizon,
                summary.ranked,
                summary.failed,
                ticket,
                rate * 100.0
            ),
            None => println!("  {}: nothing ranked, {} failed", horizon, summary.failed),
        }
    }

    println!("\nTotal time: {:?}", start.elapsed());
    Ok(())
}
