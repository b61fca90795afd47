//! CSV loaders for market data
//!
//! Loads quotes, rate paths and historical series from the data directory.

use std::path::Path;

use chrono::NaiveDate;
use csv::Reader;
use log::info;

use super::curve::{CurveClass, DurationUnit, QuoteBook, QuotePoint};
use super::rates::{RatePath, DEVALUATION_PATH, INFLATION_PATH, INTEREST_PATH};
use super::series::{IndexSeries, SeriesKind};
use super::survey::RateSurvey;
use crate::error::{Result, ReturnError};

/// Default data directory
pub const DEFAULT_DATA_PATH: &str = "data";

pub const CURVES_FILE: &str = "curvas.csv";
pub const INTEREST_FILE: &str = "tasas.csv";
/// Expected BADLAR survey, read when `tasas.csv` is absent
pub const SURVEY_FILE: &str = "rem_badlar.csv";
/// `periodo` label of the twelve-month survey average
pub const TWELVE_MONTH_LABEL: &str = "12m";
pub const INFLATION_FILE: &str = "inflacion.csv";
pub const DEVALUATION_FILE: &str = "devaluacion.csv";
pub const CPI_SERIES_FILE: &str = "serie_cer.csv";
pub const FX_SERIES_FILE: &str = "serie_a3500.csv";

#[derive(Debug, serde::Deserialize)]
struct QuoteRow {
    #[serde(rename = "clase")]
    class: String,
    #[serde(rename = "ticket")]
    ticket: String,
    #[serde(rename = "DMdias")]
    duration: f64,
    #[serde(rename = "TIR_anual")]
    annual_yield: f64,
}

#[derive(Debug, serde::Deserialize)]
struct RateRow {
    #[serde(rename = "Fecha")]
    date: NaiveDate,
    #[serde(rename = "tasa")]
    rate: f64,
    #[serde(rename = "observado", default)]
    observed: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct SurveyRow {
    #[serde(rename = "periodo")]
    period: String,
    #[serde(rename = "promedio")]
    average: f64,
}

#[derive(Debug, serde::Deserialize)]
struct SeriesRow {
    #[serde(rename = "Fecha")]
    date: NaiveDate,
    #[serde(rename = "indice")]
    level: f64,
}

/// Load quoted (duration, yield) points for every class
pub fn load_quotes(path: &Path, unit: DurationUnit) -> Result<QuoteBook> {
    load_quotes_from_reader(std::fs::File::open(path)?, unit)
}

pub fn load_quotes_from_reader<R: std::io::Read>(reader: R, unit: DurationUnit) -> Result<QuoteBook> {
    let mut reader = Reader::from_reader(reader);
    let mut quotes = Vec::new();

    for result in reader.deserialize() {
        let row: QuoteRow = result?;
        quotes.push(QuotePoint {
            class: row.class.parse::<CurveClass>()?,
            ticket: row.ticket.trim().to_string(),
            duration: row.duration,
            annual_yield: row.annual_yield,
        });
    }

    Ok(QuoteBook::new(quotes, unit))
}

/// Load a monthly rate path; a row flagged `observado=si` becomes the prior month
pub fn load_rate_path(path: &Path, name: &str) -> Result<RatePath> {
    load_rate_path_from_reader(std::fs::File::open(path)?, name)
}

pub fn load_rate_path_from_reader<R: std::io::Read>(reader: R, name: &str) -> Result<RatePath> {
    let mut reader = Reader::from_reader(reader);
    let mut prior = None;
    let mut rates = Vec::new();

    for result in reader.deserialize() {
        let row: RateRow = result?;
        match row.observed.as_deref().map(str::trim) {
            Some("si") => {
                if prior.replace((row.date, row.rate)).is_some() {
                    return Err(ReturnError::invalid_input(format!(
                        "{name} rate path has more than one observed month"
                    )));
                }
            }
            None | Some("") | Some("no") => rates.push((row.date, row.rate)),
            Some(other) => {
                return Err(ReturnError::invalid_input(format!(
                    "{name} rate path: observado must be si or no, got {other}"
                )))
            }
        }
    }

    rates.sort_by_key(|(date, _)| *date);
    let path = RatePath::from_rates(name, rates)?;
    match prior {
        Some((date, rate)) => path.with_prior(date, rate),
        None => Ok(path),
    }
}

/// Load the rate survey: one row per month plus the `12m` average
pub fn load_survey(path: &Path) -> Result<RateSurvey> {
    load_survey_from_reader(std::fs::File::open(path)?)
}

pub fn load_survey_from_reader<R: std::io::Read>(reader: R) -> Result<RateSurvey> {
    let mut reader = Reader::from_reader(reader);
    let mut monthly = Vec::new();
    let mut twelve_month = None;

    for result in reader.deserialize() {
        let row: SurveyRow = result?;
        let period = row.period.trim();
        if period == TWELVE_MONTH_LABEL {
            if twelve_month.replace(row.average).is_some() {
                return Err(ReturnError::invalid_input("rate survey has more than one 12m row"));
            }
            continue;
        }
        let date = NaiveDate::parse_from_str(period, "%Y-%m-%d")
            .map_err(|e| ReturnError::invalid_input(format!("rate survey period `{period}`: {e}")))?;
        monthly.push((date, row.average));
    }

    let twelve_month =
        twelve_month.ok_or_else(|| ReturnError::invalid_input(format!("rate survey has no {TWELVE_MONTH_LABEL} row")))?;
    RateSurvey::new(monthly, twelve_month)
}

/// Short-rate path from `tasas.csv`, or built from the survey when only that is present
pub fn load_interest_path(dir: &Path) -> Result<RatePath> {
    let rates = dir.join(INTEREST_FILE);
    if rates.exists() {
        return load_rate_path(&rates, INTEREST_PATH);
    }
    let survey = dir.join(SURVEY_FILE);
    if survey.exists() {
        info!("{} not found, building the short rate from {}", INTEREST_FILE, SURVEY_FILE);
        return load_survey(&survey)?.to_path(INTEREST_PATH);
    }
    Err(ReturnError::invalid_input(format!(
        "{} has neither {INTEREST_FILE} nor {SURVEY_FILE}",
        dir.display()
    )))
}

/// Load a daily index series
pub fn load_index_series(path: &Path, name: &str, kind: SeriesKind) -> Result<IndexSeries> {
    load_index_series_from_reader(std::fs::File::open(path)?, name, kind)
}

pub fn load_index_series_from_reader<R: std::io::Read>(reader: R, name: &str, kind: SeriesKind) -> Result<IndexSeries> {
    let mut reader = Reader::from_reader(reader);
    let mut points = Vec::new();
    for result in reader.deserialize() {
        let row: SeriesRow = result?;
        points.push((row.date, row.level));
    }
    Ok(IndexSeries::new(name, kind, points))
}

/// Every market table found in a data directory
///
/// The inflation and devaluation paths are optional since they can be
/// derived from quotes instead.
#[derive(Debug, Clone)]
pub struct LoadedMarket {
    pub quotes: QuoteBook,
    pub interest: RatePath,
    pub inflation: Option<RatePath>,
    pub devaluation: Option<RatePath>,
    pub cpi_series: IndexSeries,
    pub fx_series: IndexSeries,
}

impl LoadedMarket {
    /// Load from the default data directory
    pub fn load_default() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_DATA_PATH), DurationUnit::default())
    }

    /// Load from a specific directory
    pub fn load_from(dir: &Path, unit: DurationUnit) -> Result<Self> {
        let optional_path = |file: &str, name: &str| -> Result<Option<RatePath>> {
            let path = dir.join(file);
            if path.exists() {
                load_rate_path(&path, name).map(Some)
            } else {
                Ok(None)
            }
        };

        let market = Self {
            quotes: load_quotes(&dir.join(CURVES_FILE), unit)?,
            interest: load_interest_path(dir)?,
            inflation: optional_path(INFLATION_FILE, INFLATION_PATH)?,
            devaluation: optional_path(DEVALUATION_FILE, DEVALUATION_PATH)?,
            cpi_series: load_index_series(&dir.join(CPI_SERIES_FILE), "CER", SeriesKind::Cpi)?,
            fx_series: load_index_series(&dir.join(FX_SERIES_FILE), "A3500", SeriesKind::Fx)?,
        };

        info!(
            "loaded market data from {}: {} quotes, {} interest months, CER series {} days, A3500 series {} days",
            dir.display(),
            market.quotes.quotes.len(),
            market.interest.points().len(),
            market.cpi_series.len(),
            market.fx_series.len()
        );
        Ok(market)
    }
}
