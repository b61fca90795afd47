//! Load the instrument universe from instrumentos.csv

use std::path::Path;

use chrono::NaiveDate;
use csv::Reader;
use log::warn;

use super::{Instrument, InstrumentKind, Linkage, MonthDay};
use crate::error::{Result, ReturnError};

/// Default file name of the reference table inside the data directory
pub const INSTRUMENTS_FILE: &str = "instrumentos.csv";

/// Raw CSV row matching the bond characteristics columns
#[derive(Debug, serde::Deserialize)]
struct CsvRow {
    #[serde(rename = "Ticket")]
    ticket: String,
    #[serde(rename = "cupon1")]
    cupon1: Option<String>,
    #[serde(rename = "cupon2")]
    cupon2: Option<String>,
    #[serde(rename = "f_vencimiento")]
    maturity: NaiveDate,
    #[serde(rename = "tasa_cupon_anual")]
    coupon_rate_pct: f64,
    #[serde(rename = "tipo_bono1")]
    kind: String,
    #[serde(rename = "tipo_bono2")]
    linkage: String,
    #[serde(rename = "tipo_bono3")]
    pays_coupon: u8,
    #[serde(rename = "indice_inicial")]
    issuance_index: Option<f64>,
    #[serde(rename = "tc_inicial")]
    issuance_fx: Option<f64>,
    #[serde(rename = "precio")]
    price: f64,
    #[serde(rename = "DUAL")]
    dual: String,
}

impl CsvRow {
    fn into_instrument(self) -> Result<Instrument> {
        let linkage = Linkage::from_tag(&self.linkage)?;

        let coupon_dates = match (non_empty(self.cupon1), non_empty(self.cupon2)) {
            (Some(c1), Some(c2)) => Some((c1.parse::<MonthDay>()?, c2.parse::<MonthDay>()?)),
            (None, None) => None,
            _ => {
                return Err(ReturnError::invalid_input(format!(
                    "{}: only one of cupon1/cupon2 is set",
                    self.ticket
                )))
            }
        };

        let pays_coupon_at_maturity = match self.pays_coupon {
            0 => false,
            1 => true,
            other => {
                return Err(ReturnError::invalid_input(format!(
                    "{}: tipo_bono3 must be 0 or 1, got {other}",
                    self.ticket
                )))
            }
        };

        let dual = match self.dual.trim() {
            "si" => true,
            "no" | "" => false,
            other => {
                return Err(ReturnError::invalid_input(format!(
                    "{}: DUAL must be si or no, got {other}",
                    self.ticket
                )))
            }
        };

        Ok(Instrument {
            ticket: self.ticket.trim().to_string(),
            coupon_dates,
            maturity: self.maturity,
            coupon_rate_pct: self.coupon_rate_pct,
            kind: InstrumentKind::from_tag(&self.kind),
            pays_coupon_at_maturity,
            linkage,
            issuance_index: self.issuance_index,
            issuance_fx: self.issuance_fx,
            price: self.price,
            dual,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A reference row that could not be turned into an instrument
#[derive(Debug)]
pub struct RejectedRow {
    pub ticket: String,
    pub error: ReturnError,
}

/// Parsed universe plus the rows that were rejected
#[derive(Debug, Default)]
pub struct InstrumentTable {
    pub instruments: Vec<Instrument>,
    pub rejected: Vec<RejectedRow>,
}

/// Load the reference table from a CSV file
pub fn load_instruments<P: AsRef<Path>>(path: P) -> Result<InstrumentTable> {
    let reader = Reader::from_path(path)?;
    read_table(reader)
}

/// Load the reference table from any reader (e.g. string buffer)
pub fn load_instruments_from_reader<R: std::io::Read>(reader: R) -> Result<InstrumentTable> {
    read_table(Reader::from_reader(reader))
}

/// Load `instrumentos.csv` from a data directory
pub fn load_instruments_from_dir(dir: &Path) -> Result<InstrumentTable> {
    load_instruments(dir.join(INSTRUMENTS_FILE))
}

fn read_table<R: std::io::Read>(mut reader: Reader<R>) -> Result<InstrumentTable> {
    let mut table = InstrumentTable::default();

    for result in reader.deserialize() {
        let row: CsvRow = result?;
        let ticket = row.ticket.trim().to_string();
        match row.into_instrument() {
            Ok(instrument) => table.instruments.push(instrument),
            Err(error) => {
                warn!("rejecting reference row {ticket}: {error}");
                table.rejected.push(RejectedRow { ticket, error });
            }
        }
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Ticket,cupon1,cupon2,f_vencimiento,tasa_cupon_anual,tipo_bono1,tipo_bono2,tipo_bono3,indice_inicial,tc_inicial,precio,DUAL
TX26,05-09,11-09,2026-11-09,2,bullet,CER,0,22.5,,950,no
S31M5,,,2025-03-31,0,letra,pesos,0,,,91.2,no
X99,,,2025-03-31,0,letra,UVA,0,,,91.2,no
";

    #[test]
    fn test_load_from_reader() {
        let table = load_instruments_from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.instruments.len(), 2);
        assert_eq!(table.rejected.len(), 1);
        assert_eq!(table.rejected[0].ticket, "X99");
        assert!(matches!(table.rejected[0].error, ReturnError::InvalidLinkageClass(_)));

        let tx26 = &table.instruments[0];
        assert_eq!(tx26.kind, InstrumentKind::Bullet);
        assert_eq!(tx26.linkage, Linkage::Cpi);
        assert_eq!(tx26.coupon_dates.unwrap().1, MonthDay { month: 11, day: 9 });
        assert_eq!(tx26.issuance_index, Some(22.5));
        assert_eq!(tx26.issuance_fx, None);

        let bill = &table.instruments[1];
        assert_eq!(bill.kind, InstrumentKind::ZeroCoupon);
        assert!(bill.coupon_dates.is_none());
        assert!(!bill.pays_coupon_at_maturity);
    }

    #[test]
    fn test_load_sample_data() {
        let table = load_instruments_from_dir(Path::new("data")).expect("Failed to load instruments");
        assert!(table.rejected.is_empty());
        assert!(table.instruments.len() >= 6);
        assert!(table.instruments.iter().any(|i| i.dual));
        assert!(table
            .instruments
            .iter()
            .any(|i| !i.kind.is_eligible()));
    }
}
