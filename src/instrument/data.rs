//! Instrument reference data matching the bond characteristics table

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ReturnError};
use crate::market::CurveClass;

/// Nominal amount quoted prices refer to
pub const NOMINAL_BASE: f64 = 100.0;

/// Separator between the root ticket and the valuation suffix of dual instruments
pub const DUAL_SEPARATOR: char = '-';

/// Month/day pair of a recurring coupon date (e.g. `05-09`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthDay {
    pub month: u32,
    pub day: u32,
}

impl MonthDay {
    pub fn new(month: u32, day: u32) -> Result<Self> {
        // 2000 is a leap year, so 02-29 is accepted here and rejected per year later
        if NaiveDate::from_ymd_opt(2000, month, day).is_none() {
            return Err(ReturnError::invalid_input(format!(
                "coupon date {month:02}-{day:02} is not a calendar day"
            )));
        }
        Ok(Self { month, day })
    }

    /// This coupon date in `year`
    pub fn in_year(&self, year: i32) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day).ok_or_else(|| {
            ReturnError::DateAlignment(format!("{year}-{self} does not exist"))
        })
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}", self.month, self.day)
    }
}

impl FromStr for MonthDay {
    type Err = ReturnError;

    fn from_str(s: &str) -> Result<Self> {
        let (month, day) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| ReturnError::invalid_input(format!("coupon date `{s}` is not MM-DD")))?;
        let month = month
            .parse()
            .map_err(|_| ReturnError::invalid_input(format!("coupon date `{s}` has a bad month")))?;
        let day = day
            .parse()
            .map_err(|_| ReturnError::invalid_input(format!("coupon date `{s}` has a bad day")))?;
        MonthDay::new(month, day)
    }
}

impl TryFrom<String> for MonthDay {
    type Error = ReturnError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<MonthDay> for String {
    fn from(value: MonthDay) -> Self {
        value.to_string()
    }
}

/// Payment structure of the instrument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentKind {
    /// Two coupons a year, full principal at maturity
    Bullet,
    /// Single payment at maturity (bill), optionally with one coupon
    ZeroCoupon,
    /// Any other structure in the reference table (amortizing, etc.)
    Other(String),
}

impl InstrumentKind {
    /// Parse the `tipo_bono1` tag
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim() {
            "bullet" => InstrumentKind::Bullet,
            "letra" => InstrumentKind::ZeroCoupon,
            other => InstrumentKind::Other(other.to_string()),
        }
    }

    /// Whether the return engine can build cash flows for this kind
    pub fn is_eligible(&self) -> bool {
        matches!(self, InstrumentKind::Bullet | InstrumentKind::ZeroCoupon)
    }

    pub fn as_str(&self) -> &str {
        match self {
            InstrumentKind::Bullet => "bullet",
            InstrumentKind::ZeroCoupon => "letra",
            InstrumentKind::Other(tag) => tag,
        }
    }
}

/// Index linkage of the cash flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Linkage {
    /// Plain pesos
    None,
    /// Adjusted by the CER inflation index
    Cpi,
    /// Adjusted by the A3500 exchange rate
    Fx,
    /// Dual instrument valued on its CER leg (USD face converted at issuance FX)
    DualCpi,
}

impl Linkage {
    /// Parse the `tipo_bono2` tag
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.trim() {
            "pesos" => Ok(Linkage::None),
            "CER" => Ok(Linkage::Cpi),
            "DL" => Ok(Linkage::Fx),
            "DUAL-CER" => Ok(Linkage::DualCpi),
            other => Err(ReturnError::InvalidLinkageClass(other.to_string())),
        }
    }

    /// Curve the post-horizon flows are discounted on
    pub fn curve_class(&self) -> CurveClass {
        match self {
            Linkage::None => CurveClass::Peso,
            Linkage::Cpi | Linkage::DualCpi => CurveClass::Cpi,
            Linkage::Fx => CurveClass::Fx,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Linkage::None => "pesos",
            Linkage::Cpi => "CER",
            Linkage::Fx => "DL",
            Linkage::DualCpi => "DUAL-CER",
        }
    }
}

/// A single instrument from the reference table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// Ticket (unique key)
    pub ticket: String,

    /// Semiannual coupon dates; absent for bills
    pub coupon_dates: Option<(MonthDay, MonthDay)>,

    /// Final maturity
    pub maturity: NaiveDate,

    /// Annual coupon rate in percent (e.g. 8.0)
    pub coupon_rate_pct: f64,

    /// Payment structure
    pub kind: InstrumentKind,

    /// Bills only: whether a coupon is paid together with principal
    pub pays_coupon_at_maturity: bool,

    /// Index linkage
    pub linkage: Linkage,

    /// CER index level at issuance (CPI-linked and dual)
    pub issuance_index: Option<f64>,

    /// A3500 rate at issuance (dual)
    pub issuance_fx: Option<f64>,

    /// Quoted price per [`NOMINAL_BASE`] nominal
    pub price: f64,

    /// Listed twice, once per valuation leg
    pub dual: bool,
}

impl Instrument {
    /// Bullet bond with the given coupon dates
    pub fn bullet(
        ticket: &str,
        coupon_dates: (MonthDay, MonthDay),
        maturity: NaiveDate,
        coupon_rate_pct: f64,
        linkage: Linkage,
        price: f64,
    ) -> Self {
        Self {
            ticket: ticket.to_string(),
            coupon_dates: Some(coupon_dates),
            maturity,
            coupon_rate_pct,
            kind: InstrumentKind::Bullet,
            pays_coupon_at_maturity: false,
            linkage,
            issuance_index: None,
            issuance_fx: None,
            price,
            dual: false,
        }
    }

    /// Bill paying principal (and optionally one coupon) at maturity
    pub fn bill(ticket: &str, maturity: NaiveDate, coupon_rate_pct: f64, linkage: Linkage, price: f64) -> Self {
        Self {
            ticket: ticket.to_string(),
            coupon_dates: None,
            maturity,
            coupon_rate_pct,
            kind: InstrumentKind::ZeroCoupon,
            pays_coupon_at_maturity: coupon_rate_pct != 0.0,
            linkage,
            issuance_index: None,
            issuance_fx: None,
            price,
            dual: false,
        }
    }

    pub fn with_issuance_index(mut self, index: f64) -> Self {
        self.issuance_index = Some(index);
        self
    }

    pub fn with_issuance_fx(mut self, fx: f64) -> Self {
        self.issuance_fx = Some(fx);
        self
    }

    pub fn as_dual(mut self) -> Self {
        self.dual = true;
        self
    }

    /// Text before the dual separator, or the whole ticket
    pub fn root_ticket(&self) -> &str {
        self.ticket
            .split_once(DUAL_SEPARATOR)
            .map(|(root, _)| root)
            .unwrap_or(&self.ticket)
    }

    /// Nominal units bought with `invested` at the quoted price
    pub fn nominal_for(&self, invested: f64) -> Result<f64> {
        if !(self.price.is_finite() && self.price > 0.0) {
            return Err(ReturnError::invalid_input(format!(
                "{}: quoted price {} is not positive",
                self.ticket, self.price
            )));
        }
        Ok(invested / self.price * NOMINAL_BASE)
    }

    /// Issuance CER level, required for CPI-linked valuation
    pub fn require_issuance_index(&self) -> Result<f64> {
        match self.issuance_index {
            Some(v) if v > 0.0 => Ok(v),
            _ => Err(ReturnError::invalid_input(format!(
                "{}: CPI-linked instrument needs a positive indice_inicial",
                self.ticket
            ))),
        }
    }

    /// Issuance FX rate, required for dual valuation
    pub fn require_issuance_fx(&self) -> Result<f64> {
        match self.issuance_fx {
            Some(v) if v > 0.0 => Ok(v),
            _ => Err(ReturnError::invalid_input(format!(
                "{}: dual instrument needs a positive tc_inicial",
                self.ticket
            ))),
        }
    }
}
