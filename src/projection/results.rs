//! Per-instrument returns and the final ranked table

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ReturnError};
use crate::instrument::{Linkage, DUAL_SEPARATOR};

/// Round to two decimals
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Percentage split of total proceeds; the capital share absorbs rounding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnShares {
    pub coupons: f64,
    pub reinvestment: f64,
    pub capital: f64,
}

impl ReturnShares {
    pub fn from_amounts(ticket: &str, coupons: f64, reinvestment: f64, capital: f64) -> Result<Self> {
        let proceeds = coupons + reinvestment + capital;
        if !proceeds.is_finite() || proceeds.abs() < f64::EPSILON {
            return Err(ReturnError::DegenerateReturn {
                ticket: ticket.to_string(),
                reason: format!("total proceeds are {proceeds}"),
            });
        }
        let coupons = round2(coupons / proceeds * 100.0);
        let reinvestment = round2(reinvestment / proceeds * 100.0);
        Ok(Self {
            coupons,
            reinvestment,
            capital: round2(100.0 - coupons - reinvestment),
        })
    }

    pub fn sum(&self) -> f64 {
        self.coupons + self.reinvestment + self.capital
    }
}

/// Full decomposition for one instrument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentReturn {
    pub ticket: String,
    pub linkage: Linkage,
    pub dual: bool,
    /// Nominal units bought
    pub nominal: f64,
    pub coupons: f64,
    pub principal: f64,
    pub reinvestment: f64,
    /// Collected principal when held to maturity, otherwise the resale price
    pub capital_or_resale: f64,
    pub held_to_maturity: bool,
    pub proceeds: f64,
    /// Holding-period return
    pub total_return: f64,
    pub annualized_return: f64,
    pub shares: ReturnShares,
}

impl InstrumentReturn {
    /// Text before the dual separator, or the whole ticket
    pub fn root_ticket(&self) -> &str {
        self.ticket
            .split_once(DUAL_SEPARATOR)
            .map(|(root, _)| root)
            .unwrap_or(&self.ticket)
    }

    pub fn record(&self) -> ReturnRecord {
        ReturnRecord {
            ticket: self.ticket.clone(),
            annualized_return_pct: round2(self.annualized_return * 100.0),
            coupon_share: self.shares.coupons,
            reinvestment_share: self.shares.reinvestment,
            capital_share: self.shares.capital,
        }
    }
}

/// Output row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRecord {
    #[serde(rename = "Ticket")]
    pub ticket: String,
    #[serde(rename = "RT_Anual_Esp")]
    pub annualized_return_pct: f64,
    #[serde(rename = "Cupones")]
    pub coupon_share: f64,
    #[serde(rename = "Int_Reinv")]
    pub reinvestment_share: f64,
    #[serde(rename = "Capital_o_Reventa")]
    pub capital_share: f64,
}

/// An instrument dropped from the table and why
#[derive(Debug)]
pub struct InstrumentFailure {
    pub ticket: String,
    pub error: ReturnError,
}

/// Ranked returns plus everything that did not make it
#[derive(Debug, Default)]
pub struct ReturnTable {
    /// Sorted by annualized return, highest first
    pub returns: Vec<InstrumentReturn>,
    pub failures: Vec<InstrumentFailure>,
    /// Tickets with a structure the engine does not value
    pub skipped: Vec<String>,
    /// Tickets of reference rows that never became instruments
    pub rejected: Vec<String>,
}

impl ReturnTable {
    /// Collapse dual families and rank
    pub fn from_returns(
        returns: Vec<InstrumentReturn>,
        mut failures: Vec<InstrumentFailure>,
        skipped: Vec<String>,
    ) -> Self {
        let (duals, mut kept): (Vec<_>, Vec<_>) = returns.into_iter().partition(|r| r.dual);

        let mut order: Vec<String> = Vec::new();
        let mut families: HashMap<String, Vec<InstrumentReturn>> = HashMap::new();
        for r in duals {
            let root = r.root_ticket().to_string();
            if !families.contains_key(&root) {
                order.push(root.clone());
            }
            families.entry(root).or_default().push(r);
        }

        for root in order {
            let members = families.remove(&root).unwrap_or_default();
            match pick_dual(members) {
                Ok(best) => kept.push(best),
                Err(members) => {
                    let count = members.len();
                    warn!("dropping dual family {root}: {count} priced member(s) instead of a CER/DL pair");
                    failures.extend(members.into_iter().map(|m| InstrumentFailure {
                        ticket: m.ticket,
                        error: ReturnError::UnpairedDualInstrument {
                            root: root.clone(),
                            count,
                        },
                    }));
                }
            }
        }

        kept.sort_by(|a, b| b.annualized_return.total_cmp(&a.annualized_return));

        Self {
            returns: kept,
            failures,
            skipped,
            rejected: Vec::new(),
        }
    }

    pub fn with_rejected(mut self, rejected: Vec<String>) -> Self {
        self.rejected = rejected;
        self
    }

    pub fn records(&self) -> Vec<ReturnRecord> {
        self.returns.iter().map(InstrumentReturn::record).collect()
    }

    /// Write the ranked table as CSV
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in self.records() {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            ranked: self.returns.len(),
            failed: self.failures.len(),
            skipped: self.skipped.len(),
            rejected: self.rejected.len(),
            best: self.returns.first().map(|r| (r.ticket.clone(), r.annualized_return)),
        }
    }
}

/// Counts for logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub ranked: usize,
    pub failed: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub best: Option<(String, f64)>,
}

/// Keep the higher-return leg of a CER/DL pair; ties keep the first listed
fn pick_dual(members: Vec<InstrumentReturn>) -> std::result::Result<InstrumentReturn, Vec<InstrumentReturn>> {
    let [first, second]: [InstrumentReturn; 2] = members.try_into()?;
    let legs = (first.linkage, second.linkage);
    if !matches!(legs, (Linkage::DualCpi, Linkage::Fx) | (Linkage::Fx, Linkage::DualCpi)) {
        return Err(vec![first, second]);
    }
    Ok(if second.annualized_return > first.annualized_return {
        second
    } else {
        first
    })
}
