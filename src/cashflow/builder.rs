//! Lifetime cash-flow schedules for bullets and bills

use chrono::{Datelike, NaiveDate};
use log::debug;

use super::schedule::{CashflowRow, CashflowSchedule, FlowKind, HorizonSplit};
use crate::error::{Result, ReturnError};
use crate::instrument::{Instrument, InstrumentKind, NOMINAL_BASE};

/// Builds schedules between a valuation date and a horizon
#[derive(Debug, Clone, Copy)]
pub struct CashflowBuilder {
    valuation: NaiveDate,
    horizon: NaiveDate,
    face: f64,
}

impl CashflowBuilder {
    /// Builder for face [`NOMINAL_BASE`]
    pub fn new(valuation: NaiveDate, horizon: NaiveDate) -> Result<Self> {
        if horizon <= valuation {
            return Err(ReturnError::InvalidHorizon { horizon, valuation });
        }
        Ok(Self {
            valuation,
            horizon,
            face: NOMINAL_BASE,
        })
    }

    pub fn with_face(mut self, face: f64) -> Self {
        self.face = face;
        self
    }

    pub fn valuation(&self) -> NaiveDate {
        self.valuation
    }

    pub fn horizon(&self) -> NaiveDate {
        self.horizon
    }

    /// Full schedule: anchor row, events through maturity, horizon row
    pub fn build(&self, instrument: &Instrument) -> Result<CashflowSchedule> {
        if instrument.maturity <= self.valuation {
            return Err(ReturnError::invalid_input(format!(
                "{} matured on {}, before the valuation date {}",
                instrument.ticket, instrument.maturity, self.valuation
            )));
        }

        let mut rows = match &instrument.kind {
            InstrumentKind::Bullet => self.bullet_rows(instrument)?,
            InstrumentKind::ZeroCoupon => self.zero_coupon_rows(instrument),
            InstrumentKind::Other(tag) => return Err(ReturnError::InvalidInstrumentKind(tag.clone())),
        };

        if !rows.iter().any(|r| r.date == self.horizon) {
            let at = rows.partition_point(|r| r.date < self.horizon);
            rows.insert(at, CashflowRow::zero(self.horizon, FlowKind::Horizon));
        }

        debug!("{}: {} schedule rows", instrument.ticket, rows.len());
        CashflowSchedule::new(rows)
    }

    /// Full schedule split at the horizon
    pub fn build_split(&self, instrument: &Instrument) -> Result<HorizonSplit> {
        self.build(instrument)?.split_at(self.horizon)
    }

    fn bullet_rows(&self, instrument: &Instrument) -> Result<Vec<CashflowRow>> {
        let (first, second) = instrument.coupon_dates.ok_or_else(|| {
            ReturnError::invalid_input(format!("{} is a bullet without coupon dates", instrument.ticket))
        })?;

        let mut dates = Vec::new();
        for year in self.valuation.year()..=instrument.maturity.year() {
            for md in [first, second] {
                let date = md.in_year(year)?;
                if date >= self.valuation && date <= instrument.maturity {
                    dates.push(date);
                }
            }
        }
        dates.sort();
        dates.dedup();

        let coupon = self.face * instrument.coupon_rate_pct / 100.0 / 2.0;
        let mut rows = vec![CashflowRow::zero(self.valuation, FlowKind::Anchor)];
        rows.extend(dates.into_iter().filter(|d| *d != self.valuation).map(|date| CashflowRow {
            date,
            kind: FlowKind::Coupon,
            coupon,
            principal: 0.0,
        }));

        match rows.last_mut() {
            Some(last) if last.date == instrument.maturity => {
                last.kind = FlowKind::CouponAndPrincipal;
                last.principal = self.face;
            }
            _ => rows.push(CashflowRow {
                date: instrument.maturity,
                kind: FlowKind::Principal,
                coupon: 0.0,
                principal: self.face,
            }),
        }

        Ok(rows)
    }

    fn zero_coupon_rows(&self, instrument: &Instrument) -> Vec<CashflowRow> {
        let (kind, coupon) = if instrument.pays_coupon_at_maturity {
            (FlowKind::CouponAndPrincipal, self.face * instrument.coupon_rate_pct / 100.0)
        } else {
            (FlowKind::Principal, 0.0)
        };
        vec![
            CashflowRow::zero(self.valuation, FlowKind::Anchor),
            CashflowRow {
                date: instrument.maturity,
                kind,
                coupon,
                principal: self.face,
            },
        ]
    }
}
