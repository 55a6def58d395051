//! Decumulation output structures

use serde::{Deserialize, Serialize};

use crate::product::Envelope;

/// One year of the withdrawal phase. Monetary fields rounded to 2 decimals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRow {
    pub year: u32,
    pub age: u32,

    pub opening_capital: f64,
    pub growth: f64,

    pub gross_withdrawal: f64,
    /// Return-of-capital portion of the withdrawal
    pub part_capital: f64,
    /// Gain portion of the withdrawal
    pub part_gain: f64,

    pub income_tax: f64,
    pub social_levy: f64,
    pub total_tax: f64,
    pub net_withdrawal: f64,

    pub closing_capital: f64,

    /// Marks the row matching the assumed age of death
    pub is_death_year: bool,
}

/// Totals over the withdrawal phase. The `*_until_death` figures are
/// truncated exactly at the assumed age of death and feed the transmission
/// phase; the others cover the full requested horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecumulationSummary {
    pub years: u32,
    pub total_gross_withdrawn: f64,
    pub total_net_withdrawn: f64,
    pub total_tax: f64,

    pub net_income_until_death: f64,
    pub tax_until_death: f64,
    /// Capital remaining at the assumed age of death
    pub capital_at_death: f64,
    /// Cost basis remaining at the assumed age of death
    pub basis_at_death: f64,

    /// Cumulative life-insurance abatement actually used
    pub abatement_used: f64,
}

impl DecumulationSummary {
    /// All-zero summary for the death-during-accumulation case.
    pub fn zeroed() -> Self {
        Self {
            years: 0,
            total_gross_withdrawn: 0.0,
            total_net_withdrawn: 0.0,
            total_tax: 0.0,
            net_income_until_death: 0.0,
            tax_until_death: 0.0,
            capital_at_death: 0.0,
            basis_at_death: 0.0,
            abatement_used: 0.0,
        }
    }
}

/// Complete decumulation result for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecumulationResult {
    pub envelope: Envelope,
    pub rows: Vec<WithdrawalRow>,
    pub summary: DecumulationSummary,
}

impl DecumulationResult {
    /// Empty result used when death occurs during accumulation.
    pub fn empty(envelope: Envelope) -> Self {
        Self { envelope, rows: Vec::new(), summary: DecumulationSummary::zeroed() }
    }
}
