//! Resolved fiscal parameter record
//!
//! A flat, fully-populated set of numeric tax parameters. The simulators
//! never touch raw configuration; they only ever see this record.

use serde::{Deserialize, Serialize};

/// Flat record of every tax parameter the three phases need.
///
/// Always fully populated: any field that cannot be resolved from raw
/// configuration falls back to the documented default below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalParameters {
    /// Social levy rate (prélèvements sociaux)
    pub social_levy_rate: f64,
    /// Flat-tax income component on investment gains (PFU, IR part)
    pub flat_tax_ir_rate: f64,

    /// Life insurance: income-tax rate on gains withdrawn before 8 years
    pub li_ir_rate_before_8y: f64,
    /// Life insurance: rate after 8 years, premiums under the threshold
    pub li_ir_rate_after_8y_low: f64,
    /// Life insurance: rate after 8 years, premiums over the threshold
    pub li_ir_rate_after_8y_high: f64,
    /// Life insurance: premium threshold splitting the two post-8-year rates
    pub li_premium_threshold: f64,
    /// Life insurance: annual abatement on withdrawn gains, single
    pub li_abatement_single: f64,
    /// Life insurance: annual abatement on withdrawn gains, couple
    pub li_abatement_couple: f64,

    /// Death benefit, payments before 70: allowance per beneficiary
    pub death_pre70_allowance: f64,
    /// Death benefit, payments before 70: first-bracket rate
    pub death_pre70_bracket1_rate: f64,
    /// Death benefit, payments before 70: first-bracket limit (per beneficiary)
    pub death_pre70_bracket1_limit: f64,
    /// Death benefit, payments before 70: second-bracket rate
    pub death_pre70_bracket2_rate: f64,
    /// Death benefit, payments at/after 70: global allowance
    pub death_post70_allowance: f64,

    /// Standard inheritance-duty (DMTG) rate applied when no envelope
    /// regime overrides it
    pub dmtg_rate: f64,

    /// Retirement plan: flat rate on the gain portion of withdrawals
    pub per_gain_flat_rate: f64,

    /// Equity savings: holding period (years) after which gains are exempt
    /// from income tax
    pub equity_savings_exemption_years: f64,

    /// Dividend allowance under the graduated-scale election
    pub dividend_allowance_rate: f64,
}

impl Default for FiscalParameters {
    fn default() -> Self {
        Self {
            social_levy_rate: 0.172,
            flat_tax_ir_rate: 0.128,
            li_ir_rate_before_8y: 0.128,
            li_ir_rate_after_8y_low: 0.075,
            li_ir_rate_after_8y_high: 0.128,
            li_premium_threshold: 150_000.0,
            li_abatement_single: 4_600.0,
            li_abatement_couple: 9_200.0,
            death_pre70_allowance: 152_500.0,
            death_pre70_bracket1_rate: 0.20,
            death_pre70_bracket1_limit: 700_000.0,
            death_pre70_bracket2_rate: 0.3125,
            death_post70_allowance: 30_500.0,
            dmtg_rate: 0.20,
            per_gain_flat_rate: 0.128,
            equity_savings_exemption_years: 5.0,
            dividend_allowance_rate: 0.40,
        }
    }
}

impl FiscalParameters {
    /// Combined flat-tax rate (income component + social levy).
    pub fn flat_tax_total(&self) -> f64 {
        self.flat_tax_ir_rate + self.social_levy_rate
    }

    /// Annual life-insurance abatement for a household status.
    pub fn li_abatement(&self, couple: bool) -> f64 {
        if couple {
            self.li_abatement_couple
        } else {
            self.li_abatement_single
        }
    }
}
