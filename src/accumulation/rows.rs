//! Accumulation output structures

use serde::{Deserialize, Serialize};

use crate::product::Envelope;

/// One year of the accumulation simulation. Immutable once produced; every
/// monetary field is rounded to 2 decimals at production.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccumulationRow {
    // Timing
    pub year: u32,
    pub age: u32,

    // Opening balances
    pub opening_capitalization: f64,
    pub opening_distribution: f64,
    pub opening_cash: f64,

    // Contributions
    pub gross_contribution: f64,
    pub entry_fees: f64,
    pub net_contribution: f64,
    pub tax_saved: f64,

    // Growth
    pub interest: f64,
    pub revaluation: f64,

    // Coupon served by the distribution share
    pub coupon_gross: f64,
    pub coupon_tax: f64,
    pub coupon_net: f64,

    // Annual social levy on interest (insured-fund life insurance)
    pub social_levy_on_interest: f64,

    // Reinvestment booked this year, applied next year
    pub pending_capitalization: f64,
    pub pending_distribution: f64,

    // Cession of the distribution holding at contractual maturity
    pub cession_triggered: bool,
    pub cession_gain_tax: f64,

    // Retirement-plan death-guarantee rider (informational, not in balance)
    pub theoretical_guarantee_capital: f64,
    pub degressive_guarantee_capital: f64,

    // Closing balances
    pub closing_capitalization: f64,
    pub closing_distribution: f64,
    pub closing_cash: f64,
    pub total_capital: f64,

    // Running totals
    pub cumulative_contributions: f64,
    pub latent_gain: f64,
    pub net_income_received: f64,
}

/// Summary totals over the whole accumulation phase, plus the carry-over
/// values the decumulation phase needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccumulationSummary {
    /// Simulated years
    pub years: u32,
    /// Final total capital
    pub capital_acquired: f64,
    /// Cumulative gross payments
    pub total_contributions: f64,
    /// Cost basis carried into decumulation (net invested + folded gains)
    pub tax_basis: f64,
    /// Cumulative tax saved on deductible contributions
    pub total_tax_saved: f64,
    /// Final latent gain
    pub latent_gain: f64,
    /// Net coupons received as income
    pub net_income_received: f64,
    /// Gross contributions net of tax saved and of income received
    pub net_effort: f64,
    /// Tax paid during accumulation (coupon tax, levies, cession tax)
    pub total_tax_paid: f64,
    /// Distribution yield rate, carried for the real-estate-fund payout phase
    pub distribution_yield_rate: f64,
    /// Revaluation rate, carried for the real-estate-fund payout phase
    pub revaluation_rate: f64,
    /// Graduated-scale election carried into decumulation
    pub scale_election: bool,
}

/// Complete accumulation result for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccumulationResult {
    pub envelope: Envelope,
    pub rows: Vec<AccumulationRow>,
    pub summary: AccumulationSummary,
}

impl AccumulationResult {
    /// Row matching a given age, if the age falls inside the horizon.
    pub fn row_at_age(&self, age: u32) -> Option<&AccumulationRow> {
        self.rows.iter().find(|r| r.age == age)
    }
}
