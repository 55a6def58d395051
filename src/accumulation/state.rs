//! Mutable state carried across accumulation years

use crate::product::ProductConfig;

/// Net coupon amounts booked one year and invested at the start of the next.
///
/// Threaded explicitly from one iteration to the next; the amounts sit in the
/// cash buffer until they are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PendingReinvestment {
    pub capitalization: f64,
    pub distribution: f64,
}

impl PendingReinvestment {
    pub fn is_empty(&self) -> bool {
        self.capitalization == 0.0 && self.distribution == 0.0
    }
}

/// State of one simulated product at a point in the accumulation phase.
#[derive(Debug, Clone)]
pub struct AccumulationState {
    /// Current simulation year (1-indexed)
    pub year: u32,

    /// Capitalization sub-account balance
    pub capitalization: f64,

    /// Distribution sub-account balance
    pub distribution: f64,

    /// Cash buffer (unrouted coupons, pending reinvestments, cession proceeds)
    pub cash: f64,

    /// Amount invested in the distribution share since the last cession
    /// (cost basis for the cession gain)
    pub distribution_basis: f64,

    /// Years the current distribution holding has been held (maturity counter)
    pub distribution_held_years: u32,

    /// Cumulative gross payments
    pub contributions: f64,

    /// Cost basis of the whole product: net invested amounts plus gains
    /// folded back into principal at cession
    pub tax_basis: f64,

    /// Cumulative tax saved on deductible contributions
    pub tax_saved: f64,

    /// Cumulative net coupons counted as income received
    pub net_income_received: f64,

    /// Cumulative tax paid during accumulation (coupon tax, annual levy,
    /// cession gain tax)
    pub tax_paid: f64,

    /// Reinvestment booked last year, applied at the start of this year
    pub pending: PendingReinvestment,
}

impl AccumulationState {
    pub fn new() -> Self {
        Self {
            year: 0,
            capitalization: 0.0,
            distribution: 0.0,
            cash: 0.0,
            distribution_basis: 0.0,
            distribution_held_years: 0,
            contributions: 0.0,
            tax_basis: 0.0,
            tax_saved: 0.0,
            net_income_received: 0.0,
            tax_paid: 0.0,
            pending: PendingReinvestment::default(),
        }
    }

    /// Total capital across the three buckets.
    pub fn total_capital(&self) -> f64 {
        self.capitalization + self.distribution + self.cash
    }

    /// Latent (unrealized) gain over the cost basis.
    pub fn latent_gain(&self) -> f64 {
        (self.total_capital() - self.tax_basis).max(0.0)
    }

    /// Move to the next year. The pending reinvestment handed in becomes
    /// next year's opening pending value.
    pub fn advance_year(&mut self, booked: PendingReinvestment) {
        self.year += 1;
        self.pending = booked;
    }

    /// Client age at the current simulation year.
    pub fn age(&self, starting_age: u32) -> u32 {
        starting_age + self.year.saturating_sub(1)
    }

    /// Whether the distribution holding reaches its contractual maturity
    /// this year.
    pub fn maturity_reached(&self, product: &ProductConfig) -> bool {
        match product.maturity_years {
            Some(m) if m > 0 => self.distribution > 0.0 && self.distribution_held_years >= m,
            _ => false,
        }
    }
}

impl Default for AccumulationState {
    fn default() -> Self {
        Self::new()
    }
}
