//! Product and client data structures

use serde::{Deserialize, Serialize};

/// The wrapper/contract type holding the investment.
///
/// Every tax-treatment branch in the three simulation phases matches
/// exhaustively on this enum, so adding a rule for one envelope cannot
/// silently omit another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Envelope {
    /// Life-insurance contract (assurance vie)
    LifeInsurance,
    /// Retirement plan (PER)
    RetirementPlan,
    /// Tax-advantaged equity account (PEA)
    EquitySavings,
    /// Ordinary securities account (CTO)
    SecuritiesAccount,
    /// Real-estate fund share (SCPI)
    RealEstateFund,
}

impl Envelope {
    /// The real-estate fund has no capitalization sub-account: every payment
    /// goes to the distribution share and the capitalization balance is
    /// forced to zero at every point of the simulation.
    pub fn forces_full_distribution(&self) -> bool {
        matches!(self, Envelope::RealEstateFund)
    }

    /// Whether investment gains were already taxed year by year during
    /// accumulation. Envelopes whose gains were NOT taxed annually owe the
    /// social levy on the latent gain at death.
    pub fn gains_taxed_annually(&self) -> bool {
        matches!(
            self,
            Envelope::SecuritiesAccount | Envelope::RealEstateFund | Envelope::RetirementPlan
        )
    }

    /// Insurance-wrapped envelopes follow the life-insurance death-benefit
    /// articles rather than standard inheritance duty.
    pub fn is_insurance_wrapped(&self) -> bool {
        matches!(self, Envelope::LifeInsurance | Envelope::RetirementPlan)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Envelope::LifeInsurance => "life-insurance",
            Envelope::RetirementPlan => "retirement-plan",
            Envelope::EquitySavings => "equity-savings",
            Envelope::SecuritiesAccount => "securities-account",
            Envelope::RealEstateFund => "real-estate-fund",
        }
    }
}

/// Household status of the client, selects the life-insurance abatement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Household {
    Single,
    Couple,
}

/// What to do with the net coupon paid by the distribution share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistributionStrategy {
    /// Counted as net income received by the client
    Withdraw,
    /// Booked as pending reinvestment into the capitalization share
    ReinvestCapitalization,
    /// Booked as pending reinvestment into the distribution share
    ReinvestDistribution,
    /// Accumulates in the cash buffer
    HoldCash,
}

/// Destination of the proceeds when a distribution-share holding reaches its
/// contractual maturity (cession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CessionTarget {
    Capitalization,
    Cash,
}

impl Default for CessionTarget {
    fn default() -> Self {
        CessionTarget::Capitalization
    }
}

/// A one-off payment scheduled for a given simulation year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneOffPayment {
    /// Target simulation year (1-indexed)
    pub year: u32,
    /// Gross amount paid
    pub amount: f64,
    /// Entry fee rate on this payment
    #[serde(default)]
    pub entry_fee_rate: f64,
    /// Capitalization share of the net amount
    #[serde(default)]
    pub capitalization_ratio: f64,
    /// Distribution share of the net amount
    #[serde(default)]
    pub distribution_ratio: f64,
}

/// Payment plan for the accumulation phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSchedule {
    /// Initial lump sum paid in year 1
    pub initial_payment: f64,
    /// Recurring payment made every year
    pub annual_payment: f64,
    /// One-off payments, each tagged with its target year
    #[serde(default)]
    pub one_off_payments: Vec<OneOffPayment>,
    /// Entry fee rate applied to the initial and recurring payments
    #[serde(default)]
    pub entry_fee_rate: f64,
    /// Default capitalization share of initial and recurring payments
    #[serde(default = "default_capitalization_ratio")]
    pub capitalization_ratio: f64,
    /// Default distribution share of initial and recurring payments
    #[serde(default)]
    pub distribution_ratio: f64,
}

fn default_capitalization_ratio() -> f64 {
    1.0
}

impl PaymentSchedule {
    /// Lump-sum-only schedule, 100% capitalization, no fees.
    pub fn lump_sum(amount: f64) -> Self {
        Self {
            initial_payment: amount,
            annual_payment: 0.0,
            one_off_payments: Vec::new(),
            entry_fee_rate: 0.0,
            capitalization_ratio: 1.0,
            distribution_ratio: 0.0,
        }
    }
}

/// Read-only client profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientProfile {
    /// Current age at the start of accumulation
    pub age: u32,
    /// Marginal income-tax rate (TMI), clamped to [0, 1] at use
    pub marginal_tax_rate: f64,
    /// Household status
    pub household: Household,
}

/// Full product configuration for one envelope simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    pub envelope: Envelope,
    pub schedule: PaymentSchedule,
    /// Accumulation horizon in years
    pub years: u32,
    /// Annual yield of the capitalization share (compounds silently)
    pub capitalization_rate: f64,
    /// Annual revaluation rate of the distribution share (price growth)
    #[serde(default)]
    pub revaluation_rate: f64,
    /// Annual coupon rate served by the distribution share
    #[serde(default)]
    pub distribution_yield_rate: f64,
    /// Contractual delay (months) before newly invested distribution-share
    /// money starts earning the coupon
    #[serde(default)]
    pub jouissance_delay_months: u32,
    /// Routing of the net coupon
    #[serde(default = "default_distribution_strategy")]
    pub distribution_strategy: DistributionStrategy,
    /// Fixed product maturity in years; reaching it triggers a cession of the
    /// distribution share
    #[serde(default)]
    pub maturity_years: Option<u32>,
    /// Where cession proceeds go
    #[serde(default)]
    pub cession_target: CessionTarget,
    /// Retirement-plan guaranteed-minimum-payout rider
    #[serde(default)]
    pub guaranteed_minimum_rider: bool,
    /// Graduated-scale election: coupon and gain taxation at the marginal
    /// rate instead of the flat rate (securities account, real-estate fund)
    #[serde(default)]
    pub scale_election: bool,
}

fn default_distribution_strategy() -> DistributionStrategy {
    DistributionStrategy::HoldCash
}

impl ProductConfig {
    /// Lump-sum capitalization product, the most common case.
    pub fn new(envelope: Envelope, amount: f64, years: u32, capitalization_rate: f64) -> Self {
        Self {
            envelope,
            schedule: PaymentSchedule::lump_sum(amount),
            years,
            capitalization_rate,
            revaluation_rate: 0.0,
            distribution_yield_rate: 0.0,
            jouissance_delay_months: 0,
            distribution_strategy: DistributionStrategy::HoldCash,
            maturity_years: None,
            cession_target: CessionTarget::Capitalization,
            guaranteed_minimum_rider: false,
            scale_election: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_predicates() {
        assert!(Envelope::RealEstateFund.forces_full_distribution());
        assert!(!Envelope::LifeInsurance.forces_full_distribution());

        assert!(!Envelope::LifeInsurance.gains_taxed_annually());
        assert!(!Envelope::EquitySavings.gains_taxed_annually());
        assert!(Envelope::SecuritiesAccount.gains_taxed_annually());

        assert!(Envelope::RetirementPlan.is_insurance_wrapped());
        assert!(!Envelope::EquitySavings.is_insurance_wrapped());
    }

    #[test]
    fn test_schedule_deserializes_with_defaults() {
        let schedule: PaymentSchedule =
            serde_json::from_str(r#"{"initial_payment": 10000.0, "annual_payment": 1200.0}"#)
                .unwrap();
        assert_eq!(schedule.capitalization_ratio, 1.0);
        assert_eq!(schedule.entry_fee_rate, 0.0);
        assert!(schedule.one_off_payments.is_empty());
    }
}
