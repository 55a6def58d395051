//! Transmission on death: envelope-specific death-benefit regimes
//!
//! Computes the tax due and the net capital passed to beneficiaries, given
//! the capital present at death, the envelope and the beneficiary
//! configuration.

use serde::{Deserialize, Serialize};

use crate::fiscal::FiscalParameters;
use crate::money::{coerce_amount, round2};
use crate::product::Envelope;

/// Relationship class of the beneficiaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeneficiaryKind {
    /// Spouse or registered partner: full statutory exemption
    SpousePartner,
    /// Children or other heirs taxed under the applicable regime
    Heir,
}

/// Which statutory regime applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransmissionRegime {
    /// Spouse/partner beneficiary: zero tax whatever the envelope
    SpouseExemption,
    /// Insurance death benefit, payments before 70: per-beneficiary
    /// allowance then the two-bracket flat schedule
    PreSeventyFlatSchedule,
    /// Insurance death benefit, payments at/after 70: global allowance then
    /// standard inheritance duty
    PostSeventyAllowance,
    /// No envelope regime: standard inheritance duty on the full amount
    StandardInheritanceDuty,
}

impl TransmissionRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransmissionRegime::SpouseExemption => "spouse-exemption",
            TransmissionRegime::PreSeventyFlatSchedule => "pre-70-flat-schedule",
            TransmissionRegime::PostSeventyAllowance => "post-70-allowance",
            TransmissionRegime::StandardInheritanceDuty => "standard-inheritance-duty",
        }
    }
}

/// Inputs of the transmission computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmissionParams {
    pub envelope: Envelope,
    /// Capital present at the assumed age of death. Filled in by the
    /// orchestrator when part of a full-lifecycle run.
    #[serde(default)]
    pub capital_at_death: f64,
    /// Cumulative contributions (cost basis) at death
    #[serde(default)]
    pub contributions: f64,
    /// Assumed age of death
    pub death_age: u32,
    /// Age at which the first payment was made (before/after 70 branch)
    pub age_at_first_payment: u32,
    /// Number of beneficiaries sharing the capital
    pub beneficiary_count: u32,
    pub beneficiary: BeneficiaryKind,
    /// Banking sub-variant of the retirement plan: standard inheritance
    /// duty, no insurance allowance
    #[serde(default)]
    pub banking_retirement_plan: bool,
}

/// Tax due and net capital transmitted on death.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmissionResult {
    pub regime: TransmissionRegime,
    pub allowance: f64,
    pub taxable_base: f64,
    /// Tax from the two-bracket flat schedule (pre-70 regime)
    pub flat_schedule_tax: f64,
    /// Tax at the standard inheritance-duty rate
    pub inheritance_duty: f64,
    pub total_tax: f64,
    /// Social levy due at death on the never-taxed latent gain
    pub social_levy_on_death: f64,
    pub net_transmitted: f64,
}

/// Compute the death-benefit taxation for one envelope.
pub fn compute_transmission(
    params: &TransmissionParams,
    fiscal: &FiscalParameters,
) -> TransmissionResult {
    let capital = coerce_amount(params.capital_at_death);
    let contributions = coerce_amount(params.contributions);

    // Gains already taxed annually owe no further levy at death.
    let social_levy = if params.envelope.gains_taxed_annually() {
        0.0
    } else {
        (capital - contributions).max(0.0) * fiscal.social_levy_rate
    };
    let capital_after_levy = (capital - social_levy).max(0.0);

    // Spouse or registered partner: full exemption, whatever the envelope.
    if params.beneficiary == BeneficiaryKind::SpousePartner {
        return TransmissionResult {
            regime: TransmissionRegime::SpouseExemption,
            allowance: 0.0,
            taxable_base: 0.0,
            flat_schedule_tax: 0.0,
            inheritance_duty: 0.0,
            total_tax: 0.0,
            social_levy_on_death: round2(social_levy),
            net_transmitted: round2(capital_after_levy),
        };
    }

    let insurance_regime =
        params.envelope.is_insurance_wrapped() && !params.banking_retirement_plan;
    let beneficiaries = params.beneficiary_count.max(1) as f64;

    let (regime, allowance, taxable_base, flat_schedule_tax, inheritance_duty) =
        if insurance_regime && params.age_at_first_payment < 70 {
            // Per-beneficiary allowance, then a two-bracket schedule whose
            // boundary scales with the number of beneficiaries.
            let allowance = fiscal.death_pre70_allowance * beneficiaries;
            let base = (capital_after_levy - allowance).max(0.0);
            let bracket1_limit = fiscal.death_pre70_bracket1_limit * beneficiaries;
            let tax = base.min(bracket1_limit) * fiscal.death_pre70_bracket1_rate
                + (base - bracket1_limit).max(0.0) * fiscal.death_pre70_bracket2_rate;
            (TransmissionRegime::PreSeventyFlatSchedule, allowance, base, tax, 0.0)
        } else if insurance_regime {
            // Payments at/after 70: flat global allowance, then standard
            // inheritance duty.
            let allowance = fiscal.death_post70_allowance;
            let base = (capital_after_levy - allowance).max(0.0);
            (
                TransmissionRegime::PostSeventyAllowance,
                allowance,
                base,
                0.0,
                base * fiscal.dmtg_rate,
            )
        } else {
            // Banking retirement plan, equity savings, securities account,
            // real-estate fund: no allowance, standard duty on everything.
            let base = capital_after_levy;
            (
                TransmissionRegime::StandardInheritanceDuty,
                0.0,
                base,
                0.0,
                base * fiscal.dmtg_rate,
            )
        };

    let total_tax = flat_schedule_tax + inheritance_duty;
    TransmissionResult {
        regime,
        allowance: round2(allowance),
        taxable_base: round2(taxable_base),
        flat_schedule_tax: round2(flat_schedule_tax),
        inheritance_duty: round2(inheritance_duty),
        total_tax: round2(total_tax),
        social_levy_on_death: round2(social_levy),
        net_transmitted: round2(capital - social_levy - total_tax),
    }
}
