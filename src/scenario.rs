//! Full-lifecycle orchestration and scenario comparison
//!
//! Chains accumulation, decumulation and transmission into one projection,
//! handles death occurring during the accumulation phase, and provides the
//! elementwise comparison of two complete scenarios plus a rayon batch
//! runner (the core is side-effect-free, so scenarios evaluate in parallel
//! without synchronization).

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::accumulation::{simulate_accumulation, AccumulationResult, SimulationOptions};
use crate::decumulation::{simulate_decumulation, DecumulationResult, WithdrawalParams};
use crate::fiscal::FiscalParameters;
use crate::money::round2;
use crate::product::{ClientProfile, Envelope, ProductConfig};
use crate::transmission::{compute_transmission, TransmissionParams, TransmissionResult};

/// The six decision-support totals of a full lifecycle projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleTotals {
    /// Gross contributions net of tax saved and of income received
    pub net_effort: f64,
    /// Tax saved on deductible contributions
    pub tax_saved: f64,
    /// Capital at the end of accumulation
    pub capital_acquired: f64,
    /// Net withdrawal income received up to the assumed age of death
    pub net_decumulation_income: f64,
    /// Tax paid across all three phases, death levy included
    pub total_tax: f64,
    /// Net capital passed to the beneficiaries
    pub net_transmitted: f64,
}

/// Complete projection of one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleResult {
    pub accumulation: AccumulationResult,
    pub decumulation: DecumulationResult,
    pub transmission: TransmissionResult,
    pub totals: LifecycleTotals,
}

/// Run the three phases in sequence for one scenario.
///
/// When the assumed age of death falls inside the accumulation horizon, the
/// withdrawal phase is skipped (zeroed result) and the transmitted capital is
/// read from the accumulation row matching the death age, adding the
/// degressive death-guarantee capital when the retirement-plan rider is
/// active.
pub fn simulate_full_lifecycle(
    product: &ProductConfig,
    client: &ClientProfile,
    withdrawal: &WithdrawalParams,
    transmission: &TransmissionParams,
    fiscal: &FiscalParameters,
    options: SimulationOptions,
) -> LifecycleResult {
    let accumulation = simulate_accumulation(product, client, fiscal, options);

    let last_accumulation_age = client.age + product.years.saturating_sub(1);
    let death_during_accumulation = transmission.death_age <= last_accumulation_age;

    let (decumulation, capital_at_death, basis_at_death) = if death_during_accumulation {
        let (capital, basis) = match accumulation.row_at_age(transmission.death_age) {
            Some(row) => {
                let mut capital = row.total_capital;
                if product.envelope == Envelope::RetirementPlan && product.guaranteed_minimum_rider
                {
                    capital += row.degressive_guarantee_capital;
                }
                (capital, row.total_capital - row.latent_gain)
            }
            None => (0.0, 0.0),
        };
        (DecumulationResult::empty(product.envelope), capital, basis)
    } else {
        let decumulation =
            simulate_decumulation(&accumulation, withdrawal, client, fiscal, transmission);
        let capital = decumulation.summary.capital_at_death;
        let basis = decumulation.summary.basis_at_death;
        (decumulation, capital, basis)
    };

    let mut death_params = transmission.clone();
    death_params.envelope = product.envelope;
    death_params.capital_at_death = capital_at_death;
    death_params.contributions = basis_at_death;
    if death_params.age_at_first_payment == 0 {
        death_params.age_at_first_payment = client.age;
    }
    let transmission_result = compute_transmission(&death_params, fiscal);

    let totals = LifecycleTotals {
        net_effort: accumulation.summary.net_effort,
        tax_saved: accumulation.summary.total_tax_saved,
        capital_acquired: accumulation.summary.capital_acquired,
        net_decumulation_income: decumulation.summary.net_income_until_death,
        total_tax: round2(
            accumulation.summary.total_tax_paid
                + decumulation.summary.tax_until_death
                + transmission_result.total_tax
                + transmission_result.social_levy_on_death,
        ),
        net_transmitted: transmission_result.net_transmitted,
    };

    LifecycleResult { accumulation, decumulation, transmission: transmission_result, totals }
}

/// Which of two compared scenarios a metric favors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preference {
    ScenarioA,
    ScenarioB,
    Tie,
}

/// Delta of one metric between two scenarios (B minus A) and the scenario
/// it favors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricDelta {
    pub delta: f64,
    pub preferred: Preference,
}

/// Elementwise comparison of two complete scenario results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub net_effort: MetricDelta,
    pub tax_saved: MetricDelta,
    pub capital_acquired: MetricDelta,
    pub net_decumulation_income: MetricDelta,
    pub total_tax: MetricDelta,
    pub net_transmitted: MetricDelta,
}

/// Compare two scenario results metric by metric. Lower effort and lower
/// total tax are preferable; every other metric prefers the higher value.
pub fn compare_scenarios(a: &LifecycleResult, b: &LifecycleResult) -> ComparisonResult {
    ComparisonResult {
        net_effort: metric(a.totals.net_effort, b.totals.net_effort, false),
        tax_saved: metric(a.totals.tax_saved, b.totals.tax_saved, true),
        capital_acquired: metric(a.totals.capital_acquired, b.totals.capital_acquired, true),
        net_decumulation_income: metric(
            a.totals.net_decumulation_income,
            b.totals.net_decumulation_income,
            true,
        ),
        total_tax: metric(a.totals.total_tax, b.totals.total_tax, false),
        net_transmitted: metric(a.totals.net_transmitted, b.totals.net_transmitted, true),
    }
}

fn metric(a: f64, b: f64, higher_is_better: bool) -> MetricDelta {
    let delta = round2(b - a);
    let preferred = if delta.abs() < 0.005 {
        Preference::Tie
    } else if (delta > 0.0) == higher_is_better {
        Preference::ScenarioB
    } else {
        Preference::ScenarioA
    };
    MetricDelta { delta, preferred }
}

/// One fully-specified scenario for batch evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub label: String,
    pub product: ProductConfig,
    pub client: ClientProfile,
    pub withdrawal: WithdrawalParams,
    pub transmission: TransmissionParams,
    #[serde(default)]
    pub options: SimulationOptions,
}

/// Evaluate a set of scenarios in parallel.
pub fn run_batch(specs: &[ScenarioSpec], fiscal: &FiscalParameters) -> Vec<LifecycleResult> {
    specs
        .par_iter()
        .map(|spec| {
            simulate_full_lifecycle(
                &spec.product,
                &spec.client,
                &spec.withdrawal,
                &spec.transmission,
                fiscal,
                spec.options,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decumulation::WithdrawalMode;
    use crate::product::Household;
    use crate::transmission::BeneficiaryKind;
    use approx::assert_abs_diff_eq;

    fn client() -> ClientProfile {
        ClientProfile { age: 40, marginal_tax_rate: 0.30, household: Household::Single }
    }

    fn exhaust(duration: u32, rate: f64) -> WithdrawalParams {
        WithdrawalParams {
            mode: WithdrawalMode::ExhaustOverYears,
            duration_years: duration,
            monthly_amount: 0.0,
            one_off_amount: 0.0,
            annual_rate: rate,
        }
    }

    fn transmission(envelope: Envelope, death_age: u32) -> TransmissionParams {
        TransmissionParams {
            envelope,
            capital_at_death: 0.0,
            contributions: 0.0,
            death_age,
            age_at_first_payment: 40,
            beneficiary_count: 1,
            beneficiary: BeneficiaryKind::Heir,
            banking_retirement_plan: false,
        }
    }

    #[test]
    fn test_death_during_accumulation_skips_decumulation() {
        let product = ProductConfig::new(Envelope::LifeInsurance, 100_000.0, 20, 0.03);
        // Death at 50: inside the 40..=59 accumulation ages.
        let result = simulate_full_lifecycle(
            &product,
            &client(),
            &exhaust(15, 0.02),
            &transmission(Envelope::LifeInsurance, 50),
            &FiscalParameters::default(),
            SimulationOptions::default(),
        );

        assert!(result.decumulation.rows.is_empty());
        assert_eq!(result.totals.net_decumulation_income, 0.0);
        assert_eq!(result.decumulation.summary.total_tax, 0.0);

        let row = result.accumulation.row_at_age(50).unwrap();
        // Transmitted capital sourced from the matching accumulation row.
        assert_abs_diff_eq!(
            result.transmission.net_transmitted
                + result.transmission.total_tax
                + result.transmission.social_levy_on_death,
            row.total_capital,
            epsilon = 0.01
        );
    }

    #[test]
    fn test_rider_capital_added_when_death_during_accumulation() {
        let mut product = ProductConfig::new(Envelope::RetirementPlan, 0.0, 20, 0.02);
        product.schedule.annual_payment = 5_000.0;
        product.guaranteed_minimum_rider = true;

        let fiscal = FiscalParameters::default();
        let death = transmission(Envelope::RetirementPlan, 45);
        let result = simulate_full_lifecycle(
            &product,
            &client(),
            &exhaust(10, 0.0),
            &death,
            &fiscal,
            SimulationOptions::default(),
        );

        let row = result.accumulation.row_at_age(45).unwrap();
        let expected_capital = row.total_capital + row.degressive_guarantee_capital;
        assert_abs_diff_eq!(
            result.transmission.net_transmitted + result.transmission.total_tax,
            expected_capital,
            epsilon = 0.01
        );
    }

    #[test]
    fn test_death_after_decumulation_uses_remaining_capital() {
        let product = ProductConfig::new(Envelope::LifeInsurance, 120_000.0, 10, 0.02);
        let result = simulate_full_lifecycle(
            &product,
            &client(),
            &exhaust(20, 0.02),
            &transmission(Envelope::LifeInsurance, 60),
            &FiscalParameters::default(),
            SimulationOptions::default(),
        );

        assert!(!result.decumulation.rows.is_empty());
        let death_row = result.decumulation.rows.iter().find(|r| r.is_death_year).unwrap();
        assert_abs_diff_eq!(
            result.transmission.net_transmitted
                + result.transmission.total_tax
                + result.transmission.social_levy_on_death,
            death_row.closing_capital,
            epsilon = 0.01
        );
    }

    #[test]
    fn test_comparator_prefers_lower_effort_and_higher_transmission() {
        let small = ProductConfig::new(Envelope::LifeInsurance, 50_000.0, 10, 0.03);
        let large = ProductConfig::new(Envelope::LifeInsurance, 100_000.0, 10, 0.03);
        let fiscal = FiscalParameters::default();
        // Death at 60: withdrawals run from 50 to 64, so capital remains at
        // the death age and the larger contract transmits more.
        let death = transmission(Envelope::LifeInsurance, 60);

        let a = simulate_full_lifecycle(
            &small, &client(), &exhaust(15, 0.02), &death, &fiscal, SimulationOptions::default(),
        );
        let b = simulate_full_lifecycle(
            &large, &client(), &exhaust(15, 0.02), &death, &fiscal, SimulationOptions::default(),
        );

        let cmp = compare_scenarios(&a, &b);
        assert_eq!(cmp.net_effort.preferred, Preference::ScenarioA);
        assert_eq!(cmp.capital_acquired.preferred, Preference::ScenarioB);
        assert_eq!(cmp.net_transmitted.preferred, Preference::ScenarioB);

        let self_cmp = compare_scenarios(&a, &a);
        assert_eq!(self_cmp.total_tax.preferred, Preference::Tie);
    }

    #[test]
    fn test_zero_withdrawal_horizon_still_transmits_capital() {
        let product = ProductConfig::new(Envelope::LifeInsurance, 100_000.0, 10, 0.03);
        let result = simulate_full_lifecycle(
            &product,
            &client(),
            &exhaust(0, 0.03),
            &transmission(Envelope::LifeInsurance, 80),
            &FiscalParameters::default(),
            SimulationOptions::default(),
        );

        // No withdrawal rows, yet the acquired capital reaches the
        // transmission phase intact.
        assert!(result.decumulation.rows.is_empty());
        assert_abs_diff_eq!(
            result.transmission.net_transmitted
                + result.transmission.total_tax
                + result.transmission.social_levy_on_death,
            result.accumulation.summary.capital_acquired,
            epsilon = 0.01
        );
        assert!(result.totals.net_transmitted > 0.0);
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let fiscal = FiscalParameters::default();
        let specs: Vec<ScenarioSpec> = [0.02, 0.03, 0.04]
            .iter()
            .map(|&rate| ScenarioSpec {
                label: format!("rate-{rate}"),
                product: ProductConfig::new(Envelope::SecuritiesAccount, 80_000.0, 12, rate),
                client: client(),
                withdrawal: exhaust(10, rate),
                transmission: transmission(Envelope::SecuritiesAccount, 70),
                options: SimulationOptions::default(),
            })
            .collect();

        let results = run_batch(&specs, &fiscal);
        assert_eq!(results.len(), 3);
        for (spec, result) in specs.iter().zip(&results) {
            let sequential = simulate_full_lifecycle(
                &spec.product,
                &spec.client,
                &spec.withdrawal,
                &spec.transmission,
                &fiscal,
                spec.options,
            );
            assert_eq!(
                result.totals.capital_acquired,
                sequential.totals.capital_acquired
            );
        }
        // Higher rate builds more capital.
        assert!(results[2].totals.capital_acquired > results[0].totals.capital_acquired);
    }
}
