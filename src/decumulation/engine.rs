//! Withdrawal-phase engine
//!
//! Simulates the liquidation of the capital built during accumulation under
//! one of three payout modes, splitting each withdrawal into its capital and
//! gain portions and applying the envelope's withdrawal taxation.

use serde::{Deserialize, Serialize};

use crate::accumulation::AccumulationResult;
use crate::fiscal::FiscalParameters;
use crate::money::{clamp_rate, coerce_amount, round2};
use crate::product::{ClientProfile, Envelope, Household};
use crate::transmission::TransmissionParams;

use super::rows::{DecumulationResult, DecumulationSummary, WithdrawalRow};

/// Payout mode of the withdrawal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalMode {
    /// Fixed annual withdrawal exhausting the capital over the duration
    /// (constant-annuity formula, "VPM")
    ExhaustOverYears,
    /// Single withdrawal of a target amount in the first year
    FixedOneOff,
    /// Fixed monthly annuity (12 x monthly amount per year)
    FixedMonthly,
}

/// Withdrawal-phase parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalParams {
    pub mode: WithdrawalMode,
    /// Requested withdrawal horizon in years
    pub duration_years: u32,
    /// Target monthly amount (FixedMonthly)
    #[serde(default)]
    pub monthly_amount: f64,
    /// Target one-off amount (FixedOneOff)
    #[serde(default)]
    pub one_off_amount: f64,
    /// Annual growth rate of the capital during liquidation
    #[serde(default)]
    pub annual_rate: f64,
}

/// Fixed annual withdrawal that exhausts `capital` over `years` at a given
/// growth rate: capital x rate / (1 - (1+rate)^-years). Degenerates to
/// capital / years when the rate is zero.
pub fn constant_annuity(capital: f64, rate: f64, years: u32) -> f64 {
    if years == 0 {
        return 0.0;
    }
    if rate.abs() < 1e-12 {
        return capital / years as f64;
    }
    capital * rate / (1.0 - (1.0 + rate).powi(-(years as i32)))
}

/// Simulate the withdrawal phase following accumulation. The assumed age of
/// death comes from the transmission parameters; totals are reported both
/// over the full horizon and truncated at that age.
pub fn simulate_decumulation(
    accumulation: &AccumulationResult,
    params: &WithdrawalParams,
    client: &ClientProfile,
    fiscal: &FiscalParameters,
    transmission: &TransmissionParams,
) -> DecumulationResult {
    DecumulationSimulator { accumulation, params, client, fiscal, death_age: transmission.death_age }
        .run()
}

struct DecumulationSimulator<'a> {
    accumulation: &'a AccumulationResult,
    params: &'a WithdrawalParams,
    client: &'a ClientProfile,
    fiscal: &'a FiscalParameters,
    death_age: u32,
}

impl<'a> DecumulationSimulator<'a> {
    fn run(&self) -> DecumulationResult {
        let envelope = self.accumulation.envelope;
        let summary = &self.accumulation.summary;
        let start_age = self.client.age + summary.years;

        // The real-estate fund is never depleted: its "withdrawal" is the
        // annual yield, simulated through to the assumed age of death.
        let horizon = if envelope == Envelope::RealEstateFund {
            self.death_age.saturating_sub(start_age).saturating_add(1)
        } else {
            self.params.duration_years
        };

        let mut capital = summary.capital_acquired;
        let mut basis = summary.tax_basis.min(capital);
        let annuity = match self.params.mode {
            WithdrawalMode::ExhaustOverYears => {
                constant_annuity(capital, self.params.annual_rate, self.params.duration_years)
            }
            _ => 0.0,
        };

        let tmi = clamp_rate(self.client.marginal_tax_rate);
        let ps = clamp_rate(self.fiscal.social_levy_rate);

        let mut rows: Vec<WithdrawalRow> = Vec::with_capacity(horizon as usize);
        let mut abatement_used_total = 0.0;

        for year in 1..=horizon {
            let age = start_age + year - 1;
            let contract_age = summary.years + year;
            let opening = capital;

            let growth = if envelope == Envelope::RealEstateFund {
                capital * summary.revaluation_rate
            } else {
                capital * self.params.annual_rate
            };
            capital += growth;

            let target = match (envelope, self.params.mode) {
                (Envelope::RealEstateFund, _) => capital * summary.distribution_yield_rate,
                (_, WithdrawalMode::ExhaustOverYears) => annuity,
                (_, WithdrawalMode::FixedOneOff) => {
                    if year == 1 {
                        coerce_amount(self.params.one_off_amount)
                    } else {
                        0.0
                    }
                }
                (_, WithdrawalMode::FixedMonthly) => {
                    coerce_amount(self.params.monthly_amount) * 12.0
                }
            };

            let gross = if envelope == Envelope::RealEstateFund {
                target.max(0.0)
            } else {
                target.max(0.0).min(capital)
            };

            // Capital/gain split of the withdrawal. The fund's payout is
            // pure income, never a return of capital.
            let (part_capital, part_gain) = if envelope == Envelope::RealEstateFund {
                (0.0, gross)
            } else if capital > 0.0 {
                let gain_fraction = (capital - basis).max(0.0) / capital;
                let gain = gross * gain_fraction;
                (gross - gain, gain)
            } else {
                (0.0, 0.0)
            };

            if envelope != Envelope::RealEstateFund {
                capital -= gross;
                basis = (basis - part_capital).max(0.0);
            }

            let (income_tax, social_levy, abatement_used) =
                self.withdrawal_tax(part_capital, part_gain, contract_age, tmi, ps);
            abatement_used_total += abatement_used;

            let total_tax = income_tax + social_levy;
            capital = round2(capital);
            basis = round2(basis);

            rows.push(WithdrawalRow {
                year,
                age,
                opening_capital: round2(opening),
                growth: round2(growth),
                gross_withdrawal: round2(gross),
                part_capital: round2(part_capital),
                part_gain: round2(part_gain),
                income_tax: round2(income_tax),
                social_levy: round2(social_levy),
                total_tax: round2(total_tax),
                net_withdrawal: round2(gross - total_tax),
                closing_capital: capital,
                is_death_year: age == self.death_age,
            });

            if capital <= 0.0 && envelope != Envelope::RealEstateFund {
                break;
            }
        }

        let summary = self.summarize(&rows, summary.tax_basis, abatement_used_total);
        DecumulationResult { envelope, rows, summary }
    }

    /// Income tax, social levy and abatement used for one withdrawal.
    fn withdrawal_tax(
        &self,
        part_capital: f64,
        part_gain: f64,
        contract_age: u32,
        tmi: f64,
        ps: f64,
    ) -> (f64, f64, f64) {
        let fiscal = self.fiscal;
        match self.accumulation.envelope {
            // Gains taxed after the annual abatement once the contract is 8
            // years old; the levy never benefits from the abatement.
            Envelope::LifeInsurance => {
                let levy = part_gain * ps;
                if contract_age >= 8 {
                    let abatement =
                        fiscal.li_abatement(self.client.household == Household::Couple);
                    let used = part_gain.min(abatement);
                    let taxable = (part_gain - abatement).max(0.0);
                    let rate = if self.accumulation.summary.total_contributions
                        <= fiscal.li_premium_threshold
                    {
                        fiscal.li_ir_rate_after_8y_low
                    } else {
                        fiscal.li_ir_rate_after_8y_high
                    };
                    (taxable * rate, levy, used)
                } else {
                    (part_gain * fiscal.li_ir_rate_before_8y, levy, 0.0)
                }
            }
            // Deducted contributions are taxed back at the marginal rate,
            // gains at the flat rate.
            Envelope::RetirementPlan => (
                part_capital * tmi + part_gain * fiscal.per_gain_flat_rate,
                part_gain * ps,
                0.0,
            ),
            // Income-tax exemption on gains once the holding period is
            // reached; the levy is always due.
            Envelope::EquitySavings => {
                let ir = if (contract_age as f64) >= fiscal.equity_savings_exemption_years {
                    0.0
                } else {
                    part_gain * fiscal.flat_tax_ir_rate
                };
                (ir, part_gain * ps, 0.0)
            }
            Envelope::SecuritiesAccount => {
                let ir = if self.accumulation.summary.scale_election {
                    part_gain * tmi
                } else {
                    part_gain * fiscal.flat_tax_ir_rate
                };
                (ir, part_gain * ps, 0.0)
            }
            // Rental-like income: the whole payout is taxed at the marginal
            // rate plus the levy, no flat-tax option.
            Envelope::RealEstateFund => {
                let income = part_capital + part_gain;
                (income * tmi, income * ps, 0.0)
            }
        }
    }

    fn summarize(
        &self,
        rows: &[WithdrawalRow],
        starting_basis: f64,
        abatement_used: f64,
    ) -> DecumulationSummary {
        let total_gross: f64 = rows.iter().map(|r| r.gross_withdrawal).sum();
        let total_net: f64 = rows.iter().map(|r| r.net_withdrawal).sum();
        let total_tax: f64 = rows.iter().map(|r| r.total_tax).sum();

        // Truncate at the death row when it exists, otherwise at the end of
        // the horizon.
        let death_index = rows
            .iter()
            .position(|r| r.is_death_year)
            .unwrap_or(rows.len().saturating_sub(1));
        let until_death = &rows[..rows.len().min(death_index + 1)];
        let net_until_death: f64 = until_death.iter().map(|r| r.net_withdrawal).sum();
        let tax_until_death: f64 = until_death.iter().map(|r| r.total_tax).sum();
        // No rows (zero horizon): nothing was withdrawn, the whole acquired
        // capital survives to the death age.
        let capital_at_death = until_death
            .last()
            .map(|r| r.closing_capital)
            .unwrap_or(self.accumulation.summary.capital_acquired);
        let capital_returned: f64 = until_death.iter().map(|r| r.part_capital).sum();

        DecumulationSummary {
            years: rows.len() as u32,
            total_gross_withdrawn: round2(total_gross),
            total_net_withdrawn: round2(total_net),
            total_tax: round2(total_tax),
            net_income_until_death: round2(net_until_death),
            tax_until_death: round2(tax_until_death),
            capital_at_death,
            basis_at_death: round2((starting_basis - capital_returned).max(0.0)),
            abatement_used: round2(abatement_used),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulation::{AccumulationResult, AccumulationSummary};
    use crate::transmission::BeneficiaryKind;
    use approx::assert_abs_diff_eq;

    fn accumulation(envelope: Envelope, capital: f64, basis: f64, years: u32) -> AccumulationResult {
        AccumulationResult {
            envelope,
            rows: Vec::new(),
            summary: AccumulationSummary {
                years,
                capital_acquired: capital,
                total_contributions: basis,
                tax_basis: basis,
                total_tax_saved: 0.0,
                latent_gain: (capital - basis).max(0.0),
                net_income_received: 0.0,
                net_effort: basis,
                total_tax_paid: 0.0,
                distribution_yield_rate: 0.045,
                revaluation_rate: 0.01,
                scale_election: false,
            },
        }
    }

    fn client() -> ClientProfile {
        ClientProfile { age: 40, marginal_tax_rate: 0.30, household: Household::Single }
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

    fn exhaust(duration: u32, rate: f64) -> WithdrawalParams {
        WithdrawalParams {
            mode: WithdrawalMode::ExhaustOverYears,
            duration_years: duration,
            monthly_amount: 0.0,
            one_off_amount: 0.0,
            annual_rate: rate,
        }
    }

    #[test]
    fn test_constant_annuity_reference_value() {
        let w = constant_annuity(100_000.0, 0.03, 20);
        assert_abs_diff_eq!(w, 6_721.57, epsilon = 0.01);
        // Zero-rate degenerate case.
        assert_abs_diff_eq!(constant_annuity(100_000.0, 0.0, 20), 5_000.0, epsilon = 1e-9);
    }

    #[test]
    fn test_annuity_exhausts_capital_over_exact_horizon() {
        let acc = accumulation(Envelope::LifeInsurance, 100_000.0, 100_000.0, 10);
        let result = simulate_decumulation(
            &acc,
            &exhaust(20, 0.03),
            &client(),
            &FiscalParameters::default(),
            &transmission(Envelope::LifeInsurance, 90),
        );
        assert_eq!(result.rows.len(), 20);
        assert_abs_diff_eq!(result.rows.last().unwrap().closing_capital, 0.0, epsilon = 1.0);
    }

    #[test]
    fn test_withdrawal_split_identity() {
        let acc = accumulation(Envelope::SecuritiesAccount, 150_000.0, 90_000.0, 12);
        let result = simulate_decumulation(
            &acc,
            &exhaust(15, 0.02),
            &client(),
            &FiscalParameters::default(),
            &transmission(Envelope::SecuritiesAccount, 70),
        );
        for row in &result.rows {
            assert_abs_diff_eq!(
                row.part_capital + row.part_gain,
                row.gross_withdrawal,
                epsilon = 0.01
            );
        }
    }

    #[test]
    fn test_life_insurance_abatement_after_8_years() {
        let fiscal = FiscalParameters::default();
        // Contract is already 10 years old when withdrawals start.
        let acc = accumulation(Envelope::LifeInsurance, 200_000.0, 100_000.0, 10);
        let result = simulate_decumulation(
            &acc,
            &exhaust(10, 0.0),
            &client(),
            &fiscal,
            &transmission(Envelope::LifeInsurance, 75),
        );
        let row = &result.rows[0];
        // Gain fraction is 50%: 20000 withdrawn, 10000 of gain.
        assert_abs_diff_eq!(row.part_gain, 10_000.0, epsilon = 0.01);
        // 4600 abatement, then 7.5% (premiums under the threshold).
        assert_abs_diff_eq!(row.income_tax, (10_000.0 - 4_600.0) * 0.075, epsilon = 0.01);
        // Levy on the full gain.
        assert_abs_diff_eq!(row.social_levy, 10_000.0 * 0.172, epsilon = 0.01);
        assert!(result.summary.abatement_used > 4_599.0);
    }

    #[test]
    fn test_retirement_plan_taxes_capital_at_marginal_rate() {
        let fiscal = FiscalParameters::default();
        let acc = accumulation(Envelope::RetirementPlan, 100_000.0, 80_000.0, 15);
        let result = simulate_decumulation(
            &acc,
            &exhaust(10, 0.0),
            &client(),
            &fiscal,
            &transmission(Envelope::RetirementPlan, 80),
        );
        let row = &result.rows[0];
        let expected = row.part_capital * 0.30 + row.part_gain * 0.128;
        assert_abs_diff_eq!(row.income_tax, expected, epsilon = 0.01);
    }

    #[test]
    fn test_equity_savings_exempt_after_holding_period() {
        let fiscal = FiscalParameters::default();
        let acc = accumulation(Envelope::EquitySavings, 120_000.0, 60_000.0, 8);
        let result = simulate_decumulation(
            &acc,
            &exhaust(5, 0.0),
            &client(),
            &fiscal,
            &transmission(Envelope::EquitySavings, 60),
        );
        let row = &result.rows[0];
        assert_eq!(row.income_tax, 0.0);
        assert_abs_diff_eq!(row.social_levy, row.part_gain * 0.172, epsilon = 0.01);
    }

    #[test]
    fn test_real_estate_fund_runs_to_death_age_without_depletion() {
        let fiscal = FiscalParameters::default();
        let acc = accumulation(Envelope::RealEstateFund, 100_000.0, 100_000.0, 10);
        // Requested duration is ignored for the fund.
        let result = simulate_decumulation(
            &acc,
            &exhaust(3, 0.0),
            &client(),
            &fiscal,
            &transmission(Envelope::RealEstateFund, 75),
        );
        // Ages 50 through 75 inclusive.
        assert_eq!(result.rows.len(), 26);
        assert!(result.rows.last().unwrap().is_death_year);
        // Capital keeps revaluing, never depleted.
        assert!(result.rows.last().unwrap().closing_capital > 100_000.0);
        // Payout taxed as rental income.
        let row = &result.rows[0];
        assert_abs_diff_eq!(
            row.total_tax,
            row.gross_withdrawal * (0.30 + 0.172),
            epsilon = 0.01
        );
    }

    #[test]
    fn test_monthly_mode_caps_at_remaining_capital() {
        let fiscal = FiscalParameters::default();
        let acc = accumulation(Envelope::LifeInsurance, 100_000.0, 100_000.0, 10);
        let params = WithdrawalParams {
            mode: WithdrawalMode::FixedMonthly,
            duration_years: 10,
            monthly_amount: 1_000.0,
            one_off_amount: 0.0,
            annual_rate: 0.0,
        };
        let result = simulate_decumulation(
            &acc,
            &params,
            &client(),
            &fiscal,
            &transmission(Envelope::LifeInsurance, 90),
        );
        // 12000 a year empties 100000 in the 9th year.
        assert_eq!(result.rows.len(), 9);
        assert_abs_diff_eq!(result.rows[0].gross_withdrawal, 12_000.0, epsilon = 0.01);
        // Last withdrawal is floored at what remains.
        let last = result.rows.last().unwrap();
        assert_abs_diff_eq!(last.gross_withdrawal, 4_000.0, epsilon = 0.01);
        assert_abs_diff_eq!(last.closing_capital, 0.0, epsilon = 0.01);
    }

    #[test]
    fn test_zero_duration_keeps_capital_for_transmission() {
        let fiscal = FiscalParameters::default();
        let acc = accumulation(Envelope::LifeInsurance, 134_391.64, 100_000.0, 10);
        let result = simulate_decumulation(
            &acc,
            &exhaust(0, 0.03),
            &client(),
            &fiscal,
            &transmission(Envelope::LifeInsurance, 80),
        );
        // Nothing withdrawn: the acquired capital carries straight through
        // to the transmission phase.
        assert!(result.rows.is_empty());
        assert_eq!(result.summary.capital_at_death, 134_391.64);
        assert_eq!(result.summary.basis_at_death, 100_000.0);
        assert_eq!(result.summary.net_income_until_death, 0.0);
    }

    #[test]
    fn test_one_off_mode_withdraws_once() {
        let fiscal = FiscalParameters::default();
        let acc = accumulation(Envelope::SecuritiesAccount, 100_000.0, 100_000.0, 5);
        let params = WithdrawalParams {
            mode: WithdrawalMode::FixedOneOff,
            duration_years: 10,
            monthly_amount: 0.0,
            one_off_amount: 30_000.0,
            annual_rate: 0.02,
        };
        let result = simulate_decumulation(
            &acc,
            &params,
            &client(),
            &fiscal,
            &transmission(Envelope::SecuritiesAccount, 60),
        );
        assert_eq!(result.rows.len(), 10);
        assert_abs_diff_eq!(result.rows[0].gross_withdrawal, 30_000.0, epsilon = 0.01);
        assert_eq!(result.rows[1].gross_withdrawal, 0.0);
        // Remaining capital keeps growing over the rest of the horizon.
        assert!(result.rows[9].closing_capital > result.rows[1].closing_capital);
    }

    #[test]
    fn test_death_truncated_totals_differ_from_full_horizon() {
        let fiscal = FiscalParameters::default();
        let acc = accumulation(Envelope::LifeInsurance, 150_000.0, 150_000.0, 10);
        // Death at age 55: 6th withdrawal year out of 20.
        let result = simulate_decumulation(
            &acc,
            &exhaust(20, 0.01),
            &client(),
            &fiscal,
            &transmission(Envelope::LifeInsurance, 55),
        );
        assert!(result.summary.net_income_until_death < result.summary.total_net_withdrawn);
        let death_row = result.rows.iter().find(|r| r.is_death_year).unwrap();
        assert_eq!(result.summary.capital_at_death, death_row.closing_capital);
    }
}
