//! Patrimony Engine CLI
//!
//! Runs a full-lifecycle projection for one envelope and prints the yearly
//! rows and summary, with optional CSV export.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Parser;

use patrimony_engine::decumulation::{WithdrawalMode, WithdrawalParams};
use patrimony_engine::fiscal::resolve_fiscal_parameters;
use patrimony_engine::product::{ClientProfile, Envelope, Household, ProductConfig, ScenarioFile};
use patrimony_engine::scenario::simulate_full_lifecycle;
use patrimony_engine::transmission::{BeneficiaryKind, TransmissionParams};
use patrimony_engine::SimulationOptions;

#[derive(Debug, Parser)]
#[command(name = "patrimony_engine", about = "Envelope lifecycle projection")]
struct Args {
    /// Full scenario JSON file (overrides the individual flags)
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Raw fiscal configuration JSON ({ "fiscality": ..., "social_levies": ... })
    #[arg(long)]
    fiscal_config: Option<PathBuf>,

    /// Envelope: life-insurance, retirement-plan, equity-savings,
    /// securities-account or real-estate-fund
    #[arg(long, default_value = "life-insurance")]
    envelope: String,

    /// Initial lump sum
    #[arg(long, default_value_t = 100_000.0)]
    initial: f64,

    /// Recurring annual payment
    #[arg(long, default_value_t = 0.0)]
    annual: f64,

    /// Accumulation horizon in years
    #[arg(long, default_value_t = 20)]
    years: u32,

    /// Annual capitalization yield
    #[arg(long, default_value_t = 0.03)]
    rate: f64,

    /// Client age at the first payment
    #[arg(long, default_value_t = 45)]
    age: u32,

    /// Marginal tax rate (TMI)
    #[arg(long, default_value_t = 0.30)]
    tmi: f64,

    /// Withdrawal horizon in years
    #[arg(long, default_value_t = 20)]
    duration: u32,

    /// Assumed age of death
    #[arg(long, default_value_t = 85)]
    death_age: u32,

    /// Number of beneficiaries
    #[arg(long, default_value_t = 1)]
    beneficiaries: u32,

    /// Beneficiary is the spouse or registered partner
    #[arg(long, default_value_t = false)]
    spouse: bool,

    /// Write yearly rows to CSV files with this prefix
    #[arg(long)]
    csv_prefix: Option<String>,
}

fn parse_envelope(name: &str) -> Result<Envelope> {
    Ok(match name {
        "life-insurance" => Envelope::LifeInsurance,
        "retirement-plan" => Envelope::RetirementPlan,
        "equity-savings" => Envelope::EquitySavings,
        "securities-account" => Envelope::SecuritiesAccount,
        "real-estate-fund" => Envelope::RealEstateFund,
        other => bail!("unknown envelope '{other}'"),
    })
}

fn scenario_from_args(args: &Args) -> Result<ScenarioFile> {
    let envelope = parse_envelope(&args.envelope)?;
    let mut product = ProductConfig::new(envelope, args.initial, args.years, args.rate);
    product.schedule.annual_payment = args.annual;
    if envelope == Envelope::RealEstateFund {
        // A fund share earns its return as distribution yield.
        product.distribution_yield_rate = args.rate;
        product.capitalization_rate = 0.0;
    }

    Ok(ScenarioFile {
        product,
        client: ClientProfile {
            age: args.age,
            marginal_tax_rate: args.tmi,
            household: Household::Single,
        },
        withdrawal: WithdrawalParams {
            mode: WithdrawalMode::ExhaustOverYears,
            duration_years: args.duration,
            monthly_amount: 0.0,
            one_off_amount: 0.0,
            annual_rate: args.rate,
        },
        transmission: TransmissionParams {
            envelope,
            capital_at_death: 0.0,
            contributions: 0.0,
            death_age: args.death_age,
            age_at_first_payment: args.age,
            beneficiary_count: args.beneficiaries,
            beneficiary: if args.spouse {
                BeneficiaryKind::SpousePartner
            } else {
                BeneficiaryKind::Heir
            },
            banking_retirement_plan: false,
        },
        options: SimulationOptions::default(),
        fiscality: None,
        social_levies: None,
    })
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut scenario = match &args.scenario {
        Some(path) => ScenarioFile::load(path)
            .with_context(|| format!("loading scenario {}", path.display()))?,
        None => scenario_from_args(&args)?,
    };

    if let Some(path) = &args.fiscal_config {
        let raw: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(path)
                .with_context(|| format!("reading fiscal config {}", path.display()))?,
        )?;
        scenario.fiscality = raw.get("fiscality").cloned().or(Some(raw.clone()));
        scenario.social_levies = raw.get("social_levies").cloned();
    }

    let resolved =
        resolve_fiscal_parameters(scenario.fiscality.as_ref(), scenario.social_levies.as_ref());
    resolved.log_warnings_once();
    let fiscal = resolved.params;

    println!("Patrimony Engine v0.1.0 — {}", Local::now().format("%Y-%m-%d"));
    println!("Envelope: {}", scenario.product.envelope.as_str());
    println!(
        "Client: age {}, TMI {:.0}%, death assumed at {}",
        scenario.client.age,
        scenario.client.marginal_tax_rate * 100.0,
        scenario.transmission.death_age
    );
    println!();

    let result = simulate_full_lifecycle(
        &scenario.product,
        &scenario.client,
        &scenario.withdrawal,
        &scenario.transmission,
        &fiscal,
        scenario.options,
    );

    println!("Accumulation ({} years):", result.accumulation.rows.len());
    println!(
        "{:>4} {:>4} {:>12} {:>12} {:>10} {:>10} {:>10} {:>14}",
        "Year", "Age", "Contrib", "Interest", "Coupon", "CoupTax", "Gain", "Capital"
    );
    for row in result.accumulation.rows.iter().take(15) {
        println!(
            "{:>4} {:>4} {:>12.2} {:>12.2} {:>10.2} {:>10.2} {:>10.2} {:>14.2}",
            row.year,
            row.age,
            row.gross_contribution,
            row.interest,
            row.coupon_gross,
            row.coupon_tax,
            row.latent_gain,
            row.total_capital,
        );
    }
    if result.accumulation.rows.len() > 15 {
        println!("... ({} more years)", result.accumulation.rows.len() - 15);
    }

    if !result.decumulation.rows.is_empty() {
        println!("\nDecumulation ({} years):", result.decumulation.rows.len());
        println!(
            "{:>4} {:>4} {:>14} {:>12} {:>10} {:>10} {:>12} {:>14}",
            "Year", "Age", "Opening", "Gross", "Tax", "Net", "Gain part", "Closing"
        );
        for row in result.decumulation.rows.iter().take(15) {
            println!(
                "{:>4} {:>4} {:>14.2} {:>12.2} {:>10.2} {:>10.2} {:>12.2} {:>14.2}",
                row.year,
                row.age,
                row.opening_capital,
                row.gross_withdrawal,
                row.total_tax,
                row.net_withdrawal,
                row.part_gain,
                row.closing_capital,
            );
        }
        if result.decumulation.rows.len() > 15 {
            println!("... ({} more years)", result.decumulation.rows.len() - 15);
        }
    } else {
        println!("\nDecumulation skipped: death occurs during accumulation.");
    }

    println!("\nTransmission:");
    println!("  Regime: {}", result.transmission.regime.as_str());
    println!("  Allowance: {:.2}", result.transmission.allowance);
    println!("  Taxable base: {:.2}", result.transmission.taxable_base);
    println!("  Social levy on death: {:.2}", result.transmission.social_levy_on_death);
    println!("  Tax due: {:.2}", result.transmission.total_tax);
    println!("  Net transmitted: {:.2}", result.transmission.net_transmitted);

    println!("\nLifecycle totals:");
    println!("  Net effort: {:.2}", result.totals.net_effort);
    println!("  Tax saved: {:.2}", result.totals.tax_saved);
    println!("  Capital acquired: {:.2}", result.totals.capital_acquired);
    println!("  Net decumulation income: {:.2}", result.totals.net_decumulation_income);
    println!("  Total tax (all phases): {:.2}", result.totals.total_tax);
    println!("  Net transmitted: {:.2}", result.totals.net_transmitted);

    if let Some(prefix) = &args.csv_prefix {
        let accumulation_path = format!("{prefix}_accumulation.csv");
        let mut writer = csv::Writer::from_path(&accumulation_path)
            .with_context(|| format!("creating {accumulation_path}"))?;
        for row in &result.accumulation.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        let decumulation_path = format!("{prefix}_decumulation.csv");
        let mut writer = csv::Writer::from_path(&decumulation_path)
            .with_context(|| format!("creating {decumulation_path}"))?;
        for row in &result.decumulation.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        println!("\nRows written to {accumulation_path} and {decumulation_path}");
    }

    Ok(())
}
