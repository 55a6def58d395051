//! Fiscal parameter resolution from raw settings objects
//!
//! The settings provider persists tax tables as free-form JSON and has
//! changed shape over time, so the resolver tolerates missing sub-objects
//! and legacy key spellings. Resolution never fails: every field falls back
//! to its documented default, and each substitution is reported as a warning
//! carried in the return value. An advisory once-per-process log helper is
//! provided for callers that do not want to flood their logs.

use std::sync::Once;

use serde_json::Value;

use super::params::FiscalParameters;

/// Outcome of a resolution: the fully-populated parameters plus every
/// substitution that was made along the way.
#[derive(Debug, Clone)]
pub struct ResolvedParameters {
    pub params: FiscalParameters,
    pub warnings: Vec<String>,
}

static WARNED: Once = Once::new();

impl ResolvedParameters {
    /// Log the collected warnings once per process lifetime. Advisory only;
    /// repeated resolutions stay silent.
    pub fn log_warnings_once(&self) {
        if self.warnings.is_empty() {
            return;
        }
        WARNED.call_once(|| {
            for warning in &self.warnings {
                log::warn!("fiscal parameters: {warning}");
            }
        });
    }
}

/// Resolve raw fiscality and social-levy configuration into a complete
/// [`FiscalParameters`] record.
///
/// Overlay order: defaults, then the social-levy rate, then the
/// life-insurance withdrawal section, then the death-benefit section, then
/// the retirement-plan flat rate, then flat-tax / equity-savings / dividend
/// / inheritance-duty fields. Absent input always resolves to defaults.
pub fn resolve_fiscal_parameters(
    raw_fiscality: Option<&Value>,
    raw_social_levies: Option<&Value>,
) -> ResolvedParameters {
    let mut params = FiscalParameters::default();
    let mut warnings = Vec::new();

    if raw_fiscality.is_none() && raw_social_levies.is_none() {
        warnings.push("no fiscality or social-levy configuration found, using defaults".into());
        return ResolvedParameters { params, warnings };
    }

    if let Some(social) = raw_social_levies {
        overlay(&mut params.social_levy_rate, social, &["social_levy_rate", "rate", "taux_ps"], &mut warnings);
    }

    if let Some(fisc) = raw_fiscality {
        if let Some(li) = section(fisc, &["life_insurance", "assurance_vie"], &mut warnings) {
            overlay(&mut params.li_ir_rate_before_8y, li, &["rate_before_8y", "taux_avant_8_ans"], &mut warnings);
            overlay(&mut params.li_ir_rate_after_8y_low, li, &["rate_after_8y_low", "taux_apres_8_ans"], &mut warnings);
            overlay(&mut params.li_ir_rate_after_8y_high, li, &["rate_after_8y_high", "taux_apres_8_ans_haut"], &mut warnings);
            overlay(&mut params.li_premium_threshold, li, &["premium_threshold", "seuil_primes"], &mut warnings);
            overlay(&mut params.li_abatement_single, li, &["abatement_single", "abattement_celibataire"], &mut warnings);
            overlay(&mut params.li_abatement_couple, li, &["abatement_couple", "abattement_couple"], &mut warnings);
        }

        if let Some(death) = section(fisc, &["death_benefit", "transmission", "deces"], &mut warnings) {
            overlay(&mut params.death_pre70_allowance, death, &["pre70_allowance", "abattement_990i"], &mut warnings);
            overlay(&mut params.death_pre70_bracket1_rate, death, &["pre70_bracket1_rate", "taux_tranche_1"], &mut warnings);
            overlay(&mut params.death_pre70_bracket1_limit, death, &["pre70_bracket1_limit", "plafond_tranche_1"], &mut warnings);
            overlay(&mut params.death_pre70_bracket2_rate, death, &["pre70_bracket2_rate", "taux_tranche_2"], &mut warnings);
            overlay(&mut params.death_post70_allowance, death, &["post70_allowance", "abattement_757b"], &mut warnings);
        }

        if let Some(per) = section(fisc, &["retirement_plan", "per"], &mut warnings) {
            overlay(&mut params.per_gain_flat_rate, per, &["gain_flat_rate", "flat_rate"], &mut warnings);
        }

        overlay(&mut params.flat_tax_ir_rate, fisc, &["flat_tax_ir_rate", "pfu_ir"], &mut warnings);
        overlay(&mut params.dmtg_rate, fisc, &["dmtg_rate", "taux_dmtg"], &mut warnings);
        overlay(&mut params.equity_savings_exemption_years, fisc, &["equity_savings_exemption_years", "duree_pea"], &mut warnings);
        overlay(&mut params.dividend_allowance_rate, fisc, &["dividend_allowance_rate", "abattement_dividendes"], &mut warnings);
    }

    sanitize(&mut params, &mut warnings);

    ResolvedParameters { params, warnings }
}

/// Find the first present sub-object among several key spellings. A key that
/// is present but not an object produces a warning and is ignored.
fn section<'a>(value: &'a Value, keys: &[&str], warnings: &mut Vec<String>) -> Option<&'a Value> {
    for key in keys {
        match value.get(key) {
            None => continue,
            Some(v) if v.is_object() => return Some(v),
            Some(v) => {
                warnings.push(format!(
                    "section '{key}' is not an object ({v}), keeping its defaults"
                ));
                return None;
            }
        }
    }
    None
}

/// Overlay `field` with the first usable numeric value found under `keys`.
/// A key that is present but not numeric produces a warning and leaves the
/// default in place.
fn overlay(field: &mut f64, value: &Value, keys: &[&str], warnings: &mut Vec<String>) {
    for key in keys {
        match value.get(key) {
            None => continue,
            Some(v) => {
                match v.as_f64().filter(|n| n.is_finite()) {
                    Some(n) => *field = n,
                    None => warnings.push(format!(
                        "key '{key}' is not a number ({v}), keeping default {field}"
                    )),
                }
                return;
            }
        }
    }
}

/// Final pass: any field that somehow resolved to a non-finite or negative
/// value is forced back to its default.
fn sanitize(params: &mut FiscalParameters, warnings: &mut Vec<String>) {
    let defaults = FiscalParameters::default();
    let mut force = |name: &str, field: &mut f64, default: f64| {
        if !field.is_finite() || *field < 0.0 {
            warnings.push(format!("'{name}' resolved to an unusable value, reset to {default}"));
            *field = default;
        }
    };

    force("social_levy_rate", &mut params.social_levy_rate, defaults.social_levy_rate);
    force("flat_tax_ir_rate", &mut params.flat_tax_ir_rate, defaults.flat_tax_ir_rate);
    force("li_ir_rate_before_8y", &mut params.li_ir_rate_before_8y, defaults.li_ir_rate_before_8y);
    force("li_ir_rate_after_8y_low", &mut params.li_ir_rate_after_8y_low, defaults.li_ir_rate_after_8y_low);
    force("li_ir_rate_after_8y_high", &mut params.li_ir_rate_after_8y_high, defaults.li_ir_rate_after_8y_high);
    force("li_premium_threshold", &mut params.li_premium_threshold, defaults.li_premium_threshold);
    force("li_abatement_single", &mut params.li_abatement_single, defaults.li_abatement_single);
    force("li_abatement_couple", &mut params.li_abatement_couple, defaults.li_abatement_couple);
    force("death_pre70_allowance", &mut params.death_pre70_allowance, defaults.death_pre70_allowance);
    force("death_pre70_bracket1_rate", &mut params.death_pre70_bracket1_rate, defaults.death_pre70_bracket1_rate);
    force("death_pre70_bracket1_limit", &mut params.death_pre70_bracket1_limit, defaults.death_pre70_bracket1_limit);
    force("death_pre70_bracket2_rate", &mut params.death_pre70_bracket2_rate, defaults.death_pre70_bracket2_rate);
    force("death_post70_allowance", &mut params.death_post70_allowance, defaults.death_post70_allowance);
    force("dmtg_rate", &mut params.dmtg_rate, defaults.dmtg_rate);
    force("per_gain_flat_rate", &mut params.per_gain_flat_rate, defaults.per_gain_flat_rate);
    force("equity_savings_exemption_years", &mut params.equity_savings_exemption_years, defaults.equity_savings_exemption_years);
    force("dividend_allowance_rate", &mut params.dividend_allowance_rate, defaults.dividend_allowance_rate);
}
