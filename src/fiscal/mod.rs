//! Fiscal parameters: resolved record and resolution from raw settings

mod params;
mod resolver;

pub use params::FiscalParameters;
pub use resolver::{resolve_fiscal_parameters, ResolvedParameters};
