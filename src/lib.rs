//! Patrimony Engine - Lifecycle projection engine for long-term savings envelopes
//!
//! This library provides:
//! - Fiscal parameter resolution from raw settings with documented defaults
//! - Year-by-year accumulation simulation with dual sub-accounts and
//!   deferred coupon reinvestment
//! - Decumulation simulation with three payout modes, including the
//!   constant-annuity ("VPM") formula
//! - Transmission taxation on death with envelope-specific regimes
//! - Full-lifecycle orchestration and scenario comparison

pub mod accumulation;
pub mod decumulation;
pub mod fiscal;
pub mod money;
pub mod product;
pub mod scenario;
pub mod transmission;

// Re-export commonly used types
pub use accumulation::{simulate_accumulation, AccumulationResult, SimulationOptions};
pub use decumulation::{simulate_decumulation, WithdrawalMode, WithdrawalParams};
pub use fiscal::{resolve_fiscal_parameters, FiscalParameters};
pub use product::{ClientProfile, Envelope, ProductConfig};
pub use scenario::{compare_scenarios, simulate_full_lifecycle, LifecycleResult};
pub use transmission::{compute_transmission, TransmissionParams, TransmissionResult};
