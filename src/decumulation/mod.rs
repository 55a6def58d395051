//! Decumulation phase: withdrawal simulation and the constant-annuity formula

mod engine;
mod rows;

pub use engine::{constant_annuity, simulate_decumulation, WithdrawalMode, WithdrawalParams};
pub use rows::{DecumulationResult, DecumulationSummary, WithdrawalRow};
