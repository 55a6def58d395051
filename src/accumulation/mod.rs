//! Accumulation phase: year-by-year savings simulation

mod engine;
mod rows;
mod state;

pub use engine::{simulate_accumulation, AccumulationSimulator, SimulationOptions};
pub use rows::{AccumulationResult, AccumulationRow, AccumulationSummary};
pub use state::{AccumulationState, PendingReinvestment};
