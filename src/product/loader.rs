//! JSON scenario-file loader
//!
//! Loads a complete scenario (product, client, withdrawal and transmission
//! parameters, plus optional raw fiscal configuration) from one JSON file
//! for the CLI.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::accumulation::SimulationOptions;
use crate::decumulation::WithdrawalParams;
use crate::transmission::TransmissionParams;

use super::data::{ClientProfile, ProductConfig};

/// Errors raised while loading a scenario file.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("cannot read scenario file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid scenario file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A complete scenario as persisted on disk.
///
/// The `fiscality` and `social_levies` members are kept as raw JSON: they go
/// through the tolerant resolver, not through strict deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub product: ProductConfig,
    pub client: ClientProfile,
    pub withdrawal: WithdrawalParams,
    pub transmission: TransmissionParams,
    #[serde(default)]
    pub options: SimulationOptions,
    #[serde(default)]
    pub fiscality: Option<Value>,
    #[serde(default)]
    pub social_levies: Option<Value>,
}

impl ScenarioFile {
    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let file = File::open(path)?;
        let scenario = serde_json::from_reader(BufReader::new(file))?;
        Ok(scenario)
    }
}
