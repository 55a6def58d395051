//! Product configuration, client profile and scenario-file loading

mod data;
pub mod loader;

pub use data::{
    CessionTarget, ClientProfile, DistributionStrategy, Envelope, Household, OneOffPayment,
    PaymentSchedule, ProductConfig,
};
pub use loader::ScenarioFile;
