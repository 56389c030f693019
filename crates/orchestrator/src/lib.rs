pub mod error;
pub mod events;
pub mod executor;
pub mod orchestrator;
pub mod reconcile;
pub mod resolve;
pub mod validate;


pub use error::DeployError;
pub use events::{event_channel, MpscEventSink};
pub use executor::FutureOutcome;
pub use orchestrator::{Deployer, DeployerBuilder, StopHandle};
pub use reconcile::{reconcile, ReconciliationReport};
pub use resolve::{resolve_argument, resolved_inputs};
pub use validate::validate_module;

/// Builder error
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("missing required field: {field}")]
    MissingField { field: String },
}
