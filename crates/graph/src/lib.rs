pub mod batch;
pub mod error;
pub mod module;

pub use batch::{compute_batches, BatchPlan};
pub use error::GraphError;
pub use module::{Module, ModuleBuilder};
