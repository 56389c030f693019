pub mod error;
pub mod file;
pub mod memory;
pub mod record;
pub mod store;

pub use error::JournalError;
pub use file::FileJournal;
pub use memory::InMemoryJournal;
pub use record::{replay, JournalLine, JournalRecord};
pub use store::{DeploymentSnapshot, Journal};
