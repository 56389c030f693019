pub mod artifacts;
pub mod client;
pub mod error;
pub mod fees;
pub mod link;
pub mod nonce;
pub mod supervisor;

pub use artifacts::{ArtifactSource, InMemoryArtifacts};
pub use client::{ChainClient, PollResult, TransactionRequest};
pub use error::ChainError;
pub use fees::next_fees;
pub use link::link_bytecode;
pub use nonce::NonceManager;
pub use supervisor::{
    supervise_interaction, InteractionObserver, InteractionOutcome, ResendKind, SupervisorPolicy,
};
