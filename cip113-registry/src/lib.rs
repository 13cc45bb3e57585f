//! In-memory views over the protocol's on-chain sorted linked lists
//!
//! Both the token registry and the compliance blacklist live on chain as a
//! set of NFT-carrying UTxOs whose datums form a singly-linked list sorted
//! by key: one sentinel head with an empty key, one tail whose `next` is
//! the 30-byte 0xFF terminator, and a gap between consecutive keys for
//! every absent key. The views here are rebuilt from UTxO snapshots on
//! demand and hold no durable state; planners read them to find insertion
//! predecessors and to build non-membership proofs.

pub mod blacklist;
pub mod chain;
pub mod registry;

pub use blacklist::{BlacklistEntry, BlacklistNode, BlacklistView};
pub use chain::{ChainNode, Position, TAIL_TERMINATOR};
pub use registry::{RegistryEntry, RegistryNode, RegistryView};

use cip113_primitives::TransactionInput;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("on-chain list invariant violated: {reason}")]
    Inconsistent { reason: String },

    #[error("cannot parse node datum of {input}: {reason}")]
    BadDatum {
        input: TransactionInput,
        reason: String,
    },

    #[error("policy {0} is already registered")]
    AlreadyRegistered(String),

    #[error("credential {0} is blacklisted")]
    Blacklisted(String),
}

impl Error {
    fn inconsistent(reason: impl Into<String>) -> Self {
        Error::Inconsistent {
            reason: reason.into(),
        }
    }
}
