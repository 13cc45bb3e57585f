//! Compiled-validator catalogues and the protocol deployment snapshot
//!
//! Two JSON documents configure every planner: the blueprint (a catalogue
//! of compiled validators addressed by title) and the bootstrap snapshot
//! produced once at deployment, which pins the parameterized script hashes
//! and the outpoints of the protocol parameter UTxOs. Both are consumed
//! read-only.

mod address;
mod blueprint;
mod bootstrap;

pub use address::{base_address, enterprise_address, reward_address, reward_account_bytes};
pub use blueprint::{Blueprint, BlueprintPreamble, BlueprintValidator};
pub use bootstrap::{
    BaseScript, GlobalScript, OutpointRef, ParamsScript, ProtocolBootstrap, RegistryMintScript,
    RegistrySpendScript,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no validator titled '{title}' in blueprint")]
    ValidatorNotFound { title: String },

    #[error("error reading blueprint or bootstrap file: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing blueprint or bootstrap json: {0}")]
    Json(#[from] serde_json::Error),
}
