//! Operation planners and canonical transaction assembly
//!
//! The flow is: an intent (register, mint, transfer, freeze, seize) goes
//! into a planner, the planner reads immutable snapshots (deployment
//! bootstrap, blueprints, registry and blacklist views, wallet UTxOs) and
//! fills a [staging::StagingTransaction]; the assembler then turns that
//! staging model into a canonical unsigned transaction whose every sort
//! order matches what the on-chain validators recompute. Nothing in this
//! crate holds mutable state between calls and nothing performs I/O except
//! through the [provider::UtxoProvider] the caller hands in.

pub mod asset;
pub mod build;
pub mod fee;
pub mod params;
pub mod plan;
pub mod provider;
pub mod select;
pub mod staging;

pub use asset::ValueBag;
pub use build::{assemble, BuiltTransaction};
pub use params::PParams;
pub use plan::{
    FreezeAddress, InitBlacklist, MintToken, PlannerContext, RegisterToken, Seize, Substandard,
    SubstandardKind, TransferToken,
};
pub use provider::UtxoProvider;
pub use staging::{Output, RedeemerPurpose, ScriptKind, StagingTransaction};

use cip113_primitives::{PolicyId, ScriptHash, TransactionInput};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxBuilderError {
    #[error(transparent)]
    Blueprint(#[from] cip113_blueprint::Error),

    #[error(transparent)]
    Registry(#[from] cip113_registry::Error),

    #[error("script parameter application failed: {0}")]
    ScriptParams(#[from] cip113_uplc::Error),

    #[error("bad address: {0}")]
    Address(#[from] cip113_addresses::Error),

    #[error("utxo provider failure: {0}")]
    Provider(String),

    #[error("utxo {0} could not be resolved")]
    UtxoNotFound(TransactionInput),

    #[error("derived script hash {derived} does not match the recorded hash {expected}")]
    PolicyMismatch {
        expected: ScriptHash,
        derived: ScriptHash,
    },

    #[error("policy {0} is not present in the registry")]
    NotRegistered(PolicyId),

    #[error("not enough funds: need {requested} of {unit}, found {available}")]
    NotEnoughFunds {
        unit: String,
        requested: u64,
        available: u64,
    },

    #[error("no pure-ada collateral utxo of at least {0} lovelace")]
    MissingCollateral(u64),

    #[error("fee did not stabilize after {0} rounds")]
    FeeConvergenceFailed(usize),

    #[error("value not conserved: {0}")]
    ValueNotConserved(String),

    #[error("input, policy or withdrawal pointed to by a redeemer is not in the tx")]
    RedeemerTargetMissing,

    #[error("asset name must be 32 bytes or less")]
    AssetNameTooLong,

    #[error("address {0} has no stake credential to derive the holder identity from")]
    NoStakeCredential(String),

    #[error("address {0} is not controlled by a payment key")]
    NoPaymentKey(String),

    #[error("this operation requires the freeze-and-seize substandard")]
    SubstandardMismatch,
}

impl TxBuilderError {
    pub(crate) fn provider(e: provider::ProviderError) -> Self {
        TxBuilderError::Provider(e.to_string())
    }
}
