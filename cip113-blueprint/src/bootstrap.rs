use std::path::Path;

use serde::Deserialize;

use cip113_crypto::hash::Hash;
use cip113_primitives::TransactionInput;

use crate::Error;

/// An outpoint as spelled in deployment JSON
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OutpointRef {
    pub tx_hash: Hash<32>,
    pub index: u64,
}

impl From<OutpointRef> for TransactionInput {
    fn from(value: OutpointRef) -> Self {
        TransactionInput::new(value.tx_hash, value.index)
    }
}

/// The once-per-deployment snapshot of parameterized protocol scripts
///
/// Every `script_hash` below must equal the hash obtained by applying the
/// listed parameters to the corresponding blueprint template; planners
/// re-derive and cross-check where the spec demands it.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolBootstrap {
    /// Transaction that deployed the protocol
    pub tx_hash: Hash<32>,

    pub protocol_params: ParamsScript,
    pub issuance_params: ParamsScript,
    pub programmable_logic_global: GlobalScript,
    pub programmable_logic_base: BaseScript,
    pub registry_spend: RegistrySpendScript,
    pub registry_mint: RegistryMintScript,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ParamsScript {
    pub script_hash: Hash<28>,
    /// Where the params UTxO sits on chain; a planner reference input
    pub tx_input: OutpointRef,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GlobalScript {
    pub script_hash: Hash<28>,
    pub protocol_params_script_hash: Hash<28>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BaseScript {
    pub script_hash: Hash<28>,
    pub programmable_logic_global_script_hash: Hash<28>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySpendScript {
    pub script_hash: Hash<28>,
    pub protocol_params_script_hash: Hash<28>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RegistryMintScript {
    pub script_hash: Hash<28>,
    pub tx_input: OutpointRef,
    pub issuance_script_hash: Hash<28>,
}

impl ProtocolBootstrap {
    pub fn from_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}
