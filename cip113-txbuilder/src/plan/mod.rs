//! Operation planners
//!
//! One planner per user-facing operation. Each consumes an immutable
//! context (deployment bootstrap, blueprints, protocol parameters, a UTxO
//! provider), stages a transaction and hands it to the assembler. UTxO
//! reads always happen in the same order (protocol params, registry,
//! blacklist, wallet balances) so that equal snapshots produce
//! byte-identical transactions.

mod blacklist;
mod mint;
mod register;
mod substandard;
mod transfer;

pub use blacklist::{
    plan_freeze_address, plan_init_blacklist, plan_seize, FreezeAddress, InitBlacklist, Seize,
};
pub use mint::{plan_mint_token, MintToken};
pub use register::{plan_register_token, RegisterToken};
pub use substandard::{Substandard, SubstandardKind};
pub use transfer::{plan_transfer_token, TransferToken};

use cip113_addresses::{Address, Network, ShelleyDelegationPart, ShelleyPaymentPart};
use cip113_blueprint::{base_address, enterprise_address, Blueprint, ProtocolBootstrap};
use cip113_crypto::hash::{Hash, Hasher};
use cip113_primitives::{NetworkId, PlutusData, PolicyId, ScriptHash, TransactionInput, Utxo};
use cip113_registry::RegistryView;
use cip113_uplc::apply_params_to_script;
use tracing::debug;

use crate::asset::ValueBag;
use crate::fee::{total_ex_units, DEFAULT_EX_UNITS};
use crate::params::PParams;
use crate::provider::UtxoProvider;
use crate::select::{select_collateral, select_utxos};
use crate::staging::{Output, ScriptKind, StagingTransaction};
use crate::TxBuilderError;

pub(crate) const ISSUANCE_MINT_TITLE: &str = "issuance_mint.issuance_mint.mint";
pub(crate) const REGISTRY_SPEND_TITLE: &str = "registry_spend.registry_spend.spend";
pub(crate) const REGISTRY_MINT_TITLE: &str = "registry_mint.registry_mint.mint";
pub(crate) const LOGIC_GLOBAL_TITLE: &str =
    "programmable_logic_global.programmable_logic_global.withdraw";
pub(crate) const LOGIC_BASE_TITLE: &str = "programmable_logic_base.programmable_logic_base.spend";

/// A parameterized script ready to witness a transaction
#[derive(Debug, Clone)]
pub(crate) struct PreparedScript {
    pub bytes: Vec<u8>,
    pub hash: ScriptHash,
}

/// Everything a planner call may read; all of it immutable except the
/// provider, which is the single I/O seam
pub struct PlannerContext<'a, P> {
    pub bootstrap: &'a ProtocolBootstrap,
    pub blueprint: &'a Blueprint,
    pub substandard_blueprint: Option<&'a Blueprint>,
    pub pparams: &'a PParams,
    pub network: Network,
    pub provider: &'a P,
}

impl<'a, P: UtxoProvider> PlannerContext<'a, P> {
    pub(crate) fn network_id(&self) -> NetworkId {
        match self.network {
            Network::Testnet => NetworkId::Testnet,
            Network::Mainnet => NetworkId::Mainnet,
        }
    }

    pub(crate) fn substandard(&self) -> Result<&'a Blueprint, TxBuilderError> {
        self.substandard_blueprint.ok_or_else(|| {
            cip113_blueprint::Error::ValidatorNotFound {
                title: "<no substandard blueprint configured>".to_string(),
            }
            .into()
        })
    }

    /// Applies parameters to a blueprint template and hashes the result
    pub(crate) fn parameterize(
        &self,
        blueprint: &Blueprint,
        title: &str,
        params: &[PlutusData],
    ) -> Result<PreparedScript, TxBuilderError> {
        let validator = blueprint.find_validator(title)?;
        let bytes = apply_params_to_script(validator.compiled_code.as_ref(), params)?;
        let hash = Hasher::<224>::hash_tagged(&bytes, ScriptKind::PlutusV3.version_tag());

        debug!(%title, %hash, "parameterized validator");

        Ok(PreparedScript { bytes, hash })
    }

    /// As [Self::parameterize], also checking the derived hash against the
    /// one the deployment snapshot recorded
    pub(crate) fn parameterize_checked(
        &self,
        blueprint: &Blueprint,
        title: &str,
        params: &[PlutusData],
        expected: ScriptHash,
    ) -> Result<PreparedScript, TxBuilderError> {
        let script = self.parameterize(blueprint, title, params)?;

        if script.hash != expected {
            return Err(TxBuilderError::PolicyMismatch {
                expected,
                derived: script.hash,
            });
        }

        Ok(script)
    }

    pub(crate) fn resolve_ref(&self, outpoint: TransactionInput) -> Result<Utxo, TxBuilderError> {
        self.provider
            .resolve_outpoint(&outpoint)
            .map_err(TxBuilderError::provider)?
            .ok_or(TxBuilderError::UtxoNotFound(outpoint))
    }

    /// The protocol-params reference input, resolved to prove it exists
    pub(crate) fn protocol_params_ref(&self) -> Result<Utxo, TxBuilderError> {
        self.resolve_ref(self.bootstrap.protocol_params.tx_input.into())
    }

    pub(crate) fn issuance_params_ref(&self) -> Result<Utxo, TxBuilderError> {
        self.resolve_ref(self.bootstrap.issuance_params.tx_input.into())
    }

    pub(crate) fn registry_address(&self) -> Address {
        enterprise_address(self.bootstrap.registry_spend.script_hash, self.network)
    }

    pub(crate) fn load_registry(&self) -> Result<RegistryView, TxBuilderError> {
        let utxos = self
            .provider
            .utxos_at_address(&self.registry_address())
            .map_err(TxBuilderError::provider)?;

        Ok(RegistryView::load(
            self.bootstrap.registry_mint.script_hash,
            &utxos,
        )?)
    }

    /// The programmable-token address of whoever owns `holder`'s stake key
    pub(crate) fn programmable_address_for(
        &self,
        holder: &Address,
    ) -> Result<Address, TxBuilderError> {
        let stake_key = stake_key_hash_of(holder)?;

        Ok(base_address(
            self.bootstrap.programmable_logic_base.script_hash,
            stake_key,
            self.network,
        ))
    }

    /// Adds fee-covering inputs, collateral and the change address from
    /// the funder's wallet, leaving prior staging content untouched
    pub(crate) fn fund(
        &self,
        mut staging: StagingTransaction,
        funder: &Address,
    ) -> Result<StagingTransaction, TxBuilderError> {
        let wallet = self
            .provider
            .utxos_at_address(funder)
            .map_err(TxBuilderError::provider)?;

        let spent: Vec<TransactionInput> = staging.inputs.iter().map(|u| u.input).collect();
        let available: Vec<Utxo> = wallet
            .into_iter()
            .filter(|u| !spent.contains(&u.input))
            .collect();

        let consumed = staging
            .consumed_value()
            .ok_or_else(|| TxBuilderError::ValueNotConserved("input value overflow".into()))?;
        let produced = staging
            .produced_value()
            .ok_or_else(|| TxBuilderError::ValueNotConserved("output value overflow".into()))?;

        // reserve room for the fee plus min-ada patching of planned outputs
        let budgets: Vec<_> = staging
            .redeemers
            .values()
            .map(|(_, budget)| budget.unwrap_or(DEFAULT_EX_UNITS))
            .collect();
        let script_reserve = self.pparams.script_fee(&total_ex_units(budgets.iter()));
        let reserve = 2_000_000 * staging.outputs.len() as u64 + script_reserve + 1_000_000;

        let mut target = produced;
        target.add_coin(reserve);

        let shortfall = target.missing_from(&consumed);

        if !shortfall.is_zero() {
            for utxo in select_utxos(&available, &shortfall)? {
                staging = staging.input(utxo);
            }
        }

        if !staging.redeemers.is_empty() && staging.collateral_inputs.is_empty() {
            let taken: Vec<TransactionInput> = staging.inputs.iter().map(|u| u.input).collect();
            let candidates: Vec<Utxo> = available
                .iter()
                .filter(|u| !taken.contains(&u.input))
                .cloned()
                .collect();

            staging = staging.collateral_input(select_collateral(&candidates)?);
        }

        Ok(staging.change_address(funder.clone()))
    }
}

/// The holder identity baked into a base address
pub(crate) fn stake_key_hash_of(address: &Address) -> Result<Hash<28>, TxBuilderError> {
    match address {
        Address::Shelley(shelley) => match shelley.delegation() {
            ShelleyDelegationPart::Key(hash) => Ok(*hash),
            _ => Err(TxBuilderError::NoStakeCredential(address.to_string())),
        },
        _ => Err(TxBuilderError::NoStakeCredential(address.to_string())),
    }
}

pub(crate) fn payment_key_hash_of(address: &Address) -> Result<Hash<28>, TxBuilderError> {
    match address {
        Address::Shelley(shelley) => match shelley.payment() {
            ShelleyPaymentPart::Key(hash) => Ok(*hash),
            ShelleyPaymentPart::Script(_) => {
                Err(TxBuilderError::NoPaymentKey(address.to_string()))
            }
        },
        _ => Err(TxBuilderError::NoPaymentKey(address.to_string())),
    }
}

/// An outpoint in its on-chain data representation
pub(crate) fn outpoint_data(input: &TransactionInput) -> PlutusData {
    PlutusData::constr(
        0,
        vec![
            PlutusData::bytes(input.transaction_id.to_vec()),
            PlutusData::int(input.index as i64),
        ],
    )
}

/// A script credential in its on-chain data representation
pub(crate) fn script_credential_data(hash: &Hash<28>) -> PlutusData {
    PlutusData::constr(1, vec![PlutusData::bytes(hash.to_vec())])
}

/// An output carrying one linked-list node: its NFT, its datum, min-ada
/// to be patched in by the assembler
pub(crate) fn node_output(
    address: &Address,
    nft_policy: PolicyId,
    nft_name: &[u8],
    datum: PlutusData,
) -> Output {
    let mut value = ValueBag::new();
    value.add_asset(nft_policy, nft_name.to_vec().into(), 1);

    Output::new(address.clone(), value).with_inline_datum(datum)
}

/// An output carrying programmable tokens at a holder's address, with the
/// unit datum the programmable-logic spend validator expects
pub(crate) fn token_output(
    address: &Address,
    policy: PolicyId,
    asset_name: &[u8],
    quantity: u64,
) -> Output {
    let mut value = ValueBag::new();
    value.add_asset(policy, asset_name.to_vec().into(), quantity);

    Output::new(address.clone(), value).with_inline_datum(PlutusData::constr(0, vec![]))
}
