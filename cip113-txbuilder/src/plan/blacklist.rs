//! Compliance operations of the freeze-and-seize substandard
//!
//! The blacklist is the registry's little sibling: same sorted linked
//! list, two-field datums, append-only. Initialisation mints the sentinel
//! head; freezing splices a credential in exactly the way registration
//! splices a policy; seizing spends a frozen holder's UTxOs under the
//! third-party validator and routes the balance to the admin.

use cip113_addresses::Address;
use cip113_blueprint::{enterprise_address, reward_account_bytes};
use cip113_crypto::hash::Hash;
use cip113_primitives::{PlutusData, PolicyId, TransactionInput, Utxo};
use cip113_registry::blacklist::{inserted_node, updated_predecessor};
use cip113_registry::{BlacklistNode, BlacklistView};
use tracing::debug;

use crate::asset::ValueBag;
use crate::build::{assemble, BuiltTransaction};
use crate::plan::{
    node_output, outpoint_data, payment_key_hash_of, PlannerContext, Substandard,
    SubstandardKind, LOGIC_BASE_TITLE, LOGIC_GLOBAL_TITLE,
};
use crate::plan::substandard::{BLACKLIST_MINT_TITLE, BLACKLIST_SPEND_TITLE};
use crate::provider::UtxoProvider;
use crate::staging::{Output, ScriptKind, StagingTransaction};
use crate::TxBuilderError;

/// One-shot creation of a substandard's blacklist
#[derive(Debug, Clone)]
pub struct InitBlacklist {
    /// Operates the list; its key parameterizes the node-minting policy
    pub admin_address: Address,
    /// Outpoint consumed to make the policy unique; defaults to the
    /// admin's first wallet UTxO in outpoint order
    pub seed_input: Option<TransactionInput>,
    pub blacklist_mint_title: String,
    pub blacklist_spend_title: String,
}

impl InitBlacklist {
    pub fn new(admin_address: Address) -> Self {
        InitBlacklist {
            admin_address,
            seed_input: None,
            blacklist_mint_title: BLACKLIST_MINT_TITLE.to_string(),
            blacklist_spend_title: BLACKLIST_SPEND_TITLE.to_string(),
        }
    }
}

/// Returns the transaction plus the node policy id the new blacklist
/// lives under; registration of freeze-and-seize tokens wants that id
pub fn plan_init_blacklist<P: UtxoProvider>(
    intent: &InitBlacklist,
    ctx: &PlannerContext<P>,
) -> Result<(BuiltTransaction, PolicyId), TxBuilderError> {
    let sub_blueprint = ctx.substandard()?;
    let admin_key = payment_key_hash_of(&intent.admin_address)?;

    let wallet = ctx
        .provider
        .utxos_at_address(&intent.admin_address)
        .map_err(TxBuilderError::provider)?;

    let seed = match intent.seed_input {
        Some(outpoint) => ctx.resolve_ref(outpoint)?,
        None => wallet
            .iter()
            .min_by_key(|u| u.input)
            .cloned()
            .ok_or(TxBuilderError::NotEnoughFunds {
                unit: "lovelace".into(),
                requested: 1,
                available: 0,
            })?,
    };

    let mint = ctx.parameterize(
        sub_blueprint,
        &intent.blacklist_mint_title,
        &[
            outpoint_data(&seed.input),
            PlutusData::bytes(admin_key.to_vec()),
        ],
    )?;
    let node_policy = mint.hash;

    let spend = ctx.parameterize(
        sub_blueprint,
        &intent.blacklist_spend_title,
        &[PlutusData::bytes(node_policy.to_vec())],
    )?;
    let node_address = enterprise_address(spend.hash, ctx.network);

    debug!(%node_policy, "initialising blacklist");

    let head = BlacklistNode::genesis();

    let staging = StagingTransaction::new()
        .input(seed)
        .mint_asset(
            node_policy,
            vec![],
            1,
            PlutusData::constr(0, vec![]),
        )?
        .script(ScriptKind::PlutusV3, mint.bytes.clone())
        .output(node_output(
            &node_address,
            node_policy,
            head.key.as_ref(),
            head.to_plutus_data(),
        ))
        .disclosed_signer(admin_key);

    let staging = ctx.fund(staging, &intent.admin_address)?;
    let built = assemble(&staging, ctx.network_id(), ctx.pparams)?;

    Ok((built, node_policy))
}

/// Appends a credential to the blacklist
#[derive(Debug, Clone)]
pub struct FreezeAddress {
    pub admin_address: Address,
    /// Stake key hash whose transfers are to be blocked
    pub target_key_hash: Hash<28>,
    pub substandard: Substandard,
    /// The seed outpoint the blacklist was initialised with; needed to
    /// re-derive the node-minting script
    pub blacklist_mint_seed: TransactionInput,
}

pub fn plan_freeze_address<P: UtxoProvider>(
    intent: &FreezeAddress,
    ctx: &PlannerContext<P>,
) -> Result<BuiltTransaction, TxBuilderError> {
    let sub_blueprint = ctx.substandard()?;
    let admin_key = payment_key_hash_of(&intent.admin_address)?;

    let node_policy = intent
        .substandard
        .blacklist_node_policy()
        .ok_or(TxBuilderError::SubstandardMismatch)?;

    let spend = ctx.parameterize(
        sub_blueprint,
        &intent.substandard.blacklist_spend_title,
        &[PlutusData::bytes(node_policy.to_vec())],
    )?;
    let node_address = enterprise_address(spend.hash, ctx.network);

    let mint = ctx.parameterize_checked(
        sub_blueprint,
        &intent.substandard.blacklist_mint_title,
        &[
            outpoint_data(&intent.blacklist_mint_seed),
            PlutusData::bytes(admin_key.to_vec()),
        ],
        node_policy,
    )?;

    let utxos = ctx
        .provider
        .utxos_at_address(&node_address)
        .map_err(TxBuilderError::provider)?;
    let view = BlacklistView::load(node_policy, &utxos)?;

    let predecessor = view.locate_predecessor(&intent.target_key_hash)?;

    debug!(target = %intent.target_key_hash, "freezing credential");

    let updated = updated_predecessor(&predecessor.node, &intent.target_key_hash);
    let fresh = inserted_node(&predecessor.node, &intent.target_key_hash);

    let staging = StagingTransaction::new()
        .script_input(predecessor.utxo.clone(), PlutusData::constr(0, vec![]))
        .script(ScriptKind::PlutusV3, spend.bytes.clone())
        .output(node_output(
            &node_address,
            node_policy,
            updated.key.as_ref(),
            updated.to_plutus_data(),
        ))
        .output(node_output(
            &node_address,
            node_policy,
            fresh.key.as_ref(),
            fresh.to_plutus_data(),
        ))
        .mint_asset(
            node_policy,
            intent.target_key_hash.to_vec(),
            1,
            PlutusData::constr(1, vec![PlutusData::bytes(intent.target_key_hash.to_vec())]),
        )?
        .script(ScriptKind::PlutusV3, mint.bytes.clone())
        .disclosed_signer(admin_key);

    let staging = ctx.fund(staging, &intent.admin_address)?;

    assemble(&staging, ctx.network_id(), ctx.pparams)
}

/// Confiscates a frozen holder's balance of one programmable token
#[derive(Debug, Clone)]
pub struct Seize {
    /// Receives the seized balance at its own programmable address
    pub admin_address: Address,
    pub target_stake_key_hash: Hash<28>,
    pub policy_id: PolicyId,
    pub asset_name: Vec<u8>,
    pub substandard: Substandard,
    /// Identity the third-party validator was parameterized with
    pub admin_key_hash: Option<Hash<28>>,
}

pub fn plan_seize<P: UtxoProvider>(
    intent: &Seize,
    ctx: &PlannerContext<P>,
) -> Result<BuiltTransaction, TxBuilderError> {
    let sub_blueprint = ctx.substandard()?;

    if !matches!(intent.substandard.kind, SubstandardKind::FreezeAndSeize { .. }) {
        return Err(TxBuilderError::SubstandardMismatch);
    }

    let base_hash = ctx.bootstrap.programmable_logic_base.script_hash;
    let global_hash = ctx.bootstrap.programmable_logic_global.script_hash;

    let admin_programmable = ctx.programmable_address_for(&intent.admin_address)?;

    let target_programmable = cip113_blueprint::base_address(
        base_hash,
        intent.target_stake_key_hash,
        ctx.network,
    );

    let protocol_params_ref = ctx.protocol_params_ref()?;

    let registry = ctx.load_registry()?;
    let registry_entry = registry
        .lookup(&intent.policy_id)
        .ok_or(TxBuilderError::NotRegistered(intent.policy_id))?;

    let balances = ctx
        .provider
        .utxos_at_address(&target_programmable)
        .map_err(TxBuilderError::provider)?;

    let mut seized: Vec<Utxo> = balances
        .into_iter()
        .filter(|u| u.value.quantity_of(&intent.policy_id, &intent.asset_name) > 0)
        .collect();
    seized.sort_unstable_by_key(|u| u.input);

    if seized.is_empty() {
        return Err(TxBuilderError::NotEnoughFunds {
            unit: format!("{}.{}", intent.policy_id, hex::encode(&intent.asset_name)),
            requested: 1,
            available: 0,
        });
    }

    let logic_base = ctx.parameterize_checked(
        ctx.blueprint,
        LOGIC_BASE_TITLE,
        &[PlutusData::bytes(global_hash.to_vec())],
        base_hash,
    )?;

    let logic_global = ctx.parameterize_checked(
        ctx.blueprint,
        LOGIC_GLOBAL_TITLE,
        &[PlutusData::bytes(
            ctx.bootstrap.programmable_logic_global.protocol_params_script_hash.to_vec(),
        )],
        global_hash,
    )?;

    // the permissioned escape hatch recorded in the registry node
    let third_party_title = intent
        .substandard
        .third_party_title
        .as_ref()
        .ok_or(TxBuilderError::SubstandardMismatch)?;

    let third_party_params: Vec<PlutusData> = intent
        .admin_key_hash
        .iter()
        .map(|h| PlutusData::bytes(h.to_vec()))
        .collect();
    let third_party = ctx.parameterize(sub_blueprint, third_party_title, &third_party_params)?;

    if third_party.hash.as_ref() != registry_entry.node.third_party_script_hash.as_ref() {
        return Err(TxBuilderError::PolicyMismatch {
            expected: Hash::from_slice(registry_entry.node.third_party_script_hash.as_ref())
                .unwrap_or(third_party.hash),
            derived: third_party.hash,
        });
    }

    let mut sorted_refs = vec![protocol_params_ref.input, registry_entry.utxo.input];
    sorted_refs.sort_unstable();

    let registry_index = registry
        .index_in_sorted_refs(&intent.policy_id, &sorted_refs)
        .ok_or(TxBuilderError::RedeemerTargetMissing)? as u64;

    // all seized assets land in one output at the admin's address
    let mut seized_value = ValueBag::new();
    for utxo in &seized {
        for (policy, name, quantity) in utxo.value.assets() {
            seized_value.add_asset(*policy, name.clone(), quantity);
        }
    }

    debug!(
        target = %intent.target_stake_key_hash,
        utxos = seized.len(),
        "planning seizure"
    );

    let mut staging = StagingTransaction::new();

    for utxo in &seized {
        staging = staging.script_input(utxo.clone(), PlutusData::constr(0, vec![]));
    }

    let global_redeemer = PlutusData::constr(
        0,
        vec![PlutusData::list(vec![PlutusData::constr(
            0,
            vec![PlutusData::int(registry_index as i64)],
        )])],
    );

    staging = staging
        .script(ScriptKind::PlutusV3, logic_base.bytes.clone())
        .reference_input(protocol_params_ref.input)
        .reference_input(registry_entry.utxo.input)
        .withdrawal(
            reward_account_bytes(global_hash, ctx.network),
            0,
            global_redeemer,
        )
        .script(ScriptKind::PlutusV3, logic_global.bytes.clone())
        .withdrawal(
            reward_account_bytes(third_party.hash, ctx.network),
            0,
            PlutusData::constr(0, vec![]),
        )
        .script(ScriptKind::PlutusV3, third_party.bytes.clone())
        .output(
            Output::new(admin_programmable, seized_value)
                .with_inline_datum(PlutusData::constr(0, vec![])),
        );

    if let Some(admin_key) = intent.admin_key_hash {
        staging = staging.disclosed_signer(admin_key);
    }
    staging = staging.disclosed_signer(payment_key_hash_of(&intent.admin_address)?);

    let staging = ctx.fund(staging, &intent.admin_address)?;

    assemble(&staging, ctx.network_id(), ctx.pparams)
}
