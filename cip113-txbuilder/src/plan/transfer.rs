//! Transferring programmable tokens between holders
//!
//! Spends the sender's programmable-token UTxOs under the shared
//! programmable-logic spend validator, invokes the global and substandard
//! transfer validators through zero-amount withdrawals, and (for the
//! freeze-and-seize substandard) references one blacklist node per input
//! as a non-membership proof. Redeemer indices point into the canonically
//! sorted input and reference-input lists, so everything index-shaped here
//! is computed against pre-sorted collections.

use cip113_addresses::Address;
use cip113_blueprint::{enterprise_address, reward_account_bytes};
use cip113_primitives::{PlutusData, PolicyId, TransactionInput, Utxo};
use cip113_registry::BlacklistView;
use tracing::debug;

use crate::build::{assemble, BuiltTransaction};
use crate::plan::{
    stake_key_hash_of, token_output, PlannerContext, Substandard, SubstandardKind,
    LOGIC_BASE_TITLE, LOGIC_GLOBAL_TITLE,
};
use crate::provider::UtxoProvider;
use crate::staging::{ScriptKind, StagingTransaction};
use crate::TxBuilderError;

#[derive(Debug, Clone)]
pub struct TransferToken {
    /// The sender's own base address; its stake key is the holder identity
    pub sender_address: Address,
    /// Any address whose stake credential identifies the recipient
    pub recipient_address: Address,
    pub policy_id: PolicyId,
    pub asset_name: Vec<u8>,
    pub quantity: u64,
    pub substandard: Substandard,
}

pub fn plan_transfer_token<P: UtxoProvider>(
    intent: &TransferToken,
    ctx: &PlannerContext<P>,
) -> Result<BuiltTransaction, TxBuilderError> {
    let sub_blueprint = ctx.substandard()?;
    let base_hash = ctx.bootstrap.programmable_logic_base.script_hash;
    let global_hash = ctx.bootstrap.programmable_logic_global.script_hash;

    let sender_stake_key = stake_key_hash_of(&intent.sender_address)?;
    let sender_programmable = ctx.programmable_address_for(&intent.sender_address)?;
    let recipient_programmable = ctx.programmable_address_for(&intent.recipient_address)?;

    // read order: protocol params, registry, blacklist, sender balances
    let protocol_params_ref = ctx.protocol_params_ref()?;

    let registry = ctx.load_registry()?;
    let registry_entry = registry
        .lookup(&intent.policy_id)
        .ok_or(TxBuilderError::NotRegistered(intent.policy_id))?;

    let blacklist = match &intent.substandard.kind {
        SubstandardKind::Dummy => None,
        SubstandardKind::FreezeAndSeize {
            blacklist_node_policy,
        } => {
            let spend = ctx.parameterize(
                sub_blueprint,
                &intent.substandard.blacklist_spend_title,
                &[PlutusData::bytes(blacklist_node_policy.to_vec())],
            )?;
            let node_address = enterprise_address(spend.hash, ctx.network);
            let utxos = ctx
                .provider
                .utxos_at_address(&node_address)
                .map_err(TxBuilderError::provider)?;

            Some(BlacklistView::load(*blacklist_node_policy, &utxos)?)
        }
    };

    let balances = ctx
        .provider
        .utxos_at_address(&sender_programmable)
        .map_err(TxBuilderError::provider)?;

    let selected = select_token_utxos(
        &balances,
        &intent.policy_id,
        &intent.asset_name,
        intent.quantity,
    )?;

    let selected_total: u64 = selected
        .iter()
        .map(|u| u.value.quantity_of(&intent.policy_id, &intent.asset_name))
        .sum();
    let returning = selected_total - intent.quantity;

    debug!(
        inputs = selected.len(),
        moving = intent.quantity,
        returning,
        "planning transfer"
    );

    // validators: shared spend logic, global accounting, substandard rules
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

    let transfer_params = intent.substandard.transfer_script_params(&base_hash);
    let transfer = ctx.parameterize(
        sub_blueprint,
        &intent.substandard.transfer_title,
        &transfer_params,
    )?;

    // the registry records which transfer logic governs this policy; a
    // disagreement means the wrong blueprint or a corrupt snapshot
    if transfer.hash.as_ref() != registry_entry.node.transfer_script_hash.as_ref() {
        return Err(TxBuilderError::PolicyMismatch {
            expected: cip113_crypto::hash::Hash::from_slice(
                registry_entry.node.transfer_script_hash.as_ref(),
            )
            .unwrap_or(transfer.hash),
            derived: transfer.hash,
        });
    }

    // proofs, one per spent input in canonical input order, deduplicated
    // into the reference-input set
    let proofs: Option<Vec<Utxo>> = match &blacklist {
        None => None,
        Some(view) => {
            let mut per_input = Vec::with_capacity(selected.len());
            for _ in &selected {
                let proof = view.non_membership_proof(&sender_stake_key)?;
                per_input.push(proof.utxo.clone());
            }
            Some(per_input)
        }
    };

    // the full reference-input list, sorted the way the body will sort it
    let mut sorted_refs: Vec<TransactionInput> =
        vec![protocol_params_ref.input, registry_entry.utxo.input];

    if let Some(per_input) = &proofs {
        for proof in per_input {
            if !sorted_refs.contains(&proof.input) {
                sorted_refs.push(proof.input);
            }
        }
    }

    sorted_refs.sort_unstable();

    let registry_index = registry
        .index_in_sorted_refs(&intent.policy_id, &sorted_refs)
        .ok_or(TxBuilderError::RedeemerTargetMissing)? as u64;

    let proof_indices: Vec<u64> = match &proofs {
        None => vec![],
        Some(per_input) => per_input
            .iter()
            .map(|proof| {
                sorted_refs
                    .iter()
                    .position(|r| *r == proof.input)
                    .map(|i| i as u64)
                    .ok_or(TxBuilderError::RedeemerTargetMissing)
            })
            .collect::<Result<_, _>>()?,
    };

    // spend redeemers per input, withdrawal invocations pre-sorted by
    // reward address at assembly
    let mut staging = StagingTransaction::new();

    for utxo in &selected {
        staging = staging.script_input(utxo.clone(), PlutusData::constr(0, vec![]));
    }

    staging = staging.script(ScriptKind::PlutusV3, logic_base.bytes.clone());

    for reference in &sorted_refs {
        staging = staging.reference_input(*reference);
    }

    let global_redeemer = PlutusData::constr(
        0,
        vec![PlutusData::list(vec![PlutusData::constr(
            0,
            vec![PlutusData::int(registry_index as i64)],
        )])],
    );

    staging = staging
        .withdrawal(
            reward_account_bytes(global_hash, ctx.network),
            0,
            global_redeemer,
        )
        .script(ScriptKind::PlutusV3, logic_global.bytes.clone())
        .withdrawal(
            reward_account_bytes(transfer.hash, ctx.network),
            0,
            intent.substandard.transfer_redeemer(&proof_indices),
        )
        .script(ScriptKind::PlutusV3, transfer.bytes.clone());

    // outputs: moved amount to the recipient, remainder back to the
    // sender's programmable address, ada change to the sender's own wallet
    staging = staging.output(token_output(
        &recipient_programmable,
        intent.policy_id,
        &intent.asset_name,
        intent.quantity,
    ));

    if returning > 0 {
        staging = staging.output(token_output(
            &sender_programmable,
            intent.policy_id,
            &intent.asset_name,
            returning,
        ));
    }

    staging = staging.disclosed_signer(sender_stake_key);

    let staging = ctx.fund(staging, &intent.sender_address)?;

    assemble(&staging, ctx.network_id(), ctx.pparams)
}

/// Picks the sender's programmable UTxOs holding the transferred unit,
/// richest first, until the requested amount is covered; the result comes
/// back in canonical input order
fn select_token_utxos(
    balances: &[Utxo],
    policy: &PolicyId,
    asset_name: &[u8],
    quantity: u64,
) -> Result<Vec<Utxo>, TxBuilderError> {
    let mut holding: Vec<&Utxo> = balances
        .iter()
        .filter(|u| u.value.quantity_of(policy, asset_name) > 0)
        .collect();

    holding.sort_unstable_by(|a, b| {
        b.value
            .quantity_of(policy, asset_name)
            .cmp(&a.value.quantity_of(policy, asset_name))
            .then_with(|| a.input.cmp(&b.input))
    });

    let mut selected: Vec<Utxo> = Vec::new();
    let mut gathered = 0u64;

    for utxo in holding {
        if gathered >= quantity {
            break;
        }

        gathered += utxo.value.quantity_of(policy, asset_name);
        selected.push(utxo.clone());
    }

    if gathered < quantity {
        return Err(TxBuilderError::NotEnoughFunds {
            unit: format!("{}.{}", policy, hex::encode(asset_name)),
            requested: quantity,
            available: gathered,
        });
    }

    selected.sort_unstable_by_key(|u| u.input);

    Ok(selected)
}
