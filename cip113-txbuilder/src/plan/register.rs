//! Registering a new programmable-token policy
//!
//! One transaction that derives the new policy id, splices a node into the
//! on-chain registry between its predecessor and successor, mints the
//! registry NFT and (optionally) the initial token supply, and invokes the
//! substandard's issue validator through a zero-amount withdrawal.

use cip113_addresses::Address;
use cip113_crypto::hash::Hash;
use cip113_primitives::{PlutusData, TransactionInput};
use cip113_registry::registry::{inserted_node, updated_predecessor};
use tracing::debug;

use crate::build::{assemble, BuiltTransaction};
use crate::plan::{
    node_output, outpoint_data, script_credential_data, token_output, PlannerContext, Substandard,
    ISSUANCE_MINT_TITLE, REGISTRY_MINT_TITLE, REGISTRY_SPEND_TITLE,
};
use crate::provider::UtxoProvider;
use crate::staging::{ScriptKind, StagingTransaction};
use crate::TxBuilderError;

#[derive(Debug, Clone)]
pub struct RegisterToken {
    /// Pays fees and deposits; receives the minted supply by default
    pub registrar_address: Address,
    pub substandard: Substandard,
    pub asset_name: Vec<u8>,
    pub quantity: u64,
    pub recipient_address: Option<Address>,
    /// Admin identity for substandards whose scripts check one
    pub admin_key_hash: Option<Hash<28>>,
    /// Output of a not-yet-confirmed transaction this one builds upon
    pub chaining_input: Option<TransactionInput>,
}

pub fn plan_register_token<P: UtxoProvider>(
    intent: &RegisterToken,
    ctx: &PlannerContext<P>,
) -> Result<BuiltTransaction, TxBuilderError> {
    let sub_blueprint = ctx.substandard()?;
    let base_hash = ctx.bootstrap.programmable_logic_base.script_hash;

    // substandard validators, parameterized per their own rules
    let issue = ctx.parameterize(sub_blueprint, &intent.substandard.issue_title, &[])?;

    let transfer_params = intent.substandard.transfer_script_params(&base_hash);
    let transfer = ctx.parameterize(
        sub_blueprint,
        &intent.substandard.transfer_title,
        &transfer_params,
    )?;

    let third_party = intent
        .substandard
        .third_party_title
        .as_ref()
        .map(|title| {
            let params: Vec<PlutusData> = intent
                .admin_key_hash
                .iter()
                .map(|h| PlutusData::bytes(h.to_vec()))
                .collect();
            ctx.parameterize(sub_blueprint, title, &params)
        })
        .transpose()?;

    // the issuance policy: derived, never configured
    let issuance = ctx.parameterize(
        ctx.blueprint,
        ISSUANCE_MINT_TITLE,
        &[
            script_credential_data(&base_hash),
            script_credential_data(&issue.hash),
        ],
    )?;
    let policy_id = issuance.hash;

    debug!(%policy_id, "derived policy for registration");

    // read order: protocol params first, then the registry snapshot
    let protocol_params_ref = ctx.protocol_params_ref()?;
    let issuance_params_ref = ctx.issuance_params_ref()?;
    let registry = ctx.load_registry()?;

    let predecessor = registry.locate_predecessor(&policy_id)?;

    let registry_spend = ctx.parameterize_checked(
        ctx.blueprint,
        REGISTRY_SPEND_TITLE,
        &[PlutusData::bytes(
            ctx.bootstrap.registry_spend.protocol_params_script_hash.to_vec(),
        )],
        ctx.bootstrap.registry_spend.script_hash,
    )?;

    let registry_mint = ctx.parameterize_checked(
        ctx.blueprint,
        REGISTRY_MINT_TITLE,
        &[
            outpoint_data(&ctx.bootstrap.registry_mint.tx_input.into()),
            PlutusData::bytes(ctx.bootstrap.registry_mint.issuance_script_hash.to_vec()),
        ],
        ctx.bootstrap.registry_mint.script_hash,
    )?;

    let registry_address = ctx.registry_address();
    let registry_nft_policy = ctx.bootstrap.registry_mint.script_hash;

    // splice: spend p, emit p' (next repointed) and the fresh node
    let updated = updated_predecessor(&predecessor.node, &policy_id);
    let fresh = inserted_node(
        &predecessor.node,
        &policy_id,
        transfer.hash.to_vec().into(),
        third_party
            .as_ref()
            .map(|s| s.hash.to_vec().into())
            .unwrap_or_else(cip113_codec::utils::Bytes::empty),
    );

    let mut staging = StagingTransaction::new()
        .script_input(predecessor.utxo.clone(), PlutusData::constr(0, vec![]))
        .script(ScriptKind::PlutusV3, registry_spend.bytes.clone())
        .output(node_output(
            &registry_address,
            registry_nft_policy,
            updated.key.as_ref(),
            updated.to_plutus_data(),
        ))
        .output(node_output(
            &registry_address,
            registry_nft_policy,
            fresh.key.as_ref(),
            fresh.to_plutus_data(),
        ))
        .mint_asset(
            registry_nft_policy,
            policy_id.to_vec(),
            1,
            PlutusData::constr(
                1,
                vec![
                    PlutusData::bytes(policy_id.to_vec()),
                    PlutusData::bytes(issue.hash.to_vec()),
                ],
            ),
        )?
        .script(ScriptKind::PlutusV3, registry_mint.bytes.clone());

    if intent.quantity > 0 {
        let recipient = intent
            .recipient_address
            .as_ref()
            .unwrap_or(&intent.registrar_address);
        let recipient_programmable = ctx.programmable_address_for(recipient)?;

        staging = staging
            .mint_asset(
                policy_id,
                intent.asset_name.clone(),
                intent.quantity as i64,
                PlutusData::constr(0, vec![script_credential_data(&issue.hash)]),
            )?
            .script(ScriptKind::PlutusV3, issuance.bytes.clone())
            .output(token_output(
                &recipient_programmable,
                policy_id,
                &intent.asset_name,
                intent.quantity,
            ));
    }

    // invoke the substandard issue validator at zero withdrawal
    staging = staging
        .withdrawal(
            cip113_blueprint::reward_account_bytes(issue.hash, ctx.network),
            0,
            intent.substandard.issue_redeemer(),
        )
        .script(ScriptKind::PlutusV3, issue.bytes.clone())
        .reference_input(protocol_params_ref.input)
        .reference_input(issuance_params_ref.input);

    if let Some(chained) = intent.chaining_input {
        staging = staging.unresolved_input(chained);
    }

    if let Some(admin) = intent.admin_key_hash {
        staging = staging.disclosed_signer(admin);
    }

    let staging = ctx.fund(staging, &intent.registrar_address)?;

    assemble(&staging, ctx.network_id(), ctx.pparams)
}
