//! Minting additional supply under an already-registered policy

use cip113_addresses::Address;
use cip113_primitives::{PlutusData, PolicyId};
use tracing::debug;

use crate::build::{assemble, BuiltTransaction};
use crate::plan::{
    script_credential_data, token_output, PlannerContext, Substandard, ISSUANCE_MINT_TITLE,
};
use crate::provider::UtxoProvider;
use crate::staging::{ScriptKind, StagingTransaction};
use crate::TxBuilderError;

#[derive(Debug, Clone)]
pub struct MintToken {
    pub minter_address: Address,
    pub policy_id: PolicyId,
    pub substandard: Substandard,
    pub asset_name: Vec<u8>,
    pub quantity: u64,
    pub recipient_address: Option<Address>,
}

pub fn plan_mint_token<P: UtxoProvider>(
    intent: &MintToken,
    ctx: &PlannerContext<P>,
) -> Result<BuiltTransaction, TxBuilderError> {
    let sub_blueprint = ctx.substandard()?;
    let base_hash = ctx.bootstrap.programmable_logic_base.script_hash;

    let issue = ctx.parameterize(sub_blueprint, &intent.substandard.issue_title, &[])?;

    // the policy id is a pure function of the deployment and the issue
    // script; re-derive and cross-check before minting anything
    let issuance = ctx.parameterize(
        ctx.blueprint,
        ISSUANCE_MINT_TITLE,
        &[
            script_credential_data(&base_hash),
            script_credential_data(&issue.hash),
        ],
    )?;

    if issuance.hash != intent.policy_id {
        return Err(TxBuilderError::PolicyMismatch {
            expected: intent.policy_id,
            derived: issuance.hash,
        });
    }

    let protocol_params_ref = ctx.protocol_params_ref()?;
    let registry = ctx.load_registry()?;

    let node = registry
        .lookup(&intent.policy_id)
        .ok_or(TxBuilderError::NotRegistered(intent.policy_id))?;

    debug!(policy = %intent.policy_id, quantity = intent.quantity, "planning additional mint");

    let recipient = intent
        .recipient_address
        .as_ref()
        .unwrap_or(&intent.minter_address);
    let recipient_programmable = ctx.programmable_address_for(recipient)?;

    let mut staging = StagingTransaction::new()
        .reference_input(protocol_params_ref.input)
        .reference_input(node.utxo.input)
        .withdrawal(
            cip113_blueprint::reward_account_bytes(issue.hash, ctx.network),
            0,
            intent.substandard.issue_redeemer(),
        )
        .script(ScriptKind::PlutusV3, issue.bytes.clone());

    if intent.quantity > 0 {
        staging = staging
            .mint_asset(
                intent.policy_id,
                intent.asset_name.clone(),
                intent.quantity as i64,
                PlutusData::constr(0, vec![script_credential_data(&issue.hash)]),
            )?
            .script(ScriptKind::PlutusV3, issuance.bytes.clone())
            .output(token_output(
                &recipient_programmable,
                intent.policy_id,
                &intent.asset_name,
                intent.quantity,
            ));
    }

    let staging = ctx.fund(staging, &intent.minter_address)?;

    assemble(&staging, ctx.network_id(), ctx.pparams)
}
