//! Canonical assembly of staged transactions
//!
//! Everything order-sensitive happens here, once, in one place: inputs and
//! reference inputs sort by outpoint, mint entries by policy then asset
//! name, withdrawals by reward-account bytes, required signers by key
//! hash, and redeemers carry indices resolved against those sorted
//! collections. On-chain validators recompute the same orders, so any
//! deviation is a phase-2 failure.

use cip113_codec::utils::{Bytes, CborWrap, NonEmptySet, NonZeroInt};
use cip113_crypto::hash::Hash;
use cip113_primitives::script_data::ScriptData;
use cip113_primitives::{
    DatumOption, Fragment, NetworkId, PlutusData, PlutusScript, Redeemer, RedeemerTag,
    TransactionBody, TransactionInput, TransactionOutput, Tx, WitnessSet,
};
use tracing::debug;

use crate::asset::ValueBag;
use crate::fee::{total_ex_units, DEFAULT_EX_UNITS, MAX_FEE_ROUNDS, PROVISIONAL_FEE};
use crate::params::PParams;
use crate::staging::{Datum, Output, RedeemerPurpose, ScriptKind, StagingTransaction};
use crate::TxBuilderError;

/// A finished unsigned transaction
///
/// `tx_bytes` is the full envelope (body, script/datum/redeemer
/// witnesses, no signatures); `tx_hash` is the body hash a wallet signs.
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    pub tx_hash: Hash<32>,
    pub tx_bytes: Bytes,
    pub fee: u64,
    pub tx: Tx,
}

/// Turns a staged transaction into its canonical unsigned form
pub fn assemble(
    staging: &StagingTransaction,
    network: NetworkId,
    pparams: &PParams,
) -> Result<BuiltTransaction, TxBuilderError> {
    // canonical input order, resolved and chained inputs together
    let mut inputs: Vec<TransactionInput> = staging
        .inputs
        .iter()
        .map(|u| u.input)
        .chain(staging.unresolved_inputs.iter().copied())
        .collect();
    inputs.sort_unstable();

    let mut reference_inputs = staging.reference_inputs.clone();
    reference_inputs.sort_unstable();

    let mut collateral: Vec<TransactionInput> =
        staging.collateral_inputs.iter().map(|u| u.input).collect();
    collateral.sort_unstable();

    // mint map with net-zero entries dropped
    let mint_entries: Vec<(Hash<28>, Vec<(Bytes, i64)>)> = staging
        .mint
        .iter()
        .filter_map(|(policy, names)| {
            let names: Vec<(Bytes, i64)> = names
                .iter()
                .filter(|(_, amount)| **amount != 0)
                .map(|(name, amount)| (name.clone(), *amount))
                .collect();

            (!names.is_empty()).then_some((*policy, names))
        })
        .collect();

    let mint_policies: Vec<Hash<28>> = mint_entries.iter().map(|(p, _)| *p).collect();

    let mint: Option<cip113_primitives::Mint> = if mint_entries.is_empty() {
        None
    } else {
        Some(
            mint_entries
                .iter()
                .map(|(policy, names)| {
                    let names = names
                        .iter()
                        .map(|(name, amount)| {
                            let amount = NonZeroInt::try_from(*amount)
                                .expect("zero amounts filtered above");
                            (name.clone(), amount)
                        })
                        .collect::<Vec<_>>()
                        .into();
                    (*policy, names)
                })
                .collect::<Vec<_>>()
                .into(),
        )
    };

    let withdrawal_accounts: Vec<Bytes> = staging.withdrawals.keys().cloned().collect();

    let withdrawals: Option<cip113_primitives::Withdrawals> = if staging.withdrawals.is_empty() {
        None
    } else {
        Some(
            staging
                .withdrawals
                .iter()
                .map(|(account, amount)| (account.clone(), *amount))
                .collect::<Vec<_>>()
                .into(),
        )
    };

    // outputs with min-ada patched up before balancing
    let patched_outputs: Vec<Output> = staging
        .outputs
        .iter()
        .map(|o| patch_min_ada(o.clone(), pparams))
        .collect::<Result<_, _>>()?;

    let outputs_wire: Vec<TransactionOutput> = patched_outputs
        .iter()
        .map(output_to_wire)
        .collect::<Result<_, _>>()?;

    // balance
    let consumed = staging
        .consumed_value()
        .ok_or_else(|| TxBuilderError::ValueNotConserved("input value overflow".into()))?;

    let mut produced = ValueBag::new();
    for output in &patched_outputs {
        produced = produced
            .checked_add(&output.value)
            .ok_or_else(|| TxBuilderError::ValueNotConserved("output value overflow".into()))?;
    }
    for (policy, names) in &mint_entries {
        for (name, amount) in names {
            if *amount < 0 {
                let mut burned = ValueBag::new();
                burned.add_asset(*policy, name.clone(), amount.unsigned_abs());
                produced = produced.checked_add(&burned).ok_or_else(|| {
                    TxBuilderError::ValueNotConserved("burn value overflow".into())
                })?;
            }
        }
    }

    let available = consumed
        .checked_sub(&produced)
        .ok_or_else(|| diagnose_shortfall(&consumed, &produced))?;

    // redeemers indexed against the sorted collections
    let mut redeemers: Vec<Redeemer> = Vec::with_capacity(staging.redeemers.len());

    for (purpose, (data, budget)) in &staging.redeemers {
        let (tag, index) = match purpose {
            RedeemerPurpose::Spend(input) => {
                let index = inputs
                    .iter()
                    .position(|x| x == input)
                    .ok_or(TxBuilderError::RedeemerTargetMissing)?;
                (RedeemerTag::Spend, index)
            }
            RedeemerPurpose::Mint(policy) => {
                let index = mint_policies
                    .iter()
                    .position(|x| x == policy)
                    .ok_or(TxBuilderError::RedeemerTargetMissing)?;
                (RedeemerTag::Mint, index)
            }
            RedeemerPurpose::Reward(account) => {
                let index = withdrawal_accounts
                    .iter()
                    .position(|x| x == account)
                    .ok_or(TxBuilderError::RedeemerTargetMissing)?;
                (RedeemerTag::Reward, index)
            }
        };

        redeemers.push(Redeemer {
            tag,
            index: index as u32,
            data: data.clone(),
            ex_units: budget.unwrap_or(DEFAULT_EX_UNITS),
        });
    }

    redeemers.sort_unstable_by_key(|r| (r.tag, r.index));

    if !redeemers.is_empty() && collateral.is_empty() {
        return Err(TxBuilderError::MissingCollateral(
            crate::select::MIN_COLLATERAL,
        ));
    }

    // witness scripts partitioned by language, in hash order
    let (mut v1, mut v2, mut v3) = (vec![], vec![], vec![]);

    for witness in staging.scripts.values() {
        match witness.kind {
            ScriptKind::PlutusV1 => v1.push(PlutusScript::<1>(witness.bytes.clone())),
            ScriptKind::PlutusV2 => v2.push(PlutusScript::<2>(witness.bytes.clone())),
            ScriptKind::PlutusV3 => v3.push(PlutusScript::<3>(witness.bytes.clone())),
        }
    }

    let datums: Vec<PlutusData> = staging.datums.values().cloned().collect();
    let witness_datums = NonEmptySet::from_vec(datums);

    let script_data_hash = if redeemers.is_empty() && witness_datums.is_none() {
        None
    } else {
        let languages: Vec<u8> = staging
            .scripts
            .values()
            .map(|w| w.kind.language())
            .collect();

        Some(
            ScriptData {
                redeemers: redeemers.clone(),
                datums: witness_datums.clone(),
                language_views: pparams.language_views_for(&languages),
            }
            .hash(),
        )
    };

    let total_units = total_ex_units(redeemers.iter().map(|r| &r.ex_units));

    let required_signers: Vec<Hash<28>> = staging.required_signers.iter().copied().collect();

    let witness_set = WitnessSet {
        vkeywitness: None,
        plutus_v1_script: NonEmptySet::from_vec(v1),
        plutus_data: witness_datums,
        redeemer: (!redeemers.is_empty()).then(|| redeemers.clone()),
        plutus_v2_script: NonEmptySet::from_vec(v2),
        plutus_v3_script: NonEmptySet::from_vec(v3),
    };

    // fee fixpoint: candidate -> realized tx -> recomputed candidate
    let mut candidate = PROVISIONAL_FEE;

    for _ in 0..MAX_FEE_ROUNDS {
        let (tx, tx_bytes) = realize(
            staging,
            pparams,
            network,
            candidate,
            &available,
            &consumed,
            &produced,
            RealizeParts {
                inputs: &inputs,
                reference_inputs: &reference_inputs,
                collateral: &collateral,
                outputs_wire: &outputs_wire,
                mint: &mint,
                withdrawals: &withdrawals,
                required_signers: &required_signers,
                script_data_hash,
                witness_set: &witness_set,
            },
        )?;

        let computed = pparams.min_fee(tx_bytes.len()) + pparams.script_fee(&total_units);

        if computed == candidate {
            debug!(fee = tx.transaction_body.fee, size = tx_bytes.len(), "assembled transaction");

            return Ok(BuiltTransaction {
                tx_hash: tx.transaction_body.compute_hash(),
                fee: tx.transaction_body.fee,
                tx_bytes: tx_bytes.into(),
                tx,
            });
        }

        candidate = computed;
    }

    Err(TxBuilderError::FeeConvergenceFailed(MAX_FEE_ROUNDS))
}

struct RealizeParts<'a> {
    inputs: &'a [TransactionInput],
    reference_inputs: &'a [TransactionInput],
    collateral: &'a [TransactionInput],
    outputs_wire: &'a [TransactionOutput],
    mint: &'a Option<cip113_primitives::Mint>,
    withdrawals: &'a Option<cip113_primitives::Withdrawals>,
    required_signers: &'a [Hash<28>],
    script_data_hash: Option<Hash<32>>,
    witness_set: &'a WitnessSet,
}

#[allow(clippy::too_many_arguments)]
fn realize(
    staging: &StagingTransaction,
    pparams: &PParams,
    network: NetworkId,
    fee_candidate: u64,
    available: &ValueBag,
    consumed: &ValueBag,
    produced: &ValueBag,
    parts: RealizeParts,
) -> Result<(Tx, Vec<u8>), TxBuilderError> {
    if available.coin() < fee_candidate {
        return Err(TxBuilderError::NotEnoughFunds {
            unit: "lovelace".into(),
            requested: produced.coin() + fee_candidate,
            available: consumed.coin(),
        });
    }

    let mut change = available.clone();
    change.set_coin(available.coin() - fee_candidate);

    let mut fee = fee_candidate;
    let mut outputs = parts.outputs_wire.to_vec();
    let mut change_emitted = ValueBag::new();

    if !change.is_zero() {
        let change_address = staging.change_address.as_ref().ok_or_else(|| {
            TxBuilderError::ValueNotConserved("change left over but no change address set".into())
        })?;

        let change_output = Output::new(change_address.clone(), change.clone());
        let wire = output_to_wire(&change_output)?;
        let size = wire
            .encode_fragment()
            .map_err(|e| TxBuilderError::ValueNotConserved(e.to_string()))?
            .len();
        let min_ada = pparams.min_ada_for_size(size);

        if change.has_assets() {
            if change.coin() < min_ada {
                return Err(TxBuilderError::NotEnoughFunds {
                    unit: "lovelace".into(),
                    requested: produced.coin() + fee_candidate + min_ada,
                    available: consumed.coin(),
                });
            }
            change_emitted = change;
            outputs.push(wire);
        } else if change.coin() < min_ada {
            // ada dust folds into the fee rather than an undersized output
            fee += change.coin();
        } else {
            change_emitted = change;
            outputs.push(wire);
        }
    }

    // conservation: consumed must equal produced + change + fee exactly
    let accounted = produced
        .checked_add(&change_emitted)
        .and_then(|x| x.checked_add(&ValueBag::lovelace(fee)))
        .ok_or_else(|| TxBuilderError::ValueNotConserved("accounting overflow".into()))?;

    if accounted != *consumed {
        return Err(TxBuilderError::ValueNotConserved(format!(
            "consumed {} lovelace, accounted {} lovelace",
            consumed.coin(),
            accounted.coin()
        )));
    }

    let body = TransactionBody {
        inputs: parts.inputs.to_vec().into(),
        outputs,
        fee,
        ttl: None,
        withdrawals: parts.withdrawals.clone(),
        auxiliary_data_hash: None,
        validity_interval_start: None,
        mint: parts.mint.clone(),
        script_data_hash: parts.script_data_hash,
        collateral: NonEmptySet::from_vec(parts.collateral.to_vec()),
        required_signers: NonEmptySet::from_vec(parts.required_signers.to_vec()),
        network_id: Some(network),
        collateral_return: None,
        total_collateral: None,
        reference_inputs: NonEmptySet::from_vec(parts.reference_inputs.to_vec()),
    };

    let tx = Tx {
        transaction_body: body,
        transaction_witness_set: parts.witness_set.clone(),
        success: true,
    };

    let bytes = tx
        .encode_fragment()
        .map_err(|e| TxBuilderError::ValueNotConserved(e.to_string()))?;

    Ok((tx, bytes))
}

/// Raises an output's coin to the storage minimum for its serialized size
fn patch_min_ada(mut output: Output, pparams: &PParams) -> Result<Output, TxBuilderError> {
    for _ in 0..3 {
        let wire = output_to_wire(&output)?;
        let size = wire
            .encode_fragment()
            .map_err(|e| TxBuilderError::ValueNotConserved(e.to_string()))?
            .len();
        let required = pparams.min_ada_for_size(size);

        if output.value.coin() >= required {
            break;
        }

        output.value.set_coin(required);
    }

    Ok(output)
}

fn output_to_wire(output: &Output) -> Result<TransactionOutput, TxBuilderError> {
    let datum_option = output.datum.as_ref().map(|datum| match datum {
        Datum::Inline(data) => DatumOption::Data(CborWrap(data.clone())),
        Datum::Hash(hash) => DatumOption::Hash(*hash),
    });

    Ok(TransactionOutput {
        address: output.address.to_vec().into(),
        value: output.value.to_wire(),
        datum_option,
        script_ref: None,
    })
}

fn diagnose_shortfall(consumed: &ValueBag, produced: &ValueBag) -> TxBuilderError {
    for (policy, name, quantity) in produced.iter_assets() {
        let held = consumed.quantity_of(policy, name.as_ref());
        if held < quantity {
            return TxBuilderError::ValueNotConserved(format!(
                "outputs demand {} of {}.{} but inputs and mints provide {}",
                quantity,
                policy,
                name,
                held
            ));
        }
    }

    TxBuilderError::NotEnoughFunds {
        unit: "lovelace".into(),
        requested: produced.coin(),
        available: consumed.coin(),
    }
}
