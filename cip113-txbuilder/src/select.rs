//! Wallet-side coin selection
//!
//! Largest-first accumulation with a deterministic improvement pass: if a
//! single UTxO covers the whole target with less total value than the
//! accumulated set, it wins. Determinism is part of the planner contract
//! (equal snapshots must yield byte-identical transactions), so no
//! randomness enters the picture; ties always break on outpoint order.

use cip113_primitives::Utxo;

use crate::asset::ValueBag;
use crate::TxBuilderError;

/// Smallest acceptable collateral, in lovelace
pub const MIN_COLLATERAL: u64 = 5_000_000;

/// Picks wallet UTxOs whose combined value covers `target`
///
/// Returns the selection; the leftover becomes the change output during
/// assembly. Fails with [TxBuilderError::NotEnoughFunds] naming the first
/// uncoverable unit.
pub fn select_utxos(utxos: &[Utxo], target: &ValueBag) -> Result<Vec<Utxo>, TxBuilderError> {
    let mut pool: Vec<&Utxo> = utxos.iter().collect();
    pool.sort_unstable_by(|a, b| {
        b.coin()
            .cmp(&a.coin())
            .then_with(|| a.input.cmp(&b.input))
    });

    let mut selected: Vec<&Utxo> = Vec::new();
    let mut gathered = ValueBag::new();

    // cover each demanded asset first, richest holding first
    for (policy, name, required) in target.iter_assets() {
        let mut held = gathered.quantity_of(policy, name.as_ref());

        if held >= required {
            continue;
        }

        let mut candidates: Vec<&Utxo> = pool
            .iter()
            .filter(|u| {
                u.value.quantity_of(policy, name.as_ref()) > 0
                    && !selected.iter().any(|s| s.input == u.input)
            })
            .copied()
            .collect();

        candidates.sort_unstable_by(|a, b| {
            b.value
                .quantity_of(policy, name.as_ref())
                .cmp(&a.value.quantity_of(policy, name.as_ref()))
                .then_with(|| a.input.cmp(&b.input))
        });

        for utxo in candidates {
            if held >= required {
                break;
            }

            held += utxo.value.quantity_of(policy, name.as_ref());
            gathered = gathered
                .checked_add(&ValueBag::from_wire(&utxo.value))
                .ok_or_else(|| TxBuilderError::ValueNotConserved("selection overflow".into()))?;
            selected.push(utxo);
        }

        if held < required {
            return Err(TxBuilderError::NotEnoughFunds {
                unit: format!("{}.{}", policy, name),
                requested: required,
                available: held,
            });
        }
    }

    // then cover the coin target, largest first
    for utxo in &pool {
        if gathered.covers(target) {
            break;
        }

        if selected.iter().any(|s| s.input == utxo.input) {
            continue;
        }

        gathered = gathered
            .checked_add(&ValueBag::from_wire(&utxo.value))
            .ok_or_else(|| TxBuilderError::ValueNotConserved("selection overflow".into()))?;
        selected.push(utxo);
    }

    if !gathered.covers(target) {
        return Err(TxBuilderError::NotEnoughFunds {
            unit: "lovelace".into(),
            requested: target.coin(),
            available: gathered.coin(),
        });
    }

    // improvement: one UTxO that alone covers the target and wastes less
    if selected.len() > 1 {
        let single = pool
            .iter()
            .filter(|u| ValueBag::from_wire(&u.value).covers(target))
            .min_by(|a, b| a.coin().cmp(&b.coin()).then_with(|| a.input.cmp(&b.input)));

        if let Some(single) = single {
            if single.coin() < gathered.coin() {
                return Ok(vec![(*single).clone()]);
            }
        }
    }

    Ok(selected.into_iter().cloned().collect())
}

/// Picks the collateral input: the smallest pure-ada UTxO of at least
/// [MIN_COLLATERAL], so a script failure burns as little as possible
pub fn select_collateral(utxos: &[Utxo]) -> Result<Utxo, TxBuilderError> {
    utxos
        .iter()
        .filter(|u| {
            u.coin() >= MIN_COLLATERAL && !ValueBag::from_wire(&u.value).has_assets()
        })
        .min_by(|a, b| a.coin().cmp(&b.coin()).then_with(|| a.input.cmp(&b.input)))
        .cloned()
        .ok_or(TxBuilderError::MissingCollateral(MIN_COLLATERAL))
}
