//! Multi-asset value arithmetic for planning and balancing
//!
//! The wire [Value](cip113_primitives::Value) keeps whatever order it was
//! built with; this bag keeps assets in sorted maps so that sums,
//! subtractions and the final conversion back to the wire form are
//! deterministic.

use std::collections::BTreeMap;

use cip113_codec::utils::{Bytes, PositiveCoin};
use cip113_primitives::{PolicyId, Value};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueBag {
    coin: u64,
    assets: BTreeMap<PolicyId, BTreeMap<Bytes, u64>>,
}

impl ValueBag {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn lovelace(coin: u64) -> Self {
        ValueBag {
            coin,
            assets: BTreeMap::new(),
        }
    }

    pub fn from_wire(value: &Value) -> Self {
        let mut bag = ValueBag::lovelace(value.coin());

        for (policy, name, quantity) in value.assets() {
            bag.add_asset(*policy, name.clone(), quantity);
        }

        bag
    }

    /// Converts to the wire form with policies and names in sorted order
    pub fn to_wire(&self) -> Value {
        if self.assets.is_empty() {
            return Value::Coin(self.coin);
        }

        let assets = self
            .assets
            .iter()
            .map(|(policy, names)| {
                (
                    *policy,
                    names
                        .iter()
                        .map(|(name, quantity)| {
                            let quantity = PositiveCoin::try_from(*quantity)
                                .expect("zero quantities are pruned on insert");
                            (name.clone(), quantity)
                        })
                        .collect::<Vec<_>>()
                        .into(),
                )
            })
            .collect::<Vec<_>>()
            .into();

        Value::Multiasset(self.coin, assets)
    }

    pub fn coin(&self) -> u64 {
        self.coin
    }

    pub fn set_coin(&mut self, coin: u64) {
        self.coin = coin;
    }

    pub fn add_coin(&mut self, coin: u64) {
        self.coin += coin;
    }

    pub fn add_asset(&mut self, policy: PolicyId, name: Bytes, quantity: u64) {
        if quantity == 0 {
            return;
        }

        *self
            .assets
            .entry(policy)
            .or_default()
            .entry(name)
            .or_default() += quantity;
    }

    pub fn quantity_of(&self, policy: &PolicyId, name: &[u8]) -> u64 {
        self.assets
            .get(policy)
            .and_then(|names| names.iter().find(|(n, _)| n.as_ref() == name))
            .map(|(_, q)| *q)
            .unwrap_or_default()
    }

    pub fn has_assets(&self) -> bool {
        !self.assets.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.coin == 0 && self.assets.is_empty()
    }

    pub fn iter_assets(&self) -> impl Iterator<Item = (&PolicyId, &Bytes, u64)> {
        self.assets
            .iter()
            .flat_map(|(p, names)| names.iter().map(move |(n, q)| (p, n, *q)))
    }

    pub fn checked_add(&self, other: &ValueBag) -> Option<ValueBag> {
        let mut out = self.clone();
        out.coin = out.coin.checked_add(other.coin)?;

        for (policy, name, quantity) in other.iter_assets() {
            let slot = out
                .assets
                .entry(*policy)
                .or_default()
                .entry(name.clone())
                .or_default();
            *slot = slot.checked_add(quantity)?;
        }

        Some(out)
    }

    /// None when any coin or asset quantity would go negative
    pub fn checked_sub(&self, other: &ValueBag) -> Option<ValueBag> {
        let mut out = self.clone();
        out.coin = out.coin.checked_sub(other.coin)?;

        for (policy, name, quantity) in other.iter_assets() {
            let names = out.assets.get_mut(policy)?;
            let slot = names.get_mut(name)?;
            *slot = slot.checked_sub(quantity)?;

            if *slot == 0 {
                names.remove(name);
            }
        }

        out.assets.retain(|_, names| !names.is_empty());

        Some(out)
    }

    /// True when `self` holds at least as much of everything as `other`
    pub fn covers(&self, other: &ValueBag) -> bool {
        self.checked_sub(other).is_some()
    }

    /// Per-unit amount by which `have` falls short of `self`; zero units
    /// are omitted, so an empty result means fully covered
    pub fn missing_from(&self, have: &ValueBag) -> ValueBag {
        let mut missing = ValueBag::new();

        missing.set_coin(self.coin.saturating_sub(have.coin));

        for (policy, name, required) in self.iter_assets() {
            let held = have.quantity_of(policy, name.as_ref());
            if held < required {
                missing.add_asset(*policy, name.clone(), required - held);
            }
        }

        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cip113_crypto::hash::Hash;

    fn policy(tag: u8) -> PolicyId {
        Hash::new([tag; 28])
    }

    fn name(text: &[u8]) -> Bytes {
        text.to_vec().into()
    }

    #[test]
    fn add_and_query() {
        let mut bag = ValueBag::lovelace(5);
        bag.add_asset(policy(1), name(b"a"), 10);
        bag.add_asset(policy(1), name(b"a"), 5);

        assert_eq!(bag.coin(), 5);
        assert_eq!(bag.quantity_of(&policy(1), b"a"), 15);
        assert_eq!(bag.quantity_of(&policy(1), b"b"), 0);
    }

    #[test]
    fn zero_quantities_are_pruned() {
        let mut bag = ValueBag::new();
        bag.add_asset(policy(1), name(b"a"), 0);
        assert!(!bag.has_assets());
    }

    #[test]
    fn subtraction_removes_exhausted_assets() {
        let mut a = ValueBag::lovelace(10);
        a.add_asset(policy(1), name(b"x"), 4);

        let mut b = ValueBag::lovelace(3);
        b.add_asset(policy(1), name(b"x"), 4);

        let diff = a.checked_sub(&b).unwrap();
        assert_eq!(diff.coin(), 7);
        assert!(!diff.has_assets());
    }

    #[test]
    fn subtraction_fails_on_shortfall() {
        let a = ValueBag::lovelace(10);

        let mut b = ValueBag::lovelace(1);
        b.add_asset(policy(1), name(b"x"), 1);

        assert!(a.checked_sub(&b).is_none());
        assert!(!a.covers(&b));
    }

    #[test]
    fn wire_roundtrip_is_sorted() {
        let mut bag = ValueBag::lovelace(2_000_000);
        bag.add_asset(policy(9), name(b"z"), 1);
        bag.add_asset(policy(1), name(b"b"), 2);
        bag.add_asset(policy(1), name(b"a"), 3);

        let wire = bag.to_wire();
        let triples: Vec<_> = wire
            .assets()
            .map(|(p, n, q)| (*p, n.clone(), q))
            .collect();

        assert_eq!(
            triples,
            vec![
                (policy(1), name(b"a"), 3),
                (policy(1), name(b"b"), 2),
                (policy(9), name(b"z"), 1),
            ]
        );

        assert_eq!(ValueBag::from_wire(&wire), bag);
    }
}
