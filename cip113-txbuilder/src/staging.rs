//! The mutable transaction model planners fill in
//!
//! A staging transaction records intent without committing to any wire
//! ordering; every collection that ends up sorted in the body lives here
//! in a deterministic map so that two planners given equal inputs stage
//! byte-identical transactions. The assembler in [crate::build] is the
//! only consumer.

use std::collections::{BTreeMap, BTreeSet};

use cip113_addresses::Address;
use cip113_codec::utils::Bytes;
use cip113_crypto::hash::{Hash, Hasher};
use cip113_primitives::{
    ExUnits, NetworkId, PlutusData, PolicyId, ScriptHash, TransactionInput, Utxo,
};

use crate::asset::ValueBag;
use crate::TxBuilderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScriptKind {
    PlutusV1,
    PlutusV2,
    PlutusV3,
}

impl ScriptKind {
    pub fn version_tag(&self) -> u8 {
        match self {
            ScriptKind::PlutusV1 => 1,
            ScriptKind::PlutusV2 => 2,
            ScriptKind::PlutusV3 => 3,
        }
    }

    /// Key of this language in the cost-model table
    pub fn language(&self) -> u8 {
        self.version_tag() - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptWitness {
    pub kind: ScriptKind,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datum {
    Inline(PlutusData),
    Hash(Hash<32>),
}

/// A planned output before canonical serialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub address: Address,
    pub value: ValueBag,
    pub datum: Option<Datum>,
}

impl Output {
    pub fn new(address: Address, value: ValueBag) -> Self {
        Output {
            address,
            value,
            datum: None,
        }
    }

    pub fn with_inline_datum(mut self, datum: PlutusData) -> Self {
        self.datum = Some(Datum::Inline(datum));
        self
    }
}

/// What a redeemer witnesses; the index is resolved at assembly time
/// against the canonically sorted collections
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RedeemerPurpose {
    Spend(TransactionInput),
    Mint(PolicyId),
    /// keyed by reward-account bytes
    Reward(Bytes),
}

#[derive(Debug, Clone, Default)]
pub struct StagingTransaction {
    /// Resolved inputs; their values fund the balance
    pub inputs: Vec<Utxo>,
    /// Inputs spent without a resolved value (transaction chaining); they
    /// contribute nothing to the balance on purpose
    pub unresolved_inputs: Vec<TransactionInput>,
    pub reference_inputs: Vec<TransactionInput>,
    pub outputs: Vec<Output>,
    pub mint: BTreeMap<PolicyId, BTreeMap<Bytes, i64>>,
    /// reward-account bytes to withdrawal amount
    pub withdrawals: BTreeMap<Bytes, u64>,
    pub scripts: BTreeMap<ScriptHash, ScriptWitness>,
    pub datums: BTreeMap<Hash<32>, PlutusData>,
    pub redeemers: BTreeMap<RedeemerPurpose, (PlutusData, Option<ExUnits>)>,
    pub collateral_inputs: Vec<Utxo>,
    pub required_signers: BTreeSet<Hash<28>>,
    pub change_address: Option<Address>,
    pub network_id: Option<NetworkId>,
}

impl StagingTransaction {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn input(mut self, utxo: Utxo) -> Self {
        self.inputs.push(utxo);
        self
    }

    /// A plain input plus its spending redeemer in one step
    pub fn script_input(mut self, utxo: Utxo, redeemer: PlutusData) -> Self {
        self.redeemers.insert(
            RedeemerPurpose::Spend(utxo.input),
            (redeemer, None),
        );
        self.inputs.push(utxo);
        self
    }

    pub fn unresolved_input(mut self, input: TransactionInput) -> Self {
        self.unresolved_inputs.push(input);
        self
    }

    pub fn reference_input(mut self, input: TransactionInput) -> Self {
        if !self.reference_inputs.contains(&input) {
            self.reference_inputs.push(input);
        }
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn mint_asset(
        mut self,
        policy: PolicyId,
        name: Vec<u8>,
        amount: i64,
        redeemer: PlutusData,
    ) -> Result<Self, TxBuilderError> {
        if name.len() > 32 {
            return Err(TxBuilderError::AssetNameTooLong);
        }

        *self
            .mint
            .entry(policy)
            .or_default()
            .entry(name.into())
            .or_default() += amount;

        self.redeemers
            .insert(RedeemerPurpose::Mint(policy), (redeemer, None));

        Ok(self)
    }

    /// A zero-amount withdrawal used purely to invoke a script
    pub fn withdrawal(mut self, reward_account: Vec<u8>, amount: u64, redeemer: PlutusData) -> Self {
        let account: Bytes = reward_account.into();
        self.withdrawals.insert(account.clone(), amount);
        self.redeemers
            .insert(RedeemerPurpose::Reward(account), (redeemer, None));
        self
    }

    pub fn script(mut self, kind: ScriptKind, bytes: Vec<u8>) -> Self {
        let hash = Hasher::<224>::hash_tagged(&bytes, kind.version_tag());

        self.scripts.insert(
            hash,
            ScriptWitness {
                kind,
                bytes: bytes.into(),
            },
        );

        self
    }

    pub fn datum(mut self, datum: PlutusData) -> Self {
        let hash = cip113_primitives::plutus_data::hash(&datum);
        self.datums.insert(hash, datum);
        self
    }

    pub fn collateral_input(mut self, utxo: Utxo) -> Self {
        self.collateral_inputs.push(utxo);
        self
    }

    pub fn disclosed_signer(mut self, key_hash: Hash<28>) -> Self {
        self.required_signers.insert(key_hash);
        self
    }

    pub fn change_address(mut self, address: Address) -> Self {
        self.change_address = Some(address);
        self
    }

    pub fn network_id(mut self, network: NetworkId) -> Self {
        self.network_id = Some(network);
        self
    }

    /// Everything the transaction consumes: resolved inputs plus positive
    /// mint amounts; None on arithmetic overflow
    pub fn consumed_value(&self) -> Option<ValueBag> {
        let mut total = ValueBag::new();

        for utxo in &self.inputs {
            total = total.checked_add(&ValueBag::from_wire(&utxo.value))?;
        }

        for (policy, names) in &self.mint {
            for (name, amount) in names {
                if *amount > 0 {
                    let mut minted = ValueBag::new();
                    minted.add_asset(*policy, name.clone(), *amount as u64);
                    total = total.checked_add(&minted)?;
                }
            }
        }

        Some(total)
    }

    /// Everything the transaction must produce besides fee and change:
    /// planned outputs plus burned amounts; None on arithmetic overflow
    pub fn produced_value(&self) -> Option<ValueBag> {
        let mut total = ValueBag::new();

        for output in &self.outputs {
            total = total.checked_add(&output.value)?;
        }

        for (policy, names) in &self.mint {
            for (name, amount) in names {
                if *amount < 0 {
                    let mut burned = ValueBag::new();
                    burned.add_asset(*policy, name.clone(), amount.unsigned_abs());
                    total = total.checked_add(&burned)?;
                }
            }
        }

        Some(total)
    }
}
