//! Transaction primitives for the post-Conway era
//!
//! Handcrafted, idiomatic rust artifacts based on the Conway CDDL, trimmed
//! to the fields that programmable-token transactions populate. Optional
//! body fields keep their CDDL map keys; anything this protocol never emits
//! (certificates, governance, updates) is deliberately absent.

use serde::{Deserialize, Serialize};

use cip113_codec::minicbor::{self, Decode, Encode};
use cip113_codec::utils::{Bytes, CborWrap, KeyValuePairs, NonEmptySet, NonZeroInt, PositiveCoin, Set};
use cip113_crypto::hash::{Hash, Hasher};

use crate::plutus_data::PlutusData;

pub type AddrKeyhash = Hash<28>;

pub type ScriptHash = Hash<28>;

pub type PolicyId = ScriptHash;

pub type AssetName = Bytes;

pub type Coin = u64;

pub type DatumHash = Hash<32>;

pub type TxHash = Hash<32>;

/// Raw bytes of a reward (stake) address
pub type RewardAccount = Bytes;

pub type Multiasset<A> = KeyValuePairs<PolicyId, KeyValuePairs<AssetName, A>>;

pub type Mint = Multiasset<NonZeroInt>;

pub type Withdrawals = KeyValuePairs<RewardAccount, Coin>;

pub type RequiredSigners = NonEmptySet<AddrKeyhash>;

#[derive(
    Serialize,
    Deserialize,
    Encode,
    Decode,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Clone,
    Copy,
    std::hash::Hash,
)]
pub struct TransactionInput {
    #[n(0)]
    pub transaction_id: Hash<32>,

    #[n(1)]
    pub index: u64,
}

impl TransactionInput {
    pub fn new(transaction_id: Hash<32>, index: u64) -> Self {
        Self {
            transaction_id,
            index,
        }
    }
}

impl std::fmt::Display for TransactionInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.transaction_id, self.index)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum Value {
    Coin(Coin),
    Multiasset(Coin, Multiasset<PositiveCoin>),
}

impl Value {
    pub fn coin(&self) -> Coin {
        match self {
            Value::Coin(x) => *x,
            Value::Multiasset(x, _) => *x,
        }
    }

    /// Units of one asset held by this value, zero when absent
    pub fn quantity_of(&self, policy: &PolicyId, name: &[u8]) -> u64 {
        match self {
            Value::Coin(_) => 0,
            Value::Multiasset(_, assets) => assets
                .iter()
                .filter(|(p, _)| p == policy)
                .flat_map(|(_, names)| names.iter())
                .find(|(n, _)| n.as_ref() == name)
                .map(|(_, q)| u64::from(*q))
                .unwrap_or_default(),
        }
    }

    /// Iterates every (policy, name, quantity) triple
    pub fn assets(&self) -> impl Iterator<Item = (&PolicyId, &AssetName, u64)> {
        let inner = match self {
            Value::Coin(_) => None,
            Value::Multiasset(_, assets) => Some(assets),
        };

        inner
            .into_iter()
            .flat_map(|assets| assets.iter())
            .flat_map(|(p, names)| names.iter().map(move |(n, q)| (p, n, u64::from(*q))))
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for Value {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        match d.datatype()? {
            minicbor::data::Type::U8
            | minicbor::data::Type::U16
            | minicbor::data::Type::U32
            | minicbor::data::Type::U64 => Ok(Value::Coin(d.decode_with(ctx)?)),
            minicbor::data::Type::Array | minicbor::data::Type::ArrayIndef => {
                d.array()?;
                let coin = d.decode_with(ctx)?;
                let multiasset = d.decode_with(ctx)?;
                Ok(Value::Multiasset(coin, multiasset))
            }
            _ => Err(minicbor::decode::Error::message(
                "unknown cbor data type for Value",
            )),
        }
    }
}

impl<C> minicbor::encode::Encode<C> for Value {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Value::Coin(coin) => {
                e.encode_with(coin, ctx)?;
            }
            Value::Multiasset(coin, other) => {
                e.array(2)?;
                e.encode_with(coin, ctx)?;
                e.encode_with(other, ctx)?;
            }
        };

        Ok(())
    }
}

/// A plutus script of the given language version, in its singly
/// CBOR-wrapped form
///
/// The held bytes are exactly what appears as the byte-string payload of a
/// witness set entry, and exactly what the ledger hashes behind the
/// language tag.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlutusScript<const VERSION: u8>(pub Bytes);

impl<const VERSION: u8> PlutusScript<VERSION> {
    pub fn compute_hash(&self) -> ScriptHash {
        Hasher::<224>::hash_tagged(self.0.as_ref(), VERSION)
    }
}

impl<const VERSION: u8> AsRef<[u8]> for PlutusScript<VERSION> {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl<'b, C, const VERSION: u8> minicbor::Decode<'b, C> for PlutusScript<VERSION> {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        Ok(Self(d.decode_with(ctx)?))
    }
}

impl<C, const VERSION: u8> minicbor::Encode<C> for PlutusScript<VERSION> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        self.0.encode(e, ctx)
    }
}

/// A script attached to an output as a reference script
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum ScriptRef {
    PlutusV1Script(PlutusScript<1>),
    PlutusV2Script(PlutusScript<2>),
    PlutusV3Script(PlutusScript<3>),
}

impl ScriptRef {
    pub fn compute_hash(&self) -> ScriptHash {
        match self {
            ScriptRef::PlutusV1Script(x) => x.compute_hash(),
            ScriptRef::PlutusV2Script(x) => x.compute_hash(),
            ScriptRef::PlutusV3Script(x) => x.compute_hash(),
        }
    }
}

impl<'b, C> minicbor::Decode<'b, C> for ScriptRef {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        match d.u8()? {
            1 => Ok(Self::PlutusV1Script(d.decode_with(ctx)?)),
            2 => Ok(Self::PlutusV2Script(d.decode_with(ctx)?)),
            3 => Ok(Self::PlutusV3Script(d.decode_with(ctx)?)),
            x => Err(minicbor::decode::Error::message(format!(
                "unsupported script kind {x} in reference script"
            ))),
        }
    }
}

impl<C> minicbor::Encode<C> for ScriptRef {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            ScriptRef::PlutusV1Script(x) => e.encode_with((1u8, x), ctx)?,
            ScriptRef::PlutusV2Script(x) => e.encode_with((2u8, x), ctx)?,
            ScriptRef::PlutusV3Script(x) => e.encode_with((3u8, x), ctx)?,
        };

        Ok(())
    }
}

/// datum_option = [0, $hash32] / [1, data]
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum DatumOption {
    Hash(DatumHash),
    Data(CborWrap<PlutusData>),
}

impl<'b, C> minicbor::Decode<'b, C> for DatumOption {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        match d.u8()? {
            0 => Ok(Self::Hash(d.decode_with(ctx)?)),
            1 => Ok(Self::Data(d.decode_with(ctx)?)),
            _ => Err(minicbor::decode::Error::message(
                "invalid variant for datum option",
            )),
        }
    }
}

impl<C> minicbor::Encode<C> for DatumOption {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::Hash(x) => e.encode_with((0u8, x), ctx)?,
            Self::Data(x) => e.encode_with((1u8, x), ctx)?,
        };

        Ok(())
    }
}

/// A post-alonzo (map format) transaction output
#[derive(Serialize, Deserialize, Encode, Decode, Debug, PartialEq, Eq, Clone)]
#[cbor(map)]
pub struct TransactionOutput {
    #[n(0)]
    pub address: Bytes,

    #[n(1)]
    pub value: Value,

    #[n(2)]
    pub datum_option: Option<DatumOption>,

    #[n(3)]
    pub script_ref: Option<CborWrap<ScriptRef>>,
}

#[derive(Serialize, Deserialize, Encode, Decode, Debug, PartialEq, Eq, Clone, Copy)]
#[cbor(index_only)]
pub enum NetworkId {
    #[n(0)]
    Testnet,

    #[n(1)]
    Mainnet,
}

#[derive(Serialize, Deserialize, Encode, Decode, Debug, PartialEq, Eq, Clone, Copy)]
pub struct ExUnits {
    #[n(0)]
    pub mem: u64,

    #[n(1)]
    pub steps: u64,
}

#[derive(
    Serialize, Deserialize, Encode, Decode, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy,
)]
#[cbor(index_only)]
pub enum RedeemerTag {
    #[n(0)]
    Spend,

    #[n(1)]
    Mint,

    #[n(2)]
    Cert,

    #[n(3)]
    Reward,
}

#[derive(Serialize, Deserialize, Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct Redeemer {
    #[n(0)]
    pub tag: RedeemerTag,

    #[n(1)]
    pub index: u32,

    #[n(2)]
    pub data: PlutusData,

    #[n(3)]
    pub ex_units: ExUnits,
}

#[derive(Serialize, Deserialize, Encode, Decode, Debug, PartialEq, Eq, Clone)]
pub struct VKeyWitness {
    #[n(0)]
    pub vkey: Bytes,

    #[n(1)]
    pub signature: Bytes,
}

#[derive(Serialize, Deserialize, Encode, Decode, Debug, PartialEq, Clone)]
#[cbor(map)]
pub struct TransactionBody {
    #[n(0)]
    pub inputs: Set<TransactionInput>,

    #[n(1)]
    pub outputs: Vec<TransactionOutput>,

    #[n(2)]
    pub fee: Coin,

    #[n(3)]
    pub ttl: Option<u64>,

    #[n(5)]
    pub withdrawals: Option<Withdrawals>,

    #[n(7)]
    pub auxiliary_data_hash: Option<Hash<32>>,

    #[n(8)]
    pub validity_interval_start: Option<u64>,

    #[n(9)]
    pub mint: Option<Mint>,

    #[n(11)]
    pub script_data_hash: Option<Hash<32>>,

    #[n(13)]
    pub collateral: Option<NonEmptySet<TransactionInput>>,

    #[n(14)]
    pub required_signers: Option<RequiredSigners>,

    #[n(15)]
    pub network_id: Option<NetworkId>,

    #[n(16)]
    pub collateral_return: Option<TransactionOutput>,

    #[n(17)]
    pub total_collateral: Option<Coin>,

    #[n(18)]
    pub reference_inputs: Option<NonEmptySet<TransactionInput>>,
}

impl TransactionBody {
    /// Blake2b-256 over the body encoding: the hash wallets sign
    pub fn compute_hash(&self) -> TxHash {
        Hasher::<256>::hash_cbor(self)
    }
}

#[derive(Serialize, Deserialize, Encode, Decode, Debug, PartialEq, Clone, Default)]
#[cbor(map)]
pub struct WitnessSet {
    #[n(0)]
    pub vkeywitness: Option<NonEmptySet<VKeyWitness>>,

    #[n(3)]
    pub plutus_v1_script: Option<NonEmptySet<PlutusScript<1>>>,

    #[n(4)]
    pub plutus_data: Option<NonEmptySet<PlutusData>>,

    #[n(5)]
    pub redeemer: Option<Vec<Redeemer>>,

    #[n(6)]
    pub plutus_v2_script: Option<NonEmptySet<PlutusScript<2>>>,

    #[n(7)]
    pub plutus_v3_script: Option<NonEmptySet<PlutusScript<3>>>,
}

/// A full transaction envelope
///
/// Auxiliary data is always absent in programmable-token transactions, so
/// the fourth element encodes as null.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Tx {
    pub transaction_body: TransactionBody,
    pub transaction_witness_set: WitnessSet,
    pub success: bool,
}

impl<'b, C> minicbor::Decode<'b, C> for Tx {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        d.array()?;

        let transaction_body = d.decode_with(ctx)?;
        let transaction_witness_set = d.decode_with(ctx)?;
        let success = d.bool()?;
        d.skip()?;

        Ok(Tx {
            transaction_body,
            transaction_witness_set,
            success,
        })
    }
}

impl<C> minicbor::Encode<C> for Tx {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.array(4)?;
        e.encode_with(&self.transaction_body, ctx)?;
        e.encode_with(&self.transaction_witness_set, ctx)?;
        e.bool(self.success)?;
        e.null()?;

        Ok(())
    }
}

/// A resolved unspent output, as handed over by a chain indexer
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct Utxo {
    pub input: TransactionInput,
    pub address: Bytes,
    pub value: Value,
    pub datum: Option<PlutusData>,
    pub script: Option<ScriptRef>,
}

impl Utxo {
    pub fn coin(&self) -> Coin {
        self.value.coin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fragment;

    fn input(tag: u8, index: u64) -> TransactionInput {
        TransactionInput {
            transaction_id: Hash::new([tag; 32]),
            index,
        }
    }

    #[test]
    fn value_coin_roundtrip() {
        let value = Value::Coin(2_000_000);
        let bytes = value.encode_fragment().unwrap();
        assert_eq!(hex::encode(&bytes), "1a001e8480");

        let back = Value::decode_fragment(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn value_multiasset_queries() {
        let policy = Hash::new([7u8; 28]);
        let name: AssetName = b"tok".to_vec().into();
        let value = Value::Multiasset(
            1_200_000,
            vec![(
                policy,
                vec![(name.clone(), PositiveCoin::try_from(250u64).unwrap())].into(),
            )]
            .into(),
        );

        assert_eq!(value.coin(), 1_200_000);
        assert_eq!(value.quantity_of(&policy, b"tok"), 250);
        assert_eq!(value.quantity_of(&policy, b"other"), 0);
        assert_eq!(value.assets().count(), 1);

        let bytes = value.encode_fragment().unwrap();
        let back = Value::decode_fragment(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn output_with_inline_datum_roundtrip() {
        let output = TransactionOutput {
            address: vec![0x61; 29].into(),
            value: Value::Coin(5_000_000),
            datum_option: Some(DatumOption::Data(CborWrap(PlutusData::constr(0, vec![])))),
            script_ref: None,
        };

        let bytes = output.encode_fragment().unwrap();
        let back = TransactionOutput::decode_fragment(&bytes).unwrap();
        assert_eq!(back, output);
    }

    #[test]
    fn inline_datum_wraps_in_tag_24() {
        let output = TransactionOutput {
            address: vec![0x61; 29].into(),
            value: Value::Coin(1),
            datum_option: Some(DatumOption::Data(CborWrap(PlutusData::constr(0, vec![])))),
            script_ref: None,
        };

        let bytes = output.encode_fragment().unwrap();
        let hex = hex::encode(&bytes);
        // datum option encodes as [1, 24(<<d87980>>)]
        assert!(hex.contains("8201d81843d87980"), "got {hex}");
    }

    #[test]
    fn body_hash_is_stable() {
        let body = TransactionBody {
            inputs: vec![input(1, 0)].into(),
            outputs: vec![],
            fee: 170_000,
            ttl: None,
            withdrawals: None,
            auxiliary_data_hash: None,
            validity_interval_start: None,
            mint: None,
            script_data_hash: None,
            collateral: None,
            required_signers: None,
            network_id: Some(NetworkId::Testnet),
            collateral_return: None,
            total_collateral: None,
            reference_inputs: None,
        };

        let bytes = body.encode_fragment().unwrap();
        assert_eq!(body.compute_hash(), Hasher::<256>::hash(&bytes));
    }

    #[test]
    fn tx_encodes_with_null_auxiliary_data() {
        let tx = Tx {
            transaction_body: TransactionBody {
                inputs: vec![input(2, 1)].into(),
                outputs: vec![],
                fee: 0,
                ttl: None,
                withdrawals: None,
                auxiliary_data_hash: None,
                validity_interval_start: None,
                mint: None,
                script_data_hash: None,
                collateral: None,
                required_signers: None,
                network_id: None,
                collateral_return: None,
                total_collateral: None,
                reference_inputs: None,
            },
            transaction_witness_set: WitnessSet::default(),
            success: true,
        };

        let bytes = tx.encode_fragment().unwrap();
        assert_eq!(*bytes.last().unwrap(), 0xf6);

        let back = Tx::decode_fragment(&bytes).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn plutus_script_hash_is_version_tagged() {
        let bytes: Bytes = vec![0x01, 0x02, 0x03].into();
        let v2 = PlutusScript::<2>(bytes.clone()).compute_hash();
        let v3 = PlutusScript::<3>(bytes).compute_hash();

        assert_ne!(v2, v3);
        assert_eq!(
            v3,
            Hasher::<224>::hash_tagged(&[0x01, 0x02, 0x03], 3)
        );
    }
}
