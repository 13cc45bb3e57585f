//! Shelley addresses for the programmable-token protocol
//!
//! Only the address shapes the protocol actually produces or inspects are
//! modelled: base addresses (payment + delegation hash), enterprise
//! addresses (payment only) and stake/reward addresses. Pointer and
//! bootstrap addresses never occur in programmable-token transactions and
//! are rejected on parse.
//!
//! The address every token holder receives funds at is a base address whose
//! payment part is the shared programmable-logic script hash and whose
//! delegation part is the holder's own stake key hash; see
//! [ShelleyAddress::new] and the helpers in `cip113-blueprint`.

use std::{fmt, str::FromStr};

use cip113_crypto::hash::Hash;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("error converting from/to bech32 {0}")]
    BadBech32(bech32::Error),

    #[error("error decoding hex value")]
    BadHex,

    #[error("unknown or bad string format for address {0}")]
    UnknownStringFormat(String),

    #[error("address header not found")]
    MissingHeader,

    #[error("address header is invalid {0:08b}")]
    InvalidHeader(u8),

    #[error("address type {0} is not supported by this protocol")]
    UnsupportedAddressType(u8),

    #[error("invalid operation for address content")]
    InvalidForContent,

    #[error("unknown hrp for network {0:08b}")]
    UnknownNetworkHrp(u8),

    #[error("invalid hash size {0}")]
    InvalidHashSize(usize),
}

pub type PaymentKeyHash = Hash<28>;
pub type StakeKeyHash = Hash<28>;
pub type ScriptHash = Hash<28>;

fn slice_to_hash(slice: &[u8]) -> Result<Hash<28>, Error> {
    Hash::from_slice(slice).ok_or(Error::InvalidHashSize(slice.len()))
}

/// The payment part of a Shelley address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShelleyPaymentPart {
    Key(PaymentKeyHash),
    Script(ScriptHash),
}

impl ShelleyPaymentPart {
    pub fn key_hash(hash: Hash<28>) -> Self {
        Self::Key(hash)
    }

    pub fn script_hash(hash: Hash<28>) -> Self {
        Self::Script(hash)
    }

    pub fn as_hash(&self) -> &Hash<28> {
        match self {
            Self::Key(x) => x,
            Self::Script(x) => x,
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_hash().to_vec()
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Self::Script(_))
    }
}

/// The delegation part of a Shelley address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShelleyDelegationPart {
    Key(StakeKeyHash),
    Script(ScriptHash),
    Null,
}

impl ShelleyDelegationPart {
    pub fn key_hash(hash: Hash<28>) -> Self {
        Self::Key(hash)
    }

    pub fn script_hash(hash: Hash<28>) -> Self {
        Self::Script(hash)
    }

    pub fn as_hash(&self) -> Option<&Hash<28>> {
        match self {
            Self::Key(x) => Some(x),
            Self::Script(x) => Some(x),
            Self::Null => None,
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        match self {
            Self::Key(x) => x.to_vec(),
            Self::Script(x) => x.to_vec(),
            Self::Null => vec![],
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Self::Script(_))
    }
}

/// The network tag of an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    pub fn is_mainnet(&self) -> bool {
        matches!(self, Network::Mainnet)
    }

    pub fn value(&self) -> u8 {
        match self {
            Network::Testnet => 0,
            Network::Mainnet => 1,
        }
    }
}

impl TryFrom<u8> for Network {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Network::Testnet),
            1 => Ok(Network::Mainnet),
            x => Err(Error::InvalidHeader(x)),
        }
    }
}

/// A decoded Shelley address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShelleyAddress(Network, ShelleyPaymentPart, ShelleyDelegationPart);

/// The payload of a stake (reward) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StakePayload {
    Stake(StakeKeyHash),
    Script(ScriptHash),
}

impl StakePayload {
    pub fn is_script(&self) -> bool {
        matches!(self, StakePayload::Script(_))
    }

    pub fn as_hash(&self) -> &Hash<28> {
        match self {
            StakePayload::Stake(x) => x,
            StakePayload::Script(x) => x,
        }
    }
}

impl AsRef<[u8]> for StakePayload {
    fn as_ref(&self) -> &[u8] {
        match self {
            Self::Stake(x) => x.as_ref(),
            Self::Script(x) => x.as_ref(),
        }
    }
}

/// A decoded stake (reward) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StakeAddress(Network, StakePayload);

/// A decoded Cardano address of any supported type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Address {
    Shelley(ShelleyAddress),
    Stake(StakeAddress),
}

fn encode_bech32(addr: &[u8], hrp: &str) -> Result<String, Error> {
    let base32 = bech32::ToBase32::to_base32(&addr);
    bech32::encode(hrp, base32, bech32::Variant::Bech32).map_err(Error::BadBech32)
}

fn decode_bech32(bech32: &str) -> Result<(String, Vec<u8>), Error> {
    let (hrp, addr, _) = bech32::decode(bech32).map_err(Error::BadBech32)?;
    let base10 = bech32::FromBase32::from_base32(&addr).map_err(Error::BadBech32)?;
    Ok((hrp, base10))
}

fn parse_network(header: u8) -> Result<Network, Error> {
    Network::try_from(header & 0b0000_1111)
}

fn parse_shelley(
    header: u8,
    payload: &[u8],
    payment_is_script: bool,
    delegation: Option<bool>,
) -> Result<Address, Error> {
    let net = parse_network(header)?;

    let h1 = slice_to_hash(payload.get(0..28).ok_or(Error::InvalidHashSize(payload.len()))?)?;
    let p1 = if payment_is_script {
        ShelleyPaymentPart::Script(h1)
    } else {
        ShelleyPaymentPart::Key(h1)
    };

    let p2 = match delegation {
        Some(is_script) => {
            let h2 =
                slice_to_hash(payload.get(28..56).ok_or(Error::InvalidHashSize(payload.len()))?)?;
            if is_script {
                ShelleyDelegationPart::Script(h2)
            } else {
                ShelleyDelegationPart::Key(h2)
            }
        }
        None => ShelleyDelegationPart::Null,
    };

    Ok(ShelleyAddress(net, p1, p2).into())
}

fn parse_stake(header: u8, payload: &[u8], is_script: bool) -> Result<Address, Error> {
    let net = parse_network(header)?;
    let hash = slice_to_hash(payload.get(0..28).ok_or(Error::InvalidHashSize(payload.len()))?)?;

    let p1 = if is_script {
        StakePayload::Script(hash)
    } else {
        StakePayload::Stake(hash)
    };

    Ok(StakeAddress(net, p1).into())
}

fn bytes_to_address(bytes: &[u8]) -> Result<Address, Error> {
    let header = *bytes.first().ok_or(Error::MissingHeader)?;
    let payload = &bytes[1..];

    match header & 0b1111_0000 {
        0b0000_0000 => parse_shelley(header, payload, false, Some(false)),
        0b0001_0000 => parse_shelley(header, payload, true, Some(false)),
        0b0010_0000 => parse_shelley(header, payload, false, Some(true)),
        0b0011_0000 => parse_shelley(header, payload, true, Some(true)),
        0b0110_0000 => parse_shelley(header, payload, false, None),
        0b0111_0000 => parse_shelley(header, payload, true, None),
        0b1110_0000 => parse_stake(header, payload, false),
        0b1111_0000 => parse_stake(header, payload, true),
        0b0100_0000 | 0b0101_0000 | 0b1000_0000 => {
            Err(Error::UnsupportedAddressType(header >> 4))
        }
        _ => Err(Error::InvalidHeader(header)),
    }
}

impl ShelleyAddress {
    pub fn new(
        network: Network,
        payment: ShelleyPaymentPart,
        delegation: ShelleyDelegationPart,
    ) -> Self {
        Self(network, payment, delegation)
    }

    pub fn network(&self) -> Network {
        self.0
    }

    /// Numeric id describing the type of the address, per CIP-19
    pub fn typeid(&self) -> u8 {
        match (&self.1, &self.2) {
            (ShelleyPaymentPart::Key(_), ShelleyDelegationPart::Key(_)) => 0b0000,
            (ShelleyPaymentPart::Script(_), ShelleyDelegationPart::Key(_)) => 0b0001,
            (ShelleyPaymentPart::Key(_), ShelleyDelegationPart::Script(_)) => 0b0010,
            (ShelleyPaymentPart::Script(_), ShelleyDelegationPart::Script(_)) => 0b0011,
            (ShelleyPaymentPart::Key(_), ShelleyDelegationPart::Null) => 0b0110,
            (ShelleyPaymentPart::Script(_), ShelleyDelegationPart::Null) => 0b0111,
        }
    }

    pub fn to_header(&self) -> u8 {
        (self.typeid() << 4) | self.0.value()
    }

    pub fn payment(&self) -> &ShelleyPaymentPart {
        &self.1
    }

    pub fn delegation(&self) -> &ShelleyDelegationPart {
        &self.2
    }

    pub fn hrp(&self) -> &'static str {
        match &self.0 {
            Network::Testnet => "addr_test",
            Network::Mainnet => "addr",
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let header = self.to_header();
        let payment = self.1.to_vec();
        let delegation = self.2.to_vec();

        [&[header], payment.as_slice(), delegation.as_slice()].concat()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_vec())
    }

    pub fn to_bech32(&self) -> Result<String, Error> {
        encode_bech32(&self.to_vec(), self.hrp())
    }

    pub fn has_script(&self) -> bool {
        self.payment().is_script() || self.delegation().is_script()
    }
}

impl StakeAddress {
    pub fn new(network: Network, payload: StakePayload) -> Self {
        Self(network, payload)
    }

    pub fn network(&self) -> Network {
        self.0
    }

    pub fn typeid(&self) -> u8 {
        match &self.1 {
            StakePayload::Stake(_) => 0b1110,
            StakePayload::Script(_) => 0b1111,
        }
    }

    pub fn to_header(&self) -> u8 {
        (self.typeid() << 4) | self.0.value()
    }

    pub fn payload(&self) -> &StakePayload {
        &self.1
    }

    pub fn hrp(&self) -> &'static str {
        match &self.0 {
            Network::Testnet => "stake_test",
            Network::Mainnet => "stake",
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        [&[self.to_header()], self.1.as_ref()].concat()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_vec())
    }

    pub fn to_bech32(&self) -> Result<String, Error> {
        encode_bech32(&self.to_vec(), self.hrp())
    }

    pub fn is_script(&self) -> bool {
        self.payload().is_script()
    }
}

impl TryFrom<ShelleyAddress> for StakeAddress {
    type Error = Error;

    fn try_from(value: ShelleyAddress) -> Result<Self, Self::Error> {
        let payload = match value.delegation() {
            ShelleyDelegationPart::Key(h) => StakePayload::Stake(*h),
            ShelleyDelegationPart::Script(h) => StakePayload::Script(*h),
            ShelleyDelegationPart::Null => return Err(Error::InvalidForContent),
        };

        Ok(StakeAddress(value.network(), payload))
    }
}

impl Address {
    pub fn to_bech32(&self) -> Result<String, Error> {
        match self {
            Address::Shelley(x) => x.to_bech32(),
            Address::Stake(x) => x.to_bech32(),
        }
    }

    pub fn from_bech32(bech32: &str) -> Result<Self, Error> {
        let (_, bytes) = decode_bech32(bech32)?;
        bytes_to_address(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        bytes_to_address(bytes)
    }

    pub fn from_hex(value: &str) -> Result<Self, Error> {
        let bytes = hex::decode(value).map_err(|_| Error::BadHex)?;
        bytes_to_address(&bytes)
    }

    pub fn network(&self) -> Network {
        match self {
            Address::Shelley(x) => x.network(),
            Address::Stake(x) => x.network(),
        }
    }

    pub fn typeid(&self) -> u8 {
        match self {
            Address::Shelley(x) => x.typeid(),
            Address::Stake(x) => x.typeid(),
        }
    }

    pub fn has_script(&self) -> bool {
        match self {
            Address::Shelley(x) => x.has_script(),
            Address::Stake(x) => x.is_script(),
        }
    }

    pub fn is_enterprise(&self) -> bool {
        match self {
            Address::Shelley(x) => matches!(x.delegation(), ShelleyDelegationPart::Null),
            _ => false,
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        match self {
            Address::Shelley(x) => x.to_vec(),
            Address::Stake(x) => x.to_vec(),
        }
    }

    pub fn to_hex(&self) -> String {
        match self {
            Address::Shelley(x) => x.to_hex(),
            Address::Stake(x) => x.to_hex(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_bech32() {
            Ok(x) => f.write_str(&x),
            Err(_) => f.write_str(&self.to_hex()),
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(x) = Address::from_bech32(s) {
            return Ok(x);
        }

        if let Ok(x) = Address::from_hex(s) {
            return Ok(x);
        }

        Err(Error::UnknownStringFormat(s.to_owned()))
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        bytes_to_address(value)
    }
}

impl From<ShelleyAddress> for Address {
    fn from(addr: ShelleyAddress) -> Self {
        Address::Shelley(addr)
    }
}

impl From<StakeAddress> for Address {
    fn from(addr: StakeAddress) -> Self {
        Address::Stake(addr)
    }
}
