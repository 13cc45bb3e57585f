//! Ledger primitives and cbor codecs for programmable-token transactions
//!
//! A single-era (post-Conway) model: just the slice of the ledger CDDL that
//! programmable-token transactions exercise, handcrafted the same way the
//! full multi-era codecs are.

pub mod plutus_data;
pub mod script_data;
mod tx;

pub use plutus_data::*;
pub use tx::*;

use cip113_codec::minicbor::{decode, to_vec, Decode, Encode};

pub use cip113_codec::utils::{Bytes, Int, KeyValuePairs, NonEmptySet, NonZeroInt, PositiveCoin, Set};
pub use cip113_crypto::hash::Hash;

pub type Error = Box<dyn std::error::Error>;

/// Types that encode/decode as one self-delimiting CBOR value
pub trait Fragment<'a>
where
    Self: Sized,
{
    fn encode_fragment(&self) -> Result<Vec<u8>, Error>;
    fn decode_fragment(bytes: &'a [u8]) -> Result<Self, Error>;
}

impl<'a, T> Fragment<'a> for T
where
    T: Encode<()> + Decode<'a, ()> + Sized,
{
    fn encode_fragment(&self) -> Result<Vec<u8>, Error> {
        to_vec(self).map_err(|e| e.into())
    }

    fn decode_fragment(bytes: &'a [u8]) -> Result<Self, Error> {
        decode(bytes).map_err(|e| e.into())
    }
}
