//! The on-chain structured data model and its canonical binary form
//!
//! Datums and redeemers cross the wire as "plutus data": a small recursive
//! universe of constructors, integers, byte strings, lists and maps. The
//! encoding here matches the canonical Haskell plutus implementation
//! bit-for-bit, which is what makes off-chain datum hashes equal their
//! on-chain counterparts: compact constructor tags 121..=127 for indices
//! 0..=6, 1280..=1400 for 7..=127, the general tag 102 beyond that;
//! indefinite-length lists except when empty; byte strings chunked at 64
//! bytes; shortest-form integers with bignum tags past the 64-bit range.

use cip113_codec::minicbor::{self, data::Tag, Encode};
use cip113_codec::utils::{Int, KeyValuePairs};
use cip113_crypto::hash::{Hash, Hasher};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Deref};

/// Nesting levels past which [decode] refuses to parse
pub const MAX_DATA_DEPTH: usize = 512;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub enum PlutusData {
    Constr(Constr<PlutusData>),
    Map(KeyValuePairs<PlutusData, PlutusData>),
    BigInt(BigInt),
    BoundedBytes(BoundedBytes),
    Array(Vec<PlutusData>),
}

impl PlutusData {
    /// A constructor value addressed by constructor index (not wire tag)
    pub fn constr(index: u64, fields: Vec<PlutusData>) -> Self {
        let (tag, any_constructor) = match index {
            0..=6 => (121 + index, None),
            7..=127 => (1280 + index - 7, None),
            _ => (102, Some(index)),
        };

        PlutusData::Constr(Constr {
            tag,
            any_constructor,
            fields,
        })
    }

    pub fn int(value: i64) -> Self {
        PlutusData::BigInt(BigInt::Int(Int::from(value)))
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        PlutusData::BoundedBytes(BoundedBytes::from(value.into()))
    }

    pub fn list(items: Vec<PlutusData>) -> Self {
        PlutusData::Array(items)
    }

    pub fn map(pairs: Vec<(PlutusData, PlutusData)>) -> Self {
        PlutusData::Map(pairs.into())
    }

    /// The constructor index, when this value is a constructor
    pub fn constr_index(&self) -> Option<u64> {
        match self {
            PlutusData::Constr(x) => Some(x.index()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PlutusData::BoundedBytes(x) => Some(x.deref()),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Error {
    MalformedInput(String),
    UnknownTag(u64),
    TooDeep(usize),
    NonCanonical,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::MalformedInput(x) => write!(f, "malformed plutus data: {x}"),
            Error::UnknownTag(x) => write!(f, "unknown tag {x} for plutus data"),
            Error::TooDeep(x) => write!(f, "plutus data nesting of {x} exceeds limit"),
            Error::NonCanonical => write!(f, "plutus data encoding is not canonical"),
        }
    }
}

impl std::error::Error for Error {}

/// Canonical serialization of a data value
pub fn encode(data: &PlutusData) -> Vec<u8> {
    // the encoder is infallible when writing to a vec
    minicbor::to_vec(data).expect("infallible")
}

/// Parses the canonical encoding of a data value
///
/// Rejects trailing bytes, nesting beyond [MAX_DATA_DEPTH], tags outside the
/// plutus universe, and any input that does not re-serialize to the exact
/// same bytes (non-canonical forms).
pub fn decode(bytes: &[u8]) -> Result<PlutusData, Error> {
    scan(bytes)?;

    let data: PlutusData =
        minicbor::decode(bytes).map_err(|e| Error::MalformedInput(e.to_string()))?;

    if encode(&data) != bytes {
        return Err(Error::NonCanonical);
    }

    Ok(data)
}

/// Blake2b-256 digest of the canonical encoding, i.e. the datum hash
pub fn hash(data: &PlutusData) -> Hash<32> {
    Hasher::<256>::hash_cbor(data)
}

/// Structural pre-scan of raw CBOR: bounds nesting before the recursive
/// decoder runs, and rejects tags outside the plutus universe early.
fn scan(bytes: &[u8]) -> Result<(), Error> {
    enum Pending {
        Definite(u64),
        Indefinite,
    }

    fn malformed(what: &str) -> Error {
        Error::MalformedInput(what.to_string())
    }

    // reads a CBOR head argument; Ok(None) means indefinite length
    fn read_arg(bytes: &[u8], pos: usize, info: u8) -> Result<(Option<u64>, usize), Error> {
        let take = |n: usize| -> Result<u64, Error> {
            let slice = bytes
                .get(pos + 1..pos + 1 + n)
                .ok_or_else(|| malformed("truncated head"))?;
            let mut out = 0u64;
            for b in slice {
                out = (out << 8) | *b as u64;
            }
            Ok(out)
        };

        match info {
            0..=23 => Ok((Some(info as u64), 1)),
            24 => Ok((Some(take(1)?), 2)),
            25 => Ok((Some(take(2)?), 3)),
            26 => Ok((Some(take(4)?), 5)),
            27 => Ok((Some(take(8)?), 9)),
            31 => Ok((None, 1)),
            _ => Err(malformed("reserved length encoding")),
        }
    }

    let mut stack: Vec<Pending> = Vec::new();
    let mut pos = 0usize;
    let mut top_done = false;

    // bubbles one finished item up through definite-length parents
    fn item_finished(stack: &mut Vec<Pending>, top_done: &mut bool) {
        loop {
            match stack.last_mut() {
                None => {
                    *top_done = true;
                    return;
                }
                Some(Pending::Definite(n)) => {
                    *n -= 1;
                    if *n == 0 {
                        stack.pop();
                        continue;
                    }
                    return;
                }
                Some(Pending::Indefinite) => return,
            }
        }
    }

    while !(top_done && stack.is_empty()) {
        let first = *bytes.get(pos).ok_or_else(|| malformed("unexpected end of input"))?;
        let major = first >> 5;
        let info = first & 0x1f;

        if major == 7 && info == 31 {
            match stack.pop() {
                Some(Pending::Indefinite) => {
                    pos += 1;
                    item_finished(&mut stack, &mut top_done);
                    continue;
                }
                _ => return Err(malformed("unexpected break")),
            }
        }

        let (arg, head_len) = read_arg(bytes, pos, info)?;
        pos += head_len;

        match major {
            0 | 1 => {
                if arg.is_none() {
                    return Err(malformed("indefinite integer"));
                }
                item_finished(&mut stack, &mut top_done);
            }
            2 | 3 => match arg {
                Some(n) => {
                    let n = usize::try_from(n).map_err(|_| malformed("oversized string"))?;
                    if pos + n > bytes.len() {
                        return Err(malformed("truncated string"));
                    }
                    pos += n;
                    item_finished(&mut stack, &mut top_done);
                }
                None => {
                    stack.push(Pending::Indefinite);
                    if stack.len() > MAX_DATA_DEPTH {
                        return Err(Error::TooDeep(stack.len()));
                    }
                }
            },
            4 | 5 => {
                let items = match (major, arg) {
                    (4, Some(n)) => Some(n),
                    (5, Some(n)) => {
                        Some(n.checked_mul(2).ok_or_else(|| malformed("oversized map"))?)
                    }
                    _ => None,
                };

                match items {
                    Some(0) => item_finished(&mut stack, &mut top_done),
                    Some(n) => {
                        stack.push(Pending::Definite(n));
                        if stack.len() > MAX_DATA_DEPTH {
                            return Err(Error::TooDeep(stack.len()));
                        }
                    }
                    None => {
                        stack.push(Pending::Indefinite);
                        if stack.len() > MAX_DATA_DEPTH {
                            return Err(Error::TooDeep(stack.len()));
                        }
                    }
                }
            }
            6 => match arg {
                // the tagged value is the current item; keep scanning
                Some(2 | 3 | 102 | 121..=127 | 1280..=1400) => {}
                Some(other) => return Err(Error::UnknownTag(other)),
                None => return Err(malformed("indefinite tag")),
            },
            7 => item_finished(&mut stack, &mut top_done),
            _ => unreachable!(),
        }
    }

    if pos != bytes.len() {
        return Err(malformed("trailing bytes after plutus data"));
    }

    Ok(())
}

impl<'b, C> minicbor::decode::Decode<'b, C> for PlutusData {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let type_ = d.datatype()?;

        match type_ {
            minicbor::data::Type::Tag => {
                let mut probe = d.probe();
                let tag = probe.tag()?;

                match tag {
                    Tag::PosBignum | Tag::NegBignum => Ok(Self::BigInt(d.decode_with(ctx)?)),
                    Tag::Unassigned((121..=127) | (1280..=1400) | 102) => {
                        Ok(Self::Constr(d.decode_with(ctx)?))
                    }
                    _ => Err(minicbor::decode::Error::message(
                        "unknown tag for plutus data",
                    )),
                }
            }
            minicbor::data::Type::U8
            | minicbor::data::Type::U16
            | minicbor::data::Type::U32
            | minicbor::data::Type::U64
            | minicbor::data::Type::I8
            | minicbor::data::Type::I16
            | minicbor::data::Type::I32
            | minicbor::data::Type::I64
            | minicbor::data::Type::Int => Ok(Self::BigInt(d.decode_with(ctx)?)),
            minicbor::data::Type::Map | minicbor::data::Type::MapIndef => {
                Ok(Self::Map(d.decode_with(ctx)?))
            }
            minicbor::data::Type::Bytes | minicbor::data::Type::BytesIndef => {
                Ok(Self::BoundedBytes(d.decode_with(ctx)?))
            }
            minicbor::data::Type::Array | minicbor::data::Type::ArrayIndef => {
                Ok(Self::Array(d.decode_with(ctx)?))
            }

            any => Err(minicbor::decode::Error::message(format!(
                "bad cbor data type ({any:?}) for plutus data"
            ))),
        }
    }
}

impl<C> minicbor::encode::Encode<C> for PlutusData {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            Self::Constr(a) => {
                e.encode_with(a, ctx)?;
            }
            Self::Map(a) => {
                // definite-length map, matching the canonical haskell encoder
                e.map(a.len() as u64)?;
                for (k, v) in a.iter() {
                    k.encode(e, ctx)?;
                    v.encode(e, ctx)?;
                }
            }
            Self::BigInt(a) => {
                e.encode_with(a, ctx)?;
            }
            Self::BoundedBytes(a) => {
                e.encode_with(a, ctx)?;
            }
            Self::Array(a) => {
                encode_list(a, e, ctx)?;
            }
        };

        Ok(())
    }
}

/*
big_int = int / big_uint / big_nint
big_uint = #6.2(bounded_bytes)
big_nint = #6.3(bounded_bytes)
*/

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub enum BigInt {
    Int(Int),
    BigUInt(BoundedBytes),
    BigNInt(BoundedBytes),
}

impl<'b, C> minicbor::decode::Decode<'b, C> for BigInt {
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let datatype = d.datatype()?;

        match datatype {
            minicbor::data::Type::U8
            | minicbor::data::Type::U16
            | minicbor::data::Type::U32
            | minicbor::data::Type::U64
            | minicbor::data::Type::I8
            | minicbor::data::Type::I16
            | minicbor::data::Type::I32
            | minicbor::data::Type::I64
            | minicbor::data::Type::Int => Ok(Self::Int(d.decode_with(ctx)?)),
            minicbor::data::Type::Tag => match d.tag()? {
                Tag::PosBignum => Ok(Self::BigUInt(d.decode_with(ctx)?)),
                Tag::NegBignum => Ok(Self::BigNInt(d.decode_with(ctx)?)),
                _ => Err(minicbor::decode::Error::message(
                    "invalid cbor tag for big int",
                )),
            },
            _ => Err(minicbor::decode::Error::message(
                "invalid cbor data type for big int",
            )),
        }
    }
}

impl<C> minicbor::encode::Encode<C> for BigInt {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        match self {
            BigInt::Int(x) => {
                e.encode_with(x, ctx)?;
            }
            BigInt::BigUInt(x) => {
                e.tag(Tag::PosBignum)?;
                e.encode_with(x, ctx)?;
            }
            BigInt::BigNInt(x) => {
                e.tag(Tag::NegBignum)?;
                e.encode_with(x, ctx)?;
            }
        };

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct Constr<A> {
    pub tag: u64,
    pub any_constructor: Option<u64>,
    pub fields: Vec<A>,
}

impl<A> Constr<A> {
    /// The logical constructor index, undoing the compact tag mapping
    pub fn index(&self) -> u64 {
        match self.tag {
            121..=127 => self.tag - 121,
            1280..=1400 => self.tag - 1280 + 7,
            _ => self.any_constructor.unwrap_or_default(),
        }
    }
}

impl<'b, C, A> minicbor::decode::Decode<'b, C> for Constr<A>
where
    A: minicbor::decode::Decode<'b, C>,
{
    fn decode(d: &mut minicbor::Decoder<'b>, ctx: &mut C) -> Result<Self, minicbor::decode::Error> {
        let tag = d.tag()?;

        match tag {
            Tag::Unassigned(x @ 121..=127) | Tag::Unassigned(x @ 1280..=1400) => Ok(Constr {
                tag: x,
                fields: d.decode_with(ctx)?,
                any_constructor: None,
            }),
            Tag::Unassigned(102) => {
                d.array()?;

                Ok(Constr {
                    tag: 102,
                    any_constructor: Some(d.decode_with(ctx)?),
                    fields: d.decode_with(ctx)?,
                })
            }
            _ => Err(minicbor::decode::Error::message(
                "bad tag code for plutus data",
            )),
        }
    }
}

impl<C, A> minicbor::encode::Encode<C> for Constr<A>
where
    A: minicbor::encode::Encode<C>,
{
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.tag(Tag::Unassigned(self.tag))?;

        match self.tag {
            102 => {
                e.array(2)?;
                e.encode_with(self.any_constructor.unwrap_or_default(), ctx)?;
                encode_list(&self.fields, e, ctx)?;
                Ok(())
            }
            _ => {
                encode_list(&self.fields, e, ctx)?;
                Ok(())
            }
        }
    }
}

/// Byte strings chunked the way the canonical plutus encoder chunks them
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(into = "String")]
#[serde(try_from = "String")]
pub struct BoundedBytes(Vec<u8>);

impl From<Vec<u8>> for BoundedBytes {
    fn from(xs: Vec<u8>) -> Self {
        BoundedBytes(xs)
    }
}

impl From<BoundedBytes> for Vec<u8> {
    fn from(b: BoundedBytes) -> Self {
        b.0
    }
}

impl Deref for BoundedBytes {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<String> for BoundedBytes {
    type Error = hex::FromHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let v = hex::decode(value)?;
        Ok(BoundedBytes(v))
    }
}

impl From<BoundedBytes> for String {
    fn from(b: BoundedBytes) -> Self {
        hex::encode(b.deref())
    }
}

impl fmt::Display for BoundedBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl<C> Encode<C> for BoundedBytes {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        // byte strings longer than 64 bytes turn into indefinite-length
        // sequences of 64-byte chunks, as the haskell encoder emits them
        const CHUNK_SIZE: usize = 64;
        let bs = &self.0;

        if bs.len() <= CHUNK_SIZE {
            e.bytes(bs)?;
        } else {
            e.begin_bytes()?;
            for b in bs.chunks(CHUNK_SIZE) {
                e.bytes(b)?;
            }
            e.end()?;
        }

        Ok(())
    }
}

impl<'b, C> minicbor::decode::Decode<'b, C> for BoundedBytes {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let mut res = Vec::new();
        for chunk in d.bytes_iter()? {
            res.extend_from_slice(chunk?);
        }
        Ok(BoundedBytes::from(res))
    }
}

fn encode_list<C, W: minicbor::encode::Write, A: minicbor::encode::Encode<C>>(
    a: &Vec<A>,
    e: &mut minicbor::Encoder<W>,
    ctx: &mut C,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    // indefinite-length for non-empty lists, definite zero-length when
    // empty, mimicking cborg's default list encoder
    if a.is_empty() {
        e.array(0)?;
    } else {
        e.begin_array()?;
        for v in a {
            e.encode_with(v, ctx)?;
        }
        e.end()?;
    }

    Ok(())
}
