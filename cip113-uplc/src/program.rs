//! Program, term and constant model with the flat codec
//!
//! Variables are deBruijn indices, so lambda binders carry no payload and a
//! decoded program re-serializes to the exact bytes it came from. Data
//! constants keep their raw CBOR payload untouched for the same reason.

use cip113_codec::minicbor;
use cip113_primitives::plutus_data::{self, PlutusData};
use num_bigint::BigInt;

use crate::bits::{BitReader, BitWriter};
use crate::zigzag::ZigZag;
use crate::Error;

const TERM_VAR: u8 = 0;
const TERM_DELAY: u8 = 1;
const TERM_LAMBDA: u8 = 2;
const TERM_APPLY: u8 = 3;
const TERM_CONSTANT: u8 = 4;
const TERM_FORCE: u8 = 5;
const TERM_ERROR: u8 = 6;
const TERM_BUILTIN: u8 = 7;
const TERM_CONSTR: u8 = 8;
const TERM_CASE: u8 = 9;

const TYPE_INTEGER: u8 = 0;
const TYPE_BYTE_STRING: u8 = 1;
const TYPE_STRING: u8 = 2;
const TYPE_UNIT: u8 = 3;
const TYPE_BOOL: u8 = 4;
const TYPE_LIST: u8 = 5;
const TYPE_PAIR: u8 = 6;
const TYPE_APPLY: u8 = 7;
const TYPE_DATA: u8 = 8;

const MAX_TERM_DEPTH: usize = 1 << 16;

/// A complete UPLC program: language version plus root term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub version: (u64, u64, u64),
    pub term: Term,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// deBruijn index of a bound variable
    Var(u64),
    Delay(Box<Term>),
    Lambda(Box<Term>),
    Apply {
        function: Box<Term>,
        argument: Box<Term>,
    },
    Constant(Constant),
    Force(Box<Term>),
    Error,
    /// default-function tag, kept opaque since this codec never evaluates
    Builtin(u8),
    Constr {
        tag: u64,
        fields: Vec<Term>,
    },
    Case {
        constr: Box<Term>,
        branches: Vec<Term>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Integer(BigInt),
    ByteString(Vec<u8>),
    String(String),
    Unit,
    Bool(bool),
    /// raw CBOR payload of a data constant
    Data(Vec<u8>),
    List(ConstantType, Vec<Constant>),
    Pair(ConstantType, ConstantType, Box<Constant>, Box<Constant>),
}

impl Constant {
    /// A data constant from a structured value, via canonical serialization
    pub fn data(value: &PlutusData) -> Self {
        Constant::Data(plutus_data::encode(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantType {
    Integer,
    ByteString,
    String,
    Unit,
    Bool,
    Data,
    List(Box<ConstantType>),
    Pair(Box<ConstantType>, Box<ConstantType>),
}

impl Program {
    /// Parses a flat-encoded program, rejecting trailing garbage
    pub fn from_flat(bytes: &[u8]) -> Result<Self, Error> {
        let mut reader = BitReader::new(bytes);

        let version = (
            reader.read_word()?,
            reader.read_word()?,
            reader.read_word()?,
        );

        let term = decode_term(&mut reader, 0)?;

        reader.read_filler()?;

        if !reader.is_at_end() {
            return Err(Error::TrailingBytes);
        }

        Ok(Program { version, term })
    }

    /// Serializes back to flat, bit-identical for any decoded program
    pub fn to_flat(&self) -> Vec<u8> {
        let mut writer = BitWriter::new();

        writer.write_word(self.version.0);
        writer.write_word(self.version.1);
        writer.write_word(self.version.2);

        encode_term(&mut writer, &self.term);

        writer.finish()
    }

    /// Wraps the root term in one application node per parameter, in order
    pub fn apply_data_params(mut self, params: &[PlutusData]) -> Self {
        for param in params {
            self.term = Term::Apply {
                function: Box::new(self.term),
                argument: Box::new(Term::Constant(Constant::data(param))),
            };
        }

        self
    }
}

fn decode_term(r: &mut BitReader, depth: usize) -> Result<Term, Error> {
    if depth > MAX_TERM_DEPTH {
        return Err(Error::NestingTooDeep);
    }

    match r.read_bits(4)? {
        TERM_VAR => Ok(Term::Var(r.read_word()?)),
        TERM_DELAY => Ok(Term::Delay(Box::new(decode_term(r, depth + 1)?))),
        TERM_LAMBDA => Ok(Term::Lambda(Box::new(decode_term(r, depth + 1)?))),
        TERM_APPLY => Ok(Term::Apply {
            function: Box::new(decode_term(r, depth + 1)?),
            argument: Box::new(decode_term(r, depth + 1)?),
        }),
        TERM_CONSTANT => {
            let ty = decode_constant_type(r)?;
            let value = decode_constant_value(r, &ty)?;
            Ok(Term::Constant(value))
        }
        TERM_FORCE => Ok(Term::Force(Box::new(decode_term(r, depth + 1)?))),
        TERM_ERROR => Ok(Term::Error),
        TERM_BUILTIN => Ok(Term::Builtin(r.read_bits(7)?)),
        TERM_CONSTR => {
            let tag = r.read_word()?;
            let mut fields = Vec::new();
            while r.read_bit()? {
                fields.push(decode_term(r, depth + 1)?);
            }
            Ok(Term::Constr { tag, fields })
        }
        TERM_CASE => {
            let constr = Box::new(decode_term(r, depth + 1)?);
            let mut branches = Vec::new();
            while r.read_bit()? {
                branches.push(decode_term(r, depth + 1)?);
            }
            Ok(Term::Case { constr, branches })
        }
        other => Err(Error::UnknownTermTag(other)),
    }
}

fn encode_term(w: &mut BitWriter, term: &Term) {
    match term {
        Term::Var(index) => {
            w.write_bits(TERM_VAR, 4);
            w.write_word(*index);
        }
        Term::Delay(inner) => {
            w.write_bits(TERM_DELAY, 4);
            encode_term(w, inner);
        }
        Term::Lambda(body) => {
            // deBruijn binders carry no name on the wire
            w.write_bits(TERM_LAMBDA, 4);
            encode_term(w, body);
        }
        Term::Apply { function, argument } => {
            w.write_bits(TERM_APPLY, 4);
            encode_term(w, function);
            encode_term(w, argument);
        }
        Term::Constant(value) => {
            w.write_bits(TERM_CONSTANT, 4);
            encode_constant(w, value);
        }
        Term::Force(inner) => {
            w.write_bits(TERM_FORCE, 4);
            encode_term(w, inner);
        }
        Term::Error => {
            w.write_bits(TERM_ERROR, 4);
        }
        Term::Builtin(tag) => {
            w.write_bits(TERM_BUILTIN, 4);
            w.write_bits(*tag, 7);
        }
        Term::Constr { tag, fields } => {
            w.write_bits(TERM_CONSTR, 4);
            w.write_word(*tag);
            for field in fields {
                w.write_bit(true);
                encode_term(w, field);
            }
            w.write_bit(false);
        }
        Term::Case { constr, branches } => {
            w.write_bits(TERM_CASE, 4);
            encode_term(w, constr);
            for branch in branches {
                w.write_bit(true);
                encode_term(w, branch);
            }
            w.write_bit(false);
        }
    }
}

fn constant_type_of(value: &Constant) -> ConstantType {
    match value {
        Constant::Integer(_) => ConstantType::Integer,
        Constant::ByteString(_) => ConstantType::ByteString,
        Constant::String(_) => ConstantType::String,
        Constant::Unit => ConstantType::Unit,
        Constant::Bool(_) => ConstantType::Bool,
        Constant::Data(_) => ConstantType::Data,
        Constant::List(item, _) => ConstantType::List(Box::new(item.clone())),
        Constant::Pair(a, b, _, _) => {
            ConstantType::Pair(Box::new(a.clone()), Box::new(b.clone()))
        }
    }
}

fn push_type_tags(ty: &ConstantType, out: &mut Vec<u8>) {
    match ty {
        ConstantType::Integer => out.push(TYPE_INTEGER),
        ConstantType::ByteString => out.push(TYPE_BYTE_STRING),
        ConstantType::String => out.push(TYPE_STRING),
        ConstantType::Unit => out.push(TYPE_UNIT),
        ConstantType::Bool => out.push(TYPE_BOOL),
        ConstantType::Data => out.push(TYPE_DATA),
        ConstantType::List(item) => {
            out.push(TYPE_APPLY);
            out.push(TYPE_LIST);
            push_type_tags(item, out);
        }
        ConstantType::Pair(a, b) => {
            out.push(TYPE_APPLY);
            out.push(TYPE_APPLY);
            out.push(TYPE_PAIR);
            push_type_tags(a, out);
            push_type_tags(b, out);
        }
    }
}

fn encode_constant(w: &mut BitWriter, value: &Constant) {
    let mut tags = Vec::new();
    push_type_tags(&constant_type_of(value), &mut tags);

    for tag in tags {
        w.write_bit(true);
        w.write_bits(tag, 4);
    }
    w.write_bit(false);

    encode_constant_value(w, value);
}

fn encode_constant_value(w: &mut BitWriter, value: &Constant) {
    match value {
        Constant::Integer(i) => {
            w.write_big_word(&i.clone().zigzag());
        }
        Constant::ByteString(bytes) => {
            w.write_byte_string(bytes);
        }
        Constant::String(text) => {
            w.write_byte_string(text.as_bytes());
        }
        Constant::Unit => {}
        Constant::Bool(b) => {
            w.write_bit(*b);
        }
        Constant::Data(payload) => {
            w.write_byte_string(payload);
        }
        Constant::List(_, items) => {
            for item in items {
                w.write_bit(true);
                encode_constant_value(w, item);
            }
            w.write_bit(false);
        }
        Constant::Pair(_, _, first, second) => {
            encode_constant_value(w, first);
            encode_constant_value(w, second);
        }
    }
}

fn decode_constant_type(r: &mut BitReader) -> Result<ConstantType, Error> {
    let mut tags = Vec::new();
    while r.read_bit()? {
        tags.push(r.read_bits(4)?);
    }

    let mut iter = tags.iter().copied();
    let ty = parse_type(&mut iter)?;

    if let Some(extra) = iter.next() {
        return Err(Error::UnknownTypeTag(extra));
    }

    Ok(ty)
}

fn parse_type(tags: &mut impl Iterator<Item = u8>) -> Result<ConstantType, Error> {
    match tags.next().ok_or(Error::UnexpectedEnd(0))? {
        TYPE_INTEGER => Ok(ConstantType::Integer),
        TYPE_BYTE_STRING => Ok(ConstantType::ByteString),
        TYPE_STRING => Ok(ConstantType::String),
        TYPE_UNIT => Ok(ConstantType::Unit),
        TYPE_BOOL => Ok(ConstantType::Bool),
        TYPE_DATA => Ok(ConstantType::Data),
        TYPE_APPLY => match tags.next().ok_or(Error::UnexpectedEnd(0))? {
            TYPE_LIST => Ok(ConstantType::List(Box::new(parse_type(tags)?))),
            TYPE_APPLY => match tags.next().ok_or(Error::UnexpectedEnd(0))? {
                TYPE_PAIR => Ok(ConstantType::Pair(
                    Box::new(parse_type(tags)?),
                    Box::new(parse_type(tags)?),
                )),
                other => Err(Error::UnknownTypeTag(other)),
            },
            other => Err(Error::UnknownTypeTag(other)),
        },
        tag @ (9 | 10 | 11) => Err(Error::UnsupportedConstant(tag)),
        other => Err(Error::UnknownTypeTag(other)),
    }
}

fn decode_constant_value(r: &mut BitReader, ty: &ConstantType) -> Result<Constant, Error> {
    match ty {
        ConstantType::Integer => {
            let natural = r.read_big_word()?;
            Ok(Constant::Integer(natural.zigzag()))
        }
        ConstantType::ByteString => Ok(Constant::ByteString(r.read_byte_string()?)),
        ConstantType::String => {
            let bytes = r.read_byte_string()?;
            String::from_utf8(bytes)
                .map(Constant::String)
                .map_err(|_| Error::InvalidUtf8)
        }
        ConstantType::Unit => Ok(Constant::Unit),
        ConstantType::Bool => Ok(Constant::Bool(r.read_bit()?)),
        ConstantType::Data => {
            let payload = r.read_byte_string()?;
            check_cbor_payload(&payload)?;
            Ok(Constant::Data(payload))
        }
        ConstantType::List(item) => {
            let mut items = Vec::new();
            while r.read_bit()? {
                items.push(decode_constant_value(r, item)?);
            }
            Ok(Constant::List(item.as_ref().clone(), items))
        }
        ConstantType::Pair(a, b) => {
            let first = decode_constant_value(r, a)?;
            let second = decode_constant_value(r, b)?;
            Ok(Constant::Pair(
                a.as_ref().clone(),
                b.as_ref().clone(),
                Box::new(first),
                Box::new(second),
            ))
        }
    }
}

fn check_cbor_payload(payload: &[u8]) -> Result<(), Error> {
    let mut probe = minicbor::Decoder::new(payload);

    probe
        .skip()
        .map_err(|e| Error::BadDataPayload(e.to_string()))?;

    if probe.position() != payload.len() {
        return Err(Error::BadDataPayload("trailing bytes".to_string()));
    }

    Ok(())
}
