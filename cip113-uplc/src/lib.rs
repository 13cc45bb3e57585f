//! Untyped Plutus Core flat codec and parameter application
//!
//! Compiled validators are shipped as flat-encoded UPLC programs wrapped in
//! a CBOR byte string. Deriving a policy id off-chain means applying
//! runtime arguments to such a template and hashing the re-serialized
//! program; any drift from the on-chain serialization rules produces a
//! different hash and a transaction the validators reject. This crate
//! implements the bit-exact subset needed for that job: the program
//! envelope, every term constructor, and the constant universe compiled
//! token validators actually use.

mod apply;
mod bits;
mod program;
mod zigzag;

pub use apply::{apply_params_to_script, unwrap_cbor_envelope, wrap_cbor_envelope};
pub use program::{Constant, ConstantType, Program, Term};

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error("unexpected end of program bytes at bit {0}")]
    UnexpectedEnd(usize),

    #[error("invalid filler padding at bit {0}")]
    InvalidFiller(usize),

    #[error("trailing bytes after program body")]
    TrailingBytes,

    #[error("unknown term tag {0}")]
    UnknownTermTag(u8),

    #[error("unknown constant type tag {0}")]
    UnknownTypeTag(u8),

    #[error("constant type tag {0} is not supported by this codec")]
    UnsupportedConstant(u8),

    #[error("byte string chunk overruns program bytes")]
    BadByteString,

    #[error("constant data payload is not valid cbor: {0}")]
    BadDataPayload(String),

    #[error("program is not wrapped in a cbor byte string")]
    BadCborEnvelope,

    #[error("natural number does not fit the expected width")]
    NumberOverflow,

    #[error("string constant is not valid utf8")]
    InvalidUtf8,

    #[error("term nesting exceeds the decoder limit")]
    NestingTooDeep,
}
