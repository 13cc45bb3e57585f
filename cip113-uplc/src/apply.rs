//! Parameter application over serialized script templates
//!
//! Blueprint files ship compiled code either as the raw flat program or
//! wrapped in one or two layers of CBOR byte strings, depending on which
//! toolchain produced them. Everything here funnels through a single
//! normal form: the flat program wrapped in exactly one byte string, which
//! is also the form the ledger hashes behind the language tag.

use cip113_codec::minicbor::{self, Decoder};
use cip113_primitives::plutus_data::PlutusData;

use crate::{Error, Program};

/// Strips CBOR byte-string layers until the raw flat program remains
///
/// A flat program always starts with its major version natural (0x01 for
/// every published language version), which can never be the head of a
/// whole-buffer CBOR byte string, so peeling is unambiguous. At most two
/// layers are peeled; anything deeper is treated as a malformed envelope.
pub fn unwrap_cbor_envelope(bytes: &[u8]) -> Result<Vec<u8>, Error> {
    let mut current = bytes.to_vec();

    for _ in 0..2 {
        let mut probe = Decoder::new(&current);

        let inner = match probe.bytes() {
            Ok(inner) if probe.position() == current.len() => inner.to_vec(),
            _ => break,
        };

        current = inner;
    }

    let mut probe = Decoder::new(&current);
    if probe.bytes().is_ok() && probe.position() == current.len() {
        return Err(Error::BadCborEnvelope);
    }

    if current.is_empty() {
        return Err(Error::BadCborEnvelope);
    }

    Ok(current)
}

/// Wraps raw flat program bytes in one CBOR byte string
pub fn wrap_cbor_envelope(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 4);
    let mut e = minicbor::Encoder::new(&mut out);
    e.bytes(bytes).expect("infallible");
    out
}

/// Applies ordered data parameters to a compiled script template
///
/// Returns the singly-wrapped serialized program, the form scripts are
/// stored and hashed in. An empty parameter list only normalizes the
/// wrapping, leaving the program bytes untouched.
pub fn apply_params_to_script(
    template: &[u8],
    params: &[PlutusData],
) -> Result<Vec<u8>, Error> {
    let raw = unwrap_cbor_envelope(template)?;

    if params.is_empty() {
        return Ok(wrap_cbor_envelope(&raw));
    }

    let program = Program::from_flat(&raw)?;
    let applied = program.apply_data_params(params);

    Ok(wrap_cbor_envelope(&applied.to_flat()))
}
