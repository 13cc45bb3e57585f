//! Cryptographic primitives for the cip113 workspace
//!
//! The programmable-token protocol only ever needs one hash family: Blake2b
//! at 224 bits (script hashes, key hashes) and 256 bits (datum hashes,
//! transaction body hashes). This crate provides a sized digest value and a
//! streaming hasher around it.

pub mod hash;
