//! Shared CBOR plumbing for the cip113 crates
//!
//! Everything that crosses the wire in this workspace goes through
//! [minicbor]; this crate re-exports the library so that all sibling crates
//! agree on the same version, and provides the handful of helper structs
//! needed to express Cardano's CDDL quirks (sets, byte wrappers, ordered
//! maps) with round-trip fidelity.

/// Shared re-export of minicbor across the workspace
pub use minicbor;

/// Round-trip friendly helper structs
pub mod utils;

/// Shorthand for types that encode/decode as a standalone CBOR fragment
pub trait Fragment: Sized + for<'b> minicbor::Decode<'b, ()> + minicbor::Encode<()> {}

impl<T> Fragment for T where T: for<'b> minicbor::Decode<'b, ()> + minicbor::Encode<()> + Sized {}
