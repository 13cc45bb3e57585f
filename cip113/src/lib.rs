//! Rust building blocks for CIP-0113 programmable tokens
//!
//! This crate re-exports the whole workspace behind one dependency: the
//! off-chain construction core that turns user intent (register, mint,
//! transfer, freeze, seize) into canonical unsigned transactions which the
//! on-chain programmable-token validators accept bit-for-bit. It provides
//! no application of its own; wallets, services and CLIs layer on top.

#[doc(inline)]
pub use cip113_codec as codec;

#[doc(inline)]
pub use cip113_crypto as crypto;

#[doc(inline)]
pub use cip113_addresses as addresses;

#[doc(inline)]
pub use cip113_primitives as primitives;

#[doc(inline)]
pub use cip113_uplc as uplc;

#[doc(inline)]
pub use cip113_blueprint as blueprint;

#[doc(inline)]
pub use cip113_registry as registry;

#[doc(inline)]
pub use cip113_txbuilder as txbuilder;
