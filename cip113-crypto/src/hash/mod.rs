mod digest;
mod hasher;
mod serde;

pub use digest::Hash;
pub use hasher::Hasher;
