//! The chain-indexer interface planners consume
//!
//! Planners issue reads in a deterministic order (protocol params, then
//! registry, then blacklist, then wallet balances) and never observe their
//! own side effects; a stale snapshot simply yields a transaction the
//! chain rejects, which the caller retries. Keeping the trait synchronous
//! keeps the planners pure; async runtimes wrap it at the edge.

use cip113_addresses::Address;
use cip113_crypto::hash::Hash;
use cip113_primitives::{TransactionInput, Utxo};

pub type ProviderError = Box<dyn std::error::Error + Send + Sync>;

pub trait UtxoProvider {
    /// Resolves one outpoint to its unspent output, if it exists
    fn resolve_outpoint(&self, outpoint: &TransactionInput)
        -> Result<Option<Utxo>, ProviderError>;

    /// All unspent outputs sitting at an address
    fn utxos_at_address(&self, address: &Address) -> Result<Vec<Utxo>, ProviderError>;

    /// All unspent outputs owned by a payment or stake key hash
    fn utxos_of_owner(&self, key_hash: &Hash<28>) -> Result<Vec<Utxo>, ProviderError>;
}
