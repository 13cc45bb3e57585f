use cip113_addresses::{
    Address, Network, ShelleyAddress, ShelleyDelegationPart, ShelleyPaymentPart, StakeAddress,
    StakePayload,
};
use cip113_crypto::hash::Hash;

/// Payment-script-only address, used for registry and blacklist nodes
pub fn enterprise_address(script_hash: Hash<28>, network: Network) -> Address {
    ShelleyAddress::new(
        network,
        ShelleyPaymentPart::script_hash(script_hash),
        ShelleyDelegationPart::Null,
    )
    .into()
}

/// The programmable-token address of one holder
///
/// Payment credential is the shared programmable-logic script; the stake
/// credential is the holder's own key, which is what discriminates holders
/// from one another.
pub fn base_address(
    payment_script_hash: Hash<28>,
    stake_key_hash: Hash<28>,
    network: Network,
) -> Address {
    ShelleyAddress::new(
        network,
        ShelleyPaymentPart::script_hash(payment_script_hash),
        ShelleyDelegationPart::key_hash(stake_key_hash),
    )
    .into()
}

/// The reward address of a script used as a withdrawal validator
pub fn reward_address(script_hash: Hash<28>, network: Network) -> Address {
    StakeAddress::new(network, StakePayload::Script(script_hash)).into()
}

/// Raw reward-account bytes for the withdrawals map of a transaction body
pub fn reward_account_bytes(script_hash: Hash<28>, network: Network) -> Vec<u8> {
    reward_address(script_hash, network).to_vec()
}
