//! Shared test fixtures: an in-memory UTxO provider plus a synthetic
//! deployment whose bootstrap hashes are derived through the same
//! parameterization path the planners use, so every cross-check holds.

#![allow(dead_code)]

use cip113_addresses::{
    Address, Network, ShelleyAddress, ShelleyDelegationPart, ShelleyPaymentPart,
};
use cip113_blueprint::{
    enterprise_address, BaseScript, Blueprint, BlueprintPreamble, BlueprintValidator, GlobalScript,
    OutpointRef, ParamsScript, ProtocolBootstrap, RegistryMintScript, RegistrySpendScript,
};
use cip113_codec::utils::{Bytes, PositiveCoin};
use cip113_crypto::hash::{Hash, Hasher};
use cip113_primitives::{PlutusData, PolicyId, TransactionInput, Utxo, Value};
use cip113_registry::{BlacklistNode, RegistryNode, TAIL_TERMINATOR};
use cip113_txbuilder::provider::{ProviderError, UtxoProvider};
use cip113_uplc::{apply_params_to_script, wrap_cbor_envelope, Constant, Program, Term};

pub const NETWORK: Network = Network::Testnet;

/// In-memory provider backed by a flat UTxO list
pub struct MockProvider {
    pub utxos: Vec<Utxo>,
}

impl MockProvider {
    pub fn new(utxos: Vec<Utxo>) -> Self {
        MockProvider { utxos }
    }
}

impl UtxoProvider for MockProvider {
    fn resolve_outpoint(
        &self,
        outpoint: &TransactionInput,
    ) -> Result<Option<Utxo>, ProviderError> {
        Ok(self.utxos.iter().find(|u| u.input == *outpoint).cloned())
    }

    fn utxos_at_address(&self, address: &Address) -> Result<Vec<Utxo>, ProviderError> {
        let bytes = address.to_vec();
        Ok(self
            .utxos
            .iter()
            .filter(|u| u.address.as_ref() == bytes.as_slice())
            .cloned()
            .collect())
    }

    fn utxos_of_owner(&self, key_hash: &Hash<28>) -> Result<Vec<Utxo>, ProviderError> {
        Ok(self
            .utxos
            .iter()
            .filter(|u| {
                u.address
                    .as_ref()
                    .windows(28)
                    .any(|w| w == key_hash.as_ref())
            })
            .cloned()
            .collect())
    }
}

pub fn outpoint(tag: u8, index: u64) -> TransactionInput {
    TransactionInput::new(Hash::new([tag; 32]), index)
}

/// A distinct minimal compiled template per constant value
pub fn template(n: i64) -> Bytes {
    let program = Program {
        version: (1, 1, 0),
        term: Term::Constant(Constant::Integer(n.into())),
    };

    wrap_cbor_envelope(&program.to_flat()).into()
}

pub fn outpoint_data(input: &TransactionInput) -> PlutusData {
    PlutusData::constr(
        0,
        vec![
            PlutusData::bytes(input.transaction_id.to_vec()),
            PlutusData::int(input.index as i64),
        ],
    )
}

pub fn script_credential(hash: &Hash<28>) -> PlutusData {
    PlutusData::constr(1, vec![PlutusData::bytes(hash.to_vec())])
}

/// The hash a planner will derive for this template and parameter list
pub fn derived_hash(template: &Bytes, params: &[PlutusData]) -> Hash<28> {
    let bytes = apply_params_to_script(template.as_ref(), params).unwrap();
    Hasher::<224>::hash_tagged(&bytes, 3)
}

pub struct Deployment {
    pub bootstrap: ProtocolBootstrap,
    pub blueprint: Blueprint,
    pub substandard: Blueprint,
    pub registry_address: Address,
    pub registry_nft_policy: PolicyId,
    pub base_hash: Hash<28>,
    pub global_hash: Hash<28>,
}

fn validator(title: &str, code: &Bytes) -> BlueprintValidator {
    BlueprintValidator {
        title: title.to_string(),
        compiled_code: code.clone(),
        hash: Hasher::<224>::hash_tagged(code.as_ref(), 3),
    }
}

pub fn deployment() -> Deployment {
    let protocol_params_hash: Hash<28> = Hash::new([0xa1; 28]);
    let issuance_params_hash: Hash<28> = Hash::new([0xa2; 28]);

    let t_issuance = template(10);
    let t_registry_spend = template(11);
    let t_registry_mint = template(12);
    let t_global = template(13);
    let t_base = template(14);

    let global_hash = derived_hash(
        &t_global,
        &[PlutusData::bytes(protocol_params_hash.to_vec())],
    );
    let base_hash = derived_hash(&t_base, &[PlutusData::bytes(global_hash.to_vec())]);
    let registry_spend_hash = derived_hash(
        &t_registry_spend,
        &[PlutusData::bytes(protocol_params_hash.to_vec())],
    );

    let registry_mint_seed = OutpointRef {
        tx_hash: Hash::new([0xb0; 32]),
        index: 0,
    };
    let registry_mint_hash = derived_hash(
        &t_registry_mint,
        &[
            outpoint_data(&registry_mint_seed.into()),
            PlutusData::bytes(issuance_params_hash.to_vec()),
        ],
    );

    let bootstrap = ProtocolBootstrap {
        tx_hash: Hash::new([0xb1; 32]),
        protocol_params: ParamsScript {
            script_hash: protocol_params_hash,
            tx_input: OutpointRef {
                tx_hash: Hash::new([0xc1; 32]),
                index: 0,
            },
        },
        issuance_params: ParamsScript {
            script_hash: issuance_params_hash,
            tx_input: OutpointRef {
                tx_hash: Hash::new([0xc1; 32]),
                index: 1,
            },
        },
        programmable_logic_global: GlobalScript {
            script_hash: global_hash,
            protocol_params_script_hash: protocol_params_hash,
        },
        programmable_logic_base: BaseScript {
            script_hash: base_hash,
            programmable_logic_global_script_hash: global_hash,
        },
        registry_spend: RegistrySpendScript {
            script_hash: registry_spend_hash,
            protocol_params_script_hash: protocol_params_hash,
        },
        registry_mint: RegistryMintScript {
            script_hash: registry_mint_hash,
            tx_input: registry_mint_seed,
            issuance_script_hash: issuance_params_hash,
        },
    };

    let blueprint = Blueprint {
        preamble: BlueprintPreamble {
            title: "programmable-tokens/protocol".to_string(),
            version: Some("0.1.0".to_string()),
            plutus_version: Some("v3".to_string()),
        },
        validators: vec![
            validator("issuance_mint.issuance_mint.mint", &t_issuance),
            validator("registry_spend.registry_spend.spend", &t_registry_spend),
            validator("registry_mint.registry_mint.mint", &t_registry_mint),
            validator(
                "programmable_logic_global.programmable_logic_global.withdraw",
                &t_global,
            ),
            validator(
                "programmable_logic_base.programmable_logic_base.spend",
                &t_base,
            ),
        ],
    };

    let substandard = Blueprint {
        preamble: BlueprintPreamble {
            title: "programmable-tokens/substandard".to_string(),
            version: None,
            plutus_version: None,
        },
        validators: vec![
            validator("transfer.issue.withdraw", &template(1)),
            validator("transfer.transfer.withdraw", &template(2)),
            validator("transfer.third_party.withdraw", &template(3)),
            validator("blacklist_mint.mint", &template(20)),
            validator("blacklist_spend.spend", &template(21)),
        ],
    };

    Deployment {
        registry_address: enterprise_address(registry_spend_hash, NETWORK),
        registry_nft_policy: registry_mint_hash,
        base_hash,
        global_hash,
        bootstrap,
        blueprint,
        substandard,
    }
}

impl Deployment {
    fn substandard_template(&self, title: &str) -> &Bytes {
        &self
            .substandard
            .validators
            .iter()
            .find(|v| v.title == title)
            .unwrap()
            .compiled_code
    }

    pub fn issue_hash(&self) -> Hash<28> {
        derived_hash(self.substandard_template("transfer.issue.withdraw"), &[])
    }

    pub fn dummy_transfer_hash(&self) -> Hash<28> {
        derived_hash(self.substandard_template("transfer.transfer.withdraw"), &[])
    }

    pub fn fas_transfer_hash(&self, blacklist_policy: &PolicyId) -> Hash<28> {
        derived_hash(
            self.substandard_template("transfer.transfer.withdraw"),
            &[
                PlutusData::bytes(self.base_hash.to_vec()),
                PlutusData::bytes(blacklist_policy.to_vec()),
            ],
        )
    }

    pub fn third_party_hash(&self, admin: Option<&Hash<28>>) -> Hash<28> {
        let params: Vec<PlutusData> = admin
            .iter()
            .map(|h| PlutusData::bytes(h.to_vec()))
            .collect();
        derived_hash(
            self.substandard_template("transfer.third_party.withdraw"),
            &params,
        )
    }

    /// The policy id a registration under this deployment derives
    pub fn policy_id(&self) -> PolicyId {
        let issuance = self
            .blueprint
            .validators
            .iter()
            .find(|v| v.title == "issuance_mint.issuance_mint.mint")
            .unwrap();

        derived_hash(
            &issuance.compiled_code,
            &[
                script_credential(&self.base_hash),
                script_credential(&self.issue_hash()),
            ],
        )
    }

    pub fn blacklist_mint_hash(&self, seed: &TransactionInput, admin: &Hash<28>) -> PolicyId {
        derived_hash(
            self.substandard_template("blacklist_mint.mint"),
            &[outpoint_data(seed), PlutusData::bytes(admin.to_vec())],
        )
    }

    pub fn blacklist_address(&self, blacklist_policy: &PolicyId) -> Address {
        let spend_hash = derived_hash(
            self.substandard_template("blacklist_spend.spend"),
            &[PlutusData::bytes(blacklist_policy.to_vec())],
        );
        enterprise_address(spend_hash, NETWORK)
    }

    /// The programmable-token address of a holder's stake key
    pub fn programmable_address(&self, stake_key: &Hash<28>) -> Address {
        cip113_blueprint::base_address(self.base_hash, *stake_key, NETWORK)
    }
}

pub fn base_key_address(payment_tag: u8, stake_tag: u8) -> Address {
    ShelleyAddress::new(
        NETWORK,
        ShelleyPaymentPart::key_hash(Hash::new([payment_tag; 28])),
        ShelleyDelegationPart::key_hash(Hash::new([stake_tag; 28])),
    )
    .into()
}

pub fn ada_utxo(input: TransactionInput, address: &Address, coin: u64) -> Utxo {
    Utxo {
        input,
        address: address.to_vec().into(),
        value: Value::Coin(coin),
        datum: None,
        script: None,
    }
}

pub fn asset_utxo(
    input: TransactionInput,
    address: &Address,
    coin: u64,
    policy: PolicyId,
    name: &[u8],
    quantity: u64,
    datum: Option<PlutusData>,
) -> Utxo {
    Utxo {
        input,
        address: address.to_vec().into(),
        value: Value::Multiasset(
            coin,
            vec![(
                policy,
                vec![(
                    Bytes::from(name.to_vec()),
                    PositiveCoin::try_from(quantity).unwrap(),
                )]
                .into(),
            )]
            .into(),
        ),
        datum,
        script: None,
    }
}

/// UTxOs at the two protocol parameter outpoints the bootstrap names
pub fn protocol_param_utxos(dep: &Deployment) -> Vec<Utxo> {
    let params_address = enterprise_address(dep.bootstrap.protocol_params.script_hash, NETWORK);

    vec![
        ada_utxo(
            dep.bootstrap.protocol_params.tx_input.into(),
            &params_address,
            2_000_000,
        ),
        ada_utxo(
            dep.bootstrap.issuance_params.tx_input.into(),
            &params_address,
            2_000_000,
        ),
    ]
}

/// Registry UTxOs for the given nodes, one NFT-carrying output each
pub fn registry_utxos(dep: &Deployment, nodes: &[RegistryNode]) -> Vec<Utxo> {
    nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            asset_utxo(
                outpoint(0xd0, i as u64),
                &dep.registry_address,
                2_000_000,
                dep.registry_nft_policy,
                node.key.as_ref(),
                1,
                Some(node.to_plutus_data()),
            )
        })
        .collect()
}

/// A registry holding only the sentinel head
pub fn genesis_registry(dep: &Deployment) -> Vec<Utxo> {
    registry_utxos(
        dep,
        &[RegistryNode {
            key: Bytes::empty(),
            next: TAIL_TERMINATOR.to_vec().into(),
            transfer_script_hash: Bytes::empty(),
            third_party_script_hash: Bytes::empty(),
            metadata: Bytes::empty(),
        }],
    )
}

/// A registry with the head plus one registered policy
pub fn registry_with(
    dep: &Deployment,
    policy: PolicyId,
    transfer_hash: Hash<28>,
    third_party_hash: Option<Hash<28>>,
) -> Vec<Utxo> {
    registry_utxos(
        dep,
        &[
            RegistryNode {
                key: Bytes::empty(),
                next: policy.to_vec().into(),
                transfer_script_hash: Bytes::empty(),
                third_party_script_hash: Bytes::empty(),
                metadata: Bytes::empty(),
            },
            RegistryNode {
                key: policy.to_vec().into(),
                next: TAIL_TERMINATOR.to_vec().into(),
                transfer_script_hash: transfer_hash.to_vec().into(),
                third_party_script_hash: third_party_hash
                    .map(|h| h.to_vec().into())
                    .unwrap_or_else(Bytes::empty),
                metadata: Bytes::empty(),
            },
        ],
    )
}

/// Blacklist UTxOs for the given keys (the sentinel head is implied)
pub fn blacklist_utxos(
    dep: &Deployment,
    blacklist_policy: &PolicyId,
    keys: &[[u8; 28]],
) -> Vec<Utxo> {
    let address = dep.blacklist_address(blacklist_policy);

    let mut all: Vec<Vec<u8>> = vec![vec![]];
    all.extend(keys.iter().map(|k| k.to_vec()));

    all.iter()
        .enumerate()
        .map(|(i, key)| {
            let next = all
                .get(i + 1)
                .cloned()
                .unwrap_or_else(|| TAIL_TERMINATOR.to_vec());

            let node = BlacklistNode {
                key: key.clone().into(),
                next: next.into(),
            };

            asset_utxo(
                outpoint(0xe0, i as u64),
                &address,
                2_000_000,
                *blacklist_policy,
                node.key.as_ref(),
                1,
                Some(node.to_plutus_data()),
            )
        })
        .collect()
}
