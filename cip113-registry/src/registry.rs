//! The token registry view (directory of registered policies)

use cip113_codec::utils::Bytes;
use cip113_crypto::hash::Hash;
use cip113_primitives::{PlutusData, PolicyId, TransactionInput, Utxo};
use tracing::debug;

use crate::chain::{self, ChainNode, Position};
use crate::Error;

/// Datum of one registry node
///
/// `key` is empty on the sentinel head, otherwise a policy id. The two
/// script hashes govern transfers under that policy; `metadata` is opaque
/// to the off-chain code and carried through verbatim on updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryNode {
    pub key: Bytes,
    pub next: Bytes,
    pub transfer_script_hash: Bytes,
    pub third_party_script_hash: Bytes,
    pub metadata: Bytes,
}

impl ChainNode for RegistryNode {
    fn key(&self) -> &[u8] {
        self.key.as_ref()
    }

    fn next(&self) -> &[u8] {
        self.next.as_ref()
    }
}

impl RegistryNode {
    pub fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                PlutusData::bytes(self.key.as_ref()),
                PlutusData::bytes(self.next.as_ref()),
                PlutusData::bytes(self.transfer_script_hash.as_ref()),
                PlutusData::bytes(self.third_party_script_hash.as_ref()),
                PlutusData::bytes(self.metadata.as_ref()),
            ],
        )
    }

    pub fn from_plutus_data(data: &PlutusData) -> Result<Self, String> {
        let fields = match data {
            PlutusData::Constr(constr) if constr.index() == 0 => &constr.fields,
            _ => return Err("expected constructor 0".to_string()),
        };

        let field = |i: usize| -> Result<Bytes, String> {
            fields
                .get(i)
                .and_then(|f| f.as_bytes())
                .map(Bytes::from)
                .ok_or_else(|| format!("field {i} is not a byte string"))
        };

        if fields.len() != 5 {
            return Err(format!("expected 5 fields, found {}", fields.len()));
        }

        Ok(RegistryNode {
            key: field(0)?,
            next: field(1)?,
            transfer_script_hash: field(2)?,
            third_party_script_hash: field(3)?,
            metadata: field(4)?,
        })
    }
}

/// A registry node together with the UTxO carrying it
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub utxo: Utxo,
    pub node: RegistryNode,
}

/// A verified snapshot of the full registry list
#[derive(Debug, Clone)]
pub struct RegistryView {
    entries: Vec<RegistryEntry>,
    /// indices of `entries` in list order, head first
    order: Vec<usize>,
}

impl RegistryView {
    /// Builds the view from the UTxOs sitting at the registry-spend
    /// address, keeping only those that carry a registry NFT
    ///
    /// Every node holds exactly one NFT under `node_policy` whose asset
    /// name equals its own key (the sentinel holds the empty-name NFT).
    pub fn load(node_policy: PolicyId, utxos: &[Utxo]) -> Result<Self, Error> {
        let mut entries = Vec::new();

        for utxo in utxos {
            let datum = match &utxo.datum {
                Some(datum) => datum,
                None => continue,
            };

            let node = match RegistryNode::from_plutus_data(datum) {
                Ok(node) => node,
                Err(reason) => {
                    return Err(Error::BadDatum {
                        input: utxo.input,
                        reason,
                    })
                }
            };

            if utxo.value.quantity_of(&node_policy, node.key.as_ref()) != 1 {
                continue;
            }

            entries.push(RegistryEntry {
                utxo: utxo.clone(),
                node,
            });
        }

        let nodes: Vec<&RegistryNode> = entries.iter().map(|e| &e.node).collect();
        let order = chain::walk_order(&nodes)?;

        debug!(nodes = entries.len(), "loaded registry view");

        Ok(RegistryView { entries, order })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in list order, sentinel head first
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.order.iter().map(|&i| &self.entries[i])
    }

    /// Exact lookup of a registered policy
    pub fn lookup(&self, policy_id: &PolicyId) -> Option<&RegistryEntry> {
        match self.position(policy_id.as_ref()) {
            Position::Member(i) => Some(&self.entries[i]),
            Position::Gap(_) => None,
        }
    }

    /// The unique node `p` with `p.key < candidate < p.next`, i.e. the
    /// node an insertion of `candidate` must spend
    pub fn locate_predecessor(&self, candidate: &PolicyId) -> Result<&RegistryEntry, Error> {
        match self.position(candidate.as_ref()) {
            Position::Member(_) => Err(Error::AlreadyRegistered(candidate.to_string())),
            Position::Gap(i) => Ok(&self.entries[i]),
        }
    }

    /// Position of a registered node's outpoint within a caller-supplied
    /// reference-input list; used to point redeemers at the right proof
    pub fn index_in_sorted_refs(
        &self,
        policy_id: &PolicyId,
        sorted_refs: &[TransactionInput],
    ) -> Option<usize> {
        let entry = self.lookup(policy_id)?;
        sorted_refs.iter().position(|r| *r == entry.utxo.input)
    }

    fn position(&self, probe: &[u8]) -> Position {
        let nodes: Vec<&RegistryNode> = self.entries.iter().map(|e| &e.node).collect();
        chain::locate(&nodes, &self.order, probe)
    }
}

/// The successor update of an insertion: same node, `next` repointed at
/// the freshly inserted key
pub fn updated_predecessor(predecessor: &RegistryNode, inserted: &Hash<28>) -> RegistryNode {
    RegistryNode {
        next: inserted.to_vec().into(),
        ..predecessor.clone()
    }
}

/// The fresh node of an insertion, taking over the predecessor's old
/// successor
pub fn inserted_node(
    predecessor: &RegistryNode,
    inserted: &Hash<28>,
    transfer_script_hash: Bytes,
    third_party_script_hash: Bytes,
) -> RegistryNode {
    RegistryNode {
        key: inserted.to_vec().into(),
        next: predecessor.next.clone(),
        transfer_script_hash,
        third_party_script_hash,
        metadata: Bytes::empty(),
    }
}
