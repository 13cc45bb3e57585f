//! The compliance blacklist view (freeze-and-seize substandard)

use cip113_codec::utils::Bytes;
use cip113_crypto::hash::Hash;
use cip113_primitives::{PlutusData, PolicyId, Utxo};
use tracing::debug;

use crate::chain::{self, ChainNode, Position, TAIL_TERMINATOR};
use crate::Error;

/// Datum of one blacklist node: just the linked-list plumbing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlacklistNode {
    pub key: Bytes,
    pub next: Bytes,
}

impl ChainNode for BlacklistNode {
    fn key(&self) -> &[u8] {
        self.key.as_ref()
    }

    fn next(&self) -> &[u8] {
        self.next.as_ref()
    }
}

impl BlacklistNode {
    /// The head node a fresh blacklist starts from
    pub fn genesis() -> Self {
        BlacklistNode {
            key: Bytes::empty(),
            next: TAIL_TERMINATOR.to_vec().into(),
        }
    }

    pub fn to_plutus_data(&self) -> PlutusData {
        PlutusData::constr(
            0,
            vec![
                PlutusData::bytes(self.key.as_ref()),
                PlutusData::bytes(self.next.as_ref()),
            ],
        )
    }

    pub fn from_plutus_data(data: &PlutusData) -> Result<Self, String> {
        let fields = match data {
            PlutusData::Constr(constr) if constr.index() == 0 => &constr.fields,
            _ => return Err("expected constructor 0".to_string()),
        };

        if fields.len() != 2 {
            return Err(format!("expected 2 fields, found {}", fields.len()));
        }

        let field = |i: usize| -> Result<Bytes, String> {
            fields
                .get(i)
                .and_then(|f| f.as_bytes())
                .map(Bytes::from)
                .ok_or_else(|| format!("field {i} is not a byte string"))
        };

        Ok(BlacklistNode {
            key: field(0)?,
            next: field(1)?,
        })
    }
}

/// A blacklist node together with the UTxO carrying it
#[derive(Debug, Clone)]
pub struct BlacklistEntry {
    pub utxo: Utxo,
    pub node: BlacklistNode,
}

/// A verified snapshot of one substandard's blacklist
#[derive(Debug, Clone)]
pub struct BlacklistView {
    entries: Vec<BlacklistEntry>,
    order: Vec<usize>,
}

impl BlacklistView {
    pub fn load(node_policy: PolicyId, utxos: &[Utxo]) -> Result<Self, Error> {
        let mut entries = Vec::new();

        for utxo in utxos {
            let datum = match &utxo.datum {
                Some(datum) => datum,
                None => continue,
            };

            let node = match BlacklistNode::from_plutus_data(datum) {
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

            entries.push(BlacklistEntry {
                utxo: utxo.clone(),
                node,
            });
        }

        let nodes: Vec<&BlacklistNode> = entries.iter().map(|e| &e.node).collect();
        let order = chain::walk_order(&nodes)?;

        debug!(nodes = entries.len(), "loaded blacklist view");

        Ok(BlacklistView { entries, order })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, key_hash: &Hash<28>) -> Option<&BlacklistEntry> {
        match self.position(key_hash.as_ref()) {
            Position::Member(i) => Some(&self.entries[i]),
            Position::Gap(_) => None,
        }
    }

    /// The node whose gap covers `key_hash`, proving the credential is
    /// not a member; fails when the credential is blacklisted
    pub fn non_membership_proof(&self, key_hash: &Hash<28>) -> Result<&BlacklistEntry, Error> {
        match self.position(key_hash.as_ref()) {
            Position::Member(_) => Err(Error::Blacklisted(key_hash.to_string())),
            Position::Gap(i) => Ok(&self.entries[i]),
        }
    }

    /// Insertion predecessor for freezing a new credential
    pub fn locate_predecessor(&self, key_hash: &Hash<28>) -> Result<&BlacklistEntry, Error> {
        self.non_membership_proof(key_hash)
    }

    fn position(&self, probe: &[u8]) -> Position {
        let nodes: Vec<&BlacklistNode> = self.entries.iter().map(|e| &e.node).collect();
        chain::locate(&nodes, &self.order, probe)
    }
}

/// Predecessor update when freezing a credential
pub fn updated_predecessor(predecessor: &BlacklistNode, frozen: &Hash<28>) -> BlacklistNode {
    BlacklistNode {
        key: predecessor.key.clone(),
        next: frozen.to_vec().into(),
    }
}

/// The fresh node a freeze inserts
pub fn inserted_node(predecessor: &BlacklistNode, frozen: &Hash<28>) -> BlacklistNode {
    BlacklistNode {
        key: frozen.to_vec().into(),
        next: predecessor.next.clone(),
    }
}
