//! Substandard behaviour as a closed variant set
//!
//! A substandard bundles the validators that govern one class of
//! programmable token. Planners never branch on a substandard id string;
//! they call the capability methods here, and adding a substandard means
//! adding a variant plus its redeemer recipes.

use cip113_primitives::{PlutusData, PolicyId, ScriptHash};

/// Default titles as they appear in the shipped substandard blueprints
const ISSUE_TITLE: &str = "transfer.issue.withdraw";
const TRANSFER_TITLE: &str = "transfer.transfer.withdraw";
const THIRD_PARTY_TITLE: &str = "transfer.third_party.withdraw";
pub(crate) const BLACKLIST_MINT_TITLE: &str = "blacklist_mint.mint";
pub(crate) const BLACKLIST_SPEND_TITLE: &str = "blacklist_spend.spend";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstandardKind {
    /// Unconditional transfers; redeemers are fixed sentinel values
    Dummy,
    /// Transfers gated on blacklist non-membership, with an admin escape
    /// hatch for freezing and seizing
    FreezeAndSeize { blacklist_node_policy: PolicyId },
}

/// One substandard: its behaviour variant plus the validator titles to
/// resolve against the substandard blueprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substandard {
    pub kind: SubstandardKind,
    pub issue_title: String,
    pub transfer_title: String,
    pub third_party_title: Option<String>,
    pub blacklist_mint_title: String,
    pub blacklist_spend_title: String,
}

impl Substandard {
    pub fn dummy() -> Self {
        Substandard {
            kind: SubstandardKind::Dummy,
            issue_title: ISSUE_TITLE.to_string(),
            transfer_title: TRANSFER_TITLE.to_string(),
            third_party_title: None,
            blacklist_mint_title: BLACKLIST_MINT_TITLE.to_string(),
            blacklist_spend_title: BLACKLIST_SPEND_TITLE.to_string(),
        }
    }

    pub fn freeze_and_seize(blacklist_node_policy: PolicyId) -> Self {
        Substandard {
            kind: SubstandardKind::FreezeAndSeize {
                blacklist_node_policy,
            },
            issue_title: ISSUE_TITLE.to_string(),
            transfer_title: TRANSFER_TITLE.to_string(),
            third_party_title: Some(THIRD_PARTY_TITLE.to_string()),
            blacklist_mint_title: BLACKLIST_MINT_TITLE.to_string(),
            blacklist_spend_title: BLACKLIST_SPEND_TITLE.to_string(),
        }
    }

    pub fn blacklist_node_policy(&self) -> Option<PolicyId> {
        match &self.kind {
            SubstandardKind::Dummy => None,
            SubstandardKind::FreezeAndSeize {
                blacklist_node_policy,
            } => Some(*blacklist_node_policy),
        }
    }

    /// Parameters of the substandard transfer validator
    pub fn transfer_script_params(&self, logic_base_hash: &ScriptHash) -> Vec<PlutusData> {
        match &self.kind {
            SubstandardKind::Dummy => vec![],
            SubstandardKind::FreezeAndSeize {
                blacklist_node_policy,
            } => vec![
                PlutusData::bytes(logic_base_hash.to_vec()),
                PlutusData::bytes(blacklist_node_policy.to_vec()),
            ],
        }
    }

    /// Redeemer of the zero-amount issue withdrawal
    pub fn issue_redeemer(&self) -> PlutusData {
        match &self.kind {
            SubstandardKind::Dummy => PlutusData::int(100),
            SubstandardKind::FreezeAndSeize { .. } => PlutusData::constr(0, vec![]),
        }
    }

    /// Redeemer of the zero-amount transfer withdrawal
    ///
    /// `proof_indices` has one entry per spent programmable-token input,
    /// in canonical input order, pointing at that input's non-membership
    /// proof within the sorted reference-input list.
    pub fn transfer_redeemer(&self, proof_indices: &[u64]) -> PlutusData {
        match &self.kind {
            SubstandardKind::Dummy => PlutusData::int(200),
            SubstandardKind::FreezeAndSeize { .. } => PlutusData::list(
                proof_indices
                    .iter()
                    .map(|i| PlutusData::constr(0, vec![PlutusData::int(*i as i64)]))
                    .collect(),
            ),
        }
    }
}
