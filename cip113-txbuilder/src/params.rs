//! Protocol parameters the assembler needs
//!
//! A thin slice of the chain's parameter set: fee coefficients, the
//! per-byte storage deposit, execution-unit prices, and the cost model
//! column that feeds the script-data hash. Loadable from the JSON the
//! deployment ships next to the bootstrap file; defaults carry the
//! current mainnet values so tests and tools work out of the box.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use cip113_primitives::script_data::{CostModel, LanguageViews, PlutusVersion};
use cip113_primitives::ExUnits;

use crate::TxBuilderError;

/// A price expressed as a fraction, e.g. 577/10000 lovelace per mem unit
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitPrice {
    pub numerator: u64,
    pub denominator: u64,
}

impl UnitPrice {
    /// Cost of `units` at this price, rounded up
    pub fn cost(&self, units: u64) -> u64 {
        let scaled = units as u128 * self.numerator as u128;
        scaled.div_ceil(self.denominator as u128) as u64
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PParams {
    /// Additive fee term (min_fee_b)
    pub min_fee_constant: u64,

    /// Per-byte fee term (min_fee_a)
    pub min_fee_coefficient: u64,

    pub coins_per_utxo_byte: u64,

    pub price_mem: UnitPrice,

    pub price_steps: UnitPrice,

    pub collateral_percentage: u64,

    /// Cost model per plutus version (0 = V1, 1 = V2, 2 = V3)
    #[serde(default)]
    pub cost_models: BTreeMap<PlutusVersion, CostModel>,
}

impl Default for PParams {
    fn default() -> Self {
        PParams {
            min_fee_constant: 155_381,
            min_fee_coefficient: 44,
            coins_per_utxo_byte: 4_310,
            price_mem: UnitPrice {
                numerator: 577,
                denominator: 10_000,
            },
            price_steps: UnitPrice {
                numerator: 721,
                denominator: 10_000_000,
            },
            collateral_percentage: 150,
            cost_models: BTreeMap::new(),
        }
    }
}

impl PParams {
    pub fn from_json(json: &str) -> Result<Self, TxBuilderError> {
        serde_json::from_str(json).map_err(|e| TxBuilderError::Provider(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TxBuilderError> {
        let raw = std::fs::read_to_string(path).map_err(|e| TxBuilderError::Provider(e.to_string()))?;
        Self::from_json(&raw)
    }

    /// The size-based fee floor for a serialized transaction
    pub fn min_fee(&self, tx_size: usize) -> u64 {
        self.min_fee_constant + self.min_fee_coefficient * tx_size as u64
    }

    /// The execution-unit fee for the transaction's total budget
    pub fn script_fee(&self, ex_units: &ExUnits) -> u64 {
        self.price_mem.cost(ex_units.mem) + self.price_steps.cost(ex_units.steps)
    }

    /// Minimum lovelace an output of the given serialized size must hold
    pub fn min_ada_for_size(&self, output_size: usize) -> u64 {
        self.coins_per_utxo_byte * (output_size as u64 + 160)
    }

    /// Language views restricted to the script versions a tx actually runs
    pub fn language_views_for(&self, versions: &[PlutusVersion]) -> LanguageViews {
        self.cost_models
            .iter()
            .filter(|(version, _)| versions.contains(version))
            .map(|(version, model)| (*version, model.clone()))
            .collect()
    }
}
