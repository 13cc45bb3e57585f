use std::path::Path;

use serde::Deserialize;

use cip113_codec::utils::Bytes;
use cip113_crypto::hash::Hash;

use crate::Error;

/// A catalogue of compiled validators
///
/// Protocol blueprints and substandard blueprints share this shape; the
/// latter use `scriptBytes`/`scriptHash` for the code fields and shorter
/// two-segment titles, both of which the field aliases absorb.
#[derive(Deserialize, Debug, Clone)]
pub struct Blueprint {
    pub preamble: BlueprintPreamble,
    pub validators: Vec<BlueprintValidator>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintPreamble {
    pub title: String,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub plutus_version: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BlueprintValidator {
    /// `"file.module.purpose"` for protocol validators, `"module.purpose"`
    /// in substandard files
    pub title: String,

    /// The compiled template, before any parameter application
    #[serde(alias = "compiled_code", alias = "scriptBytes", alias = "script_bytes")]
    pub compiled_code: Bytes,

    /// Hash of the unparameterized template
    #[serde(alias = "scriptHash", alias = "script_hash")]
    pub hash: Hash<28>,
}

impl Blueprint {
    pub fn from_str(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Exact-title lookup of a compiled validator
    pub fn find_validator(&self, title: &str) -> Result<&BlueprintValidator, Error> {
        self.validators
            .iter()
            .find(|v| v.title == title)
            .ok_or_else(|| Error::ValidatorNotFound {
                title: title.to_string(),
            })
    }
}
