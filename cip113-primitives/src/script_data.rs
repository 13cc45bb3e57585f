//! Script data hash (body field 11)
//!
//! The preimage is the concatenation of the witness-set encodings of the
//! redeemers and datums plus the "language views" map of cost models for
//! every script language the transaction runs. Getting this hash wrong is
//! the classic source of phase-2 failures, so the encoding quirks below are
//! load-bearing.

use std::collections::BTreeMap;

use cip113_codec::minicbor::{self, Encode};
use cip113_codec::utils::NonEmptySet;
use cip113_crypto::hash::{Hash, Hasher};

use crate::{PlutusData, Redeemer};

pub type PlutusVersion = u8;

pub type CostModel = Vec<i64>;

/// The language views map keyed by plutus version (0 = V1, 1 = V2, 2 = V3)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageViews(pub BTreeMap<PlutusVersion, CostModel>);

impl FromIterator<(PlutusVersion, CostModel)> for LanguageViews {
    fn from_iter<I: IntoIterator<Item = (PlutusVersion, CostModel)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<C> Encode<C> for LanguageViews {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let mut canonical_order: Vec<u8> = self.0.keys().copied().filter(|&k| k != 0).collect();
        canonical_order.sort_unstable();
        // PlutusV1 is encoded as the byte string 0x4100, which sorts after
        // the small-int keys in canonical map order
        if self.0.contains_key(&0) {
            canonical_order.push(0);
        }

        e.map(self.0.len() as u64)?;
        for lang in canonical_order {
            let cost_model = self.0.get(&lang).expect("key from same map");
            match lang {
                0 => {
                    // the V1 legacy quirk: both key and value are wrapped in
                    // byte strings, and the model array is indefinite
                    let mut inner = vec![];
                    let mut sub = minicbor::Encoder::new(&mut inner);
                    sub.begin_array().expect("infallible");
                    for v in cost_model.iter() {
                        sub.encode_with(v, ctx).expect("infallible");
                    }
                    sub.end().expect("infallible");
                    e.bytes(&minicbor::to_vec(0).expect("infallible"))?;
                    e.bytes(&inner)?;
                }
                _ => {
                    e.encode(lang)?;
                    e.encode(cost_model)?;
                }
            }
        }

        Ok(())
    }
}

/// Assembles and hashes the script-data preimage
#[derive(Debug, Clone)]
pub struct ScriptData {
    pub redeemers: Vec<Redeemer>,
    pub datums: Option<NonEmptySet<PlutusData>>,
    pub language_views: LanguageViews,
}

impl ScriptData {
    pub fn hash(&self) -> Hash<32> {
        let mut buf = vec![];

        if self.redeemers.is_empty() {
            // datum-only transactions hash [A0 | datums | A0]
            buf.push(0xa0);

            if let Some(datums) = &self.datums {
                minicbor::encode(datums, &mut buf).expect("infallible");
            }

            buf.push(0xa0);
        } else {
            minicbor::encode(&self.redeemers, &mut buf).expect("infallible");

            if let Some(datums) = &self.datums {
                minicbor::encode(datums, &mut buf).expect("infallible");
            }

            minicbor::encode(&self.language_views, &mut buf).expect("infallible");
        }

        Hasher::<256>::hash(&buf)
    }
}
