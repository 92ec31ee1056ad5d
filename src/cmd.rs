use getset::{CopyGetters, Getters, Setters};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::encodings::HashFunctions;
use crate::signature::Signature;
use crate::sketch::minhash::KmerMinHash;
use crate::Error;

/// Parameters for building a set of empty signatures, one per ksize and
/// enabled molecule type.
#[derive(Debug, Clone, TypedBuilder, CopyGetters, Getters, Setters, Serialize, Deserialize)]
pub struct ComputeParameters {
    #[getset(get = "pub", set = "pub")]
    #[builder(default = vec![21, 31, 51])]
    ksizes: Vec<u32>,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = true)]
    dna: bool,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = false)]
    protein: bool,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = false)]
    dayhoff: bool,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = false)]
    hp: bool,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = 500u32)]
    num_hashes: u32,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = 0u64)]
    scaled: u64,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = 42u64)]
    seed: u64,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = false)]
    track_abundance: bool,
}

impl Default for ComputeParameters {
    fn default() -> Self {
        ComputeParameters::builder().build()
    }
}

impl ComputeParameters {
    /// Molecule types enabled in these parameters, in a stable order.
    pub fn hash_functions(&self) -> Vec<HashFunctions> {
        let mut enabled = vec![];
        if self.dna {
            enabled.push(HashFunctions::murmur64_DNA);
        }
        if self.dayhoff {
            enabled.push(HashFunctions::murmur64_dayhoff);
        }
        if self.hp {
            enabled.push(HashFunctions::murmur64_hp);
        }
        if self.protein {
            enabled.push(HashFunctions::murmur64_protein);
        }
        enabled
    }

    /// A scaled value set here takes precedence over `num_hashes`.
    pub fn build_sketches(&self) -> Result<Vec<KmerMinHash>, Error> {
        let num = if self.scaled > 0 { 0 } else { self.num_hashes };

        let mut sketches = vec![];
        for hash_function in self.hash_functions() {
            for &ksize in &self.ksizes {
                sketches.push(KmerMinHash::new(
                    self.scaled,
                    ksize,
                    hash_function,
                    self.seed,
                    self.track_abundance,
                    num,
                )?);
            }
        }
        Ok(sketches)
    }

    pub fn build_signatures(&self) -> Result<Vec<Signature>, Error> {
        Ok(self
            .build_sketches()?
            .into_iter()
            .map(Signature::new)
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::signature::SigsTrait;

    #[test]
    fn defaults() {
        let cp = ComputeParameters::default();
        assert_eq!(cp.ksizes(), &vec![21, 31, 51]);
        assert!(cp.dna());
        assert!(!cp.protein());
        assert_eq!(cp.num_hashes(), 500);
        assert_eq!(cp.seed(), 42);
    }

    #[test]
    fn one_sketch_per_ksize_and_molecule() {
        let mut cp = ComputeParameters::default();
        cp.set_dayhoff(true);
        cp.set_protein(true);
        cp.set_hp(true);

        let sketches = cp.build_sketches().unwrap();
        assert_eq!(sketches.len(), 12);
        assert_eq!(sketches[3].hash_function(), HashFunctions::murmur64_dayhoff);
        assert_eq!(sketches[3].ksize(), 21);
    }

    #[test]
    fn scaled_wins_over_num() {
        let cp = ComputeParameters::builder()
            .ksizes(vec![31])
            .scaled(1000u64)
            .build();
        let sketches = cp.build_sketches().unwrap();
        assert_eq!(sketches[0].num(), 0);
        assert_eq!(sketches[0].scaled(), 1000);
    }
}
