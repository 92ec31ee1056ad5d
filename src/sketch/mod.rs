pub mod frozen;
pub mod minhash;

use std::hash::{Hash, Hasher};

use crate::encodings::HashFunctions;
use crate::signature::SigsTrait;
use crate::sketch::frozen::FrozenMinHash;
use crate::sketch::minhash::KmerMinHash;
use crate::Error;

/// A MinHash sketch that is either mutable or frozen.
///
/// Mutating a frozen sketch through this type fails with
/// [`Error::FrozenMinHash`]. Equality ignores mutability.
#[derive(Debug, Clone)]
pub enum Sketch {
    MinHash(KmerMinHash),
    FrozenMinHash(FrozenMinHash),
}

impl Sketch {
    pub fn minhash(&self) -> &KmerMinHash {
        match self {
            Sketch::MinHash(mh) => mh,
            Sketch::FrozenMinHash(mh) => &**mh,
        }
    }

    pub fn minhash_mut(&mut self) -> Result<&mut KmerMinHash, Error> {
        match self {
            Sketch::MinHash(mh) => Ok(mh),
            Sketch::FrozenMinHash(_) => Err(Error::FrozenMinHash),
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, Sketch::FrozenMinHash(_))
    }

    pub fn to_frozen(&self) -> Sketch {
        Sketch::FrozenMinHash(self.minhash().to_frozen())
    }

    pub fn to_mutable(&self) -> Sketch {
        Sketch::MinHash(self.minhash().to_mutable())
    }

    pub fn add_hash(&mut self, hash: u64) -> Result<(), Error> {
        self.minhash_mut()?.add_hash(hash);
        Ok(())
    }

    pub fn add_many(&mut self, hashes: &[u64]) -> Result<(), Error> {
        self.minhash_mut()?.add_many(hashes)
    }

    pub fn add_kmer(&mut self, kmer: &[u8]) -> Result<(), Error> {
        self.minhash_mut()?.add_kmer(kmer)
    }

    pub fn add_sequence(&mut self, seq: &[u8], force: bool) -> Result<(), Error> {
        self.minhash_mut()?.add_sequence(seq, force)
    }

    pub fn add_protein(&mut self, seq: &[u8]) -> Result<(), Error> {
        self.minhash_mut()?.add_protein(seq)
    }
}

impl PartialEq for Sketch {
    fn eq(&self, other: &Sketch) -> bool {
        self.minhash() == other.minhash()
    }
}

impl Eq for Sketch {}

impl Hash for Sketch {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.minhash().hash(state);
    }
}

impl From<KmerMinHash> for Sketch {
    fn from(mh: KmerMinHash) -> Sketch {
        Sketch::MinHash(mh)
    }
}

impl From<FrozenMinHash> for Sketch {
    fn from(mh: FrozenMinHash) -> Sketch {
        Sketch::FrozenMinHash(mh)
    }
}

impl SigsTrait for Sketch {
    fn size(&self) -> usize {
        self.minhash().size()
    }

    fn to_vec(&self) -> Vec<u64> {
        self.minhash().to_vec()
    }

    fn ksize(&self) -> usize {
        self.minhash().ksize()
    }

    fn seed(&self) -> u64 {
        self.minhash().seed()
    }

    fn hash_function(&self) -> HashFunctions {
        self.minhash().hash_function()
    }

    fn check_compatible(&self, other: &Self) -> Result<(), Error> {
        self.minhash().check_compatible(other.minhash())
    }
}
