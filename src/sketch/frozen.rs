use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::encodings::HashFunctions;
use crate::signature::SigsTrait;
use crate::sketch::minhash::KmerMinHash;
use crate::Error;

/// An immutable view over a [`KmerMinHash`].
///
/// Every read-only operation of the inner sketch is available through
/// `Deref`; nothing hands out a mutable reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrozenMinHash(KmerMinHash);

impl FrozenMinHash {
    pub fn into_mutable(self) -> KmerMinHash {
        self.0
    }
}

impl Deref for FrozenMinHash {
    type Target = KmerMinHash;

    fn deref(&self) -> &KmerMinHash {
        &self.0
    }
}

impl From<KmerMinHash> for FrozenMinHash {
    fn from(mh: KmerMinHash) -> FrozenMinHash {
        FrozenMinHash(mh)
    }
}

impl SigsTrait for FrozenMinHash {
    fn size(&self) -> usize {
        self.0.size()
    }

    fn to_vec(&self) -> Vec<u64> {
        self.0.to_vec()
    }

    fn ksize(&self) -> usize {
        self.0.ksize()
    }

    fn seed(&self) -> u64 {
        self.0.seed()
    }

    fn hash_function(&self) -> HashFunctions {
        self.0.hash_function()
    }

    fn check_compatible(&self, other: &Self) -> Result<(), Error> {
        self.0.check_compatible(&other.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn frozen_copy_is_independent() {
        let mut mh = KmerMinHash::new(1, 21, HashFunctions::murmur64_DNA, 42, false, 0).unwrap();
        mh.add_many(&[1, 2, 3]).unwrap();

        let frozen = mh.to_frozen();
        mh.add_hash(4);

        assert_eq!(frozen.size(), 3);
        assert_eq!(frozen.mins(), vec![1, 2, 3]);
        assert_eq!(frozen.jaccard(&mh, false).unwrap(), 0.75);

        let mut thawed = frozen.to_mutable();
        thawed.add_hash(4);
        assert_eq!(thawed, mh);
        assert_eq!(frozen.into_mutable().size(), 3);
    }
}
