//! # Compare biological sequence datasets with MinHash signatures.
//!
//! Large sequencing datasets are summarized as [MinHash sketches][0]: small,
//! deterministic samples of the hashed k-mers in each dataset. Two sketch
//! sizing policies are supported:
//!
//! - *num* sketches keep a fixed number of the smallest hashes;
//! - *scaled* (FracMinHash) sketches keep every hash below a fraction of the
//!   hash space, so their size grows with the dataset.
//!
//! A [`Signature`](signature::Signature) wraps a sketch with a name and a
//! source filename, and exposes Jaccard similarity, containment and
//! [average nucleotide identity](ani_utils) estimates. Collections of
//! signatures are saved and loaded as (optionally gzip-compressed) JSON by
//! the [`codec`] module.
//!
//! [0]: https://en.wikipedia.org/wiki/MinHash

// error and hash function names keep their acronyms (InvalidDNA, ANIEstimationError)
#![allow(clippy::upper_case_acronyms)]

pub mod errors;
pub use errors::SourmashError as Error;

pub type Result<T> = std::result::Result<T, Error>;

pub mod ani_utils;
pub mod cmd;
pub mod codec;
pub mod encodings;
pub mod prelude;
pub mod selection;
pub mod signature;
pub mod sketch;

use murmurhash3::murmurhash3_x64_128;

pub fn _hash_murmur(kmer: &[u8], seed: u64) -> u64 {
    murmurhash3_x64_128(kmer, seed).0
}
