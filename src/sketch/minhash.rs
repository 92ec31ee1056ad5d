use std::borrow::Cow;
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::f64::consts::PI;
use std::fmt::Write;
use std::hash::{Hash, Hasher};
use std::iter::{Iterator, Peekable};

use log::{debug, warn};
use once_cell::sync::OnceCell;
use serde::de::{Deserializer, Error as DeError};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::_hash_murmur;
use crate::ani_utils::{self, AniResult};
use crate::encodings::HashFunctions;
use crate::signature::{SeqToHashes, SigsTrait};
use crate::sketch::frozen::FrozenMinHash;
use crate::Error;

pub fn max_hash_for_scaled(scaled: u64) -> u64 {
    match scaled {
        0 => 0,
        1 => u64::max_value(),
        _ => (u64::max_value() as f64 / scaled as f64) as u64,
    }
}

pub fn scaled_for_max_hash(max_hash: u64) -> u64 {
    match max_hash {
        0 => 0,
        _ => (u64::max_value() as f64 / max_hash as f64).round() as u64,
    }
}

// Distinct k-mers behind a scaled sketch. Tiny max_hash values give a
// scaled close to u64::MAX, so the product saturates.
fn estimated_kmers(size: usize, scaled: u64) -> u64 {
    (size as u64).saturating_mul(scaled)
}

fn default_seed() -> u64 {
    42
}

fn default_molecule() -> String {
    HashFunctions::murmur64_DNA.to_string()
}

/// A mutable MinHash sketch.
///
/// Hashes are kept sorted in `mins`, with per-hash counts in `abunds` when
/// abundance tracking is enabled. The sketch runs in one of two modes:
/// a *num* sketch keeps the `num` smallest hashes, a *scaled* sketch keeps
/// every hash below `max_hash`.
///
/// Mutating methods take `&mut self`; share a `KmerMinHash` across threads
/// behind a `Mutex`, or freeze it with [`KmerMinHash::to_frozen`].
#[derive(Debug, Clone)]
pub struct KmerMinHash {
    num: u32,
    ksize: u32,
    hash_function: HashFunctions,
    seed: u64,
    max_hash: u64,
    mins: Vec<u64>,
    abunds: Option<Vec<u64>>,
    md5sum: OnceCell<String>,
}

impl PartialEq for KmerMinHash {
    fn eq(&self, other: &KmerMinHash) -> bool {
        self.ksize == other.ksize
            && self.num == other.num
            && self.max_hash == other.max_hash
            && self.seed == other.seed
            && self.hash_function == other.hash_function
            && self.mins == other.mins
            && self.abunds == other.abunds
    }
}

impl Eq for KmerMinHash {}

impl Hash for KmerMinHash {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ksize.hash(state);
        self.num.hash(state);
        self.max_hash.hash(state);
        self.seed.hash(state);
        self.hash_function.hash(state);
        self.mins.hash(state);
    }
}

impl Default for KmerMinHash {
    fn default() -> KmerMinHash {
        KmerMinHash {
            num: 1000,
            ksize: 21,
            hash_function: HashFunctions::murmur64_DNA,
            seed: 42,
            max_hash: 0,
            mins: Vec::with_capacity(1000),
            abunds: None,
            md5sum: OnceCell::new(),
        }
    }
}

impl Serialize for KmerMinHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let n_fields = match &self.abunds {
            Some(_) => 10,
            _ => 9,
        };

        let mut partial = serializer.serialize_struct("KmerMinHash", n_fields)?;
        partial.serialize_field("ksize", &self.ksize)?;
        partial.serialize_field("seed", &self.seed)?;
        partial.serialize_field("num", &self.num)?;
        partial.serialize_field("scaled", &self.scaled())?;
        partial.serialize_field("max_hash", &self.max_hash)?;
        partial.serialize_field("molecule", &self.hash_function.to_string())?;
        partial.serialize_field("track_abundance", &self.track_abundance())?;
        partial.serialize_field("mins", &self.mins)?;

        if let Some(abunds) = &self.abunds {
            partial.serialize_field("abundances", abunds)?;
        }

        partial.serialize_field("md5sum", &self.md5sum())?;

        partial.end()
    }
}

impl<'de> Deserialize<'de> for KmerMinHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Also reads the per-sketch records of the older multi-sketch
        // layout, which carry `max_hash` but no `scaled`/`track_abundance`.
        #[derive(Deserialize)]
        struct TempSig {
            ksize: u32,
            #[serde(default = "default_seed")]
            seed: u64,
            #[serde(default)]
            num: u32,
            #[serde(default)]
            scaled: u64,
            #[serde(default)]
            max_hash: Option<u64>,
            #[serde(default = "default_molecule")]
            molecule: String,
            #[serde(default)]
            track_abundance: Option<bool>,
            mins: Vec<u64>,
            #[serde(default)]
            abundances: Option<Vec<u64>>,
            #[serde(default)]
            md5sum: Option<String>,
        }

        let tmpsig = TempSig::deserialize(deserializer)?;

        let max_hash = tmpsig
            .max_hash
            .unwrap_or_else(|| max_hash_for_scaled(tmpsig.scaled));
        let num = if max_hash != 0 { 0 } else { tmpsig.num };
        let hash_function =
            HashFunctions::try_from(tmpsig.molecule.as_str()).map_err(D::Error::custom)?;

        // mins are not always stored ordered, so sort them (and their
        // abundances) before use.
        let (mins, abunds) = match tmpsig.abundances {
            Some(abunds) => {
                if abunds.len() != tmpsig.mins.len() {
                    return Err(D::Error::custom(format!(
                        "{} mins but {} abundances",
                        tmpsig.mins.len(),
                        abunds.len()
                    )));
                }
                let mut values: Vec<(u64, u64)> = tmpsig.mins.into_iter().zip(abunds).collect();
                values.sort_unstable();
                values.dedup_by_key(|(hash, _)| *hash);
                let (mins, abunds): (Vec<u64>, Vec<u64>) = values.into_iter().unzip();
                (mins, Some(abunds))
            }
            None => {
                let mut mins = tmpsig.mins;
                mins.sort_unstable();
                mins.dedup();
                let abunds = match tmpsig.track_abundance {
                    Some(true) => Some(vec![1; mins.len()]),
                    _ => None,
                };
                (mins, abunds)
            }
        };

        let mut mh = KmerMinHash {
            num,
            ksize: tmpsig.ksize,
            hash_function,
            seed: tmpsig.seed,
            max_hash,
            mins,
            abunds,
            md5sum: OnceCell::new(),
        };
        mh.enforce_bounds();

        if let Some(stored) = tmpsig.md5sum {
            if stored != mh.md5sum() {
                warn!(
                    "stored md5sum {} does not match content ({}), using the recomputed value",
                    stored,
                    mh.md5sum()
                );
            }
        }

        Ok(mh)
    }
}

impl KmerMinHash {
    /// Create an empty sketch.
    ///
    /// Exactly one of `scaled` and `num` selects the sizing policy; setting
    /// both is an error.
    pub fn new(
        scaled: u64,
        ksize: u32,
        hash_function: HashFunctions,
        seed: u64,
        track_abundance: bool,
        num: u32,
    ) -> Result<KmerMinHash, Error> {
        if num > 0 && scaled > 0 {
            return Err(Error::InvalidSizing { num, scaled });
        }

        let mins = if num > 0 {
            Vec::with_capacity(num as usize)
        } else {
            Vec::with_capacity(1000)
        };

        let abunds = if track_abundance {
            Some(Vec::with_capacity(mins.capacity()))
        } else {
            None
        };

        Ok(KmerMinHash {
            num,
            ksize,
            hash_function,
            seed,
            max_hash: max_hash_for_scaled(scaled),
            mins,
            abunds,
            md5sum: OnceCell::new(),
        })
    }

    /// Create an empty scaled sketch from an explicit hash threshold
    /// instead of a scaled factor.
    pub fn with_max_hash(
        max_hash: u64,
        ksize: u32,
        hash_function: HashFunctions,
        seed: u64,
        track_abundance: bool,
    ) -> KmerMinHash {
        KmerMinHash {
            num: 0,
            ksize,
            hash_function,
            seed,
            max_hash,
            mins: Vec::with_capacity(1000),
            abunds: if track_abundance { Some(vec![]) } else { None },
            md5sum: OnceCell::new(),
        }
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn is_protein(&self) -> bool {
        self.hash_function == HashFunctions::murmur64_protein
    }

    pub fn dayhoff(&self) -> bool {
        self.hash_function == HashFunctions::murmur64_dayhoff
    }

    pub fn hp(&self) -> bool {
        self.hash_function == HashFunctions::murmur64_hp
    }

    pub fn max_hash(&self) -> u64 {
        self.max_hash
    }

    pub fn scaled(&self) -> u64 {
        scaled_for_max_hash(self.max_hash)
    }

    /// True for FracMinHash sketches, false for bottom-`num` sketches.
    pub fn is_scaled(&self) -> bool {
        self.max_hash != 0
    }

    pub fn clear(&mut self) {
        self.mins.clear();
        if let Some(ref mut abunds) = self.abunds {
            abunds.clear();
        }
        self.reset_md5sum();
    }

    pub fn is_empty(&self) -> bool {
        self.mins.is_empty()
    }

    pub fn set_hash_function(&mut self, h: HashFunctions) -> Result<(), Error> {
        if self.hash_function == h {
            return Ok(());
        }

        if !self.is_empty() {
            return Err(Error::NonEmptyMinHash {
                message: "hash_function".into(),
            });
        }

        self.hash_function = h;
        Ok(())
    }

    pub fn track_abundance(&self) -> bool {
        self.abunds.is_some()
    }

    pub fn enable_abundance(&mut self) -> Result<(), Error> {
        if !self.mins.is_empty() {
            return Err(Error::NonEmptyMinHash {
                message: "track_abundance=True".into(),
            });
        }

        self.abunds = Some(vec![]);

        Ok(())
    }

    pub fn disable_abundance(&mut self) {
        self.abunds = None;
    }

    pub fn to_frozen(&self) -> FrozenMinHash {
        FrozenMinHash::from(self.clone())
    }

    pub fn to_mutable(&self) -> KmerMinHash {
        self.clone()
    }

    fn reset_md5sum(&mut self) {
        self.md5sum.take();
    }

    /// Checksum of the ksize and the sorted hashes. Abundances are not
    /// included.
    pub fn md5sum(&self) -> String {
        self.md5sum
            .get_or_init(|| {
                let mut buffer = String::with_capacity(20);

                let mut md5_ctx = md5::Context::new();
                // writing to a String can't fail
                let _ = write!(&mut buffer, "{}", self.ksize);
                md5_ctx.consume(&buffer);
                buffer.clear();
                for x in &self.mins {
                    let _ = write!(&mut buffer, "{}", x);
                    md5_ctx.consume(&buffer);
                    buffer.clear();
                }
                format!("{:x}", md5_ctx.compute())
            })
            .clone()
    }

    /// k-mer length actually hashed: `ksize` for DNA, `ksize / 3` residues
    /// for protein alphabets.
    pub fn kmer_length(&self) -> u32 {
        if self.hash_function.dna() {
            self.ksize
        } else {
            self.ksize / 3
        }
    }

    fn within_max_hash(&self, hash: u64) -> bool {
        self.max_hash == 0 || self.max_hash == u64::max_value() || hash < self.max_hash
    }

    // Drop anything the sizing policy wouldn't keep.
    fn enforce_bounds(&mut self) {
        if self.is_scaled() && self.max_hash != u64::max_value() {
            let keep = self.mins.partition_point(|&h| h < self.max_hash);
            self.truncate(keep);
        }
        if self.num != 0 {
            self.truncate(self.num as usize);
        }
    }

    fn truncate(&mut self, len: usize) {
        if len < self.mins.len() {
            self.mins.truncate(len);
            if let Some(ref mut abunds) = self.abunds {
                abunds.truncate(len);
            }
            self.reset_md5sum();
        }
    }

    pub fn add_hash(&mut self, hash: u64) {
        self.add_hash_with_abundance(hash, 1);
    }

    pub fn add_hash_with_abundance(&mut self, hash: u64, abundance: u64) {
        if self.num == 0 && self.max_hash == 0 {
            // why did you create this minhash? it will always be empty...
            return;
        }

        if !self.within_max_hash(hash) {
            return;
        }

        if abundance == 0 {
            self.remove_hash(hash);
            return;
        }

        match self.mins.binary_search(&hash) {
            Ok(pos) => {
                if let Some(ref mut abunds) = self.abunds {
                    abunds[pos] += abundance;
                }
            }
            Err(pos) => {
                if self.num != 0 && pos >= self.num as usize {
                    // full, and larger than everything we have
                    return;
                }

                self.mins.insert(pos, hash);
                if let Some(ref mut abunds) = self.abunds {
                    abunds.insert(pos, abundance);
                }

                if self.num != 0 && self.mins.len() > self.num as usize {
                    self.mins.pop();
                    if let Some(ref mut abunds) = self.abunds {
                        abunds.pop();
                    }
                }
                self.reset_md5sum();
            }
        }
    }

    pub fn set_hash_with_abundance(&mut self, hash: u64, abundance: u64) {
        match self.mins.binary_search(&hash) {
            Ok(pos) if abundance > 0 => {
                if let Some(ref mut abunds) = self.abunds {
                    abunds[pos] = abundance;
                }
            }
            _ => self.add_hash_with_abundance(hash, abundance),
        }
    }

    pub fn add_word(&mut self, word: &[u8]) {
        let hash = _hash_murmur(word, self.seed);
        self.add_hash(hash);
    }

    /// Add a single k-mer, which must be exactly `ksize` long.
    pub fn add_kmer(&mut self, kmer: &[u8]) -> Result<(), Error> {
        if kmer.len() != self.ksize as usize {
            return Err(Error::InvalidKmerLength {
                expected: self.ksize as usize,
                found: kmer.len(),
            });
        }
        self.add_sequence(kmer, false)
    }

    /// Add every k-mer of a DNA sequence. Invalid k-mers are an error,
    /// unless `force` is set, in which case they are skipped.
    pub fn add_sequence(&mut self, seq: &[u8], force: bool) -> Result<(), Error> {
        let hashes = SeqToHashes::new(
            seq,
            self.ksize as usize,
            force,
            false,
            self.hash_function,
            self.seed,
        );

        for hash in hashes {
            self.add_hash(hash?);
        }

        Ok(())
    }

    /// Add every k-mer of an amino acid sequence.
    pub fn add_protein(&mut self, seq: &[u8]) -> Result<(), Error> {
        let hashes = SeqToHashes::new(
            seq,
            self.ksize as usize,
            false,
            true,
            self.hash_function,
            self.seed,
        );

        for hash in hashes {
            self.add_hash(hash?);
        }

        Ok(())
    }

    pub fn remove_hash(&mut self, hash: u64) {
        if let Ok(pos) = self.mins.binary_search(&hash) {
            self.mins.remove(pos);
            if let Some(ref mut abunds) = self.abunds {
                abunds.remove(pos);
            }
            self.reset_md5sum();
        }
    }

    pub fn remove_from(&mut self, other: &KmerMinHash) -> Result<(), Error> {
        for min in &other.mins {
            self.remove_hash(*min);
        }
        Ok(())
    }

    pub fn remove_many(&mut self, hashes: &[u64]) -> Result<(), Error> {
        for min in hashes {
            self.remove_hash(*min);
        }
        Ok(())
    }

    /// Union of both sketches, summing abundances of shared hashes.
    pub fn merge(&mut self, other: &KmerMinHash) -> Result<(), Error> {
        self.check_compatible(other)?;

        let max_size = self.mins.len() + other.mins.len();
        let limit = if self.num == 0 {
            usize::max_value()
        } else {
            self.num as usize
        };

        let self_abund = |i: usize| self.abunds.as_ref().map_or(1, |a| a[i]);
        let other_abund = |j: usize| other.abunds.as_ref().map_or(1, |a| a[j]);

        let mut merged: Vec<u64> = Vec::with_capacity(max_size);
        let mut merged_abunds: Vec<u64> = Vec::with_capacity(max_size);
        let (mut i, mut j) = (0, 0);

        while merged.len() < limit {
            let (hash, abund) = match (self.mins.get(i), other.mins.get(j)) {
                (Some(&a), Some(&b)) => match a.cmp(&b) {
                    Ordering::Less => {
                        i += 1;
                        (a, self_abund(i - 1))
                    }
                    Ordering::Greater => {
                        j += 1;
                        (b, other_abund(j - 1))
                    }
                    Ordering::Equal => {
                        i += 1;
                        j += 1;
                        (a, self_abund(i - 1) + other_abund(j - 1))
                    }
                },
                (Some(&a), None) => {
                    i += 1;
                    (a, self_abund(i - 1))
                }
                (None, Some(&b)) => {
                    j += 1;
                    (b, other_abund(j - 1))
                }
                (None, None) => break,
            };
            merged.push(hash);
            merged_abunds.push(abund);
        }

        if self.abunds.is_some() {
            self.abunds = Some(merged_abunds);
        }
        self.mins = merged;
        self.reset_md5sum();
        Ok(())
    }

    pub fn add_from(&mut self, other: &KmerMinHash) -> Result<(), Error> {
        for min in &other.mins {
            self.add_hash(*min);
        }
        Ok(())
    }

    pub fn add_many(&mut self, hashes: &[u64]) -> Result<(), Error> {
        for min in hashes {
            self.add_hash(*min);
        }
        Ok(())
    }

    pub fn add_many_with_abund(&mut self, hashes: &[(u64, u64)]) -> Result<(), Error> {
        for item in hashes {
            self.add_hash_with_abundance(item.0, item.1);
        }
        Ok(())
    }

    /// Checks everything except the sizing parameters that downsampling
    /// can reconcile.
    fn check_params(&self, other: &KmerMinHash) -> Result<(), Error> {
        if self.ksize != other.ksize {
            return Err(Error::MismatchKSizes);
        }
        if self.hash_function != other.hash_function {
            return Err(Error::MismatchDNAProt);
        }
        if self.seed != other.seed {
            return Err(Error::MismatchSeed);
        }
        if self.is_scaled() != other.is_scaled() {
            return Err(Error::MismatchSketchKind);
        }
        Ok(())
    }

    // Bring both sketches to the stricter of the two sizing policies.
    // Without `downsample`, differing policies are an error.
    fn reconcile<'a>(
        &'a self,
        other: &'a KmerMinHash,
        downsample: bool,
    ) -> Result<(Cow<'a, KmerMinHash>, Cow<'a, KmerMinHash>), Error> {
        self.check_params(other)?;

        if self.max_hash != other.max_hash {
            if !downsample {
                return Err(Error::MismatchScaled);
            }
            let max_hash = u64::min(self.max_hash, other.max_hash);
            debug!(
                "downsampling to scaled={} before comparison",
                scaled_for_max_hash(max_hash)
            );
            return Ok((
                self.downsampled_to_max_hash(max_hash)?,
                other.downsampled_to_max_hash(max_hash)?,
            ));
        }

        if self.num != other.num {
            if !downsample {
                return Err(Error::MismatchNum {
                    n1: self.num,
                    n2: other.num,
                });
            }
            let num = u32::min(self.num, other.num);
            debug!("downsampling to num={} before comparison", num);
            let first = if self.num == num {
                Cow::Borrowed(self)
            } else {
                Cow::Owned(self.downsample(Some(num), None)?)
            };
            let second = if other.num == num {
                Cow::Borrowed(other)
            } else {
                Cow::Owned(other.downsample(Some(num), None)?)
            };
            return Ok((first, second));
        }

        Ok((Cow::Borrowed(self), Cow::Borrowed(other)))
    }

    fn downsampled_to_max_hash(&self, max_hash: u64) -> Result<Cow<'_, KmerMinHash>, Error> {
        if self.max_hash == max_hash {
            Ok(Cow::Borrowed(self))
        } else {
            Ok(Cow::Owned(self.downsample_max_hash(max_hash)?))
        }
    }

    pub fn count_common(&self, other: &KmerMinHash, downsample: bool) -> Result<u64, Error> {
        let (first, second) = self.reconcile(other, downsample)?;
        let iter = Intersection::new(first.mins.iter(), second.mins.iter());
        Ok(iter.count() as u64)
    }

    /// Shared hashes and the size of the union.
    ///
    /// For num sketches the union is itself limited to the `num` smallest
    /// hashes, and only shared hashes inside it are reported.
    pub fn intersection(
        &self,
        other: &KmerMinHash,
        downsample: bool,
    ) -> Result<(Vec<u64>, u64), Error> {
        let (first, second) = self.reconcile(other, downsample)?;

        if first.num != 0 {
            let combined: Vec<u64> = Union::new(first.mins.iter(), second.mins.iter())
                .take(first.num as usize)
                .cloned()
                .collect();
            let common = Intersection::new(
                Intersection::new(first.mins.iter(), second.mins.iter()),
                combined.iter(),
            )
            .cloned()
            .collect();
            Ok((common, combined.len() as u64))
        } else {
            Ok(intersection(first.mins.iter(), second.mins.iter()))
        }
    }

    /// Number of shared hashes and the size of the union, with the same
    /// num-sketch rules as [`KmerMinHash::intersection`].
    pub fn intersection_size(
        &self,
        other: &KmerMinHash,
        downsample: bool,
    ) -> Result<(u64, u64), Error> {
        let (first, second) = self.reconcile(other, downsample)?;

        if first.num != 0 {
            let combined: Vec<u64> = Union::new(first.mins.iter(), second.mins.iter())
                .take(first.num as usize)
                .cloned()
                .collect();
            let common = Intersection::new(
                Intersection::new(first.mins.iter(), second.mins.iter()),
                combined.iter(),
            )
            .count();
            Ok((common as u64, combined.len() as u64))
        } else {
            Ok(intersection_size(first.mins.iter(), second.mins.iter()))
        }
    }

    pub fn union_size(&self, other: &KmerMinHash, downsample: bool) -> Result<u64, Error> {
        let (_, union) = self.intersection_size(other, downsample)?;
        Ok(union)
    }

    /// Jaccard similarity, ignoring abundance. Two empty sketches have a
    /// similarity of 0.
    pub fn jaccard(&self, other: &KmerMinHash, downsample: bool) -> Result<f64, Error> {
        let (common, size) = self.intersection_size(other, downsample)?;
        Ok(common as f64 / u64::max(1, size) as f64)
    }

    /// Fraction of the hashes in `self` also found in `other`.
    pub fn contained_by(&self, other: &KmerMinHash, downsample: bool) -> Result<f64, Error> {
        let (first, second) = self.reconcile(other, downsample)?;
        if first.is_empty() {
            return Ok(0.0);
        }
        let common = Intersection::new(first.mins.iter(), second.mins.iter()).count();
        Ok(common as f64 / first.size() as f64)
    }

    /// The larger of the two containments, i.e. shared hashes over the
    /// size of the smaller sketch.
    pub fn max_containment(&self, other: &KmerMinHash, downsample: bool) -> Result<f64, Error> {
        let (first, second) = self.reconcile(other, downsample)?;
        let min_size = usize::min(first.size(), second.size());
        if min_size == 0 {
            return Ok(0.0);
        }
        let common = Intersection::new(first.mins.iter(), second.mins.iter()).count();
        Ok(common as f64 / min_size as f64)
    }

    // compare two minhashes, with abundance;
    // calculate their angular similarity.
    pub fn angular_similarity(&self, other: &KmerMinHash) -> Result<f64, Error> {
        self.check_compatible(other)?;

        let (abunds, other_abunds) = match (&self.abunds, &other.abunds) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(Error::NeedsAbundanceTracking),
        };

        let a_sq: u64 = abunds.iter().map(|a| a * a).sum();
        let b_sq: u64 = other_abunds.iter().map(|a| a * a).sum();

        let mut prod = 0;
        let (mut i, mut j) = (0, 0);
        while i < self.mins.len() && j < other.mins.len() {
            match self.mins[i].cmp(&other.mins[j]) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    prod += abunds[i] * other_abunds[j];
                    i += 1;
                    j += 1;
                }
            }
        }

        let norm_a = (a_sq as f64).sqrt();
        let norm_b = (b_sq as f64).sqrt();

        if norm_a == 0. || norm_b == 0. {
            return Ok(0.0);
        }
        let prod = f64::min(prod as f64 / (norm_a * norm_b), 1.);
        let distance = 2. * prod.acos() / PI;
        Ok(1. - distance)
    }

    pub fn similarity(
        &self,
        other: &KmerMinHash,
        ignore_abundance: bool,
        downsample: bool,
    ) -> Result<f64, Error> {
        let (first, second) = self.reconcile(other, downsample)?;
        if ignore_abundance || first.abunds.is_none() || second.abunds.is_none() {
            first.jaccard(&second, false)
        } else {
            first.angular_similarity(&second)
        }
    }

    /// ANI estimated from the containment of `self` in `other`.
    ///
    /// `containment` skips recomputing the containment when the caller
    /// already has it.
    pub fn containment_ani(
        &self,
        other: &KmerMinHash,
        downsample: bool,
        confidence: Option<f64>,
        containment: Option<f64>,
    ) -> Result<AniResult, Error> {
        let (first, second) = self.scaled_pair(other, downsample)?;
        let containment = match containment {
            Some(c) => c,
            None => first.contained_by(&second, false)?,
        };
        let scaled = first.scaled();
        ani_utils::containment_ani(
            containment,
            first.kmer_length(),
            scaled,
            estimated_kmers(first.size(), scaled),
            confidence,
        )
    }

    /// ANI from whichever containment direction gives the higher estimate.
    pub fn max_containment_ani(
        &self,
        other: &KmerMinHash,
        downsample: bool,
        confidence: Option<f64>,
        max_containment: Option<f64>,
    ) -> Result<AniResult, Error> {
        let (first, second) = self.scaled_pair(other, downsample)?;
        let scaled = first.scaled();
        let ksize = first.kmer_length();

        match max_containment {
            Some(mc) => {
                let n_unique_kmers =
                    estimated_kmers(usize::min(first.size(), second.size()), scaled);
                ani_utils::containment_ani(mc, ksize, scaled, n_unique_kmers, confidence)
            }
            None => ani_utils::max_containment_ani(
                (
                    first.contained_by(&second, false)?,
                    estimated_kmers(first.size(), scaled),
                ),
                (
                    second.contained_by(&first, false)?,
                    estimated_kmers(second.size(), scaled),
                ),
                ksize,
                scaled,
                confidence,
            ),
        }
    }

    /// ANI estimated from the Jaccard similarity.
    pub fn jaccard_ani(
        &self,
        other: &KmerMinHash,
        downsample: bool,
        confidence: Option<f64>,
        jaccard: Option<f64>,
    ) -> Result<AniResult, Error> {
        let (first, second) = self.scaled_pair(other, downsample)?;
        let jaccard = match jaccard {
            Some(j) => j,
            None => first.jaccard(&second, false)?,
        };
        let scaled = first.scaled();
        let mean_size = (first.size() + second.size()) / 2;
        ani_utils::jaccard_ani(
            jaccard,
            first.kmer_length(),
            scaled,
            estimated_kmers(mean_size, scaled),
            confidence,
        )
    }

    fn scaled_pair<'a>(
        &'a self,
        other: &'a KmerMinHash,
        downsample: bool,
    ) -> Result<(Cow<'a, KmerMinHash>, Cow<'a, KmerMinHash>), Error> {
        if !self.is_scaled() || !other.is_scaled() {
            return Err(Error::ScaledRequired);
        }
        self.reconcile(other, downsample)
    }

    pub fn mins(&self) -> Vec<u64> {
        self.mins.clone()
    }

    pub fn iter_mins(&self) -> impl Iterator<Item = &u64> {
        self.mins.iter()
    }

    pub fn abunds(&self) -> Option<Vec<u64>> {
        self.abunds.clone()
    }

    /// A copy with a stricter sizing policy: a smaller `num` for num
    /// sketches, a larger `scaled` for scaled sketches.
    pub fn downsample(&self, num: Option<u32>, scaled: Option<u64>) -> Result<KmerMinHash, Error> {
        match (num, scaled) {
            (None, None) => Ok(self.clone()),
            (Some(_), Some(_)) => Err(Error::InvalidDownsample {
                message: "cannot set both num and scaled".into(),
            }),
            (Some(num), None) => {
                if self.is_scaled() {
                    return Err(Error::InvalidDownsample {
                        message: "cannot downsample a scaled MinHash using num".into(),
                    });
                }
                if num == 0 || num > self.num {
                    return Err(Error::InvalidDownsample {
                        message: format!(
                            "new num {} must be between 1 and current num {}",
                            num, self.num
                        ),
                    });
                }
                let mut new_mh = self.clone();
                new_mh.num = num;
                new_mh.truncate(num as usize);
                Ok(new_mh)
            }
            (None, Some(scaled)) => {
                if !self.is_scaled() {
                    return Err(Error::InvalidDownsample {
                        message: "cannot downsample a num MinHash using scaled".into(),
                    });
                }
                if scaled < self.scaled() {
                    return Err(Error::InvalidDownsample {
                        message: format!(
                            "new scaled {} is lower than current scaled {}",
                            scaled,
                            self.scaled()
                        ),
                    });
                }
                self.downsample_max_hash(max_hash_for_scaled(scaled))
            }
        }
    }

    // create a downsampled copy of self
    pub fn downsample_max_hash(&self, max_hash: u64) -> Result<KmerMinHash, Error> {
        if !self.is_scaled() || max_hash == 0 || max_hash > self.max_hash {
            return Err(Error::InvalidDownsample {
                message: format!(
                    "max_hash {} is not stricter than current max_hash {}",
                    max_hash, self.max_hash
                ),
            });
        }

        let mut new_mh = self.clone();
        new_mh.max_hash = max_hash;
        new_mh.enforce_bounds();
        Ok(new_mh)
    }

    pub fn to_vec_abunds(&self) -> Vec<(u64, u64)> {
        if let Some(abunds) = &self.abunds {
            self.mins
                .iter()
                .cloned()
                .zip(abunds.iter().cloned())
                .collect()
        } else {
            self.mins
                .iter()
                .cloned()
                .zip(std::iter::repeat(1))
                .collect()
        }
    }
}

impl SigsTrait for KmerMinHash {
    fn size(&self) -> usize {
        self.mins.len()
    }

    fn to_vec(&self) -> Vec<u64> {
        self.mins.clone()
    }

    fn ksize(&self) -> usize {
        self.ksize as usize
    }

    fn seed(&self) -> u64 {
        self.seed
    }

    fn hash_function(&self) -> HashFunctions {
        self.hash_function
    }

    fn check_compatible(&self, other: &KmerMinHash) -> Result<(), Error> {
        self.check_params(other)?;
        if self.max_hash != other.max_hash {
            return Err(Error::MismatchScaled);
        }
        if self.num != other.num {
            return Err(Error::MismatchNum {
                n1: self.num,
                n2: other.num,
            });
        }
        Ok(())
    }
}

struct Intersection<T, I: Iterator<Item = T>, J: Iterator<Item = T>> {
    iter: Peekable<I>,
    other: Peekable<J>,
}

impl<T, I: Iterator<Item = T>, J: Iterator<Item = T>> Intersection<T, I, J> {
    pub fn new(left: I, right: J) -> Self {
        Intersection {
            iter: left.peekable(),
            other: right.peekable(),
        }
    }
}

impl<T: Ord, I: Iterator<Item = T>, J: Iterator<Item = T>> Iterator for Intersection<T, I, J> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let res = match (self.iter.peek(), self.other.peek()) {
                (Some(left_key), Some(right_key)) => left_key.cmp(right_key),
                _ => return None,
            };

            match res {
                Ordering::Less => {
                    self.iter.next();
                }
                Ordering::Greater => {
                    self.other.next();
                }
                Ordering::Equal => {
                    self.other.next();
                    return self.iter.next();
                }
            }
        }
    }
}

struct Union<T, I: Iterator<Item = T>> {
    iter: Peekable<I>,
    other: Peekable<I>,
}

impl<T, I: Iterator<Item = T>> Union<T, I> {
    pub fn new(left: I, right: I) -> Self {
        Union {
            iter: left.peekable(),
            other: right.peekable(),
        }
    }
}

impl<T: Ord, I: Iterator<Item = T>> Iterator for Union<T, I> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let res = match (self.iter.peek(), self.other.peek()) {
            (Some(left_key), Some(right_key)) => left_key.cmp(right_key),
            (None, Some(_)) => {
                return self.other.next();
            }
            (Some(_), None) => {
                return self.iter.next();
            }
            _ => return None,
        };

        match res {
            Ordering::Less => self.iter.next(),
            Ordering::Greater => self.other.next(),
            Ordering::Equal => {
                self.other.next();
                self.iter.next()
            }
        }
    }
}

fn intersection<'a>(
    me_iter: impl Iterator<Item = &'a u64>,
    other_iter: impl Iterator<Item = &'a u64>,
) -> (Vec<u64>, u64) {
    let mut me = me_iter.peekable();
    let mut other = other_iter.peekable();
    let mut common: Vec<u64> = vec![];
    let mut union_size = 0;

    loop {
        match (me.peek(), other.peek()) {
            (Some(left_key), Some(right_key)) => match left_key.cmp(right_key) {
                Ordering::Less => {
                    me.next();
                }
                Ordering::Greater => {
                    other.next();
                }
                Ordering::Equal => {
                    common.push(**left_key);
                    other.next();
                    me.next();
                }
            },
            (None, Some(_)) => {
                other.next();
            }
            (Some(_), None) => {
                me.next();
            }
            _ => break,
        };
        union_size += 1;
    }
    (common, union_size)
}

fn intersection_size<'a>(
    me_iter: impl Iterator<Item = &'a u64>,
    other_iter: impl Iterator<Item = &'a u64>,
) -> (u64, u64) {
    let mut me = me_iter.peekable();
    let mut other = other_iter.peekable();
    let mut common = 0;
    let mut union_size = 0;

    loop {
        match (me.peek(), other.peek()) {
            (Some(left_key), Some(right_key)) => match left_key.cmp(right_key) {
                Ordering::Less => {
                    me.next();
                }
                Ordering::Greater => {
                    other.next();
                }
                Ordering::Equal => {
                    other.next();
                    me.next();
                    common += 1;
                }
            },
            (None, Some(_)) => {
                other.next();
            }
            (Some(_), None) => {
                me.next();
            }
            _ => break,
        };
        union_size += 1;
    }
    (common, union_size)
}
