//! # Compressed representations of genomic data
//!
//! A signature is a sketch of a genomic dataset, plus the name and the
//! filename it came from.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io;
use std::iter::Iterator;

use typed_builder::TypedBuilder;

use crate::_hash_murmur;
use crate::ani_utils::AniResult;
use crate::cmd::ComputeParameters;
use crate::codec::{save_signatures, SaveOptions};
use crate::encodings::{aa_to_dayhoff, aa_to_hp, revcomp, to_aa, HashFunctions, VALID};
use crate::prelude::ToWriter;
use crate::sketch::minhash::KmerMinHash;
use crate::sketch::Sketch;
use crate::Error;

/// Read-only operations shared by every sketch flavor.
pub trait SigsTrait {
    fn size(&self) -> usize;
    fn to_vec(&self) -> Vec<u64>;
    fn ksize(&self) -> usize;
    fn check_compatible(&self, other: &Self) -> Result<(), Error>;
    fn seed(&self) -> u64;

    fn hash_function(&self) -> HashFunctions;
}

/// Iterator over the k-mer hashes of a sequence.
///
/// DNA k-mers are hashed in canonical form (the smaller of the k-mer and
/// its reverse complement). For protein alphabets a DNA sequence is
/// translated in all six frames first, and `ksize / 3` residues are hashed
/// per k-mer. With `is_protein` the input is taken as amino acids already.
pub struct SeqToHashes {
    sequence: Vec<u8>,
    rc: Vec<u8>,
    ksize: usize,
    kmer_index: usize,
    max_index: usize,
    force: bool,
    is_protein: bool,
    hash_function: HashFunctions,
    seed: u64,
    translated: Option<std::vec::IntoIter<u64>>,
}

impl SeqToHashes {
    pub fn new(
        seq: &[u8],
        k_size: usize,
        force: bool,
        is_protein: bool,
        hash_function: HashFunctions,
        seed: u64,
    ) -> SeqToHashes {
        let ksize = if is_protein || !hash_function.dna() {
            k_size / 3
        } else {
            k_size
        };

        let sequence = seq.to_ascii_uppercase();
        let max_index = if ksize > 0 && sequence.len() >= ksize {
            sequence.len() - ksize + 1
        } else {
            0
        };

        SeqToHashes {
            sequence,
            rc: vec![],
            ksize,
            kmer_index: 0,
            max_index,
            force,
            is_protein,
            hash_function,
            seed,
            translated: None,
        }
    }

    fn next_dna(&mut self) -> Option<Result<u64, Error>> {
        while self.kmer_index < self.max_index {
            let start = self.kmer_index;
            let end = start + self.ksize;

            if let Some(offset) = self.sequence[start..end]
                .iter()
                .rposition(|&nt| !VALID[nt as usize])
            {
                if !self.force {
                    self.kmer_index = self.max_index;
                    return Some(Err(Error::InvalidDNA {
                        message: String::from_utf8_lossy(&self.sequence[start..end]).into_owned(),
                    }));
                }
                // every k-mer overlapping the bad base is skipped
                self.kmer_index = start + offset + 1;
                continue;
            }

            if self.rc.is_empty() {
                self.rc = revcomp(&self.sequence);
            }

            let len = self.sequence.len();
            let kmer = &self.sequence[start..end];
            let krc = &self.rc[len - end..len - start];
            self.kmer_index += 1;

            return Some(Ok(_hash_murmur(std::cmp::min(kmer, krc), self.seed)));
        }
        None
    }

    fn protein_hashes(&self) -> Result<Vec<u64>, Error> {
        let residues: Cow<[u8]> = match self.hash_function {
            HashFunctions::murmur64_protein => Cow::Borrowed(&self.sequence[..]),
            HashFunctions::murmur64_dayhoff => {
                Cow::Owned(self.sequence.iter().map(|&aa| aa_to_dayhoff(aa)).collect())
            }
            HashFunctions::murmur64_hp => {
                Cow::Owned(self.sequence.iter().map(|&aa| aa_to_hp(aa)).collect())
            }
            invalid => {
                return Err(Error::InvalidHashFunction {
                    function: invalid.to_string(),
                })
            }
        };

        if self.ksize == 0 {
            return Ok(vec![]);
        }

        Ok(residues
            .windows(self.ksize)
            .map(|aa_kmer| _hash_murmur(aa_kmer, self.seed))
            .collect())
    }

    fn translated_hashes(&self) -> Result<Vec<u64>, Error> {
        if self.ksize == 0 || self.sequence.len() < self.ksize * 3 {
            return Ok(vec![]);
        }

        let dayhoff = self.hash_function.dayhoff();
        let hp = self.hash_function.hp();
        let rc = revcomp(&self.sequence);

        let mut hashes = Vec::with_capacity(2 * self.sequence.len() / 3);
        for frame in 0..3 {
            for strand in [&self.sequence, &rc] {
                let aa = to_aa(&strand[frame..], dayhoff, hp)?;
                hashes.extend(
                    aa.windows(self.ksize)
                        .map(|aa_kmer| _hash_murmur(aa_kmer, self.seed)),
                );
            }
        }
        Ok(hashes)
    }
}

impl Iterator for SeqToHashes {
    type Item = Result<u64, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.is_protein && self.hash_function.dna() {
            return self.next_dna();
        }

        if self.translated.is_none() {
            let hashes = if self.is_protein {
                self.protein_hashes()
            } else {
                self.translated_hashes()
            };
            match hashes {
                Ok(hashes) => self.translated = Some(hashes.into_iter()),
                Err(e) => {
                    self.translated = Some(vec![].into_iter());
                    return Some(Err(e));
                }
            }
        }

        self.translated.as_mut().and_then(|h| h.next()).map(Ok)
    }
}

/// A sketch with its name and source filename.
#[derive(Clone, TypedBuilder)]
pub struct Signature {
    #[builder(setter(into))]
    sketch: Sketch,

    #[builder(default, setter(into, strip_option))]
    name: Option<String>,

    #[builder(default, setter(into, strip_option))]
    filename: Option<String>,
}

impl Signature {
    pub fn new<S: Into<Sketch>>(sketch: S) -> Signature {
        Signature {
            sketch: sketch.into(),
            name: None,
            filename: None,
        }
    }

    /// One empty signature per ksize and molecule type in `params`.
    pub fn from_params(params: &ComputeParameters) -> Result<Vec<Signature>, Error> {
        params.build_signatures()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = Some(name.into())
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn set_filename(&mut self, filename: &str) {
        self.filename = Some(filename.into())
    }

    pub fn sketch(&self) -> &Sketch {
        &self.sketch
    }

    pub fn sketch_mut(&mut self) -> &mut Sketch {
        &mut self.sketch
    }

    pub fn set_sketch<S: Into<Sketch>>(&mut self, sketch: S) {
        self.sketch = sketch.into();
    }

    pub fn minhash(&self) -> &KmerMinHash {
        self.sketch.minhash()
    }

    pub fn md5sum(&self) -> String {
        self.minhash().md5sum()
    }

    /// A deep copy holding a frozen sketch.
    pub fn copy(&self) -> Signature {
        Signature {
            sketch: self.sketch.to_frozen(),
            name: self.name.clone(),
            filename: self.filename.clone(),
        }
    }

    pub fn add_sequence(&mut self, seq: &[u8], force: bool) -> Result<(), Error> {
        self.sketch.add_sequence(seq, force)
    }

    pub fn add_protein(&mut self, seq: &[u8]) -> Result<(), Error> {
        self.sketch.add_protein(seq)
    }

    /// Jaccard similarity of the two sketches.
    pub fn similarity(&self, other: &Signature, downsample: bool) -> Result<f64, Error> {
        self.minhash().jaccard(other.minhash(), downsample)
    }

    pub fn contained_by(&self, other: &Signature, downsample: bool) -> Result<f64, Error> {
        self.minhash().contained_by(other.minhash(), downsample)
    }

    pub fn max_containment(&self, other: &Signature, downsample: bool) -> Result<f64, Error> {
        self.minhash().max_containment(other.minhash(), downsample)
    }

    pub fn containment_ani(
        &self,
        other: &Signature,
        downsample: bool,
        confidence: Option<f64>,
        containment: Option<f64>,
    ) -> Result<AniResult, Error> {
        self.minhash()
            .containment_ani(other.minhash(), downsample, confidence, containment)
    }

    pub fn max_containment_ani(
        &self,
        other: &Signature,
        downsample: bool,
        confidence: Option<f64>,
        max_containment: Option<f64>,
    ) -> Result<AniResult, Error> {
        self.minhash()
            .max_containment_ani(other.minhash(), downsample, confidence, max_containment)
    }

    pub fn jaccard_ani(
        &self,
        other: &Signature,
        downsample: bool,
        confidence: Option<f64>,
        jaccard: Option<f64>,
    ) -> Result<AniResult, Error> {
        self.minhash()
            .jaccard_ani(other.minhash(), downsample, confidence, jaccard)
    }
}

impl ToWriter for Signature {
    fn to_writer<W>(&self, writer: &mut W) -> Result<(), Error>
    where
        W: io::Write,
    {
        save_signatures(std::slice::from_ref(self), writer, &SaveOptions::default())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // empty strings fall through to the next candidate
        let name = self.name().filter(|n| !n.is_empty());
        let filename = self.filename().filter(|n| !n.is_empty());
        match (name, filename) {
            (Some(name), _) => write!(f, "{}", name),
            (None, Some(filename)) => write!(f, "{}", filename),
            (None, None) => write!(f, "{}", &self.md5sum()[..8]),
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let md5 = self.md5sum();
        f.debug_tuple("Signature")
            .field(&self.to_string())
            .field(&format_args!("{}", &md5[..8]))
            .finish()
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Signature) -> bool {
        self.name == other.name
            && self.filename == other.filename
            && self.sketch == other.sketch
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.md5sum().hash(state);
        self.name.hash(state);
        self.filename.hash(state);
    }
}
