use std::collections::HashMap;
use std::convert::TryFrom;
use std::str;

use once_cell::sync::Lazy;

use crate::Error;

/// Alphabet a sketch hashes k-mers from.
///
/// Everything is hashed with MurmurHash3; the variants differ in how a
/// sequence is turned into k-mers before hashing.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum HashFunctions {
    murmur64_DNA = 1,
    murmur64_protein = 2,
    murmur64_dayhoff = 3,
    murmur64_hp = 4,
}

impl HashFunctions {
    pub fn dna(&self) -> bool {
        *self == HashFunctions::murmur64_DNA
    }

    pub fn protein(&self) -> bool {
        *self == HashFunctions::murmur64_protein
    }

    pub fn dayhoff(&self) -> bool {
        *self == HashFunctions::murmur64_dayhoff
    }

    pub fn hp(&self) -> bool {
        *self == HashFunctions::murmur64_hp
    }
}

impl Default for HashFunctions {
    fn default() -> Self {
        HashFunctions::murmur64_DNA
    }
}

impl std::fmt::Display for HashFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HashFunctions::murmur64_DNA => "dna",
                HashFunctions::murmur64_protein => "protein",
                HashFunctions::murmur64_dayhoff => "dayhoff",
                HashFunctions::murmur64_hp => "hp",
            }
        )
    }
}

impl TryFrom<&str> for HashFunctions {
    type Error = Error;

    fn try_from(moltype: &str) -> Result<Self, Self::Error> {
        match moltype.to_lowercase().as_ref() {
            "dna" => Ok(HashFunctions::murmur64_DNA),
            "dayhoff" => Ok(HashFunctions::murmur64_dayhoff),
            "hp" => Ok(HashFunctions::murmur64_hp),
            "protein" => Ok(HashFunctions::murmur64_protein),
            _ => Err(Error::InvalidHashFunction {
                function: moltype.into(),
            }),
        }
    }
}

const COMPLEMENT: [u8; 256] = {
    let mut lookup = [0; 256];
    lookup[b'A' as usize] = b'T';
    lookup[b'C' as usize] = b'G';
    lookup[b'G' as usize] = b'C';
    lookup[b'T' as usize] = b'A';
    lookup[b'N' as usize] = b'N';
    lookup
};

#[inline]
pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|nt| COMPLEMENT[*nt as usize])
        .collect()
}

/// Nucleotides accepted in a DNA k-mer (after uppercasing).
pub const VALID: [bool; 256] = {
    let mut lookup = [false; 256];
    lookup[b'A' as usize] = true;
    lookup[b'C' as usize] = true;
    lookup[b'G' as usize] = true;
    lookup[b'T' as usize] = true;
    lookup
};

// Standard genetic code. Codons with an N in the wobble position are
// included when all four completions encode the same residue.
static CODONTABLE: Lazy<HashMap<&'static [u8], u8>> = Lazy::new(|| {
    let groups: [(u8, &[&str]); 21] = [
        (b'F', &["TTT", "TTC"]),
        (b'L', &["TTA", "TTG", "CTT", "CTC", "CTA", "CTG", "CTN"]),
        (b'S', &["TCT", "TCC", "TCA", "TCG", "TCN", "AGT", "AGC"]),
        (b'Y', &["TAT", "TAC"]),
        (b'*', &["TAA", "TAG", "TGA"]),
        (b'C', &["TGT", "TGC"]),
        (b'W', &["TGG"]),
        (b'P', &["CCT", "CCC", "CCA", "CCG", "CCN"]),
        (b'H', &["CAT", "CAC"]),
        (b'Q', &["CAA", "CAG"]),
        (b'R', &["CGT", "CGC", "CGA", "CGG", "CGN", "AGA", "AGG"]),
        (b'I', &["ATT", "ATC", "ATA"]),
        (b'M', &["ATG"]),
        (b'T', &["ACT", "ACC", "ACA", "ACG", "ACN"]),
        (b'N', &["AAT", "AAC"]),
        (b'K', &["AAA", "AAG"]),
        (b'V', &["GTT", "GTC", "GTA", "GTG", "GTN"]),
        (b'A', &["GCT", "GCC", "GCA", "GCG", "GCN"]),
        (b'D', &["GAT", "GAC"]),
        (b'E', &["GAA", "GAG"]),
        (b'G', &["GGT", "GGC", "GGA", "GGG", "GGN"]),
    ];

    groups
        .iter()
        .flat_map(|&(aa, codons)| codons.iter().map(move |&c| (c.as_bytes(), aa)))
        .collect()
});

// Dayhoff groups, from
// Dayhoff M. O., Schwartz R. M., Orcutt B. C. (1978).
// A model of evolutionary change in proteins,
// in Atlas of Protein Sequence and Structure, 345–352.
//
// | Amino acid    | Property              | Dayhoff |
// |---------------|-----------------------|---------|
// | C             | Sulfur polymerization | a       |
// | A, G, P, S, T | Small                 | b       |
// | D, E, N, Q    | Acid and amide        | c       |
// | H, K, R       | Basic                 | d       |
// | I, L, M, V    | Hydrophobic           | e       |
// | F, W, Y       | Aromatic              | f       |
#[inline]
pub fn aa_to_dayhoff(aa: u8) -> u8 {
    match aa {
        b'C' => b'a',
        b'A' | b'G' | b'P' | b'S' | b'T' => b'b',
        b'D' | b'E' | b'N' | b'Q' => b'c',
        b'H' | b'K' | b'R' => b'd',
        b'I' | b'L' | b'M' | b'V' => b'e',
        b'F' | b'W' | b'Y' => b'f',
        b'*' => b'*',
        _ => b'X',
    }
}

// Hydrophobic/hydrophilic mapping, from
// Phillips, R., Kondev, J., Theriot, J. (2008).
// Physical Biology of the Cell. New York: Garland Science.
#[inline]
pub fn aa_to_hp(aa: u8) -> u8 {
    match aa {
        b'A' | b'F' | b'G' | b'I' | b'L' | b'M' | b'P' | b'V' | b'W' | b'Y' => b'h',
        b'N' | b'C' | b'S' | b'T' | b'D' | b'E' | b'R' | b'H' | b'K' | b'Q' => b'p',
        b'*' => b'*',
        _ => b'X',
    }
}

#[inline]
pub fn translate_codon(codon: &[u8]) -> Result<u8, Error> {
    match codon.len() {
        1 => Ok(b'X'),
        2 => {
            let padded = [codon[0], codon[1], b'N'];
            Ok(*CODONTABLE.get(&padded[..]).unwrap_or(&b'X'))
        }
        3 => Ok(*CODONTABLE.get(codon).unwrap_or(&b'X')),
        n => Err(Error::InvalidCodonLength {
            message: format!("{}", n),
        }),
    }
}

/// Translate a DNA sequence in the first frame, optionally reducing the
/// residues to the Dayhoff or HP alphabets. Trailing partial codons are
/// dropped.
#[inline]
pub fn to_aa(seq: &[u8], dayhoff: bool, hp: bool) -> Result<Vec<u8>, Error> {
    let mut converted: Vec<u8> = Vec::with_capacity(seq.len() / 3);

    for chunk in seq.chunks_exact(3) {
        let residue = translate_codon(chunk)?;
        if dayhoff {
            converted.push(aa_to_dayhoff(residue));
        } else if hp {
            converted.push(aa_to_hp(residue));
        } else {
            converted.push(residue);
        }
    }

    Ok(converted)
}
