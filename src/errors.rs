use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourmashError {
    /// Raised for internal errors in the libraries.  Should not happen.
    #[error("internal error: {message:?}")]
    Internal { message: String },

    #[error("FrozenMinHash does not support modification")]
    FrozenMinHash,

    #[error("must have same num: {n1} != {n2}")]
    MismatchNum { n1: u32, n2: u32 },

    #[error("different ksizes cannot be compared")]
    MismatchKSizes,

    #[error("DNA/prot minhashes cannot be compared")]
    MismatchDNAProt,

    #[error("mismatch in scaled; comparison fail")]
    MismatchScaled,

    #[error("mismatch in seed; comparison fail")]
    MismatchSeed,

    #[error("num and scaled MinHashes cannot be compared")]
    MismatchSketchKind,

    #[error("cannot set both num and scaled: num={num}, scaled={scaled}")]
    InvalidSizing { num: u32, scaled: u64 },

    #[error("cannot downsample: {message}")]
    InvalidDownsample { message: String },

    #[error("Invalid hash function: {function:?}")]
    InvalidHashFunction { function: String },

    #[error("Can only set {message:?} if the MinHash is empty")]
    NonEmptyMinHash { message: String },

    #[error("k-mer to add is not {expected} in length: got {found}")]
    InvalidKmerLength { expected: usize, found: usize },

    #[error("invalid DNA character in input k-mer: {message}")]
    InvalidDNA { message: String },

    #[error("Codon is invalid length: {message}")]
    InvalidCodonLength { message: String },

    #[error("invalid ksize: {message:?}")]
    InvalidKsize { message: String },

    #[error("abundance tracking must be enabled in both MinHashes")]
    NeedsAbundanceTracking,

    #[error("can only calculate ANI for scaled MinHashes")]
    ScaledRequired,

    #[error("confidence must be between 0 and 1, got {confidence}")]
    InvalidConfidence { confidence: f64 },

    #[error("ANI is undefined when no k-mers are shared")]
    UndefinedANI,

    #[error("error while calculating ANI confidence intervals: {message}")]
    ANIEstimationError { message: String },

    #[error("expected to load exactly one signature, found {found}")]
    ExpectedOneSignature { found: usize },

    #[error(transparent)]
    SerdeError(#[from] serde_json::error::Error),

    #[error(transparent)]
    NifflerError(#[from] niffler::Error),

    #[error(transparent)]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl SourmashError {
    /// True for the errors raised when two sketches can't be compared
    /// as they are.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            SourmashError::MismatchNum { .. }
                | SourmashError::MismatchKSizes
                | SourmashError::MismatchDNAProt
                | SourmashError::MismatchScaled
                | SourmashError::MismatchSeed
                | SourmashError::MismatchSketchKind
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mismatch_messages() {
        assert_eq!(
            SourmashError::MismatchScaled.to_string(),
            "mismatch in scaled; comparison fail"
        );
        assert!(SourmashError::MismatchSeed.is_mismatch());
        assert!(!SourmashError::UndefinedANI.is_mismatch());
    }
}
