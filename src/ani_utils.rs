// Streamlined set of utils for containment --> ANI estimation
// Equations based off of: https://github.com/KoslickiLab/mutation-rate-ci-calculator
// Reference: https://doi.org/10.1101/2022.01.11.475870

use log::{trace, warn};
use roots::{find_root_brent, SimpleConvergency};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::Error;

const DEFAULT_CONFIDENCE: f64 = 0.95;
const PROB_NOTHING_IN_COMMON_THRESHOLD: f64 = 1e-3;

/// An ANI point estimate with its confidence interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AniResult {
    pub ani: f64,
    pub lower: f64,
    pub upper: f64,
    /// Probability of two sketches at this ANI sharing no hashes at all.
    /// High values mean the estimate is unreliable.
    pub p_nothing_in_common: f64,
}

impl AniResult {
    fn identical() -> AniResult {
        AniResult {
            ani: 1.0,
            lower: 1.0,
            upper: 1.0,
            p_nothing_in_common: 0.0,
        }
    }
}

impl From<AniResult> for (f64, f64, f64) {
    fn from(res: AniResult) -> (f64, f64, f64) {
        (res.ani, res.lower, res.upper)
    }
}

fn exp_n_mutated(l: f64, k: f64, r1: f64) -> f64 {
    let q = r1_to_q(k, r1);
    l * q
}

fn var_n_mutated(l: f64, k: f64, r1: f64, q: Option<f64>) -> Result<f64, Error> {
    if r1 == 0.0 {
        return Ok(0.0);
    }

    let q = q.unwrap_or_else(|| r1_to_q(k, r1));

    let var_n = l * (1.0 - q) * (q * (2.0 * k + (2.0 / r1) - 1.0) - 2.0 * k)
        + k * (k - 1.0) * (1.0 - q).powi(2)
        + (2.0 * (1.0 - q) / (r1.powi(2))) * ((1.0 + (k - 1.0) * (1.0 - q)) * r1 - q);

    if var_n < 0.0 {
        Err(Error::ANIEstimationError {
            message: "varN is less than 0.0".into(),
        })
    } else {
        Ok(var_n)
    }
}

fn exp_n_mutated_squared(l: f64, k: f64, p: f64) -> Result<f64, Error> {
    let var_n = var_n_mutated(l, k, p, None)?;
    let exp_n_squared = exp_n_mutated(l, k, p).powi(2);
    Ok(var_n + exp_n_squared)
}

fn probit(p: f64) -> Result<f64, Error> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| Error::Internal {
        message: e.to_string(),
    })?;
    Ok(normal.inverse_cdf(p))
}

fn r1_to_q(k: f64, r1: f64) -> f64 {
    1.0 - (1.0 - r1).powi(k as i32)
}

fn check_confidence(confidence: Option<f64>) -> Result<f64, Error> {
    let confidence = confidence.unwrap_or(DEFAULT_CONFIDENCE);
    if confidence > 0.0 && confidence < 1.0 {
        Ok(confidence)
    } else {
        Err(Error::InvalidConfidence { confidence })
    }
}

fn prob_nothing_in_common(mutation_rate: f64, ksize: f64, scaled: u64, n_unique_kmers: f64) -> f64 {
    if mutation_rate == 1.0 {
        return 1.0;
    } else if mutation_rate == 0.0 {
        return 0.0;
    }

    let f_scaled = 1.0 / scaled as f64;
    let exp_nmut = exp_n_mutated(n_unique_kmers, ksize, mutation_rate);
    let expected_log_probability = (n_unique_kmers - exp_nmut) * (1.0 - f_scaled).ln();

    if expected_log_probability.is_infinite() {
        0.0
    } else {
        expected_log_probability.exp()
    }
}

// Confidence interval for the ANI, as (lower, upper).
fn ani_ci(
    containment: f64,
    ksize: f64,
    scaled: u64,
    n_unique_kmers: f64,
    confidence: f64,
) -> Result<(f64, f64), Error> {
    let f_scaled = 1.0 / scaled as f64;
    let alpha = 1.0 - confidence;

    let z_alpha = probit(1.0 - alpha / 2.0)?;
    let bias_factor = 1.0 - (1.0 - f_scaled).powf(n_unique_kmers);
    let term_1 = (1.0 - f_scaled) / (f_scaled * n_unique_kmers.powi(3) * bias_factor.powi(2));
    let term_2 = |pest: f64| {
        n_unique_kmers * exp_n_mutated(n_unique_kmers, ksize, pest)
            - exp_n_mutated_squared(n_unique_kmers, ksize, pest).unwrap_or(0.0)
    };
    let term_3 = |pest: f64| {
        var_n_mutated(n_unique_kmers, ksize, pest, None).unwrap_or(0.0) / n_unique_kmers.powi(2)
    };

    let var_direct = |pest: f64| term_1 * term_2(pest) + term_3(pest);

    let f1 = |pest: f64| {
        (1.0 - pest).powi(ksize as i32) + z_alpha * var_direct(pest).sqrt() - containment
    };
    let f2 = |pest: f64| {
        (1.0 - pest).powi(ksize as i32) - z_alpha * var_direct(pest).sqrt() - containment
    };

    let mut convergency = SimpleConvergency {
        eps: 1e-15,
        max_iter: 1000,
    };

    // no root means the bound falls outside the search interval
    let lower = match find_root_brent(0.0000001, 0.9999999, &f1, &mut convergency) {
        Ok(dist) => 1.0 - dist,
        Err(e) => {
            trace!("no root for the lower ANI bound ({:?}), clipping", e);
            0.0
        }
    };
    let upper = match find_root_brent(0.0000001, 0.9999999, &f2, &mut convergency) {
        Ok(dist) => 1.0 - dist,
        Err(e) => {
            trace!("no root for the upper ANI bound ({:?}), clipping", e);
            1.0
        }
    };

    Ok((lower, upper))
}

/// ANI estimated from the containment of one sketch in another.
///
/// `n_unique_kmers` is the estimated number of distinct k-mers in the
/// contained dataset, usually the sketch size times `scaled`.
pub fn containment_ani(
    containment: f64,
    ksize: u32,
    scaled: u64,
    n_unique_kmers: u64,
    confidence: Option<f64>,
) -> Result<AniResult, Error> {
    let confidence = check_confidence(confidence)?;

    if !(0.0..=1.0).contains(&containment) {
        return Err(Error::ANIEstimationError {
            message: format!("containment {} is not between 0 and 1", containment),
        });
    }
    if containment == 0.0 {
        return Err(Error::UndefinedANI);
    }
    if containment == 1.0 {
        return Ok(AniResult::identical());
    }
    if ksize == 0 || scaled == 0 || n_unique_kmers == 0 {
        return Err(Error::ANIEstimationError {
            message: format!(
                "need positive ksize, scaled and k-mer count, got {}, {} and {}",
                ksize, scaled, n_unique_kmers
            ),
        });
    }

    let ksize = ksize as f64;
    let n_unique_kmers = n_unique_kmers as f64;

    let ani = containment.powf(1.0 / ksize);
    let (lower, upper) = ani_ci(containment, ksize, scaled, n_unique_kmers, confidence)?;

    let p_nothing_in_common = prob_nothing_in_common(1.0 - ani, ksize, scaled, n_unique_kmers);
    if p_nothing_in_common > PROB_NOTHING_IN_COMMON_THRESHOLD {
        warn!(
            "ANI estimate {:.4} is unreliable: probability of sharing no hashes is {:.4}",
            ani, p_nothing_in_common
        );
    }

    Ok(AniResult {
        ani,
        lower: f64::min(lower, ani),
        upper: f64::max(upper, ani),
        p_nothing_in_common,
    })
}

/// ANI estimated from a Jaccard similarity, through the containment
/// `2J / (1 + J)` of two equally sized sets with that Jaccard.
pub fn jaccard_ani(
    jaccard: f64,
    ksize: u32,
    scaled: u64,
    n_unique_kmers: u64,
    confidence: Option<f64>,
) -> Result<AniResult, Error> {
    if !(0.0..=1.0).contains(&jaccard) {
        return Err(Error::ANIEstimationError {
            message: format!("jaccard {} is not between 0 and 1", jaccard),
        });
    }
    let containment = 2.0 * jaccard / (1.0 + jaccard);
    containment_ani(containment, ksize, scaled, n_unique_kmers, confidence)
}

/// ANI from both containment directions, each given as
/// `(containment, n_unique_kmers)`. Returns the higher point estimate.
pub fn max_containment_ani(
    first: (f64, u64),
    second: (f64, u64),
    ksize: u32,
    scaled: u64,
    confidence: Option<f64>,
) -> Result<AniResult, Error> {
    let a = containment_ani(first.0, ksize, scaled, first.1, confidence)?;
    let b = containment_ani(second.0, ksize, scaled, second.1, confidence)?;
    Ok(if b.ani > a.ani { b } else { a })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_containment_to_ani_zero() {
        assert!(matches!(
            containment_ani(0.0, 21, 10, 100, Some(0.95)),
            Err(Error::UndefinedANI)
        ));
    }

    #[test]
    fn test_containment_to_ani_one() {
        let res = containment_ani(1.0, 21, 10, 100, None).unwrap();
        assert_eq!(<(f64, f64, f64)>::from(res), (1.0, 1.0, 1.0));
    }

    #[test]
    fn test_containment_to_ani_scaled1() {
        let res = containment_ani(0.5, 21, 1, 10000, None).unwrap();
        assert!(close(res.ani, 0.9675317785238916));
        assert!(close(res.lower, 0.9635213980271021));
        assert!(close(res.upper, 0.9712900870335944));
    }

    #[test]
    fn test_containment_to_ani_scaled100() {
        let res = containment_ani(0.1, 31, 100, 10000, None).unwrap();
        assert!(close(res.ani, 0.9284145445194744));
        assert!(close(res.lower, 0.9094445232754665));
        assert!(close(res.upper, 0.9467922076143345));
    }

    #[test]
    fn test_containment_to_ani_scaled100_2() {
        let res = containment_ani(0.5, 21, 100, 10000, None).unwrap();
        assert!(close(res.ani, 0.9675317785238916));
        assert!(close(res.lower, 0.9569003945603415));
        assert!(close(res.upper, 0.9762879360833708));
    }

    #[test]
    fn higher_confidence_widens_interval() {
        let narrow = containment_ani(0.5, 21, 100, 10000, Some(0.8)).unwrap();
        let wide = containment_ani(0.5, 21, 100, 10000, Some(0.99)).unwrap();
        assert_eq!(narrow.ani, wide.ani);
        assert!(wide.lower < narrow.lower);
        assert!(wide.upper > narrow.upper);
    }

    #[test]
    fn invalid_confidence() {
        for confidence in [0.0, 1.0, -0.5, 1.5] {
            assert!(matches!(
                containment_ani(0.5, 21, 100, 10000, Some(confidence)),
                Err(Error::InvalidConfidence { .. })
            ));
        }
    }

    #[test]
    fn jaccard_to_ani() {
        // J = 1/3 is the Jaccard of two equal-sized sets with C = 0.5
        let from_jaccard = jaccard_ani(1.0 / 3.0, 21, 100, 10000, None).unwrap();
        let from_containment = containment_ani(0.5, 21, 100, 10000, None).unwrap();
        assert!(close(from_jaccard.ani, from_containment.ani));

        assert!(matches!(
            jaccard_ani(0.0, 21, 100, 10000, None),
            Err(Error::UndefinedANI)
        ));
        assert_eq!(jaccard_ani(1.0, 21, 100, 10000, None).unwrap().ani, 1.0);
    }

    #[test]
    fn max_containment_picks_higher() {
        let res = max_containment_ani((0.1, 10000), (0.5, 2000), 21, 100, None).unwrap();
        assert!(close(res.ani, 0.9675317785238916));
    }

    #[test]
    fn test_prob_nothing_in_common() {
        let ani = containment_ani(0.25, 31, 10, 1_000_000, None).unwrap();
        assert!(ani.p_nothing_in_common < 1e-10);

        let sparse = containment_ani(0.01, 31, 1000, 1000, None).unwrap();
        assert!(sparse.p_nothing_in_common > 0.9);
    }

    #[test]
    fn test_var_n_mutated_zero() {
        let var_n_mut = var_n_mutated(200.0, 31.0, 0.0, None).unwrap();
        assert_eq!(var_n_mut, 0.0, "Expected variance to be 0 for r=0");
    }

    #[test]
    fn test_var_n_mutated_value_error() {
        match var_n_mutated(200.0, 31.0, 10.0, None) {
            Err(e) => assert_eq!(
                e.to_string(),
                "error while calculating ANI confidence intervals: varN is less than 0.0",
            ),
            Ok(_) => panic!("Expected an error, but got Ok"),
        }
    }

    #[test]
    fn test_var_n_mutated_success() {
        let var_n_mut = var_n_mutated(200_000.0, 31.0, 0.4, None).unwrap();
        let expected = 0.10611425440741508;
        assert!((var_n_mut - expected).abs() < 1e-6);
    }
}
