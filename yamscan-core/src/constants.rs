/// Version string reported in output headers.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of motif positions.
///
/// Bounding the width guarantees that a window full of non-standard letters
/// (each scoring [`AMBIGUITY_SCORE`]) sums to at most -500,000,000, which
/// stays far above `i32::MIN`.
pub const MAX_MOTIF_WIDTH: usize = 50;

/// Score assigned to the non-standard letter row of every PWM position.
///
/// Any window containing a non-ACGTU letter picks up at least one of these
/// and lands far below any reachable threshold.
pub const AMBIGUITY_SCORE: i32 = -10_000_000;

/// Smallest permitted background probability.
///
/// Keeps the per-position score range bounded, which in turn bounds the CDF
/// size: `1000*log2(1/0.001)` is 9,965 and `1000*log2(0.001/0.997)` is
/// -9,961, so a 50-position motif needs at most ~996,300 CDF entries.
pub const MIN_BKG_VALUE: f64 = 0.001;

/// Hard cap on the exact score-distribution array length.
pub const MAX_CDF_SIZE: u64 = 2_097_152;

/// PWM scores are `log2(prob/bkg)` scaled by this factor and truncated.
pub const PWM_INT_MULTIPLIER: f64 = 1000.0;

/// Maximum stored size of motif names.
pub const MAX_NAME_SIZE: usize = 256;

/// Maximum size of sequence names (and BED range names).
pub const SEQ_NAME_MAX_CHAR: usize = 512;

pub const DEFAULT_NSITES: i32 = 1000;
pub const DEFAULT_PVALUE: f64 = 0.0001;
pub const DEFAULT_PSEUDOCOUNT: i32 = 1;

/// Line width used when writing FASTA output.
pub const FASTA_LINE_LEN: usize = 60;

/// Largest k accepted by the Euler/Markov shufflers; the complete k-mer
/// table has `5^k` entries, so this keeps allocations modest.
pub const MAX_SHUFFLE_K: usize = 9;

pub const DEFAULT_SHUFFLE_K: usize = 3;
pub const DEFAULT_SHUFFLE_SEED: u64 = 4;

/// Powers of five up to `5^MAX_SHUFFLE_K`, indexed by exponent.
pub const POW5: [u64; MAX_SHUFFLE_K + 1] = [
    1, 5, 25, 125, 625, 3_125, 15_625, 78_125, 390_625, 1_953_125,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow5_matches_exponentiation() {
        for (exp, &val) in POW5.iter().enumerate() {
            assert_eq!(val, 5u64.pow(exp as u32));
        }
    }

    #[test]
    fn ambiguity_cannot_overflow() {
        let worst = AMBIGUITY_SCORE as i64 * MAX_MOTIF_WIDTH as i64;
        assert!(worst > i32::MIN as i64);
    }
}
