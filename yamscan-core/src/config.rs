//! Configuration for the scanner and the shuffler.
//!
//! The CLI builds one of these and threads it by shared reference through
//! parsing, threshold derivation, and scanning; nothing here is global.

use crate::background::Background;
use crate::constants::{
    DEFAULT_NSITES, DEFAULT_PSEUDOCOUNT, DEFAULT_PVALUE, DEFAULT_SHUFFLE_K, DEFAULT_SHUFFLE_SEED,
};

/// Settings controlling motif scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Background probabilities used for PWM generation and p-values.
    pub bkg: Background,
    /// When `true`, the background came from `-b` and motif-file-supplied
    /// values (MEME) are ignored.
    pub user_bkg: bool,
    /// Threshold p-value for reporting hits.
    pub pvalue: f64,
    /// Nominal site count used in PPM to PCM conversion.
    pub nsites: i32,
    /// Pseudocount added during PWM generation.
    pub pseudocount: i32,
    /// Number of scanning workers. Clamped to the motif count.
    pub threads: usize,
    /// Scan the reverse complement as well as the forward strand.
    pub scan_rc: bool,
    /// Rename duplicate motif/sequence names instead of aborting.
    pub dedup: bool,
    /// Trim motif and sequence names to the first whitespace.
    pub trim_names: bool,
    /// Keep at most one sequence resident, re-reading the input per motif.
    pub low_mem: bool,
    /// Report every hit scoring zero or better instead of using a p-value
    /// threshold.
    pub thresh0: bool,
    /// Treat lowercase letters as non-standard (soft-mask skipping).
    pub mask: bool,
    /// Draw a progress bar during scanning.
    pub progress: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            bkg: Background::uniform(),
            user_bkg: false,
            pvalue: DEFAULT_PVALUE,
            nsites: DEFAULT_NSITES,
            pseudocount: DEFAULT_PSEUDOCOUNT,
            threads: 1,
            scan_rc: true,
            dedup: false,
            trim_names: true,
            low_mem: true,
            thresh0: false,
            mask: false,
            progress: false,
        }
    }
}

impl ScanConfig {
    /// Settings forced by consensus (`-1`) mode: uniform background, no
    /// p-value filtering, default pseudo-counts.
    pub fn for_consensus(mut self) -> Self {
        self.bkg = Background::uniform();
        self.user_bkg = false;
        self.pvalue = 1.0;
        self.nsites = DEFAULT_NSITES;
        self.pseudocount = DEFAULT_PSEUDOCOUNT;
        self
    }
}

/// Shuffling method selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuffleMethod {
    /// Random Eulerian trail through the (k-1)-mer multigraph; preserves
    /// exact k-mer counts. Default for k > 1.
    Euler,
    /// Markov generation from k-mer transition counts.
    Markov,
    /// Non-overlapping k-sized block shuffle.
    Linear,
}

/// Settings controlling sequence shuffling.
#[derive(Debug, Clone)]
pub struct ShuffleConfig {
    pub k: usize,
    pub seed: u64,
    pub method: ShuffleMethod,
    /// Additional shuffles emitted per sequence; the repeat number is
    /// appended to the record name.
    pub repeats: u32,
    /// Re-seed the generator before every sequence.
    pub reseed: bool,
    /// Write RNA letters (ACGU) instead of DNA. Only meaningful for the
    /// Euler and Markov methods, which rewrite letters.
    pub rna_out: bool,
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_SHUFFLE_K,
            seed: DEFAULT_SHUFFLE_SEED,
            method: ShuffleMethod::Euler,
            repeats: 0,
            reseed: false,
            rna_out: false,
        }
    }
}
