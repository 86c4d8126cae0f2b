//! # yamscan-core
//!
//! Core library behind the `yamscan` motif scanner and the `yamshuf`
//! sequence shuffler.
//!
//! ## Overview
//!
//! yamscan converts motifs (MEME, HOMER, JASPAR, or HOCOMOCO PCM text
//! files, or a bare consensus string) into integer log-odds PWMs, derives
//! an exact p-value threshold for each from the discrete null score
//! distribution, and slides every motif across DNA/RNA sequences on both
//! strands, reporting windows that clear the threshold. yamshuf rearranges
//! sequences while preserving their k-mer composition.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use yamscan_core::config::ScanConfig;
//! use yamscan_core::motif::{Motif, Scoring};
//! use yamscan_core::background::Background;
//!
//! let cfg = ScanConfig::default();
//! let scoring = Scoring {
//!     bkg: cfg.bkg,
//!     nsites: cfg.nsites,
//!     pseudocount: cfg.pseudocount,
//! };
//! let motif = Motif::from_consensus("TGACTCA", &scoring)?;
//! println!("{} positions, max score {}", motif.width(), motif.max_score);
//! # Ok::<(), yamscan_core::types::ScanError>(())
//! ```
//!
//! ## Module organization
//!
//! - [`alphabet`]: base-to-index tables and IUPAC consensus rows
//! - [`background`]: background probability handling
//! - [`config`]: scanner and shuffler settings
//! - [`motif`]: the PWM model, file format parsers, and the exact score
//!   distribution engine
//! - [`sequence`]: FASTA/FASTQ input with transparent gzip
//! - [`bed`]: scanning-range restriction
//! - [`dedup`]: duplicate name detection
//! - [`scan`]: the inner scanning loops
//! - [`runner`]: worker-pool and streaming scan drivers
//! - [`output`]: headers and record formatting
//! - [`shuffle`]: the k-mer preserving shuffle engine
//!
//! ## Error handling
//!
//! All fallible operations return [`Result<T, ScanError>`](types::ScanError)
//! carrying the offending file line where one exists. Diagnostics and
//! invariant warnings go through the `log` facade; binaries decide the
//! visible level.

pub mod alphabet;
pub mod background;
pub mod bed;
pub mod config;
pub mod constants;
pub mod dedup;
pub mod motif;
pub mod output;
pub mod runner;
pub mod scan;
pub mod sequence;
pub mod shuffle;
pub mod types;

pub use types::{Result, ScanError};
