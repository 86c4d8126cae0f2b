//! Higher-order DNA/RNA sequence shuffling.
//!
//! Four methods, all length-preserving. k=1 is a Fisher-Yates shuffle; the
//! linear method swaps non-overlapping k-sized blocks; the Markov method
//! regenerates the sequence from k-mer transition counts; the Eulerian
//! method (the default for k > 1) preserves exact k-mer composition by
//! walking a random Eulerian trail through the (k-1)-mer multigraph.
//!
//! A complete k-mer table of size 5^k is used rather than a hash table:
//! shuffling tasks almost never need k beyond 3, and even k=9 stays below
//! 20 MB.

use std::io::Write;
use std::time::Instant;

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::alphabet::{base_index, INDEX_TO_DNA, INDEX_TO_RNA};
use crate::config::{ShuffleConfig, ShuffleMethod};
use crate::constants::{FASTA_LINE_LEN, MAX_SHUFFLE_K, POW5};
use crate::sequence::{open_fastx, CharCounts, SeqSource};
use crate::types::{Result, ScanError};

/// Pack the k letters starting at `offset` into a base-5 index.
#[inline]
fn kmer_at(seq: &[u8], k: usize, offset: usize) -> usize {
    let mut kmer = 0;
    for j in 0..k {
        kmer += POW5[k - 1 - j] as usize * base_index(seq[offset + j]);
    }
    kmer
}

/// Draw a letter index from a row of five raw counts; `None` when the row
/// is empty.
fn pick_counts(rng: &mut Xoshiro256StarStar, row: &[u64]) -> Option<usize> {
    let c0 = row[0];
    let c1 = c0 + row[1];
    let c2 = c1 + row[2];
    let c3 = c2 + row[3];
    let c4 = c3 + row[4];
    if c4 == 0 {
        return None;
    }
    let draw = rng.gen_range(0..c4);
    Some(if draw < c0 {
        0
    } else if draw < c1 {
        1
    } else if draw < c2 {
        2
    } else if draw < c3 {
        3
    } else {
        4
    })
}

/// Draw a letter index from a cumulative row; an empty row falls back to a
/// uniform standard letter.
fn pick_cumulative(rng: &mut Xoshiro256StarStar, row: &[u64]) -> usize {
    if row[4] == 0 {
        return rng.gen_range(0..4);
    }
    let draw = rng.gen_range(0..row[4]);
    if draw < row[0] {
        0
    } else if draw < row[1] {
        1
    } else if draw < row[2] {
        2
    } else if draw < row[3] {
        3
    } else {
        4
    }
}

/// Reusable shuffling state: the RNG plus the k-mer and trail tables for
/// the table-driven methods.
pub struct Shuffler {
    cfg: ShuffleConfig,
    rng: Xoshiro256StarStar,
    /// Edge multiplicities, one slot per k-mer (5^k).
    kmer_tab: Vec<u64>,
    /// Designated exit edge per (k-1)-mer vertex on the arborescence.
    exit_edge: Vec<u64>,
    /// Base edge-table offset of the vertex a given edge leads to.
    vertex_from_edge: Vec<u64>,
    /// Vertices already routed toward the trail terminal.
    routed: Vec<bool>,
    markov_warned: bool,
}

impl Shuffler {
    pub fn new(cfg: ShuffleConfig) -> Result<Self> {
        if cfg.k == 0 {
            return Err(ScanError::Config("k must be a positive integer".into()));
        }
        if cfg.method != ShuffleMethod::Linear && cfg.k > MAX_SHUFFLE_K {
            return Err(ScanError::Config(format!(
                "k={} exceeds allowed max for Euler/Markov (max={MAX_SHUFFLE_K})",
                cfg.k
            )));
        }
        let table_len = if cfg.k > 1 && cfg.method != ShuffleMethod::Linear {
            POW5[cfg.k] as usize
        } else {
            0
        };
        let vertex_len = if table_len > 0 && cfg.method == ShuffleMethod::Euler {
            POW5[cfg.k - 1] as usize
        } else {
            0
        };
        let rng = Xoshiro256StarStar::seed_from_u64(cfg.seed);
        Ok(Shuffler {
            cfg,
            rng,
            kmer_tab: vec![0; table_len],
            exit_edge: vec![0; vertex_len],
            vertex_from_edge: vec![0; vertex_len],
            routed: vec![false; vertex_len],
            markov_warned: false,
        })
    }

    /// Re-seed the generator from the configured seed (the `-R` behavior).
    pub fn reseed(&mut self) {
        self.rng = Xoshiro256StarStar::seed_from_u64(self.cfg.seed);
    }

    fn letters(&self) -> &'static [u8; 5] {
        if self.cfg.rna_out {
            &INDEX_TO_RNA
        } else {
            &INDEX_TO_DNA
        }
    }

    /// Shuffle `seq` in place. Returns `false` (leaving the sequence
    /// untouched) when it is too short for the configured k.
    pub fn shuffle(&mut self, seq: &mut [u8]) -> bool {
        if seq.len() < self.cfg.k * 2 {
            info!(
                "sequence too short to shuffle (size={}, k={})",
                seq.len(),
                self.cfg.k
            );
            return false;
        }
        if self.cfg.k == 1 {
            self.fisher_yates(seq);
            return true;
        }
        match self.cfg.method {
            ShuffleMethod::Linear => self.linear(seq),
            ShuffleMethod::Markov => {
                if seq.len() < 100 && !self.markov_warned {
                    info!("Markov shuffling of small sequences may generate homopolymer repeats");
                    self.markov_warned = true;
                }
                self.count_kmers(seq);
                self.markov(seq);
            }
            ShuffleMethod::Euler => {
                self.count_kmers(seq);
                self.euler(seq);
            }
        }
        true
    }

    fn count_kmers(&mut self, seq: &[u8]) {
        let k = self.cfg.k;
        self.kmer_tab.fill(0);
        for offset in 0..=seq.len() - k {
            self.kmer_tab[kmer_at(seq, k, offset)] += 1;
        }
    }

    fn fisher_yates(&mut self, seq: &mut [u8]) {
        for i in 0..seq.len().saturating_sub(1) {
            let j = self.rng.gen_range(i..seq.len());
            seq.swap(i, j);
        }
    }

    /// Swap each k-block with a random later k-aligned block. O(n) and
    /// only approximately k-mer preserving.
    fn linear(&mut self, seq: &mut [u8]) {
        let k = self.cfg.k;
        let len = seq.len();
        let mut i = 0;
        while i < len - 2 * k + 1 {
            let draw = self.rng.gen_range(0..len - 2 * k + 1 - i);
            let other = i + k + draw - draw % k;
            for a in 0..k {
                seq.swap(i + a, other + a);
            }
            i += k;
        }
    }

    /// Regenerate the tail of the sequence by drawing each next letter
    /// from the empirical (k-1)-mer transition distribution. The first
    /// k-1 letters are kept (canonicalized through the alphabet).
    fn markov(&mut self, seq: &mut [u8]) {
        let k = self.cfg.k;
        let letters = self.letters();
        for row in self.kmer_tab.chunks_exact_mut(5) {
            row[1] += row[0];
            row[2] += row[1];
            row[3] += row[2];
            row[4] += row[3];
        }
        for i in 0..k - 1 {
            seq[i] = letters[base_index(seq[i])];
        }
        for i in k - 1..seq.len() {
            let mut prefix = 0;
            for j in 1..k {
                prefix += base_index(seq[i - j]) * POW5[j] as usize;
            }
            let row = &self.kmer_tab[prefix..prefix + 5];
            seq[i] = letters[pick_cumulative(&mut self.rng, row)];
        }
    }

    /// Random Eulerian trail with the same k-mer composition as the input.
    ///
    /// The input's last k-mer stays the trail's final edge and its terminal
    /// (k-1)-mer the root of the arborescence: every vertex gets a
    /// designated exit edge toward the root via random greedy walks, those
    /// exits are reserved for last use, and the trail then consumes the
    /// remaining edges by uniform draws.
    fn euler(&mut self, seq: &mut [u8]) {
        let k = self.cfg.k;
        let len = seq.len();
        let letters = self.letters();
        let n_vertices = POW5[k - 1] as usize;
        for i in 0..k - 1 {
            seq[i] = letters[base_index(seq[i])];
        }
        seq[len - 1] = letters[base_index(seq[len - 1])];

        // The final edge leaves the pool up front; its target vertex is
        // the trail terminal.
        let last_edge = kmer_at(seq, k, len - k);
        self.kmer_tab[last_edge] -= 1;

        self.exit_edge.fill(0);
        self.routed.fill(false);
        for vertex in 0..n_vertices {
            let row = &self.kmer_tab[vertex * 5..vertex * 5 + 5];
            if row.iter().sum::<u64>() == 0 {
                self.routed[vertex] = true;
            }
        }
        self.routed[kmer_at(seq, k - 1, len - k + 1)] = true;

        // vertex_from_edge[v] is the edge-table offset of v's suffix
        // (k-2)-mer; adding the chosen letter index yields the next vertex.
        if k > 2 {
            let wrap = POW5[k - 2] as usize;
            for vertex in 0..n_vertices {
                self.vertex_from_edge[vertex] = ((vertex % wrap) * 5) as u64;
            }
        } else {
            self.vertex_from_edge.fill(0);
        }

        // Random greedy walks from every vertex toward the routed set;
        // the picked edges form an arborescence rooted at the terminal.
        for start in 0..n_vertices {
            let mut vertex = start;
            while !self.routed[vertex] {
                let row = &self.kmer_tab[vertex * 5..vertex * 5 + 5];
                let picked = pick_counts(&mut self.rng, row)
                    .expect("unrouted vertex always has outgoing edges");
                self.exit_edge[vertex] = picked as u64;
                vertex = picked + self.vertex_from_edge[vertex] as usize;
            }
            let mut vertex = start;
            while !self.routed[vertex] {
                self.routed[vertex] = true;
                vertex = self.exit_edge[vertex] as usize + self.vertex_from_edge[vertex] as usize;
            }
        }

        // Reserve the exit edges for last use at each vertex.
        for vertex in 0..n_vertices {
            let edge = vertex * 5 + self.exit_edge[vertex] as usize;
            if edge != last_edge && self.kmer_tab[edge] > 0 {
                self.kmer_tab[edge] -= 1;
            }
        }

        // Walk the trail from the input's first (k-1)-mer, consuming free
        // edges first and leaving through the exit edge once exhausted.
        for i in k - 2..len - 2 {
            let vertex = kmer_at(seq, k - 1, i - k + 2);
            let row_start = vertex * 5;
            let next = match pick_counts(&mut self.rng, &self.kmer_tab[row_start..row_start + 5]) {
                Some(edge) => {
                    self.kmer_tab[row_start + edge] -= 1;
                    edge
                }
                None => self.exit_edge[vertex] as usize,
            };
            seq[i + 1] = letters[next];
        }
    }
}

/// Write one FASTA record, wrapping the sequence to 60 columns. A non-zero
/// repeat number is appended to the header.
pub fn write_fasta<W: Write>(
    out: &mut W,
    id: &str,
    desc: Option<&str>,
    seq: &[u8],
    repeat: u32,
) -> Result<()> {
    match (desc, repeat) {
        (Some(desc), 0) => writeln!(out, ">{id} {desc}")?,
        (Some(desc), n) => writeln!(out, ">{id} {desc}-{n}")?,
        (None, 0) => writeln!(out, ">{id}")?,
        (None, n) => writeln!(out, ">{id}-{n}")?,
    }
    for chunk in seq.chunks(FASTA_LINE_LEN) {
        out.write_all(chunk)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Shuffle every sequence of the source into `out` as FASTA (FASTQ input
/// is down-converted). Returns the number of input sequences.
pub fn run_shuffle<W: Write>(cfg: &ShuffleConfig, source: &SeqSource, out: &mut W) -> Result<u64> {
    let mut shuffler = Shuffler::new(cfg.clone())?;
    let started = Instant::now();
    let mut n_seqs = 0u64;
    for record in open_fastx(source)? {
        let record = record?;
        n_seqs += 1;
        debug!("shuffling sequence #{n_seqs}: {}", record.id);
        if log::log_enabled!(log::Level::Debug) {
            let mut counts = CharCounts::new();
            counts.tally(&record.seq);
            let gaps = counts.count(b'.') + counts.count(b'-');
            let unknowns = record.seq.len() as u64 - gaps - counts.standard();
            debug!(
                "  sequence size: {} ({:.2}% non-standard), GC content: {:.2}%",
                record.seq.len(),
                100.0 * unknowns as f64 / record.seq.len().max(1) as f64,
                counts.gc_fraction() * 100.0
            );
        }
        if cfg.reseed {
            shuffler.reseed();
        }
        let mut seq = record.seq;
        for repeat in 0..=cfg.repeats {
            if !shuffler.shuffle(&mut seq) {
                break;
            }
            write_fasta(out, &record.id, record.desc.as_deref(), &seq, repeat)?;
        }
    }
    if n_seqs == 0 {
        return Err(ScanError::Sequence(
            "failed to read any sequences from input".into(),
        ));
    }
    out.flush()?;
    info!("shuffled {n_seqs} sequence(s) in {:.2?}", started.elapsed());
    Ok(n_seqs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn counts(seq: &[u8], k: usize) -> HashMap<usize, u64> {
        let mut table = HashMap::new();
        for offset in 0..=seq.len() - k {
            *table.entry(kmer_at(seq, k, offset)).or_insert(0) += 1;
        }
        table
    }

    fn config(k: usize, method: ShuffleMethod) -> ShuffleConfig {
        ShuffleConfig {
            k,
            method,
            ..ShuffleConfig::default()
        }
    }

    #[test]
    fn euler_preserves_dinucleotide_counts() {
        let input = b"ACGTACGTACGT".to_vec();
        let mut seq = input.clone();
        let mut shuffler = Shuffler::new(config(2, ShuffleMethod::Euler)).unwrap();
        assert!(shuffler.shuffle(&mut seq));
        assert_eq!(seq.len(), input.len());
        assert_eq!(counts(&input, 2), counts(&seq, 2));
    }

    #[test]
    fn euler_preserves_higher_order_counts_with_ns() {
        let input = b"ACGTNNACGTTTTGGGCACACGTNACGATCGATTACA".to_vec();
        for k in [2, 3, 4] {
            let mut seq = input.clone();
            let mut shuffler = Shuffler::new(config(k, ShuffleMethod::Euler)).unwrap();
            assert!(shuffler.shuffle(&mut seq));
            assert_eq!(counts(&input, k), counts(&seq, k), "k={k}");
        }
    }

    #[test]
    fn euler_is_deterministic_for_a_seed() {
        let input = b"ACGTACGTACGTTTGGAACC".to_vec();
        let run = || {
            let mut seq = input.clone();
            let mut shuffler = Shuffler::new(config(3, ShuffleMethod::Euler)).unwrap();
            shuffler.shuffle(&mut seq);
            seq
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn reseeding_replays_the_stream() {
        let input = b"ACGTACGTACGTTTGGAACC".to_vec();
        let mut shuffler = Shuffler::new(config(3, ShuffleMethod::Euler)).unwrap();
        let mut first = input.clone();
        shuffler.shuffle(&mut first);
        shuffler.reseed();
        let mut second = input.clone();
        shuffler.shuffle(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn euler_keeps_trail_endpoints() {
        let input = b"TAGTACGTACGTACGGGTCA".to_vec();
        let mut seq = input.clone();
        let mut shuffler = Shuffler::new(config(3, ShuffleMethod::Euler)).unwrap();
        shuffler.shuffle(&mut seq);
        assert_eq!(&seq[..2], &input[..2]);
        assert_eq!(seq[seq.len() - 1], input[input.len() - 1]);
    }

    #[test]
    fn markov_keeps_prefix_and_length() {
        let input = b"ACGTACGTACGTTTGGAACCACGTACGT".to_vec();
        let mut seq = input.clone();
        let mut shuffler = Shuffler::new(config(3, ShuffleMethod::Markov)).unwrap();
        assert!(shuffler.shuffle(&mut seq));
        assert_eq!(seq.len(), input.len());
        assert_eq!(&seq[..2], &input[..2]);
        assert!(seq.iter().all(|b| b"ACGTN".contains(b)));
    }

    #[test]
    fn fisher_yates_is_a_permutation() {
        let input = b"AAACCCGGGTTTN".to_vec();
        let mut seq = input.clone();
        let mut shuffler = Shuffler::new(config(1, ShuffleMethod::Euler)).unwrap();
        assert!(shuffler.shuffle(&mut seq));
        let mut sorted_in = input.clone();
        let mut sorted_out = seq.clone();
        sorted_in.sort_unstable();
        sorted_out.sort_unstable();
        assert_eq!(sorted_in, sorted_out);
    }

    #[test]
    fn linear_preserves_byte_multiset() {
        let input = b"ACGTACGTACGTACGTACGTA".to_vec();
        let mut seq = input.clone();
        let mut shuffler = Shuffler::new(config(4, ShuffleMethod::Linear)).unwrap();
        assert!(shuffler.shuffle(&mut seq));
        let mut sorted_in = input.clone();
        let mut sorted_out = seq.clone();
        sorted_in.sort_unstable();
        sorted_out.sort_unstable();
        assert_eq!(sorted_in, sorted_out);
    }

    #[test]
    fn rna_output_uses_u() {
        let input = b"ACGTACGTACGTACGT".to_vec();
        let mut seq = input.clone();
        let cfg = ShuffleConfig {
            rna_out: true,
            ..config(2, ShuffleMethod::Euler)
        };
        let mut shuffler = Shuffler::new(cfg).unwrap();
        shuffler.shuffle(&mut seq);
        assert!(seq.contains(&b'U'));
        assert!(!seq.contains(&b'T'));
    }

    #[test]
    fn too_short_sequences_are_skipped() {
        let mut seq = b"ACGT".to_vec();
        let mut shuffler = Shuffler::new(config(3, ShuffleMethod::Euler)).unwrap();
        assert!(!shuffler.shuffle(&mut seq));
        assert_eq!(seq, b"ACGT");
    }

    #[test]
    fn k_limit_is_enforced_for_table_methods() {
        assert!(Shuffler::new(config(10, ShuffleMethod::Euler)).is_err());
        assert!(Shuffler::new(config(10, ShuffleMethod::Linear)).is_ok());
        assert!(Shuffler::new(config(0, ShuffleMethod::Euler)).is_err());
    }

    #[test]
    fn fasta_wrapping_and_repeat_naming() {
        let mut out = Vec::new();
        let seq = vec![b'A'; 130];
        write_fasta(&mut out, "seq1", None, &seq, 0).unwrap();
        write_fasta(&mut out, "seq1", Some("note"), &seq[..4], 2).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ">seq1");
        assert_eq!(lines[1].len(), 60);
        assert_eq!(lines[2].len(), 60);
        assert_eq!(lines[3].len(), 10);
        assert_eq!(lines[4], ">seq1 note-2");
        assert_eq!(lines[5], "AAAA");
    }
}
