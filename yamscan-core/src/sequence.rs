//! Sequence input: FASTA/FASTQ records over plain or gzip-compressed
//! streams, plus the base accounting used for stats and warnings.
//!
//! Two residency modes exist. In-memory mode keeps every sequence resident
//! for the scan phase; low-memory mode performs a peek pass that records
//! only names and lengths, then re-reads the file once per motif.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use bio::io::{fasta, fastq};
use flate2::read::MultiGzDecoder;
use log::{info, warn};

use crate::constants::SEQ_NAME_MAX_CHAR;
use crate::types::{Result, ScanError};

/// Where sequences are read from. Standard input cannot be re-read, so the
/// driver forces in-memory mode for it.
#[derive(Debug, Clone)]
pub enum SeqSource {
    Path(PathBuf),
    Stdin,
}

impl SeqSource {
    /// Interpret `-` as standard input.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            SeqSource::Stdin
        } else {
            SeqSource::Path(PathBuf::from(arg))
        }
    }

    pub fn is_stdin(&self) -> bool {
        matches!(self, SeqSource::Stdin)
    }

    /// Open the source, transparently decompressing gzip streams detected
    /// by their magic bytes.
    pub fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        match self {
            SeqSource::Path(path) => {
                let file = File::open(path).map_err(|e| {
                    ScanError::Sequence(format!("failed to open \"{}\" [{e}]", path.display()))
                })?;
                maybe_gzip(BufReader::new(file))
            }
            SeqSource::Stdin => maybe_gzip(BufReader::new(io::stdin())),
        }
    }
}

fn maybe_gzip<R: BufRead + Send + 'static>(mut reader: R) -> Result<Box<dyn BufRead + Send>> {
    let magic = reader.fill_buf()?;
    if magic.len() >= 2 && magic[0] == 0x1f && magic[1] == 0x8b {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// One record pulled from a FASTA or FASTQ stream.
#[derive(Debug, Clone)]
pub struct FastxRecord {
    pub id: String,
    pub desc: Option<String>,
    pub seq: Vec<u8>,
}

impl FastxRecord {
    /// The record's display name: the id alone when trimming (or when no
    /// comment is present), otherwise id and comment joined by a space.
    pub fn display_name(&self, trim_names: bool) -> Result<String> {
        let name = match (&self.desc, trim_names) {
            (Some(desc), false) => format!("{} {}", self.id, desc),
            _ => self.id.clone(),
        };
        if name.len() > SEQ_NAME_MAX_CHAR {
            return Err(ScanError::Sequence(format!(
                "sequence name is too large ({}>{SEQ_NAME_MAX_CHAR})",
                name.len()
            )));
        }
        Ok(name)
    }
}

/// Pull-based record iterator over either FASTA or FASTQ input.
pub enum FastxRecords {
    Fasta(fasta::Records<Box<dyn BufRead + Send>>),
    Fastq(fastq::Records<Box<dyn BufRead + Send>>),
}

impl Iterator for FastxRecords {
    type Item = Result<FastxRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            FastxRecords::Fasta(records) => records.next().map(|r| {
                r.map(|rec| FastxRecord {
                    id: rec.id().to_owned(),
                    desc: rec.desc().map(str::to_owned),
                    seq: rec.seq().to_owned(),
                })
                .map_err(|e| ScanError::Sequence(format!("failed to read input: {e}")))
            }),
            FastxRecords::Fastq(records) => records.next().map(|r| {
                r.map(|rec| FastxRecord {
                    id: rec.id().to_owned(),
                    desc: rec.desc().map(str::to_owned),
                    seq: rec.seq().to_owned(),
                })
                .map_err(|e| ScanError::Sequence(format!("failed to parse FASTQ input: {e}")))
            }),
        }
    }
}

/// Open a source and wrap it in the right record iterator, sniffing the
/// format from the first content byte (`>` FASTA, `@` FASTQ).
pub fn open_fastx(source: &SeqSource) -> Result<FastxRecords> {
    let mut reader = source.open()?;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Err(ScanError::Sequence(
                "failed to read any sequences from input".into(),
            ));
        }
        match buf.iter().position(|b| !b.is_ascii_whitespace()) {
            Some(pos) => {
                let first = buf[pos];
                reader.consume(pos);
                return match first {
                    b'>' => Ok(FastxRecords::Fasta(
                        fasta::Reader::from_bufread(reader).records(),
                    )),
                    b'@' => Ok(FastxRecords::Fastq(
                        fastq::Reader::from_bufread(reader).records(),
                    )),
                    other => Err(ScanError::Sequence(format!(
                        "input does not look like FASTA or FASTQ (starts with '{}')",
                        other as char
                    ))),
                };
            }
            None => {
                let len = buf.len();
                reader.consume(len);
            }
        }
    }
}

/// Raw byte tallies over sequence data.
#[derive(Debug, Clone)]
pub struct CharCounts([u64; 256]);

impl Default for CharCounts {
    fn default() -> Self {
        CharCounts([0; 256])
    }
}

impl CharCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tally(&mut self, seq: &[u8]) {
        for &b in seq {
            self.0[b as usize] += 1;
        }
    }

    pub fn count(&self, b: u8) -> u64 {
        self.0[b as usize]
    }

    /// Count of standard DNA/RNA letters in either case.
    pub fn standard(&self) -> u64 {
        b"AaCcGgTtUu".iter().map(|&b| self.count(b)).sum()
    }

    /// GC fraction among standard letters.
    pub fn gc_fraction(&self) -> f64 {
        let gc: u64 = b"GgCc".iter().map(|&b| self.count(b)).sum();
        gc as f64 / self.standard() as f64
    }
}

/// Aggregate statistics over all loaded (or peeked) sequences.
#[derive(Debug, Clone, Default)]
pub struct SeqStats {
    pub total_bases: u64,
    pub unknowns: u64,
    pub gc_pct: f64,
}

/// The sequence side of a scan: names, sizes, stats, and (in-memory mode)
/// the base data itself.
#[derive(Debug)]
pub struct SequenceSet {
    pub names: Vec<String>,
    pub sizes: Vec<u64>,
    /// Empty in low-memory mode.
    pub data: Vec<Vec<u8>>,
    pub stats: SeqStats,
}

impl SequenceSet {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Read every record from the source, keeping the base data only when
/// `keep_data` is set (in-memory mode). Fatal when the input yields no
/// sequences, no bases, or no standard bases at all.
pub fn load_sequences(
    source: &SeqSource,
    trim_names: bool,
    keep_data: bool,
) -> Result<SequenceSet> {
    let mut names = Vec::new();
    let mut sizes = Vec::new();
    let mut data = Vec::new();
    let mut counts = CharCounts::new();
    for record in open_fastx(source)? {
        let record = record?;
        names.push(record.display_name(trim_names)?);
        sizes.push(record.seq.len() as u64);
        counts.tally(&record.seq);
        if keep_data {
            data.push(record.seq);
        }
    }
    if names.is_empty() {
        return Err(ScanError::Sequence(
            "failed to read any sequences from input".into(),
        ));
    }
    let total_bases: u64 = sizes.iter().sum();
    if total_bases == 0 {
        return Err(ScanError::Sequence("only encountered empty sequences".into()));
    }
    let unknowns = total_bases - counts.standard();
    if unknowns == total_bases {
        return Err(ScanError::Sequence(
            "failed to read any standard DNA/RNA bases".into(),
        ));
    }
    let unknown_pct = 100.0 * unknowns as f64 / total_bases as f64;
    if unknown_pct >= 90.0 {
        warn!("non-standard base count is extremely high ({unknown_pct:.2}%)");
    } else if unknown_pct >= 50.0 {
        info!("non-standard base count is very high ({unknown_pct:.2}%)");
    } else if unknown_pct >= 10.0 {
        info!("non-standard base count seems high ({unknown_pct:.2}%)");
    }
    if counts.count(b' ') > 0 {
        info!(
            "found spaces ({}) in sequences, these will be treated as gaps",
            counts.count(b' ')
        );
    }
    let stats = SeqStats {
        total_bases,
        unknowns,
        gc_pct: counts.gc_fraction() * 100.0,
    };
    info!(
        "{} {} base(s) across {} sequence(s) (GC={:.2}%)",
        if keep_data { "loaded" } else { "found" },
        stats.total_bases,
        names.len(),
        stats.gc_pct
    );
    Ok(SequenceSet {
        names,
        sizes,
        data,
        stats,
    })
}

/// Re-read the source, handing each record's bases to `visit` in file
/// order. Used by the low-memory scan path once per motif; the enumeration
/// order necessarily matches the initial peek since it is the same file.
pub fn for_each_sequence(
    source: &SeqSource,
    mut visit: impl FnMut(usize, &[u8]) -> Result<()>,
) -> Result<()> {
    for (index, record) in open_fastx(source)?.enumerate() {
        let record = record?;
        visit(index, &record.seq)?;
    }
    Ok(())
}
