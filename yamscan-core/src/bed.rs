//! BED range parsing and restriction of scanning to sub-ranges.

use std::collections::HashMap;
use std::io::BufRead;

use bio::bio_types::strand::Strand;
use log::{debug, info};

use crate::constants::SEQ_NAME_MAX_CHAR;
use crate::types::{Result, ScanError};

/// One scanning range: a half-open `[start, end)` interval on a named
/// sequence, with an optional range name and strand restriction.
#[derive(Debug, Clone)]
pub struct BedRegion {
    pub seq_name: String,
    /// Zero-based inclusive start.
    pub start: u64,
    /// Zero-based exclusive end.
    pub end: u64,
    pub name: String,
    /// `Unknown` means scan both strands.
    pub strand: Strand,
    /// Index into the sequence set; filled by [`BedFile::resolve`].
    pub seq_index: usize,
}

impl BedRegion {
    pub fn strand_char(&self) -> char {
        match self.strand {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Unknown => '.',
        }
    }
}

/// Parsed BED file plus line accounting for verbose output.
#[derive(Debug)]
pub struct BedFile {
    pub regions: Vec<BedRegion>,
    pub n_lines: u64,
    pub n_comments: u64,
    pub n_empty: u64,
}

impl BedFile {
    /// Total number of bases covered by all ranges.
    pub fn covered_bases(&self) -> u64 {
        self.regions.iter().map(|r| r.end - r.start).sum()
    }

    /// Parse tab-separated BED content. Comment and header lines (`#`,
    /// `browser`, `track`) and empty lines are skipped; at least three
    /// fields are required. Field 5 (score) is ignored.
    pub fn parse<R: BufRead>(reader: R, trim_names: bool) -> Result<Self> {
        let mut regions = Vec::new();
        let mut n_lines = 0u64;
        let mut n_comments = 0u64;
        let mut n_empty = 0u64;
        for line in reader.lines() {
            let line = line?;
            n_lines += 1;
            if line.trim().is_empty() {
                n_empty += 1;
                continue;
            }
            if line.starts_with('#') || line.starts_with("browser") || line.starts_with("track") {
                n_comments += 1;
                continue;
            }
            regions.push(parse_region(&line, n_lines, trim_names)?);
        }
        if regions.is_empty() {
            return Err(ScanError::Config(
                "failed to read any records in bed file".into(),
            ));
        }
        Ok(BedFile {
            regions,
            n_lines,
            n_comments,
            n_empty,
        })
    }

    /// Resolve sequence names to indices through the name index built from
    /// the input sequences. Ranges naming unknown sequences are fatal.
    pub fn resolve(&mut self, index: &HashMap<String, usize>) -> Result<()> {
        for (rank, region) in self.regions.iter_mut().enumerate() {
            region.seq_index = *index.get(&region.seq_name).ok_or_else(|| {
                ScanError::Config(format!(
                    "range #{} in bed file has a sequence name not in input sequences ({})",
                    rank + 1,
                    region.seq_name
                ))
            })?;
        }
        Ok(())
    }

    /// Trim ranges against the actual sequence sizes. A start at or past
    /// the sequence end is fatal; an overhanging end is trimmed with a
    /// warning.
    pub fn clamp_to_sequences(&mut self, sizes: &[u64]) -> Result<()> {
        for (rank, region) in self.regions.iter_mut().enumerate() {
            let size = sizes[region.seq_index];
            if region.start + 1 > size {
                return Err(ScanError::Config(format!(
                    "range #{} ({}-{}) in bed file is out of bounds on sequence {} (size={})",
                    rank + 1,
                    region.start + 1,
                    region.end,
                    region.seq_name,
                    size
                )));
            }
            if region.end > size {
                info!(
                    "trimming range #{} ({}-{}) in bed file on sequence {} (size={})",
                    rank + 1,
                    region.start + 1,
                    region.end,
                    region.seq_name,
                    size
                );
                region.end = size;
            }
        }
        Ok(())
    }

    /// Log range statistics the way verbose mode reports them.
    pub fn log_stats(&self, n_seqs: usize) {
        debug!(
            "{} line(s) total, with {} comment/header and {} empty line(s)",
            self.n_lines, self.n_comments, self.n_empty
        );
        let mut covered = vec![false; n_seqs];
        for region in &self.regions {
            covered[region.seq_index] = true;
        }
        info!(
            "found {} range(s) covering {} base(s) across {} sequence(s)",
            self.regions.len(),
            self.covered_bases(),
            covered.iter().filter(|&&c| c).count()
        );
    }
}

fn parse_region(line: &str, line_num: u64, trim_names: bool) -> Result<BedRegion> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 3 {
        return Err(ScanError::bed(
            line_num,
            format!(
                "encountered line with fewer than 3 tab-separated fields (found {})",
                fields.len()
            ),
        ));
    }
    let strand = if fields.len() >= 6 {
        match fields[5].trim() {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            "." => Strand::Unknown,
            other => {
                return Err(ScanError::bed(
                    line_num,
                    format!("incorrect strand field (found '{other}', need +/-/.)"),
                ));
            }
        }
    } else {
        Strand::Unknown
    };
    let start = parse_coord(fields[1], "start", line_num)?;
    let end = parse_coord(fields[2], "end", line_num)?;
    if start >= end {
        return Err(ScanError::bed(line_num, "has a start >= end value"));
    }
    let name = if fields.len() >= 4 {
        let raw = fields[3];
        if raw.is_empty() {
            return Err(ScanError::bed(line_num, "has an empty range name"));
        }
        field_name(raw, "range", line_num, trim_names)?
    } else {
        ".".to_owned()
    };
    let seq_name = {
        if fields[0].is_empty() {
            return Err(ScanError::bed(line_num, "has an empty sequence name"));
        }
        field_name(fields[0], "sequence", line_num, trim_names)?
    };
    Ok(BedRegion {
        seq_name,
        start,
        end,
        name,
        strand,
        seq_index: 0,
    })
}

fn parse_coord(field: &str, what: &str, line_num: u64) -> Result<u64> {
    // Tolerate stray whitespace inside numeric fields.
    let cleaned: String = field.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(ScanError::bed(line_num, format!("has an empty {what} field")));
    }
    cleaned
        .parse::<u64>()
        .map_err(|_| ScanError::bed(line_num, format!("failed to parse {what} value '{field}'")))
}

fn field_name(raw: &str, what: &str, line_num: u64, trim_names: bool) -> Result<String> {
    if raw.len() > SEQ_NAME_MAX_CHAR {
        return Err(ScanError::bed(
            line_num,
            format!("{what} name is too large ({}>{SEQ_NAME_MAX_CHAR})", raw.len()),
        ));
    }
    let mut name = raw.to_owned();
    if trim_names {
        if let Some(cut) = name.find(' ') {
            name.truncate(cut);
        }
    }
    Ok(name)
}
