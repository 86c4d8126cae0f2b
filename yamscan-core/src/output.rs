//! Output headers, float formatting, and diagnostic summaries.

use std::io::Write;

use crate::bed::{BedFile, BedRegion};
use crate::config::ScanConfig;
use crate::constants::{PWM_INT_MULTIPLIER, VERSION};
use crate::motif::dist::score_to_pvalue;
use crate::motif::Motif;
use crate::sequence::{CharCounts, SequenceSet};
use crate::types::Result;

/// Render a float with at most `sig` significant digits, switching to
/// exponential notation for very small or very large magnitudes (the
/// shortest-form behavior of C's `%g`).
pub fn format_sig(value: f64, sig: usize) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let exponent = value.abs().log10().floor() as i32;
    if exponent < -4 || exponent >= sig as i32 {
        let text = format!("{:.*e}", sig.saturating_sub(1), value);
        // strip trailing zeros from the mantissa: "3.900000e-7" -> "3.9e-7"
        match text.split_once('e') {
            Some((mantissa, exp)) => {
                let mantissa = mantissa.trim_end_matches('0').trim_end_matches('.');
                format!("{mantissa}e{exp}")
            }
            None => text,
        }
    } else {
        let decimals = (sig as i32 - 1 - exponent).max(0) as usize;
        let text = format!("{value:.decimals$}");
        if text.contains('.') {
            text.trim_end_matches('0').trim_end_matches('.').to_owned()
        } else {
            text
        }
    }
}

/// Largest conceivable number of hit records given the inputs; consumed by
/// downstream q-value computation.
pub fn max_possible_hits(motifs: &[Motif], sizes: &[u64], scan_rc: bool) -> u64 {
    let mut total = 0u64;
    for motif in motifs {
        for &size in sizes {
            total += (size + 1).saturating_sub(motif.width() as u64);
        }
    }
    if scan_rc {
        total *= 2
    }
    total
}

/// Write the three header lines preceding hit records.
pub fn write_scan_header<W: Write>(
    out: &mut W,
    command_line: &str,
    motifs: &[Motif],
    seqs: &SequenceSet,
    bed: Option<&BedFile>,
    cfg: &ScanConfig,
    dedupped: bool,
) -> Result<()> {
    writeln!(out, "##yamscan v{VERSION} [ {command_line} ]")?;
    let motif_size: u64 = motifs.iter().map(|m| m.width() as u64).sum();
    let dedup_field = if dedupped { " Dedupped=true" } else { "" };
    match bed {
        Some(bed) => {
            writeln!(
                out,
                "##MotifCount={} MotifSize={} BedCount={} BedSize={} SeqCount={} SeqSize={} GC={:.2}% Ns={}{}",
                motifs.len(),
                motif_size,
                bed.regions.len(),
                bed.covered_bases(),
                seqs.len(),
                seqs.stats.total_bases,
                seqs.stats.gc_pct,
                seqs.stats.unknowns,
                dedup_field,
            )?;
            writeln!(
                out,
                "##bed_range\tbed_name\tseq_name\tstart\tend\tstrand\tmotif\tpvalue\tscore\tscore_pct\tmatch"
            )?;
        }
        None => {
            writeln!(
                out,
                "##MotifCount={} MotifSize={} SeqCount={} SeqSize={} GC={:.2}% Ns={} MaxPossibleHits={}{}",
                motifs.len(),
                motif_size,
                seqs.len(),
                seqs.stats.total_bases,
                seqs.stats.gc_pct,
                seqs.stats.unknowns,
                max_possible_hits(motifs, &seqs.sizes, cfg.scan_rc),
                dedup_field,
            )?;
            writeln!(
                out,
                "##seq_name\tstart\tend\tstrand\tmotif\tpvalue\tscore\tscore_pct\tmatch"
            )?;
        }
    }
    Ok(())
}

/// Human-readable dump of one motif: the PWM at 1/1000 scale plus sample
/// score-to-p-value pairs. Used when no sequences are supplied.
pub fn write_motif_summary<W: Write>(
    out: &mut W,
    motif: &Motif,
    number: u64,
    cdf: &[f64],
) -> Result<()> {
    writeln!(out, "Motif: {} (N{} L{})", motif.name, number, motif.file_line)?;
    let max = motif.max_score as f64 / PWM_INT_MULTIPLIER;
    match motif.threshold {
        Some(threshold) => writeln!(
            out,
            "MaxScore={max:.2}\tThreshold={:.2}",
            threshold as f64 / PWM_INT_MULTIPLIER
        )?,
        None => writeln!(out, "MaxScore={max:.2}\tThreshold=[exceeds max]")?,
    }
    writeln!(out, "Motif PWM:\n\tA\tC\tG\tT")?;
    for pos in 0..motif.width() {
        writeln!(
            out,
            "{}:\t{:.2}\t{:.2}\t{:.2}\t{:.2}",
            pos + 1,
            motif.score_at(pos, 0) as f64 / PWM_INT_MULTIPLIER,
            motif.score_at(pos, 1) as f64 / PWM_INT_MULTIPLIER,
            motif.score_at(pos, 2) as f64 / PWM_INT_MULTIPLIER,
            motif.score_at(pos, 3) as f64 / PWM_INT_MULTIPLIER,
        )?;
    }
    writeln!(
        out,
        "Score={:.2}\t-->     p=1",
        motif.min_score as f64 / PWM_INT_MULTIPLIER
    )?;
    for score in [motif.min_score / 2, 0, motif.max_score / 2, motif.max_score] {
        writeln!(
            out,
            "Score={:.2}\t-->     p={}",
            score as f64 / PWM_INT_MULTIPLIER,
            format_sig(score_to_pvalue(motif, cdf, score), 2)
        )?;
    }
    Ok(())
}

pub fn write_seq_stats_header<W: Write>(out: &mut W, bed: bool) -> Result<()> {
    if bed {
        writeln!(out, "##bed_range\tbed_name\tseq_num\tseq_name\tsize\tgc_pct\tn_count")?;
    } else {
        writeln!(out, "##seq_num\tseq_name\tsize\tgc_pct\tn_count")?;
    }
    Ok(())
}

fn write_gc<W: Write>(out: &mut W, counts: &CharCounts) -> Result<()> {
    let gc = counts.gc_fraction() * 100.0;
    if gc.is_finite() {
        write!(out, "{gc:.2}\t")?;
    } else {
        write!(out, "nan\t")?;
    }
    Ok(())
}

/// One row of the sequence-stats listing (`-s` without motifs).
pub fn write_seq_stats_row<W: Write>(
    out: &mut W,
    seq_num: usize,
    name: &str,
    seq: &[u8],
) -> Result<()> {
    let mut counts = CharCounts::new();
    counts.tally(seq);
    write!(out, "{}\t{name}\t{}\t", seq_num + 1, seq.len())?;
    if seq.is_empty() {
        write!(out, "nan\t")?;
    } else {
        write_gc(out, &counts)?;
    }
    writeln!(out, "{}", seq.len() as u64 - counts.standard())?;
    Ok(())
}

/// BED-restricted variant of the stats row, computed over the range only.
pub fn write_bed_seq_stats_row<W: Write>(
    out: &mut W,
    region: &BedRegion,
    seq_name: &str,
    seq: &[u8],
) -> Result<()> {
    let slice = &seq[region.start as usize..region.end as usize];
    let mut counts = CharCounts::new();
    counts.tally(slice);
    write!(
        out,
        "{}:{}-{}({})\t{}\t{}\t{seq_name}\t{}\t",
        region.seq_name,
        region.start + 1,
        region.end,
        region.strand_char(),
        region.name,
        region.seq_index + 1,
        slice.len(),
    )?;
    write_gc(out, &counts)?;
    writeln!(out, "{}", slice.len() as u64 - counts.standard())?;
    Ok(())
}
