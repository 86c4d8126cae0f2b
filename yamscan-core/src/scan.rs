//! The inner scan loops: slide a motif across a sequence (or a BED range)
//! and emit records for windows scoring at or above the threshold.

use std::fmt::Write as _;
use std::io::Write;
use std::sync::Mutex;

use bio::bio_types::strand::Strand;

use crate::alphabet::{BASE_INDEX, MASK_INDEX};
use crate::bed::BedRegion;
use crate::config::ScanConfig;
use crate::constants::PWM_INT_MULTIPLIER;
use crate::motif::dist::score_to_pvalue;
use crate::motif::Motif;
use crate::output::format_sig;
use crate::types::Result;

/// Destination of formatted hit records. Each record arrives as one
/// complete line, so the shared-writer implementation stays atomic per
/// record.
pub trait RecordSink {
    fn record(&mut self, line: &str) -> Result<()>;
}

/// Direct single-threaded sink.
pub struct StreamSink<W: Write>(pub W);

impl<W: Write> RecordSink for StreamSink<W> {
    fn record(&mut self, line: &str) -> Result<()> {
        self.0.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Sink shared between scanning workers; one lock acquisition per record.
pub struct SharedSink<'a, W: Write>(pub &'a Mutex<W>);

impl<W: Write> RecordSink for SharedSink<'_, W> {
    fn record(&mut self, line: &str) -> Result<()> {
        let mut out = self.0.lock().expect("poisoned output lock");
        out.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Everything the hit formatter needs besides the window itself.
pub struct HitContext<'a> {
    pub motif: &'a Motif,
    pub cdf: &'a [f64],
    pub seq_name: &'a str,
    pub region: Option<&'a BedRegion>,
    /// Consensus-mode hits are exact matches; their p-value column is
    /// reported as 1.
    pub is_consensus: bool,
}

fn emit(
    ctx: &HitContext<'_>,
    line: &mut String,
    sink: &mut impl RecordSink,
    seq: &[u8],
    offset: usize,
    strand: char,
    score: i32,
) -> Result<()> {
    line.clear();
    if let Some(region) = ctx.region {
        let _ = write!(
            line,
            "{}:{}-{}({})\t{}\t",
            ctx.seq_name,
            region.start + 1,
            region.end,
            region.strand_char(),
            region.name,
        );
    }
    let pvalue = if ctx.is_consensus {
        1.0
    } else {
        score_to_pvalue(ctx.motif, ctx.cdf, score)
    };
    let width = ctx.motif.width();
    let matched = String::from_utf8_lossy(&seq[offset..offset + width]);
    let _ = writeln!(
        line,
        "{}\t{}\t{}\t{strand}\t{}\t{}\t{:.3}\t{:.1}\t{matched}",
        ctx.seq_name,
        offset + 1,
        offset + width,
        ctx.motif.name,
        format_sig(pvalue, 9),
        score as f64 / PWM_INT_MULTIPLIER,
        100.0 * score as f64 / ctx.motif.max_score as f64,
    );
    sink.record(line)
}

/// Scan one whole sequence with one motif, both strands or forward-only
/// per the configuration. Sequences shorter than the motif and motifs
/// without a reachable threshold produce no records and no errors.
pub fn scan_sequence(
    ctx: &HitContext<'_>,
    seq: &[u8],
    cfg: &ScanConfig,
    sink: &mut impl RecordSink,
) -> Result<()> {
    let Some(threshold) = ctx.motif.threshold else {
        return Ok(());
    };
    let width = ctx.motif.width();
    if seq.len() < width {
        return Ok(());
    }
    let index = if cfg.mask { &MASK_INDEX } else { &BASE_INDEX };
    let cutoff = threshold - 1;
    let mut line = String::new();
    if cfg.scan_rc {
        for offset in 0..=seq.len() - width {
            let (fwd, rc) = ctx.motif.score_both(seq, offset, index);
            if fwd > cutoff {
                emit(ctx, &mut line, sink, seq, offset, '+', fwd)?;
            }
            if rc > cutoff {
                emit(ctx, &mut line, sink, seq, offset, '-', rc)?;
            }
        }
    } else {
        for offset in 0..=seq.len() - width {
            let fwd = ctx.motif.score_fwd(seq, offset, index);
            if fwd > cutoff {
                emit(ctx, &mut line, sink, seq, offset, '+', fwd)?;
            }
        }
    }
    Ok(())
}

/// Scan the sub-range of a sequence named by a BED region, honoring its
/// strand restriction. `ctx.region` must be the same region.
pub fn scan_bed_region(
    ctx: &HitContext<'_>,
    seq: &[u8],
    region: &BedRegion,
    cfg: &ScanConfig,
    sink: &mut impl RecordSink,
) -> Result<()> {
    let Some(threshold) = ctx.motif.threshold else {
        return Ok(());
    };
    let width = ctx.motif.width();
    let start = region.start as usize;
    let end = region.end as usize;
    if end - start < width {
        return Ok(());
    }
    let index = if cfg.mask { &MASK_INDEX } else { &BASE_INDEX };
    let cutoff = threshold - 1;
    let mut line = String::new();
    match region.strand {
        Strand::Unknown => {
            for offset in start..=end - width {
                let (fwd, rc) = ctx.motif.score_both(seq, offset, index);
                if fwd > cutoff {
                    emit(ctx, &mut line, sink, seq, offset, '+', fwd)?;
                }
                if rc > cutoff {
                    emit(ctx, &mut line, sink, seq, offset, '-', rc)?;
                }
            }
        }
        Strand::Forward => {
            for offset in start..=end - width {
                let fwd = ctx.motif.score_fwd(seq, offset, index);
                if fwd > cutoff {
                    emit(ctx, &mut line, sink, seq, offset, '+', fwd)?;
                }
            }
        }
        Strand::Reverse => {
            for offset in start..=end - width {
                let rc = ctx.motif.score_rc(seq, offset, index);
                if rc > cutoff {
                    emit(ctx, &mut line, sink, seq, offset, '-', rc)?;
                }
            }
        }
    }
    Ok(())
}
