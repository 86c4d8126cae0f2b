//! Exact null distribution of motif scores.
//!
//! The total score of a window under the background is the sum of
//! independent per-position categorical draws. Shifting every position so
//! its minimum score is zero turns the support into the integer axis
//! `[0, width * (max-min)]`, over which the PDF is built by iterated
//! convolution, integrated into an upper-tail CDF, and searched for the
//! p-value threshold.

use log::debug;

use crate::background::Background;
use crate::constants::MAX_CDF_SIZE;
use crate::motif::Motif;
use crate::types::{Result, ScanError};

/// Per-worker scratch for the distribution computation.
///
/// Buffers only ever grow; a worker reuses one scratch across all the
/// motifs it owns, sized by the largest CDF among them.
#[derive(Debug, Default)]
pub struct CdfScratch {
    cdf: Vec<f64>,
    tmp: Vec<f64>,
}

impl CdfScratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, len: usize) {
        if self.cdf.len() < len {
            self.cdf.resize(len, 0.0);
            self.tmp.resize(len, 0.0);
        }
    }

    /// The survival function filled by the last [`fill_cdf`] call.
    pub fn cdf(&self, motif: &Motif) -> &[f64] {
        &self.cdf[..motif.cdf_size() as usize]
    }
}

/// Compute the exact PDF of the motif score under `bkg` and integrate it
/// into the upper-tail CDF `P(score - cdf_offset >= index)`.
pub fn fill_cdf(motif: &Motif, bkg: &Background, scratch: &mut CdfScratch) -> Result<()> {
    let size = motif.cdf_size();
    debug!("generating CDF for [{}] (n={})", motif.name, size);
    if size > MAX_CDF_SIZE {
        return Err(ScanError::CdfTooLarge {
            name: motif.name.clone(),
            size,
            max: MAX_CDF_SIZE,
        });
    }
    let size = size as usize;
    scratch.ensure(size);
    let cdf_max = motif.cdf_max() as usize;
    let pdf = &mut scratch.cdf[..size];
    let tmp = &mut scratch.tmp[..size];
    pdf.fill(0.0);
    pdf[0] = 1.0;
    for pos in 0..motif.width() {
        let max_step = pos * cdf_max;
        tmp[..=max_step].copy_from_slice(&pdf[..=max_step]);
        pdf[..max_step + cdf_max + 1].fill(0.0);
        for letter in 0..4 {
            let shift = (motif.score_at(pos, letter) - motif.min) as usize;
            let freq = bkg.freq(letter);
            for step in 0..=max_step {
                pdf[step + shift] += tmp[step] * freq;
            }
        }
    }
    let pdf_sum: f64 = pdf.iter().sum();
    if (pdf_sum - 1.0).abs() > 0.0001 {
        debug!("sum(PDF) != 1.0 for [{}] (sum={pdf_sum:.2})", motif.name);
        for p in pdf.iter_mut() {
            *p /= pdf_sum;
        }
    }
    for index in (0..size - 1).rev() {
        pdf[index] += pdf[index + 1];
    }
    Ok(())
}

/// P-value of an integer score against a filled CDF. Callers guarantee the
/// score lies inside the motif's reachable range.
#[inline]
pub fn score_to_pvalue(motif: &Motif, cdf: &[f64], score: i32) -> f64 {
    cdf[(score - motif.cdf_offset()) as usize]
}

/// Smallest integer score whose upper-tail probability is below `pvalue`,
/// or `None` when even the maximum score is too probable (the motif cannot
/// reach the requested p-value and is skipped during scanning).
pub fn threshold_for(motif: &Motif, cdf: &[f64], pvalue: f64) -> Option<i32> {
    let size = motif.cdf_size() as usize;
    let index = cdf[..size]
        .iter()
        .position(|&p| p < pvalue)
        .unwrap_or(size);
    let min_pvalue = score_to_pvalue(motif, cdf, motif.max_score);
    if min_pvalue / pvalue > 1.0001 {
        debug!(
            "min possible pvalue for [{}] is greater than the threshold, motif will not be scored ({min_pvalue:.3e}>{pvalue:.3e})",
            motif.name
        );
        return None;
    }
    Some(index as i32 + motif.cdf_offset())
}

/// Fill the CDF and set the motif's threshold in one step, honoring the
/// `thresh0` and consensus overrides.
pub fn prepare_motif(
    motif: &mut Motif,
    bkg: &Background,
    pvalue: f64,
    thresh0: bool,
    is_consensus: bool,
    scratch: &mut CdfScratch,
) -> Result<()> {
    fill_cdf(motif, bkg, scratch)?;
    motif.threshold = threshold_for(motif, scratch.cdf(motif), pvalue);
    if thresh0 {
        motif.threshold = Some(0);
    } else if is_consensus {
        motif.threshold = Some(motif.max_score);
    }
    Ok(())
}
