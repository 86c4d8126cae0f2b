//! Scan orchestration.
//!
//! Two mutually exclusive drivers: the in-memory path partitions motifs
//! across a fixed set of workers (each owning its CDF scratch), while the
//! low-memory path holds one sequence at a time and re-reads the input file
//! once per motif. Also hosts the motif-print and sequence-stats modes that
//! run when only one of the two inputs is supplied.

use std::io::Write;
use std::sync::Mutex;
use std::time::Instant;

use indicatif::ProgressBar;
use log::{debug, info};

use crate::bed::BedFile;
use crate::config::ScanConfig;
use crate::motif::dist::{prepare_motif, CdfScratch};
use crate::motif::Motif;
use crate::output;
use crate::scan::{scan_bed_region, scan_sequence, HitContext, SharedSink, StreamSink};
use crate::sequence::{for_each_sequence, SeqSource, SequenceSet};
use crate::types::{Result, ScanError};

/// Worker index owning motif `i` out of `n` under `workers` workers.
fn worker_of(index: usize, n_motifs: usize, workers: usize) -> usize {
    (index as f64 / n_motifs as f64 * workers as f64) as usize
}

fn progress_bar(cfg: &ScanConfig, len: u64) -> Option<ProgressBar> {
    cfg.progress.then(|| ProgressBar::new(len))
}

/// Write the output headers and run the configured scanning path.
#[allow(clippy::too_many_arguments)]
pub fn run_scan<W: Write + Send>(
    cfg: &ScanConfig,
    motifs: Vec<Motif>,
    seqs: &SequenceSet,
    bed: Option<&BedFile>,
    source: &SeqSource,
    is_consensus: bool,
    dedupped: bool,
    command_line: &str,
    out: &mut W,
) -> Result<()> {
    output::write_scan_header(out, command_line, &motifs, seqs, bed, cfg, dedupped)?;
    info!("scanning ...");
    let started = Instant::now();
    if cfg.low_mem {
        scan_streaming(cfg, motifs, seqs, bed, source, is_consensus, out)?;
    } else {
        scan_in_memory(cfg, motifs, seqs, bed, is_consensus, out)?;
    }
    out.flush()?;
    info!("needed {:.2?} to scan", started.elapsed());
    Ok(())
}

/// All sequences resident; motifs partitioned across workers. Output
/// records from different motifs may interleave, but records within one
/// motif keep ascending (sequence, offset) order.
fn scan_in_memory<W: Write + Send>(
    cfg: &ScanConfig,
    motifs: Vec<Motif>,
    seqs: &SequenceSet,
    bed: Option<&BedFile>,
    is_consensus: bool,
    out: &mut W,
) -> Result<()> {
    let n_motifs = motifs.len();
    let workers = cfg.threads.clamp(1, n_motifs.max(1));
    let mut buckets: Vec<Vec<Motif>> = (0..workers).map(|_| Vec::new()).collect();
    for (index, motif) in motifs.into_iter().enumerate() {
        buckets[worker_of(index, n_motifs, workers)].push(motif);
    }
    let bar = progress_bar(cfg, n_motifs as u64);
    let sink = Mutex::new(out);
    let failure: Mutex<Option<ScanError>> = Mutex::new(None);
    rayon::scope(|scope| {
        for bucket in buckets {
            let sink = &sink;
            let failure = &failure;
            let bar = bar.as_ref();
            scope.spawn(move |_| {
                let mut scratch = CdfScratch::new();
                for mut motif in bucket {
                    let outcome = scan_one_motif(
                        cfg,
                        &mut motif,
                        seqs,
                        bed,
                        is_consensus,
                        &mut scratch,
                        sink,
                    );
                    if let Some(bar) = bar {
                        bar.inc(1);
                    }
                    if let Err(error) = outcome {
                        let mut slot = failure.lock().expect("poisoned error slot");
                        slot.get_or_insert(error);
                        return;
                    }
                }
            });
        }
    });
    if let Some(bar) = bar {
        bar.finish();
    }
    match failure.into_inner().expect("poisoned error slot") {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

fn scan_one_motif<W: Write>(
    cfg: &ScanConfig,
    motif: &mut Motif,
    seqs: &SequenceSet,
    bed: Option<&BedFile>,
    is_consensus: bool,
    scratch: &mut CdfScratch,
    sink: &Mutex<W>,
) -> Result<()> {
    debug!("scanning motif: {}", motif.name);
    prepare_motif(
        motif,
        &cfg.bkg,
        cfg.pvalue,
        cfg.thresh0,
        is_consensus,
        scratch,
    )?;
    let motif = &*motif;
    let cdf = scratch.cdf(motif);
    let mut shared = SharedSink(sink);
    match bed {
        None => {
            for (index, seq) in seqs.data.iter().enumerate() {
                let ctx = HitContext {
                    motif,
                    cdf,
                    seq_name: &seqs.names[index],
                    region: None,
                    is_consensus,
                };
                scan_sequence(&ctx, seq, cfg, &mut shared)?;
            }
        }
        Some(bed) => {
            for region in &bed.regions {
                let ctx = HitContext {
                    motif,
                    cdf,
                    seq_name: &seqs.names[region.seq_index],
                    region: Some(region),
                    is_consensus,
                };
                scan_bed_region(&ctx, &seqs.data[region.seq_index], region, cfg, &mut shared)?;
            }
        }
    }
    Ok(())
}

/// Low-memory path: one worker, one resident sequence, one full re-read of
/// the sequence file per motif. Motifs are emitted in input order.
fn scan_streaming<W: Write>(
    cfg: &ScanConfig,
    mut motifs: Vec<Motif>,
    seqs: &SequenceSet,
    bed: Option<&BedFile>,
    source: &SeqSource,
    is_consensus: bool,
    out: &mut W,
) -> Result<()> {
    let bar = progress_bar(cfg, motifs.len() as u64);
    let mut scratch = CdfScratch::new();
    for motif in &mut motifs {
        debug!("scanning motif: {}", motif.name);
        prepare_motif(
            motif,
            &cfg.bkg,
            cfg.pvalue,
            cfg.thresh0,
            is_consensus,
            &mut scratch,
        )?;
        let motif = &*motif;
        let cdf = scratch.cdf(motif);
        let mut sink = StreamSink(&mut *out);
        for_each_sequence(source, |index, seq| {
            debug!("scanning sequence: {}", seqs.names[index]);
            match bed {
                None => {
                    let ctx = HitContext {
                        motif,
                        cdf,
                        seq_name: &seqs.names[index],
                        region: None,
                        is_consensus,
                    };
                    scan_sequence(&ctx, seq, cfg, &mut sink)
                }
                Some(bed) => {
                    for region in bed.regions.iter().filter(|r| r.seq_index == index) {
                        debug!("scanning range: {}-{}", region.start + 1, region.end);
                        let ctx = HitContext {
                            motif,
                            cdf,
                            seq_name: &seqs.names[region.seq_index],
                            region: Some(region),
                            is_consensus,
                        };
                        scan_bed_region(&ctx, seq, region, cfg, &mut sink)?;
                    }
                    Ok(())
                }
            }
        })?;
        if let Some(bar) = &bar {
            bar.inc(1);
        }
    }
    if let Some(bar) = bar {
        bar.finish();
    }
    Ok(())
}

/// `-m` without `-s`: derive every threshold and print the parsed motifs.
pub fn print_motifs<W: Write>(
    cfg: &ScanConfig,
    motifs: &mut [Motif],
    is_consensus: bool,
    out: &mut W,
) -> Result<()> {
    info!("no sequences provided, parsing and printing motifs");
    let mut scratch = CdfScratch::new();
    let rule = "-".repeat(40);
    for (index, motif) in motifs.iter_mut().enumerate() {
        prepare_motif(
            motif,
            &cfg.bkg,
            cfg.pvalue,
            cfg.thresh0,
            is_consensus,
            &mut scratch,
        )?;
        writeln!(out, "{rule}")?;
        output::write_motif_summary(out, motif, index as u64 + 1, scratch.cdf(motif))?;
    }
    writeln!(out, "{rule}")?;
    out.flush()?;
    Ok(())
}

/// `-s` without motifs: print per-sequence (or per-range) statistics.
pub fn print_seq_stats<W: Write>(
    cfg: &ScanConfig,
    seqs: &SequenceSet,
    bed: Option<&BedFile>,
    source: &SeqSource,
    out: &mut W,
) -> Result<()> {
    info!("no motifs provided, printing sequence stats");
    output::write_seq_stats_header(out, bed.is_some())?;
    if cfg.low_mem {
        for_each_sequence(source, |index, seq| {
            match bed {
                None => output::write_seq_stats_row(out, index, &seqs.names[index], seq)?,
                Some(bed) => {
                    for region in bed.regions.iter().filter(|r| r.seq_index == index) {
                        output::write_bed_seq_stats_row(
                            out,
                            region,
                            &seqs.names[region.seq_index],
                            seq,
                        )?;
                    }
                }
            }
            Ok(())
        })?;
    } else {
        match bed {
            None => {
                for (index, seq) in seqs.data.iter().enumerate() {
                    output::write_seq_stats_row(out, index, &seqs.names[index], seq)?;
                }
            }
            Some(bed) => {
                for region in &bed.regions {
                    output::write_bed_seq_stats_row(
                        out,
                        region,
                        &seqs.names[region.seq_index],
                        &seqs.data[region.seq_index],
                    )?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::Background;
    use crate::motif::Scoring;
    use crate::sequence::SeqStats;

    fn seqs(records: &[(&str, &[u8])]) -> SequenceSet {
        let mut counts = crate::sequence::CharCounts::new();
        for (_, seq) in records {
            counts.tally(seq);
        }
        let total: u64 = records.iter().map(|(_, s)| s.len() as u64).sum();
        SequenceSet {
            names: records.iter().map(|(n, _)| n.to_string()).collect(),
            sizes: records.iter().map(|(_, s)| s.len() as u64).collect(),
            data: records.iter().map(|(_, s)| s.to_vec()).collect(),
            stats: SeqStats {
                total_bases: total,
                unknowns: total - counts.standard(),
                gc_pct: counts.gc_fraction() * 100.0,
            },
        }
    }

    fn consensus(pattern: &str) -> Motif {
        let scoring = Scoring {
            bkg: Background::uniform(),
            nsites: 1000,
            pseudocount: 1,
        };
        Motif::from_consensus(pattern, &scoring).unwrap()
    }

    #[test]
    fn worker_partition_is_balanced_and_ordered() {
        // 10 motifs across 3 workers: each worker's set is a contiguous run
        let owners: Vec<usize> = (0..10).map(|i| worker_of(i, 10, 3)).collect();
        assert_eq!(owners, vec![0, 0, 0, 0, 1, 1, 1, 2, 2, 2]);
        for pair in owners.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert_eq!(worker_of(0, 1, 1), 0);
    }

    #[test]
    fn in_memory_scan_produces_header_and_hits() {
        let cfg = ScanConfig {
            low_mem: false,
            ..ScanConfig::default()
        };
        let set = seqs(&[("s1", b"AAACGTAA")]);
        let motifs = vec![consensus("ACGT")];
        let mut out = Vec::new();
        run_scan(
            &cfg.clone().for_consensus(),
            motifs,
            &set,
            None,
            &SeqSource::Stdin,
            true,
            false,
            "-1 ACGT -s seqs.fa",
            &mut out,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("##yamscan v"));
        assert!(text.contains("MaxPossibleHits="));
        assert!(text.contains("##seq_name\tstart"));
        assert!(text.contains("s1\t4\t7\t+\tACGT\t1\t"));
    }

    #[test]
    fn multi_worker_scan_covers_all_motifs() {
        let cfg = ScanConfig {
            low_mem: false,
            threads: 3,
            pvalue: 1.0,
            ..ScanConfig::default()
        };
        let set = seqs(&[("s1", b"AAACGTAAACGTAA")]);
        let motifs = vec![consensus("ACGT"), consensus("AAAC"), consensus("CGTA")];
        let mut out = Vec::new();
        run_scan(
            &cfg, motifs, &set, None, &SeqSource::Stdin, true, false, "", &mut out,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        for name in ["ACGT", "AAAC", "CGTA"] {
            assert!(
                text.lines().any(|l| l.split('\t').nth(4) == Some(name)),
                "missing hits for {name}"
            );
        }
    }

    #[test]
    fn motif_print_mode_writes_summaries() {
        let cfg = ScanConfig::default();
        let mut motifs = [consensus("ACGT")];
        let mut out = Vec::new();
        print_motifs(&cfg, &mut motifs, false, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Motif: ACGT"));
        assert!(text.contains("Motif PWM:"));
        assert!(text.contains("p=1"));
    }

    #[test]
    fn seq_stats_mode_in_memory() {
        let cfg = ScanConfig {
            low_mem: false,
            ..ScanConfig::default()
        };
        let set = seqs(&[("s1", b"GGCC"), ("s2", b"AATT")]);
        let mut out = Vec::new();
        print_seq_stats(&cfg, &set, None, &SeqSource::Stdin, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("##seq_num"));
        assert!(text.contains("1\ts1\t4\t100.00\t0"));
        assert!(text.contains("2\ts2\t4\t0.00\t0"));
    }
}
