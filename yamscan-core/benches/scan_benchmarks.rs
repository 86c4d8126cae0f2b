use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use yamscan_core::background::Background;
use yamscan_core::config::{ScanConfig, ShuffleConfig, ShuffleMethod};
use yamscan_core::motif::dist::{fill_cdf, prepare_motif, CdfScratch};
use yamscan_core::motif::{Motif, Scoring};
use yamscan_core::scan::{scan_sequence, HitContext, RecordSink};
use yamscan_core::shuffle::Shuffler;

const SEQ_LEN: usize = 100_000;

fn random_sequence(len: usize) -> Vec<u8> {
    let mut rng = Xoshiro256StarStar::seed_from_u64(99);
    let letters = [b'A', b'C', b'G', b'T'];
    (0..len).map(|_| letters[rng.gen_range(0..4)]).collect()
}

fn motif(consensus: &str) -> Motif {
    let scoring = Scoring {
        bkg: Background::uniform(),
        nsites: 1000,
        pseudocount: 1,
    };
    Motif::from_consensus(consensus, &scoring).unwrap()
}

/// Sink that only counts records, keeping I/O out of the measurement.
struct CountingSink(u64);

impl RecordSink for CountingSink {
    fn record(&mut self, _line: &str) -> yamscan_core::Result<()> {
        self.0 += 1;
        Ok(())
    }
}

fn bench_fill_cdf(c: &mut Criterion) {
    let bkg = Background::uniform();
    let mut group = c.benchmark_group("fill_cdf");
    for width in [8usize, 15, 25] {
        let m = motif(&"ACGTMRWS".chars().cycle().take(width).collect::<String>());
        group.bench_function(format!("w{width}"), |b| {
            let mut scratch = CdfScratch::new();
            b.iter(|| fill_cdf(black_box(&m), &bkg, &mut scratch).unwrap());
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let seq = random_sequence(SEQ_LEN);
    let cfg = ScanConfig::default();
    let mut m = motif("TGACTCAGTAGT");
    let mut scratch = CdfScratch::new();
    prepare_motif(&mut m, &cfg.bkg, cfg.pvalue, false, false, &mut scratch).unwrap();
    let mut group = c.benchmark_group("scan");
    group.throughput(Throughput::Bytes(SEQ_LEN as u64));
    group.bench_function("dual_strand_100kb", |b| {
        b.iter(|| {
            let ctx = HitContext {
                motif: &m,
                cdf: scratch.cdf(&m),
                seq_name: "bench",
                region: None,
                is_consensus: false,
            };
            let mut sink = CountingSink(0);
            scan_sequence(&ctx, black_box(&seq), &cfg, &mut sink).unwrap();
            sink.0
        });
    });
    let fwd_only = ScanConfig {
        scan_rc: false,
        ..ScanConfig::default()
    };
    group.bench_function("forward_only_100kb", |b| {
        b.iter(|| {
            let ctx = HitContext {
                motif: &m,
                cdf: scratch.cdf(&m),
                seq_name: "bench",
                region: None,
                is_consensus: false,
            };
            let mut sink = CountingSink(0);
            scan_sequence(&ctx, black_box(&seq), &fwd_only, &mut sink).unwrap();
            sink.0
        });
    });
    group.finish();
}

fn bench_shuffle(c: &mut Criterion) {
    let seq = random_sequence(10_000);
    let mut group = c.benchmark_group("shuffle");
    group.throughput(Throughput::Bytes(seq.len() as u64));
    for (label, method, k) in [
        ("euler_k2", ShuffleMethod::Euler, 2),
        ("euler_k3", ShuffleMethod::Euler, 3),
        ("markov_k3", ShuffleMethod::Markov, 3),
        ("linear_k3", ShuffleMethod::Linear, 3),
    ] {
        let cfg = ShuffleConfig {
            k,
            method,
            ..ShuffleConfig::default()
        };
        group.bench_function(label, |b| {
            let mut shuffler = Shuffler::new(cfg.clone()).unwrap();
            let mut work = seq.clone();
            b.iter(|| {
                work.copy_from_slice(&seq);
                shuffler.shuffle(black_box(&mut work))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fill_cdf, bench_scan, bench_shuffle);
criterion_main!(benches);
