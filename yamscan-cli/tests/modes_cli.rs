//! Residency modes, masking, gzip inputs, and name handling.

mod common;

use std::io::Write as _;

use common::{hit_rows, meme_file, write_file, yamscan};
use predicates::prelude::*;
use tempfile::tempdir;

fn gzip_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();
    path
}

#[test]
fn low_memory_and_in_memory_paths_agree() {
    let dir = tempdir().unwrap();
    let motifs = write_file(&dir, "motifs.txt", &meme_file(&["JUN", "FOS"]));
    let seqs = write_file(&dir, "seqs.fa", ">s1\nACGTACGTAACGT\n>s2\nTTTACGTTTT\n");
    let run = |extra: &[&str]| {
        let mut cmd = yamscan();
        cmd.arg("-m")
            .arg(&motifs)
            .arg("-s")
            .arg(&seqs)
            .args(["-t", "0.01"])
            .args(extra);
        let assert = cmd.assert().success();
        let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
        hit_rows(&stdout)
    };
    // The streaming (default) and all-in-memory (-l) paths emit the same
    // records; the single-worker orders also coincide.
    assert_eq!(run(&[]), run(&["-l"]));
    assert!(!run(&[]).is_empty());
}

#[test]
fn gzipped_sequences_and_bed_are_read() {
    let dir = tempdir().unwrap();
    let seqs = gzip_file(&dir, "seqs.fa.gz", ">chr1\nAAAAAAAAAAACGTAAAAAA\n");
    let bed = gzip_file(&dir, "ranges.bed.gz", "chr1\t5\t18\tr1\t0\t+\n");
    let assert = yamscan()
        .args(["-1", "ACGT", "-s"])
        .arg(&seqs)
        .arg("-x")
        .arg(&bed)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let rows = hit_rows(&stdout);
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("chr1:6-18(+)\tr1\tchr1\t11\t14\t+\t"));
}

#[test]
fn masking_skips_softmasked_windows() {
    let dir = tempdir().unwrap();
    let seqs = write_file(&dir, "seqs.fa", ">s\nAAacgtAAACGT\n");
    let run = |mask: bool| {
        let mut cmd = yamscan();
        cmd.args(["-1", "ACGT", "-f", "-s"]).arg(&seqs);
        if mask {
            cmd.arg("-M");
        }
        let assert = cmd.assert().success();
        hit_rows(&String::from_utf8(assert.get_output().stdout.clone()).unwrap())
    };
    assert_eq!(run(false).len(), 2);
    let masked = run(true);
    assert_eq!(masked.len(), 1);
    assert!(masked[0].starts_with("s\t9\t12\t+\t"));
}

#[test]
fn raw_names_keep_comments_and_break_trimmed_lookup() {
    let dir = tempdir().unwrap();
    let seqs = write_file(&dir, "seqs.fa", ">chr1 assembled contig\nAAAACGTAAA\n");
    // Default: name trimmed to first word.
    yamscan()
        .args(["-1", "ACGT", "-f", "-s"])
        .arg(&seqs)
        .assert()
        .success()
        .stdout(predicate::str::contains("chr1\t4\t7\t+\t"));
    // -r: the comment stays part of the name.
    yamscan()
        .args(["-1", "ACGT", "-f", "-r", "-s"])
        .arg(&seqs)
        .assert()
        .success()
        .stdout(predicate::str::contains("chr1 assembled contig\t4\t7\t+\t"));
}

#[test]
fn fastq_sequences_are_scanned() {
    let dir = tempdir().unwrap();
    let seqs = write_file(&dir, "reads.fq", "@r1\nAAACGTAA\n+\nIIIIIIII\n");
    yamscan()
        .args(["-1", "ACGT", "-s"])
        .arg(&seqs)
        .assert()
        .success()
        .stdout(predicate::str::contains("r1\t4\t7\t+\t"));
}

#[test]
fn malformed_background_argument_is_fatal() {
    let dir = tempdir().unwrap();
    let motifs = write_file(&dir, "motifs.txt", &meme_file(&["JUN"]));
    let seqs = write_file(&dir, "seqs.fa", ">s\nACGTACGT\n");
    for bad in ["0.25,0.25,0.25", "1,2,3,4,5", "a,b,c,d"] {
        yamscan()
            .arg("-m")
            .arg(&motifs)
            .arg("-s")
            .arg(&seqs)
            .args(["-b", bad])
            .assert()
            .failure()
            .stderr(predicate::str::contains("background"));
    }
}

#[test]
fn empty_sequence_file_is_fatal() {
    let dir = tempdir().unwrap();
    let seqs = write_file(&dir, "empty.fa", "");
    yamscan()
        .args(["-1", "ACGT", "-s"])
        .arg(&seqs)
        .assert()
        .failure()
        .stderr(predicate::str::contains("sequence"));
}
