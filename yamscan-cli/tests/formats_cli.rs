mod common;

use common::{hit_rows, meme_file, write_file, yamscan};
use predicates::prelude::*;
use tempfile::tempdir;

const JASPAR: &str = "\
>MA0000.1 acgt
A [ 10  0  0  0 ]
C [  0 10  0  0 ]
G [  0  0 10  0 ]
T [  0  0  0 10 ]
";

const HOMER: &str = "\
>ACGT\tacgt-homer\t6.049
1.0\t0.0\t0.0\t0.0
0.0\t1.0\t0.0\t0.0
0.0\t0.0\t1.0\t0.0
0.0\t0.0\t0.0\t1.0
";

const HOCOMOCO: &str = "\
>ACGT_PCM
10\t0\t0\t0
0\t10\t0\t0
0\t0\t10\t0
0\t0\t0\t10
";

fn scan_with(dir: &tempfile::TempDir, motif_text: &str) -> Vec<String> {
    let motifs = write_file(dir, "motifs.txt", motif_text);
    let seqs = write_file(dir, "seqs.fa", ">seq\nAAACGTAA\n");
    let assert = yamscan()
        .arg("-m")
        .arg(&motifs)
        .arg("-s")
        .arg(&seqs)
        .args(["-t", "0.01"])
        .assert()
        .success();
    hit_rows(&String::from_utf8(assert.get_output().stdout.clone()).unwrap())
}

#[test]
fn meme_motif_finds_the_site() {
    let dir = tempdir().unwrap();
    let rows = scan_with(&dir, &meme_file(&["JUN"]));
    assert!(rows.iter().any(|r| r.starts_with("seq\t4\t7\t+\tJUN\t")));
}

#[test]
fn jaspar_motif_finds_the_site() {
    let dir = tempdir().unwrap();
    let rows = scan_with(&dir, JASPAR);
    assert!(rows.iter().any(|r| r.starts_with("seq\t4\t7\t+\tMA0000.1\t")));
}

#[test]
fn homer_motif_finds_the_site() {
    let dir = tempdir().unwrap();
    let rows = scan_with(&dir, HOMER);
    assert!(rows.iter().any(|r| r.starts_with("seq\t4\t7\t+\tacgt-homer\t")));
}

#[test]
fn hocomoco_motif_finds_the_site() {
    let dir = tempdir().unwrap();
    let rows = scan_with(&dir, HOCOMOCO);
    assert!(rows.iter().any(|r| r.starts_with("seq\t4\t7\t+\tACGT_PCM\t")));
}

#[test]
fn protein_meme_file_is_fatal() {
    let dir = tempdir().unwrap();
    let motifs = write_file(
        &dir,
        "protein.txt",
        "MEME version 4\n\nALPHABET= ACDEFGHIKLMNPQRSTVWY\n\nMOTIF x\n",
    );
    let seqs = write_file(&dir, "seqs.fa", ">seq\nACGT\n");
    yamscan()
        .arg("-m")
        .arg(&motifs)
        .arg("-s")
        .arg(&seqs)
        .assert()
        .failure()
        .stderr(predicate::str::contains("protein"));
}

#[test]
fn hocomoco_pwm_bodies_are_rejected() {
    let dir = tempdir().unwrap();
    let motifs = write_file(&dir, "pwm.txt", ">X\n1.2\t-0.5\t0.3\t-1.0\n");
    let seqs = write_file(&dir, "seqs.fa", ">seq\nACGT\n");
    yamscan()
        .arg("-m")
        .arg(&motifs)
        .arg("-s")
        .arg(&seqs)
        .assert()
        .failure();
}

#[test]
fn malformed_matrix_row_is_fatal() {
    let dir = tempdir().unwrap();
    // 1.2 sum is over the 0.1 absolute tolerance
    let motifs = write_file(&dir, "bad.txt", ">ACGT\tbad\t0\n0.4\t0.4\t0.2\t0.2\n");
    let seqs = write_file(&dir, "seqs.fa", ">seq\nACGT\n");
    yamscan()
        .arg("-m")
        .arg(&motifs)
        .arg("-s")
        .arg(&seqs)
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not add up to 1"));
}

#[test]
fn user_background_shifts_scores() {
    let dir = tempdir().unwrap();
    let motifs = write_file(&dir, "motifs.txt", &meme_file(&["JUN"]));
    let seqs = write_file(&dir, "seqs.fa", ">seq\nAAACGTAA\n");
    let run = |bkg: Option<&str>| {
        let mut cmd = yamscan();
        cmd.arg("-m").arg(&motifs).arg("-s").arg(&seqs).args(["-t", "0.5"]);
        if let Some(bkg) = bkg {
            cmd.args(["-b", bkg]);
        }
        let assert = cmd.assert().success();
        String::from_utf8(assert.get_output().stdout.clone()).unwrap()
    };
    let uniform = run(None);
    let skewed = run(Some("0.4,0.1,0.1,0.4"));
    let score_of = |text: &str| -> f64 {
        hit_rows(text)
            .iter()
            .find(|r| r.contains("\t4\t7\t+\t"))
            .and_then(|r| r.split('\t').nth(6))
            .and_then(|s| s.parse().ok())
            .unwrap()
    };
    // Rare letters score higher against a background that underweights them.
    assert!(score_of(&skewed) > score_of(&uniform));
}
