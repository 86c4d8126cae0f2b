#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

/// Write a fixture file into the test directory.
pub fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn yamscan() -> Command {
    Command::cargo_bin("yamscan").unwrap()
}

pub fn yamshuf() -> Command {
    Command::cargo_bin("yamshuf").unwrap()
}

/// A MEME file holding one exact-match ACGT motif under the given name(s).
pub fn meme_file(names: &[&str]) -> String {
    let mut text = String::from(
        "MEME version 4\n\nALPHABET= ACGT\n\nBackground letter frequencies\nA 0.25 C 0.25 G 0.25 T 0.25\n",
    );
    for name in names {
        text.push_str(&format!(
            "\nMOTIF {name}\nletter-probability matrix: alength= 4 w= 4 nsites= 20 E= 0\n\
             1.0 0.0 0.0 0.0\n0.0 1.0 0.0 0.0\n0.0 0.0 1.0 0.0\n0.0 0.0 0.0 1.0\n"
        ));
    }
    text
}

/// Split stdout into hit rows (skipping the `##` headers).
pub fn hit_rows(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| !line.starts_with("##"))
        .map(str::to_owned)
        .collect()
}
