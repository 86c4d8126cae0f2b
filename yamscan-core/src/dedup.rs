//! Duplicate name detection for motifs and sequences.
//!
//! The first occurrence of a name always wins. Later occurrences either
//! abort the run (listing up to five offenders) or, when deduplication is
//! enabled, receive a `__N<one-based-index>` suffix.

use std::collections::{HashMap, HashSet};

use log::info;

use crate::motif::Motif;
use crate::types::{Result, ScanError};

const MAX_LISTED: usize = 5;

fn mark_duplicates<'a>(names: impl Iterator<Item = &'a str>) -> Vec<bool> {
    let mut seen = HashSet::new();
    names.map(|name| !seen.insert(name.to_owned())).collect()
}

fn rename(name: &mut String, index: usize, max_len: usize) -> Result<()> {
    let suffix = format!("__N{}", index + 1);
    if name.len() + suffix.len() > max_len {
        return Err(ScanError::Config(format!(
            "failed to deduplicate name #{}, name is too large",
            index + 1
        )));
    }
    name.push_str(&suffix);
    Ok(())
}

fn offender_listing(entries: &[(usize, String)], total: u64) -> String {
    let mut listing = String::new();
    for (index, name) in entries.iter().take(MAX_LISTED) {
        listing.push_str(&format!("\n    #{}: {}", index + 1, name));
    }
    if total as usize > MAX_LISTED {
        listing.push_str(&format!("\n    ...\n    found {total} total non-unique names"));
    }
    listing
}

/// Check motif names, renaming or aborting. Returns whether any name was
/// rewritten.
pub fn check_motif_names(motifs: &mut [Motif], dedup: bool) -> Result<bool> {
    if motifs.len() < 2 {
        return Ok(false);
    }
    let dupes = mark_duplicates(motifs.iter().map(|m| m.name.as_str()));
    let total = dupes.iter().filter(|&&d| d).count() as u64;
    if total == 0 {
        return Ok(false);
    }
    if !dedup {
        let offenders: Vec<(usize, String)> = motifs
            .iter()
            .enumerate()
            .filter(|(i, _)| dupes[*i])
            .map(|(i, m)| (i, format!("L{} {}", m.file_line, m.name)))
            .collect();
        return Err(ScanError::DuplicateNames {
            kind: "motif",
            listing: format!(
                " (use -d to deduplicate){}",
                offender_listing(&offenders, total)
            ),
        });
    }
    for (index, motif) in motifs.iter_mut().enumerate() {
        if dupes[index] {
            rename(&mut motif.name, index, crate::constants::MAX_NAME_SIZE)?;
        }
    }
    info!("renamed {total} duplicate motif name(s)");
    Ok(true)
}

/// Check sequence names, renaming or aborting. With a BED file in play the
/// name-to-index relation must be injective, so duplicates are always
/// fatal there.
pub fn check_seq_names(names: &mut [String], dedup: bool, use_bed: bool) -> Result<bool> {
    let dupes = mark_duplicates(names.iter().map(String::as_str));
    let total = dupes.iter().filter(|&&d| d).count() as u64;
    if total == 0 {
        return Ok(false);
    }
    if !dedup || use_bed {
        let offenders: Vec<(usize, String)> = names
            .iter()
            .enumerate()
            .filter(|(i, _)| dupes[*i])
            .map(|(i, n)| (i, n.clone()))
            .collect();
        let hint = if use_bed {
            "; these cannot exist with -x"
        } else {
            " (use -d to deduplicate)"
        };
        return Err(ScanError::DuplicateNames {
            kind: "sequence",
            listing: format!("{hint}{}", offender_listing(&offenders, total)),
        });
    }
    for (index, name) in names.iter_mut().enumerate() {
        if dupes[index] {
            rename(name, index, crate::constants::SEQ_NAME_MAX_CHAR)?;
        }
    }
    info!("renamed {total} duplicate sequence name(s)");
    Ok(true)
}

/// Build the sequence-name to index map used by BED resolution; first
/// occurrence wins (names are unique after duplicate handling).
pub fn build_name_index(names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(names.len());
    for (position, name) in names.iter().enumerate() {
        index.entry(name.clone()).or_insert(position);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::Background;
    use crate::motif::Scoring;

    fn motif(name: &str) -> Motif {
        let scoring = Scoring {
            bkg: Background::uniform(),
            nsites: 1000,
            pseudocount: 1,
        };
        let mut m = Motif::from_consensus("ACGT", &scoring).unwrap();
        m.name = name.to_owned();
        m
    }

    #[test]
    fn duplicates_abort_by_default() {
        let mut motifs = vec![motif("JUN"), motif("JUN")];
        let err = check_motif_names(&mut motifs, false).unwrap_err();
        assert!(err.to_string().contains("JUN"));
        assert!(err.to_string().contains("-d"));
    }

    #[test]
    fn duplicates_rename_in_index_order() {
        let mut motifs = vec![motif("JUN"), motif("JUN"), motif("FOS"), motif("JUN")];
        assert!(check_motif_names(&mut motifs, true).unwrap());
        let names: Vec<&str> = motifs.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["JUN", "JUN__N2", "FOS", "JUN__N4"]);
    }

    #[test]
    fn unique_names_are_untouched() {
        let mut motifs = vec![motif("a"), motif("b")];
        assert!(!check_motif_names(&mut motifs, true).unwrap());
        assert_eq!(motifs[1].name, "b");
    }

    #[test]
    fn seq_dupes_fatal_with_bed_even_when_deduping() {
        let mut names = vec!["chr1".to_owned(), "chr1".to_owned()];
        assert!(check_seq_names(&mut names, true, true).is_err());
        assert!(check_seq_names(&mut names, true, false).unwrap());
        assert_eq!(names, vec!["chr1", "chr1__N2"]);
    }

    #[test]
    fn abort_listing_is_capped_at_five() {
        let mut names: Vec<String> = std::iter::repeat("x".to_owned()).take(8).collect();
        let err = check_seq_names(&mut names, false, false).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("found 7 total non-unique names"));
        assert_eq!(text.matches("#").count(), 5);
    }

    #[test]
    fn rename_respects_name_cap() {
        let mut names = vec!["a".repeat(510), "a".repeat(510)];
        assert!(check_seq_names(&mut names, true, false).is_err());
    }

    #[test]
    fn name_index_first_occurrence_wins() {
        let names = vec!["a".to_owned(), "b".to_owned(), "a".to_owned()];
        let index = build_name_index(&names);
        assert_eq!(index["a"], 0);
        assert_eq!(index["b"], 1);
    }
}
