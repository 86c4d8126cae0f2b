//! Base-to-index mapping for DNA/RNA letters.
//!
//! Letters A, C, G, T/U (either case) map to indices 0..=3; everything else
//! maps to the non-standard index 4, which every PWM scores with the
//! ambiguity sentinel. A second table routes lowercase letters to index 4 so
//! that soft-masked (repeat-masked) sequence is skipped when masking is on.

/// Index of the non-standard letter row in PWMs and k-mer tables.
pub const AMBIG: u8 = 4;

const fn build_index(mask_lower: bool) -> [u8; 256] {
    let mut table = [AMBIG; 256];
    table[b'A' as usize] = 0;
    table[b'C' as usize] = 1;
    table[b'G' as usize] = 2;
    table[b'T' as usize] = 3;
    table[b'U' as usize] = 3;
    if !mask_lower {
        table[b'a' as usize] = 0;
        table[b'c' as usize] = 1;
        table[b'g' as usize] = 2;
        table[b't' as usize] = 3;
        table[b'u' as usize] = 3;
    }
    table
}

/// Case-insensitive base index table.
pub static BASE_INDEX: [u8; 256] = build_index(false);

/// Base index table that treats lowercase (soft-masked) letters as
/// non-standard.
pub static MASK_INDEX: [u8; 256] = build_index(true);

/// Letters corresponding to indices 0..=4 when writing DNA.
pub const INDEX_TO_DNA: [u8; 5] = *b"ACGTN";

/// Letters corresponding to indices 0..=4 when writing RNA.
pub const INDEX_TO_RNA: [u8; 5] = *b"ACGUN";

#[inline]
pub fn base_index(b: u8) -> usize {
    BASE_INDEX[b as usize] as usize
}

/// Per-letter probability rows for IUPAC ambiguity codes, used when a motif
/// is built from a consensus string. Unknown letters yield `None`.
pub fn consensus_probs(letter: u8) -> Option<[f64; 4]> {
    let probs = match letter.to_ascii_uppercase() {
        b'A' => [1.0, 0.0, 0.0, 0.0],
        b'C' => [0.0, 1.0, 0.0, 0.0],
        b'G' => [0.0, 0.0, 1.0, 0.0],
        b'T' | b'U' => [0.0, 0.0, 0.0, 1.0],
        b'Y' => [0.0, 0.5, 0.0, 0.5],
        b'R' => [0.5, 0.0, 0.5, 0.0],
        b'W' => [0.5, 0.0, 0.0, 0.5],
        b'S' => [0.0, 0.5, 0.5, 0.0],
        b'K' => [0.0, 0.0, 0.5, 0.5],
        b'M' => [0.5, 0.5, 0.0, 0.0],
        b'D' => [0.333, 0.0, 0.333, 0.333],
        b'V' => [0.333, 0.333, 0.333, 0.0],
        b'H' => [0.333, 0.333, 0.0, 0.333],
        b'B' => [0.0, 0.333, 0.333, 0.333],
        b'N' => [0.25, 0.25, 0.25, 0.25],
        _ => return None,
    };
    Some(probs)
}
