//! Motif file format auto-detection and parsing.
//!
//! Four text formats are recognized from the first content lines of the
//! file: MEME (a `MEME version` marker), HOMER (`>` headers containing
//! tabs), JASPAR (bracketed per-letter count rows), and HOCOMOCO position
//! count matrices. All parsers emit normalized [`Motif`] values scored
//! against the effective background.

use std::io::BufRead;

use log::{debug, info, warn};

use crate::background::Background;
use crate::config::ScanConfig;
use crate::constants::MAX_MOTIF_WIDTH;
use crate::motif::{normalize_probs, Motif, Scoring};
use crate::types::{Result, ScanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotifFormat {
    Meme,
    Homer,
    Jaspar,
    Hocomoco,
}

/// Result of parsing a motif file: the motifs plus the background they were
/// scored against (MEME files may supply their own unless the user
/// overrode it).
#[derive(Debug)]
pub struct ParsedMotifs {
    pub motifs: Vec<Motif>,
    pub bkg: Background,
    pub format: MotifFormat,
}

/// Read, detect, and parse a motif file.
pub fn parse_motifs<R: BufRead>(reader: R, cfg: &ScanConfig) -> Result<ParsedMotifs> {
    let lines: Vec<String> = reader.lines().collect::<std::io::Result<_>>()?;
    let format = detect_format(&lines)?;
    let (mut motifs, bkg) = match format {
        MotifFormat::Meme => read_meme(&lines, cfg)?,
        MotifFormat::Homer => (read_homer(&lines, cfg)?, cfg.bkg),
        MotifFormat::Jaspar => (read_jaspar(&lines, cfg)?, cfg.bkg),
        MotifFormat::Hocomoco => (read_hocomoco(&lines, cfg)?, cfg.bkg),
    };
    if motifs.is_empty() {
        return Err(ScanError::Config(
            "all parsed motifs are empty".into(),
        ));
    }
    if motifs.len() > 100_000 {
        warn!("scanning may be quite slow with this many motifs ({})", motifs.len());
    }
    if cfg.trim_names {
        for motif in &mut motifs {
            trim_name(&mut motif.name);
        }
    }
    Ok(ParsedMotifs { motifs, bkg, format })
}

/// Inspect the first content lines and pick the parser.
pub fn detect_format(lines: &[String]) -> Result<MotifFormat> {
    let mut saw_header = false;
    let mut header_has_tab = false;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with("MEME version ") {
            debug!("detected MEME format");
            return Ok(MotifFormat::Meme);
        }
        if saw_header {
            let brackets = line.contains('[') || line.contains(']');
            if line.starts_with('A') && line.contains('[') && line.contains(']') {
                debug!("detected JASPAR format");
                return Ok(MotifFormat::Jaspar);
            }
            if line.starts_with('A') || brackets {
                return Err(ScanError::Config("detected malformed JASPAR format".into()));
            }
            if header_has_tab {
                debug!("detected HOMER format");
                return Ok(MotifFormat::Homer);
            }
            if line.contains('-') {
                return Err(ScanError::Config(
                    "cannot read HOCOMOCO PWMs, only PCMs are supported".into(),
                ));
            }
            debug!("detected HOCOMOCO format");
            return Ok(MotifFormat::Hocomoco);
        }
        if line.starts_with('>') {
            header_has_tab = line.contains('\t');
            saw_header = true;
        }
    }
    Err(ScanError::Config("failed to detect motif format".into()))
}

fn trim_name(name: &mut String) {
    if let Some(cut) = name.find([' ', '\t']) {
        name.truncate(cut);
    }
}

/// Split a matrix row into exactly four numeric fields.
fn parse_row(line: &str, name: &str) -> Result<[f64; 4]> {
    let mut values = [0.0; 4];
    let mut count = 0;
    for field in line.split_whitespace() {
        if count == 4 {
            return Err(ScanError::motif(name, "has too many columns (need 4)"));
        }
        values[count] = field.parse::<f64>().map_err(|_| {
            ScanError::motif(name, format!("failed to parse matrix value '{field}'"))
        })?;
        count += 1;
    }
    match count {
        0 => Err(ScanError::motif(name, "has an empty row")),
        1..=3 => Err(ScanError::motif(name, "has too few columns (need 4)")),
        _ => Ok(values),
    }
}

fn check_width(name: &str, rows: usize) -> Result<()> {
    if rows >= MAX_MOTIF_WIDTH {
        return Err(ScanError::motif(
            name,
            format!("motif is too large (max={MAX_MOTIF_WIDTH})"),
        ));
    }
    Ok(())
}

/// An accumulating raw motif shared by the line-oriented readers.
struct RawMotif {
    name: String,
    line: u64,
    rows: Vec<[f64; 4]>,
}

fn build_prob_motifs(
    raw: Vec<RawMotif>,
    scoring: &Scoring,
    pcm: bool,
) -> Result<Vec<Motif>> {
    let mut motifs = Vec::with_capacity(raw.len());
    let mut empty = 0u64;
    for r in raw {
        if r.rows.is_empty() {
            empty += 1;
            continue;
        }
        let motif = if pcm {
            Motif::from_pcm_rows(r.name, r.line, &r.rows, scoring)?
        } else {
            Motif::from_prob_rows(r.name, r.line, &r.rows, scoring)?
        };
        motifs.push(motif);
    }
    if empty > 0 {
        warn!("found {empty} empty motif(s)");
    }
    Ok(motifs)
}

// ---------------------------------------------------------------------------
// MEME

fn read_meme(lines: &[String], cfg: &ScanConfig) -> Result<(Vec<Motif>, Background)> {
    let mut bkg = cfg.bkg;
    let mut bkg_marker: Option<u64> = None;
    let mut alph_seen = false;
    let mut strand_seen = false;
    let mut raw: Vec<RawMotif> = Vec::new();
    let mut matrix_start: Option<u64> = None;
    let mut live = false;
    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx as u64 + 1;
        if line.starts_with("Background letter frequencies") {
            if bkg_marker.is_some() {
                return Err(ScanError::motif_format(
                    line_num,
                    "detected multiple background definition lines in MEME file",
                ));
            }
            if !raw.is_empty() {
                return Err(ScanError::motif_format(
                    line_num,
                    "found background definition line after motifs",
                ));
            }
            bkg_marker = Some(line_num);
        } else if bkg_marker == Some(line_num - 1) {
            if !cfg.user_bkg {
                bkg = parse_meme_bkg(line, line_num)?;
                debug!("found MEME background values: {:?}", bkg.as_array());
            }
        } else if line.starts_with("ALPHABET") {
            if alph_seen {
                return Err(ScanError::motif_format(
                    line_num,
                    "detected multiple alphabet definition lines in MEME file",
                ));
            }
            if !raw.is_empty() {
                return Err(ScanError::motif_format(
                    line_num,
                    "found alphabet definition line after motifs",
                ));
            }
            if line.starts_with("ALPHABET= ACDEFGHIKLMNPQRSTVWY") {
                return Err(ScanError::motif_format(line_num, "detected protein alphabet"));
            }
            alph_seen = true;
        } else if line.starts_with("strands:") {
            if strand_seen {
                return Err(ScanError::motif_format(
                    line_num,
                    "detected multiple strand information lines in MEME file",
                ));
            }
            if !raw.is_empty() {
                return Err(ScanError::motif_format(
                    line_num,
                    "found strand information line after motifs",
                ));
            }
            check_meme_strand(line, line_num, cfg.scan_rc);
            strand_seen = true;
        } else if line.starts_with("MOTIF") {
            let name = parse_meme_name(line);
            debug!("found motif: {name}");
            raw.push(RawMotif {
                name,
                line: line_num,
                rows: Vec::new(),
            });
            matrix_start = None;
            live = false;
        } else if line.starts_with("letter-probability matrix") {
            let ready = raw.last().is_some_and(|r| r.rows.is_empty());
            if !ready {
                return Err(ScanError::motif_format(line_num, "possible malformed MEME motif"));
            }
            matrix_start = Some(line_num);
            live = true;
        } else if live {
            let motif = raw.last_mut().expect("live implies a current motif");
            if line.trim().is_empty() || line.contains('-') || line.contains('*') {
                live = false;
            } else if Some(line_num) == matrix_start.map(|start| start + motif.rows.len() as u64 + 1)
            {
                check_width(&motif.name, motif.rows.len())?;
                let mut row = parse_row(line, &motif.name)?;
                normalize_probs(&mut row, &motif.name)?;
                motif.rows.push(row);
            } else {
                live = false;
            }
        }
    }
    if raw.is_empty() {
        return Err(ScanError::Config(
            "failed to detect any motifs in MEME file".into(),
        ));
    }
    info!("found {} MEME motif(s)", raw.len());
    let scoring = Scoring {
        bkg,
        nsites: cfg.nsites,
        pseudocount: cfg.pseudocount,
    };
    Ok((build_prob_motifs(raw, &scoring, false)?, bkg))
}

/// `MOTIF <name> [alt]` keeps only the first word after the keyword.
fn parse_meme_name(line: &str) -> String {
    line["MOTIF".len()..]
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_owned()
}

fn parse_meme_bkg(line: &str, line_num: u64) -> Result<Background> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if !line.starts_with('A') {
        return Err(ScanError::motif_format(
            line_num,
            "expected first character of background line to be 'A'",
        ));
    }
    if tokens.len() < 8 {
        return Err(ScanError::motif_format(
            line_num,
            "too few background values in MEME file (need 4)",
        ));
    }
    if tokens.len() > 8 {
        return Err(ScanError::motif_format(
            line_num,
            "parsed too many background values in MEME file",
        ));
    }
    let expected: [&[&str]; 4] = [&["A"], &["C"], &["G"], &["T", "U"]];
    let mut values = [0.0; 4];
    for slot in 0..4 {
        let letter = tokens[slot * 2];
        if !expected[slot].contains(&letter) {
            return Err(ScanError::motif_format(
                line_num,
                format!("unexpected letter '{letter}' in MEME background"),
            ));
        }
        values[slot] = tokens[slot * 2 + 1].parse::<f64>().map_err(|_| {
            ScanError::motif_format(
                line_num,
                format!("failed to parse background value '{}'", tokens[slot * 2 + 1]),
            )
        })?;
    }
    Background::from_values(values)
}

fn check_meme_strand(line: &str, line_num: u64, scan_rc: bool) {
    let fwd = line.matches('+').count();
    let rev = line.matches('-').count();
    if fwd > 1 || rev > 1 || (fwd == 0 && rev == 0) {
        info!("possible malformed strand field (L{line_num})");
    }
    if scan_rc && fwd > 0 && rev == 0 {
        info!("MEME motifs are only for the forward strand (L{line_num})");
    }
    if fwd == 0 && rev > 0 {
        info!("MEME motifs are only for the reverse strand (L{line_num})");
    }
    if !scan_rc && fwd > 0 && rev > 0 {
        info!("MEME motifs are for both strands (L{line_num})");
    }
}

// ---------------------------------------------------------------------------
// HOMER

fn read_homer(lines: &[String], cfg: &ScanConfig) -> Result<Vec<Motif>> {
    let mut raw: Vec<RawMotif> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx as u64 + 1;
        if line.starts_with('>') {
            let name = parse_homer_name(line, raw.len() as u64 + 1);
            debug!("found motif: {name}");
            raw.push(RawMotif {
                name,
                line: line_num,
                rows: Vec::new(),
            });
        } else if !line.trim().is_empty() {
            if let Some(motif) = raw.last_mut() {
                check_width(&motif.name, motif.rows.len())?;
                let mut row = parse_row(line, &motif.name)?;
                normalize_probs(&mut row, &motif.name)?;
                motif.rows.push(row);
            }
        }
    }
    info!("found {} HOMER motif(s)", raw.len());
    let scoring = Scoring {
        bkg: cfg.bkg,
        nsites: cfg.nsites,
        pseudocount: cfg.pseudocount,
    };
    build_prob_motifs(raw, &scoring, false)
}

/// The HOMER header is `>CONSENSUS\tname\tlogodds...`; the name is the
/// second tab-separated field.
fn parse_homer_name(line: &str, motif_num: u64) -> String {
    let mut fields = line[1..].split('\t');
    let _consensus = fields.next();
    match fields.next() {
        Some(name) => {
            if fields.next().is_none() {
                debug!("HOMER motif is missing logodds score [#{motif_num}]");
            }
            name.to_owned()
        }
        None => {
            debug!("failed to parse motif name [#{motif_num}]");
            String::new()
        }
    }
}

// ---------------------------------------------------------------------------
// JASPAR

fn read_jaspar(lines: &[String], cfg: &ScanConfig) -> Result<Vec<Motif>> {
    struct JasparRaw {
        name: String,
        line: u64,
        // per-letter count rows in A, C, G, T order
        counts: [Vec<i32>; 4],
        rows_seen: u32,
    }
    fn finish(raw: &JasparRaw, scoring: &Scoring) -> Result<Option<Motif>> {
        if raw.rows_seen != 4 {
            let problem = if raw.rows_seen < 4 { "few" } else { "many" };
            return Err(ScanError::motif(
                &raw.name,
                format!("has too {problem} rows (found {}, need 4)", raw.rows_seen),
            ));
        }
        let width = raw.counts[0].len();
        if width == 0 {
            return Ok(None);
        }
        let mut rows = vec![[0i32; 4]; width];
        for (letter, counts) in raw.counts.iter().enumerate() {
            for (pos, &count) in counts.iter().enumerate() {
                rows[pos][letter] = count;
            }
        }
        Motif::from_count_rows(raw.name.clone(), raw.line, &rows, scoring).map(Some)
    }

    let scoring = Scoring {
        bkg: cfg.bkg,
        nsites: cfg.nsites,
        pseudocount: cfg.pseudocount,
    };
    let mut motifs = Vec::new();
    let mut current: Option<JasparRaw> = None;
    let mut empty = 0u64;
    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx as u64 + 1;
        if line.starts_with('>') {
            if let Some(raw) = current.take() {
                match finish(&raw, &scoring)? {
                    Some(motif) => motifs.push(motif),
                    None => empty += 1,
                }
            }
            let name = line[1..].trim_end().to_owned();
            debug!("found motif: {name}");
            current = Some(JasparRaw {
                name,
                line: line_num,
                counts: Default::default(),
                rows_seen: 0,
            });
        } else if !line.trim().is_empty() {
            if let Some(raw) = current.as_mut() {
                raw.rows_seen += 1;
                add_jaspar_row(raw.name.clone(), line, &mut raw.counts)?;
            }
        }
    }
    if let Some(raw) = current.take() {
        match finish(&raw, &scoring)? {
            Some(motif) => motifs.push(motif),
            None => empty += 1,
        }
    }
    if empty > 0 {
        warn!("found {empty} empty motif(s)");
    }
    info!("found {} JASPAR motif(s)", motifs.len());
    Ok(motifs)
}

fn add_jaspar_row(name: String, line: &str, counts: &mut [Vec<i32>; 4]) -> Result<()> {
    let letter = line
        .chars()
        .find_map(|c| match c.to_ascii_uppercase() {
            'A' => Some(0usize),
            'C' => Some(1),
            'G' => Some(2),
            'T' | 'U' => Some(3),
            _ => None,
        })
        .ok_or_else(|| ScanError::motif(&name, "couldn't find ACGTU in row names"))?;
    let (open, close) = match (line.find('['), line.rfind(']')) {
        (Some(open), Some(close)) if open < close => (open, close),
        _ => {
            return Err(ScanError::motif(
                &name,
                format!("couldn't find '[]' in row ({})", letter + 1),
            ));
        }
    };
    let mut row = Vec::new();
    for field in line[open + 1..close].split_whitespace() {
        let value = field
            .parse::<i32>()
            .map_err(|_| ScanError::motif(&name, format!("failed to parse count value '{field}'")))?;
        row.push(value);
    }
    if row.is_empty() {
        return Err(ScanError::motif(&name, "has an empty row"));
    }
    let width_so_far = counts.iter().map(Vec::len).max().unwrap_or(0);
    if width_so_far != 0 && row.len() != width_so_far {
        return Err(ScanError::motif(
            &name,
            "has rows with differing numbers of counts",
        ));
    }
    counts[letter] = row;
    Ok(())
}

// ---------------------------------------------------------------------------
// HOCOMOCO

fn read_hocomoco(lines: &[String], cfg: &ScanConfig) -> Result<Vec<Motif>> {
    let mut raw: Vec<RawMotif> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        let line_num = idx as u64 + 1;
        if line.starts_with('>') {
            let name = line[1..].trim_end().to_owned();
            debug!("found motif: {name}");
            raw.push(RawMotif {
                name,
                line: line_num,
                rows: Vec::new(),
            });
        } else if !line.trim().is_empty() {
            if let Some(motif) = raw.last_mut() {
                check_width(&motif.name, motif.rows.len())?;
                let row = parse_row(line, &motif.name)?;
                motif.rows.push(row);
            }
        }
    }
    info!("found {} HOCOMOCO motif(s)", raw.len());
    let scoring = Scoring {
        bkg: cfg.bkg,
        nsites: cfg.nsites,
        pseudocount: cfg.pseudocount,
    };
    build_prob_motifs(raw, &scoring, true)
}
