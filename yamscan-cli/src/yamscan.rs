//! # yamscan - fast and simple PWM scanning
//!
//! Scans DNA/RNA sequences with position weight matrices built from motif
//! files (MEME, JASPAR, HOMER, HOCOMOCO PCM) or a single consensus string,
//! reporting every window whose score clears an exact p-value threshold.
//!
//! ```bash
//! # scan a motif file against sequences
//! yamscan -m motifs.txt -s genome.fa -o hits.tsv
//!
//! # scan a consensus with ambiguity letters
//! yamscan -1 TGASTCA -s genome.fa
//!
//! # restrict scanning to BED ranges, four threads
//! yamscan -m motifs.txt -s genome.fa -x peaks.bed -j 4
//!
//! # only -s: per-sequence stats; only -m: parsed motif dump
//! yamscan -s genome.fa
//! ```

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::time::Instant;

use clap::{Arg, ArgAction, ArgGroup, Command};
use log::{info, LevelFilter};

use yamscan_core::background::Background;
use yamscan_core::bed::BedFile;
use yamscan_core::config::ScanConfig;
use yamscan_core::constants::VERSION;
use yamscan_core::dedup::{build_name_index, check_motif_names, check_seq_names};
use yamscan_core::motif::formats::parse_motifs;
use yamscan_core::motif::{Motif, Scoring};
use yamscan_core::runner;
use yamscan_core::sequence::{load_sequences, SeqSource};
use yamscan_core::types::{Result, ScanError};

fn cli() -> Command {
    Command::new("yamscan")
        .version(VERSION)
        .about("Fast and simple PWM scanning of DNA/RNA sequences")
        .arg(
            Arg::new("motifs")
                .short('m')
                .long("motifs")
                .value_name("FILE")
                .help("Motif file: MEME, JASPAR, HOMER, or HOCOMOCO (PCM) text")
                .conflicts_with("consensus"),
        )
        .arg(
            Arg::new("consensus")
                .short('1')
                .long("consensus")
                .value_name("SEQ")
                .help("Scan a single consensus sequence; IUPAC ambiguity letters allowed"),
        )
        .arg(
            Arg::new("seqs")
                .short('s')
                .long("seqs")
                .value_name("FILE")
                .help("FASTA/FASTQ sequences to scan; may be gzipped; '-' for stdin"),
        )
        .arg(
            Arg::new("bed")
                .short('x')
                .long("bed")
                .value_name("FILE")
                .help("Restrict scanning to the ranges of this BED file; may be gzipped")
                .conflicts_with("dedup"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file (default: stdout)"),
        )
        .arg(
            Arg::new("bkg")
                .short('b')
                .long("bkg")
                .value_name("A,C,G,T")
                .help("Comma-separated background probabilities for A,C,G,T|U"),
        )
        .arg(
            Arg::new("forward")
                .short('f')
                .long("forward-only")
                .action(ArgAction::SetTrue)
                .help("Only scan the forward strand"),
        )
        .arg(
            Arg::new("pvalue")
                .short('t')
                .long("pvalue")
                .value_name("FLOAT")
                .help("Threshold P-value (default: 0.0001)")
                .conflicts_with_all(["thresh0", "consensus"]),
        )
        .arg(
            Arg::new("thresh0")
                .short('0')
                .long("thresh0")
                .action(ArgAction::SetTrue)
                .help("Report all hits scoring zero or greater instead of using a threshold"),
        )
        .arg(
            Arg::new("pseudocount")
                .short('p')
                .long("pseudocount")
                .value_name("INT")
                .help("Pseudocount for PWM generation (default: 1)"),
        )
        .arg(
            Arg::new("nsites")
                .short('n')
                .long("nsites")
                .value_name("INT")
                .help("Number of motif sites used in PPM->PCM conversion (default: 1000)"),
        )
        .arg(
            Arg::new("mask")
                .short('M')
                .long("mask")
                .action(ArgAction::SetTrue)
                .help("Mask lower case letters and do not scan them"),
        )
        .arg(
            Arg::new("dedup")
                .short('d')
                .long("dedup")
                .action(ArgAction::SetTrue)
                .help("Deduplicate motif/sequence names instead of aborting"),
        )
        .arg(
            Arg::new("raw-names")
                .short('r')
                .long("raw-names")
                .action(ArgAction::SetTrue)
                .help("Do not trim motif and sequence names to the first word"),
        )
        .arg(
            Arg::new("all-in-memory")
                .short('l')
                .long("all-in-memory")
                .action(ArgAction::SetTrue)
                .help("Deactivate low memory mode and keep all sequences resident"),
        )
        .arg(
            Arg::new("threads")
                .short('j')
                .long("threads")
                .value_name("INT")
                .help("Number of scanning threads (default: 1); limited by the motif count"),
        )
        .arg(
            Arg::new("progress")
                .short('g')
                .long("progress")
                .action(ArgAction::SetTrue)
                .help("Print a progress bar during scanning"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Verbose mode"),
        )
        .arg(
            Arg::new("very-verbose")
                .short('w')
                .long("very-verbose")
                .action(ArgAction::SetTrue)
                .help("Very verbose mode"),
        )
        .group(
            ArgGroup::new("inputs")
                .args(["motifs", "consensus", "seqs"])
                .multiple(true)
                .required(true),
        )
}

fn init_logger(verbose: bool, very_verbose: bool) {
    let level = if very_verbose {
        LevelFilter::Debug
    } else if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn parse_positive_int(matches: &clap::ArgMatches, id: &str, flag: char) -> Result<Option<i32>> {
    match matches.get_one::<String>(id) {
        None => Ok(None),
        Some(text) => {
            let value: i32 = text.parse().map_err(|_| {
                ScanError::Config(format!("failed to parse -{flag} value '{text}'"))
            })?;
            if value < 1 {
                return Err(ScanError::Config(format!(
                    "-{flag} must be a positive integer"
                )));
            }
            Ok(Some(value))
        }
    }
}

fn run() -> Result<()> {
    let matches = cli().get_matches();
    init_logger(matches.get_flag("verbose"), matches.get_flag("very-verbose"));
    let command_line: String = std::env::args().skip(1).collect::<Vec<_>>().join(" ");

    let mut cfg = ScanConfig {
        scan_rc: !matches.get_flag("forward"),
        dedup: matches.get_flag("dedup"),
        trim_names: !matches.get_flag("raw-names"),
        low_mem: !matches.get_flag("all-in-memory"),
        thresh0: matches.get_flag("thresh0"),
        mask: matches.get_flag("mask"),
        progress: matches.get_flag("progress"),
        ..ScanConfig::default()
    };
    if let Some(text) = matches.get_one::<String>("pvalue") {
        cfg.pvalue = text
            .parse()
            .map_err(|_| ScanError::Config(format!("failed to parse -t value '{text}'")))?;
        if !(0.0..=1.0).contains(&cfg.pvalue) {
            return Err(ScanError::Config(
                "-t cannot be less than 0 or more than 1".into(),
            ));
        }
    }
    if let Some(value) = parse_positive_int(&matches, "pseudocount", 'p')? {
        cfg.pseudocount = value;
    }
    if let Some(value) = parse_positive_int(&matches, "nsites", 'n')? {
        cfg.nsites = value;
    }
    if let Some(value) = parse_positive_int(&matches, "threads", 'j')? {
        cfg.threads = value as usize;
    }
    if let Some(text) = matches.get_one::<String>("bkg") {
        cfg.bkg = Background::parse(text)?;
        cfg.user_bkg = true;
        info!("using user-supplied background: {:?}", cfg.bkg.as_array());
    }

    let source = matches
        .get_one::<String>("seqs")
        .map(|arg| SeqSource::from_arg(arg));
    let bed_path = matches.get_one::<String>("bed");
    if !cfg.scan_rc && bed_path.is_some() {
        info!("the -f arg is ignored when -x is used");
    }

    // Build motifs from a consensus string or a motif file.
    let mut is_consensus = false;
    let mut motifs: Vec<Motif> = Vec::new();
    if let Some(consensus) = matches.get_one::<String>("consensus") {
        cfg = cfg.for_consensus();
        is_consensus = true;
        let scoring = Scoring {
            bkg: cfg.bkg,
            nsites: cfg.nsites,
            pseudocount: cfg.pseudocount,
        };
        motifs.push(Motif::from_consensus(consensus, &scoring)?);
    } else if let Some(path) = matches.get_one::<String>("motifs") {
        let file = File::open(path).map_err(|e| {
            ScanError::Config(format!("failed to open motif file \"{path}\" [{e}]"))
        })?;
        let parsed = parse_motifs(BufReader::new(file), &cfg)?;
        cfg.bkg = parsed.bkg;
        motifs = parsed.motifs;
    }
    let mut dedupped = false;
    if !motifs.is_empty() {
        dedupped |= check_motif_names(&mut motifs, cfg.dedup)?;
    }

    // Multi-threading only pays off for several motifs scanned in memory.
    if is_consensus || source.is_none() || motifs.len() <= 1 {
        if cfg.threads > 1 {
            info!("multi-threading not available for current inputs");
        }
        cfg.threads = 1;
    }
    if let Some(src) = &source {
        if (src.is_stdin() || cfg.threads > 1) && cfg.low_mem {
            info!("deactivating low-mem mode");
            cfg.low_mem = false;
        }
    }
    if cfg.low_mem && source.is_some() {
        info!("running in low-mem mode");
    }

    let mut out: Box<dyn Write + Send> = match matches.get_one::<String>("output") {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| {
            ScanError::Config(format!("failed to create output file \"{path}\" [{e}]"))
        })?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };

    match &source {
        None => {
            // Motifs but no sequences: dump the parsed motifs.
            runner::print_motifs(&cfg, &mut motifs, is_consensus, &mut out)?;
        }
        Some(source) => {
            let started = Instant::now();
            let mut seqs = load_sequences(source, cfg.trim_names, !cfg.low_mem)?;
            info!("needed {:.2?} to read sequences", started.elapsed());
            dedupped |= check_seq_names(&mut seqs.names, cfg.dedup, bed_path.is_some())?;
            let bed = match bed_path {
                Some(path) => {
                    let reader = SeqSource::from_arg(path).open()?;
                    let mut bed = BedFile::parse(reader, cfg.trim_names)?;
                    bed.resolve(&build_name_index(&seqs.names))?;
                    bed.clamp_to_sequences(&seqs.sizes)?;
                    bed.log_stats(seqs.len());
                    Some(bed)
                }
                None => None,
            };
            if motifs.is_empty() {
                runner::print_seq_stats(&cfg, &seqs, bed.as_ref(), source, &mut out)?;
            } else {
                runner::run_scan(
                    &cfg,
                    motifs,
                    &seqs,
                    bed.as_ref(),
                    source,
                    is_consensus,
                    dedupped,
                    &command_line,
                    &mut out,
                )?;
            }
        }
    }
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("Error: {error}");
        eprintln!("Run yamscan -h to see usage.");
        std::process::exit(1);
    }
}
