use thiserror::Error;

/// Error types surfaced by motif parsing, sequence loading, and scanning.
#[derive(Error, Debug)]
pub enum ScanError {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed motif file content, with the offending line number
    #[error("invalid motif file (L{line}): {msg}")]
    MotifFormat { line: u64, msg: String },
    /// A parsed motif violates a structural constraint
    #[error("invalid motif [{name}]: {msg}")]
    Motif { name: String, msg: String },
    /// Background probabilities could not be parsed or validated
    #[error("invalid background: {0}")]
    Background(String),
    /// Malformed BED file content, with the offending line number
    #[error("invalid bed file (L{line}): {msg}")]
    Bed { line: u64, msg: String },
    /// Sequence input could not be read or contained no usable data
    #[error("invalid sequence input: {0}")]
    Sequence(String),
    /// Duplicate motif or sequence names without deduplication enabled
    #[error("encountered duplicate {kind} name(s){listing}")]
    DuplicateNames { kind: &'static str, listing: String },
    /// The exact score distribution would exceed the internal size cap
    #[error("requested CDF size for [{name}] is too large ({size}>{max}); make sure no background values are below the allowed minimum")]
    CdfTooLarge { name: String, size: u64, max: u64 },
    /// Invalid option combination or value
    #[error("{0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;

impl ScanError {
    pub(crate) fn motif_format(line: u64, msg: impl Into<String>) -> Self {
        Self::MotifFormat {
            line,
            msg: msg.into(),
        }
    }

    pub(crate) fn motif(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Motif {
            name: name.into(),
            msg: msg.into(),
        }
    }

    pub(crate) fn bed(line: u64, msg: impl Into<String>) -> Self {
        Self::Bed {
            line,
            msg: msg.into(),
        }
    }
}
