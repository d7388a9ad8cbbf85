//! Error types for the lineprinter-to-PDF engine.
//!
//! Configuration errors are reported before anything reaches the output
//! file and leave the session reusable.  Errors raised after the first
//! byte has been written are recorded on the session and every later
//! call returns them again; the only recovery at that point is a prior
//! checkpoint.

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds reported by the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Output path does not end in a `.pdf` extension
    #[error("Output filename must end in .pdf")]
    BadFilename,

    /// File exists but does not carry a PDF header
    #[error("File is not a PDF: missing %PDF-1.x header")]
    NotPdf,

    /// Existing file could not be parsed for appending
    #[error("Cannot append: {0}")]
    NoAppend(&'static str),

    /// Existing file was not written by this engine
    #[error("File was not produced by this engine")]
    NotProduced,

    /// File mode is `New` but the file already has content
    #[error("File exists and is not empty")]
    NotEmpty,

    /// Configuration value outside its accepted range
    #[error("Value out of range for {0}")]
    InvalidValue(&'static str),

    /// Negative value supplied for a dimension
    #[error("Negative value for {0}")]
    NegativeValue(&'static str),

    /// Configuration change attempted after printing began
    #[error("Configuration is frozen once printing has started")]
    Active,

    /// Page geometry constraints are mutually inconsistent
    #[error("Inconsistent page geometry: {0}")]
    InconsistentGeometry(&'static str),

    /// Font name is not one of the fourteen PDF base fonts
    #[error("Unknown font: {0}")]
    UnknownFont(String),

    /// Form name is not recognized
    #[error("Unknown form type: {0}")]
    UnknownForm(String),

    /// Form image is not a parsable JPEG
    #[error("Form image is not a usable JPEG")]
    BadJpeg,

    /// Output file error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error on a secondary file (form image, snapshot target)
    #[error("IO error on auxiliary file: {0}")]
    OtherIo(std::io::Error),

    /// Internal invariant violated
    #[error("Internal inconsistency: {0}")]
    Bugcheck(&'static str),

    /// An earlier fatal error left the output file unusable
    #[error("Session already failed: {0}")]
    Poisoned(String),
}

impl Error {
    /// True for errors that may have left a partially written file.
    ///
    /// Such errors are recorded on the session; later calls fail with
    /// the same error until the session is dropped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Bugcheck(_))
    }
}
