#![allow(clippy::too_many_arguments)]
#![allow(clippy::manual_range_contains)]

//! # lptpdf
//!
//! Turn ASCII lineprinter output into PDF on simulated fan-fold
//! stationery: tractor-feed holes, greenbar (or blue/gray/yellow)
//! banding, line-number rulers, optional JPEG form backgrounds,
//! configurable pitch and page geometry.
//!
//! ## Core features
//!
//! - **Control handling**: CR overprint, LF/FF pagination with a
//!   configurable top-of-form offset, VT-style escape stripping with
//!   `CSI Pn z` pitch selection
//! - **Incremental append**: reopen a finished file and splice new
//!   pages into its page tree in O(1) extra scanning
//! - **Checkpointing**: keep a long-lived output file valid between
//!   bursts of output, so a crashed producer loses only its tail
//! - **LZW content streams**: PDF `/LZWDecode` compression with
//!   automatic fallback to raw text when it does not pay
//!
//! Only the fourteen PDF base fonts are used; nothing is embedded.
//! Append mode accepts only files this engine produced.
//!
//! ## Quick start
//!
//! ```no_run
//! use lptpdf::PdfWriter;
//!
//! # fn main() -> lptpdf::Result<()> {
//! let mut pdf = PdfWriter::open("listing.pdf")?;
//! pdf.set_form("greenbar")?;
//! pdf.set_cpi(10.0)?;
//! pdf.print(b"HELLO, WORLD\r\n\x0c")?;
//! let (page, line) = pdf.position();
//! println!("at page {page}, line {line}");
//! pdf.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Input side: escape stripping and pagination
pub mod lines;
pub mod parser;

// PDF assembly
pub mod append;
pub mod document;
pub mod form;
pub mod xref;

// Stream compression
pub mod lzw;

// Form image support
pub mod jpeg;

// Configuration
pub mod config;

// Re-exports
pub use config::{Config, FileMode, FormType};
pub use document::{is_pdf_file, PdfWriter};
pub use error::{Error, Result};

/// Names of the fourteen accepted base fonts.
pub fn font_names() -> &'static [&'static str] {
    config::BASE_FONTS
}

/// Names of the accepted form backgrounds.
pub fn form_names() -> &'static [&'static str] {
    config::FORM_NAMES
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
