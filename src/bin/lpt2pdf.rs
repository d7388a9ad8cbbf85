//! Command-line driver for the lineprinter-to-PDF engine.
//!
//! ```text
//! lpt2pdf [-options] [infiles] outfile.pdf
//! ```
//!
//! Defaults describe a standard lineprinter: 14.875 x 11.000 in sheet,
//! 6 LPI, 10 CPI, greenbar.  Input files are concatenated; `-` (or no
//! input at all) reads stdin.  The output file must be seekable.

use std::io::Read;
use std::process::ExitCode;

use lptpdf::{FileMode, PdfWriter};

/// Switch table: keyword, value kind, default shown in help, help text.
const OPTIONS: &[(&str, Kind, &str, &str)] = &[
    ("-bar", Kind::Number, "0.500in", "Height of the form bar."),
    ("-bottom", Kind::Number, "0.500in", "Bottom margin in inches; below this there is no bar."),
    ("-columns", Kind::Integer, "132", "Number of print columns, used to center output."),
    ("-cpi", Kind::Number, "10", "Characters per inch; fractional pitch is supported."),
    ("-font", Kind::String, "Courier", "Font used to render the input data."),
    ("-form", Kind::String, "greenbar", "Form background; plain is a white page."),
    ("-image", Kind::String, "<none>", "JPEG image used as the form background, scaled to the printable area."),
    ("-length", Kind::Number, "11.000in", "Page length in inches, inclusive of all margins."),
    ("-lfont", Kind::String, "Times-Bold", "Font used for the ruler pitch labels."),
    ("-lno", Kind::Number, "0.100in", "Width of the line number column; 0 to omit it."),
    ("-lpi", Kind::Integer, "6", "Lines per inch: 6 or 8."),
    ("-nfont", Kind::String, "Times-Roman", "Font used for the ruler numbers."),
    ("-require", Kind::String, "new", "File policy: new, append or replace."),
    ("-side", Kind::Number, "0.470in", "Width of the tractor feed margin on each side."),
    ("-title", Kind::String, "Lineprinter data", "Title embedded in the PDF document."),
    ("-tof", Kind::Integer, "top margin in lines", "Logical top-of-form line that <FF> advances to."),
    ("-top", Kind::Number, "1.000in", "Top margin in inches, above the first bar."),
    ("-width", Kind::Number, "14.875in", "Page width in inches, inclusive of all margins."),
];

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    String,
    Number,
    Integer,
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(code) => code,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::from(3)
        },
    }
}

fn run() -> Result<ExitCode, String> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
        return Ok(ExitCode::SUCCESS);
    }

    // Split into switches, input files, and the trailing output file.
    let mut i = 0;
    let mut switches: Vec<(&str, &str)> = Vec::new();
    while i < args.len() {
        if args[i] == "--" {
            i += 1;
            break;
        }
        if !args[i].starts_with('-') || args[i] == "-" {
            break;
        }
        let value = args.get(i + 1).ok_or_else(|| format!("? {} requires an argument", args[i]))?;
        switches.push((args[i].as_str(), value.as_str()));
        i += 2;
    }

    if i >= args.len() {
        return Err("?No output file given, --help for usage".to_string());
    }
    let output = &args[args.len() - 1];
    let inputs = &args[i..args.len() - 1];

    let mut pdf = PdfWriter::open(output).map_err(|e| format!("{output}: {e}"))?;

    for (key, value) in switches {
        apply(&mut pdf, key, value).map_err(|e| format!("{value}: {e}"))?;
    }

    if inputs.is_empty() {
        do_stream(&mut pdf, &mut std::io::stdin().lock(), "<stdin>")?;
    } else {
        for input in inputs {
            if input == "-" {
                do_stream(&mut pdf, &mut std::io::stdin().lock(), "<stdin>")?;
            } else {
                let mut fh =
                    std::fs::File::open(input).map_err(|e| format!("{input}: {e}"))?;
                do_stream(&mut pdf, &mut fh, input)?;
            }
        }
    }

    pdf.close().map_err(|e| format!("pdf_close failed: {e}"))?;
    Ok(ExitCode::SUCCESS)
}

fn apply(pdf: &mut PdfWriter, key: &str, value: &str) -> lptpdf::Result<()> {
    let kind = OPTIONS
        .iter()
        .find(|(k, ..)| *k == key)
        .map(|(_, kind, ..)| *kind);
    let kind = match kind {
        Some(k) => k,
        None => {
            eprintln!("Unknown switch {key}, --help for usage");
            std::process::exit(3);
        },
    };

    match (key, kind) {
        ("-font", _) => pdf.set_text_font(value),
        ("-nfont", _) => pdf.set_number_font(value),
        ("-lfont", _) => pdf.set_label_font(value),
        ("-form", _) => pdf.set_form(value),
        ("-image", _) => pdf.set_form_image(value),
        ("-title", _) => pdf.set_title(value),
        ("-require", _) => pdf.set_file_mode(FileMode::parse(value)?),
        ("-columns", _) => pdf.set_cols(parse_integer(key, value)),
        ("-lpi", _) => pdf.set_lpi(parse_integer(key, value)),
        ("-tof", _) => pdf.set_tof_offset(parse_integer(key, value)),
        ("-bar", _) => pdf.set_bar_height(parse_dimension(key, value)),
        ("-bottom", _) => pdf.set_bottom_margin(parse_dimension(key, value)),
        ("-cpi", _) => pdf.set_cpi(parse_dimension(key, value)),
        ("-length", _) => pdf.set_page_length(parse_dimension(key, value)),
        ("-lno", _) => pdf.set_lno_width(parse_dimension(key, value)),
        ("-side", _) => pdf.set_side_margin(parse_dimension(key, value)),
        ("-top", _) => pdf.set_top_margin(parse_dimension(key, value)),
        ("-width", _) => pdf.set_page_width(parse_dimension(key, value)),
        _ => unreachable!("switch table covers all keys"),
    }
}

fn parse_integer(key: &str, value: &str) -> u32 {
    match value.parse() {
        Ok(v) => v,
        Err(_) => {
            eprintln!("? not an integer for {key} value: {value}");
            std::process::exit(3);
        },
    }
}

/// Parse a linear dimension; `in` (default), `cm` and `mm` suffixes
/// are accepted.
fn parse_dimension(key: &str, value: &str) -> f64 {
    let (number, divisor) = if let Some(v) = value.strip_suffix("cm") {
        (v, 2.54)
    } else if let Some(v) = value.strip_suffix("mm") {
        (v, 25.4)
    } else if let Some(v) = value.strip_suffix("in") {
        (v, 1.0)
    } else {
        (value, 1.0)
    };
    match number.parse::<f64>() {
        Ok(v) => v / divisor,
        Err(_) => {
            eprintln!("?Unknown qualifier for {key} value: {value}");
            std::process::exit(3);
        },
    }
}

fn do_stream<R: Read>(pdf: &mut PdfWriter, fh: &mut R, name: &str) -> Result<(), String> {
    let mut buf = [0u8; 8192];
    let mut total: u64 = 0;

    loop {
        let n = fh.read(&mut buf).map_err(|e| format!("Error reading {name}: {e}"))?;
        if n == 0 {
            break;
        }
        total += n as u64;
        pdf.print(&buf[..n]).map_err(|e| format!("pdf_print failed: {e}"))?;
    }

    if total > 0 {
        eprintln!("Read {total} characters from {name}");
    }
    let (page, line) = pdf.position();
    eprintln!("End of {name}, at page {page} line {line}");
    Ok(())
}

fn usage() {
    eprintln!(
        "Usage:\n\
         lpt2pdf [-options] infiles outfile\n\
         \n\
         lpt2pdf will turn an ASCII input file into a PDF file on simulated paper.\n\
         \n\
         The defaults are for a standard lineprinter - 14.875 x 11.000 in,\n\
         6LPI, 10 CPI.  (Lines and Characters per inch.)\n\
         \n\
         Default is to read from stdin.  '-' as an input file also means stdin.\n\
         The output file must be seekable, generally a disk.  A pipe will not work.\n\
         \n\
         Options, naturally are optional:"
    );
    for (key, kind, def, help) in OPTIONS {
        let kind = match kind {
            Kind::Number => "n.m",
            Kind::Integer => "integer",
            Kind::String => "string",
        };
        eprintln!("    {key} {kind}\n        {help}\n        Default: {def}\n");
    }
    eprintln!("    Accepted fonts (case-sensitive, never embedded):");
    for font in lptpdf::font_names() {
        eprintln!("        {font}");
    }
    eprintln!("\n    Accepted forms:");
    for form in lptpdf::form_names() {
        eprintln!("        {form}");
    }
    eprintln!(
        "\n    Linear dimensions may be specified in cm or mm by suffixing the\n\
         number with cm or mm respectively.\n\
         \n\
         In general, you don't need any options to get usable output."
    );
}
