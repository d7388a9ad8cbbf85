//! Session configuration: page geometry, pitch, fonts, and form styling.
//!
//! A [`Config`] is owned by the writer session and is frozen once the
//! first byte of output has been produced.  Range checks happen in the
//! individual setters; the cross-field geometry checks that need every
//! value at once run in [`Config::validate_geometry`] immediately
//! before the first write.

use crate::error::{Error, Result};

/// Points per inch.
pub const PT: f64 = 72.0;

/// The fourteen base fonts every PDF reader must provide.
///
/// Fonts are never embedded; names are matched case-sensitively.
pub const BASE_FONTS: &[&str] = &[
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Helvetica",
    "Helvetica-Bold",
    "HelveticaOblique",
    "Helvetica-BoldOblique",
    "Symbol",
    "ZapfDingbats",
];

/// Names accepted by [`FormType::parse`], in declaration order.
pub const FORM_NAMES: &[&str] = &["plain", "greenbar", "bluebar", "graybar", "yellowbar"];

/// How to treat an existing output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    /// File must be empty (or absent)
    #[default]
    New,
    /// Append pages if the file is a PDF produced by this engine
    Append,
    /// Replace the contents of an existing file
    Replace,
}

impl FileMode {
    /// Parse a mode name, case-insensitively.
    pub fn parse(name: &str) -> Result<Self> {
        if name.eq_ignore_ascii_case("new") {
            Ok(FileMode::New)
        } else if name.eq_ignore_ascii_case("append") {
            Ok(FileMode::Append)
        } else if name.eq_ignore_ascii_case("replace") {
            Ok(FileMode::Replace)
        } else {
            Err(Error::InvalidValue("file mode"))
        }
    }
}

/// Form background drawn behind the text of every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormType {
    /// White page, holes only
    Plain,
    /// Alternating green bars
    #[default]
    GreenBar,
    /// Alternating blue bars
    BlueBar,
    /// Alternating gray bars
    GrayBar,
    /// Alternating yellow bars
    YellowBar,
    /// Scaled JPEG image
    Image,
}

/// RGB triples (as PDF operand text) for one form style.
#[derive(Debug, Clone, Copy)]
pub struct FormColors {
    /// Rule and border color
    pub line: &'static str,
    /// Bar fill color
    pub bar: &'static str,
    /// Ruler label color
    pub text: &'static str,
}

const RGB_BLACK: &str = "0 0 0";

impl FormType {
    /// Parse a form name, case-insensitively.  `Image` is selected by
    /// supplying a form image, never by name.
    pub fn parse(name: &str) -> Result<Self> {
        match FORM_NAMES.iter().position(|f| name.eq_ignore_ascii_case(f)) {
            Some(0) => Ok(FormType::Plain),
            Some(1) => Ok(FormType::GreenBar),
            Some(2) => Ok(FormType::BlueBar),
            Some(3) => Ok(FormType::GrayBar),
            Some(4) => Ok(FormType::YellowBar),
            _ => Err(Error::UnknownForm(name.to_string())),
        }
    }

    /// Colors used to paint this form.  Image forms draw their rules
    /// and labels in the plain (black) colors.
    pub fn colors(self) -> FormColors {
        match self {
            FormType::Plain | FormType::Image => FormColors {
                line: RGB_BLACK,
                bar: RGB_BLACK,
                text: RGB_BLACK,
            },
            FormType::GreenBar => FormColors {
                line: "0.780 0.860 0.780",
                bar: "0.880 0.960 0.880",
                text: "0.780 0.860 0.780",
            },
            FormType::BlueBar => FormColors {
                line: "0.794 0.900 0.900",
                bar: "0.804 1.000 1.000",
                text: "0.794 0.900 0.900",
            },
            FormType::GrayBar => FormColors {
                line: "0.700 0.700 0.700",
                bar: "0.800 0.800 0.800",
                text: "0.700 0.700 0.700",
            },
            // Yellow labels are unreadable; gray stands in.
            FormType::YellowBar => FormColors {
                line: "0.900 0.900 0.800",
                bar: "1.000 1.000 0.600",
                text: "0.700 0.700 0.700",
            },
        }
    }
}

/// Validate a font name against the base-14 set.
pub fn check_font(name: &str) -> Result<()> {
    if BASE_FONTS.contains(&name) {
        Ok(())
    } else {
        Err(Error::UnknownFont(name.to_string()))
    }
}

/// Escape `\`, `(` and `)` for use inside a PDF literal string.
pub fn escape_pdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\\' || c == '(' || c == ')' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Default document title; `DisplayDocTitle` is only requested when
/// the caller changes it.
pub const DEFAULT_TITLE: &str = "Lineprinter data";

/// Frozen-once-printing session configuration.
///
/// Defaults describe standard lineprinter stationery: 14.875 × 11 in
/// sheet, 6 LPI, 10 CPI, 132 columns, greenbar.
#[derive(Debug, Clone)]
pub struct Config {
    /// Existing-file policy
    pub mode: FileMode,
    /// Characters per inch (fractional pitches were real hardware)
    pub cpi: f64,
    /// Lines per inch, 6 or 8
    pub lpi: u32,
    /// Print columns, used to center output
    pub cols: u32,
    /// Sheet width, inches
    pub wid: f64,
    /// Sheet length, inches
    pub len: f64,
    /// Text font
    pub font: String,
    /// Ruler number font
    pub nfont: String,
    /// Ruler label font
    pub nbold: String,
    /// Document title (stored pre-escaped)
    pub title: String,
    /// Top margin above the first bar, inches
    pub top: f64,
    /// Logical top-of-form line; `None` until set, resolved to
    /// `top * lpi` at first write
    pub tof: Option<u32>,
    /// Bottom margin below the last bar, inches
    pub bot: f64,
    /// Tractor-feed margin on each side, inches
    pub margin: f64,
    /// Width of the line-number column, inches (0 omits it)
    pub lno: f64,
    /// Background form style
    pub formtype: FormType,
    /// JPEG path when `formtype` is `Image`
    pub formfile: Option<String>,
    /// Bar height, inches
    pub barh: f64,
    /// Write content streams uncompressed when false
    pub compress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: FileMode::New,
            cpi: 10.0,
            lpi: 6,
            cols: 132,
            wid: 14.875,
            len: 11.0,
            font: "Courier".to_string(),
            nfont: "Times-Roman".to_string(),
            nbold: "Times-Bold".to_string(),
            title: DEFAULT_TITLE.to_string(),
            top: 1.0,
            tof: None,
            bot: 0.5,
            margin: 0.470,
            lno: 0.100,
            formtype: FormType::GreenBar,
            formfile: None,
            barh: 0.5,
            compress: true,
        }
    }
}

impl Config {
    /// Lines per page at the current pitch.
    pub fn lpp(&self) -> u32 {
        (self.len * self.lpi as f64) as u32
    }

    /// Top-of-form offset, resolving the unset default.
    pub fn tof(&self) -> u32 {
        self.tof.unwrap_or((self.top * self.lpi as f64) as u32)
    }

    /// Cross-field checks run immediately before the first write.
    ///
    /// Individual ranges were checked when the values were set; these
    /// constraints involve several values at once and can only be
    /// judged once all of them are final.
    pub fn validate_geometry(&self) -> Result<()> {
        let printable = self.wid - 2.0 * (self.margin + self.lno);

        // Tractors need 3.0 in of paper between the margins.
        if printable < 3.0 {
            return Err(Error::InconsistentGeometry("printable width under 3.0 in"));
        }
        if printable < self.cols as f64 / self.cpi {
            return Err(Error::InconsistentGeometry("columns do not fit printable width"));
        }
        if self.len * (self.lpi as f64) < 4.0 {
            return Err(Error::InconsistentGeometry("page shorter than 4 lines"));
        }
        if self.tof() as f64 > self.len * self.lpi as f64 {
            return Err(Error::InconsistentGeometry("TOF offset exceeds page length"));
        }
        if self.formtype != FormType::Image && self.barh < 1.0 / self.lpi as f64 {
            return Err(Error::InconsistentGeometry("bar shorter than one line"));
        }
        Ok(())
    }
}
