//! Writer session: the long-lived context that owns the output file.
//!
//! A [`PdfWriter`] is created by [`PdfWriter::open`], configured with
//! the `set_*` methods, fed bytes through [`print`], and finished with
//! [`close`].  Between bursts of output, [`checkpoint`] writes enough
//! trailing metadata that the file is a valid PDF right now, then
//! rewinds so the next page overwrites it; a crash after a checkpoint
//! loses only the unflushed tail.
//!
//! Nothing touches the file until the first effective byte of output:
//! configuration and (in append mode) the existing file structure are
//! validated first, so an error up to that point leaves the file
//! exactly as it was.
//!
//! [`print`]: PdfWriter::print
//! [`close`]: PdfWriter::close
//! [`checkpoint`]: PdfWriter::checkpoint

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use sha1::{Digest, Sha1};

use crate::append::{self, AppendInfo};
use crate::config::{check_font, escape_pdf_string, Config, FileMode, FormType, DEFAULT_TITLE, PT};
use crate::error::{Error, Result};
use crate::form::{self, real};
use crate::jpeg;
use crate::lines::LineBuffer;
use crate::lzw::LzwEncoder;
use crate::parser::InputParser;
use crate::xref::ObjectTable;

/// Binary comment after the header line; tells transports this is not
/// a text file.
const HEADER: &[u8] = b"%PDF-1.4\n%\xC2\xA5\xC2\xB1\xC3\xAB\n";

/// Producer string written to the info dictionary.  The `LPTPDF
/// Version ` prefix is what append mode looks for.
const PRODUCER: &str = "LPTPDF Version 1.0";

/// Lineprinter-to-PDF writer session.
///
/// Owns the output file handle, the configuration, the escape parser,
/// the page buffer, the object table and the running document digest.
/// Scratch buffers grow as needed and are reused across pages.
pub struct PdfWriter {
    file: File,
    cfg: Config,
    parser: InputParser,
    lines: LineBuffer,
    table: ObjectTable,
    lzw: LzwEncoder,
    sha: Sha1,

    /// Configuration frozen (first print call seen)
    active: bool,
    /// Existing-file inspection done
    initialized: bool,
    /// Header/anchor written for the current interval
    written: bool,
    /// Continuing after a checkpoint
    resumed: bool,
    /// Fatal error already hit; message repeated to later calls
    fatal: Option<String>,

    /// Append state recovered from the previous sessions
    append: Option<AppendInfo>,
    /// Byte position of the rewritable `/Parent` slot in the old anchor
    anchor_patch_pos: Option<u64>,
    /// File position saved by the most recent checkpoint
    checkpoint_pos: Option<u64>,

    /// Precomputed form background (empty until first write)
    form_buf: Vec<u8>,
    /// Image XObject id when the form is a JPEG
    form_obj: Option<u32>,
    /// Object id of this session's first page content stream
    page_base: u32,

    /// Pages emitted this session
    page: u32,
    /// Current line, 0 while the page is untouched
    line: u32,
    /// Lines per page at the current pitch
    lpp: u32,
    /// Resolved top-of-form offset
    tof: u32,

    parse_buf: Vec<u16>,
    page_buf: Vec<u8>,
}

impl PdfWriter {
    /// Open (or create) `path` for writing.
    ///
    /// The path must end in `.pdf` (any case).  The file is opened
    /// read/write without truncation and must be seekable; which of
    /// new/append/replace applies is decided by [`set_file_mode`] and
    /// enforced at the first [`print`].
    ///
    /// [`set_file_mode`]: Self::set_file_mode
    /// [`print`]: Self::print
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if !ok {
            return Err(Error::BadFilename);
        }

        let mut file = File::options().read(true).write(true).create(true).open(path)?;
        // Checkpoint and append both need absolute seeks; pipes and
        // ttys cannot provide them.
        file.stream_position()?;

        Ok(Self {
            file,
            cfg: Config::default(),
            parser: InputParser::new(),
            lines: LineBuffer::new(),
            table: ObjectTable::new(),
            lzw: LzwEncoder::new(),
            sha: Sha1::new(),
            active: false,
            initialized: false,
            written: false,
            resumed: false,
            fatal: None,
            append: None,
            anchor_patch_pos: None,
            checkpoint_pos: None,
            form_buf: Vec::new(),
            form_obj: None,
            page_base: 1,
            page: 0,
            line: 0,
            lpp: 0,
            tof: 0,
            parse_buf: Vec::new(),
            page_buf: Vec::new(),
        })
    }

    // ----- configuration ------------------------------------------------

    fn settable(&self) -> Result<()> {
        if self.active {
            Err(Error::Active)
        } else {
            Ok(())
        }
    }

    fn non_negative(v: f64, name: &'static str) -> Result<()> {
        if v < 0.0 {
            Err(Error::NegativeValue(name))
        } else {
            Ok(())
        }
    }

    /// Existing-file policy; see [`FileMode`].
    pub fn set_file_mode(&mut self, mode: FileMode) -> Result<()> {
        self.settable()?;
        self.cfg.mode = mode;
        Ok(())
    }

    /// Horizontal pitch in characters per inch, 1.0 to 20.0.
    pub fn set_cpi(&mut self, cpi: f64) -> Result<()> {
        self.settable()?;
        Self::non_negative(cpi, "cpi")?;
        if !(1.0..=20.0).contains(&cpi) {
            return Err(Error::InvalidValue("cpi"));
        }
        self.cfg.cpi = cpi;
        Ok(())
    }

    /// Vertical pitch in lines per inch; 6 and 8 are supported.
    pub fn set_lpi(&mut self, lpi: u32) -> Result<()> {
        self.settable()?;
        if lpi != 6 && lpi != 8 {
            return Err(Error::InvalidValue("lpi"));
        }
        self.cfg.lpi = lpi;
        Ok(())
    }

    /// Print columns; used to center output between the margins.
    pub fn set_cols(&mut self, cols: u32) -> Result<()> {
        self.settable()?;
        self.cfg.cols = cols;
        Ok(())
    }

    /// Sheet width in inches, at least 3.0.
    pub fn set_page_width(&mut self, wid: f64) -> Result<()> {
        self.settable()?;
        Self::non_negative(wid, "width")?;
        if wid < 3.0 {
            return Err(Error::InvalidValue("width"));
        }
        self.cfg.wid = wid;
        Ok(())
    }

    /// Sheet length in inches, at least 2.0.
    pub fn set_page_length(&mut self, len: f64) -> Result<()> {
        self.settable()?;
        Self::non_negative(len, "length")?;
        if len < 2.0 {
            return Err(Error::InvalidValue("length"));
        }
        self.cfg.len = len;
        Ok(())
    }

    /// Top margin in inches (above the first bar).
    pub fn set_top_margin(&mut self, top: f64) -> Result<()> {
        self.settable()?;
        Self::non_negative(top, "top margin")?;
        self.cfg.top = top;
        Ok(())
    }

    /// Bottom margin in inches (below the last bar).
    pub fn set_bottom_margin(&mut self, bot: f64) -> Result<()> {
        self.settable()?;
        Self::non_negative(bot, "bottom margin")?;
        self.cfg.bot = bot;
        Ok(())
    }

    /// Tractor-feed margin on each side, at least 0.350 in.
    pub fn set_side_margin(&mut self, margin: f64) -> Result<()> {
        self.settable()?;
        Self::non_negative(margin, "side margin")?;
        if margin < 0.350 {
            return Err(Error::InvalidValue("side margin"));
        }
        self.cfg.margin = margin;
        Ok(())
    }

    /// Width of the line-number column in inches; 0 omits it,
    /// otherwise at least 0.1.
    pub fn set_lno_width(&mut self, lno: f64) -> Result<()> {
        self.settable()?;
        Self::non_negative(lno, "line-number width")?;
        if lno != 0.0 && lno < 0.1 {
            return Err(Error::InvalidValue("line-number width"));
        }
        self.cfg.lno = lno;
        Ok(())
    }

    /// Height of a form bar in inches.
    pub fn set_bar_height(&mut self, barh: f64) -> Result<()> {
        self.settable()?;
        Self::non_negative(barh, "bar height")?;
        self.cfg.barh = barh;
        Ok(())
    }

    /// Logical top-of-form line (the line a form feed advances to).
    /// Defaults to `top * lpi` when never set.
    pub fn set_tof_offset(&mut self, tof: u32) -> Result<()> {
        self.settable()?;
        self.cfg.tof = Some(tof);
        Ok(())
    }

    /// Select a named form background; see [`crate::form_names`].
    pub fn set_form(&mut self, name: &str) -> Result<()> {
        self.settable()?;
        self.cfg.formtype = FormType::parse(name)?;
        Ok(())
    }

    /// Use a JPEG file as the form background, scaled to the printable
    /// width.  The file must exist now; it is read at first write.
    pub fn set_form_image<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.settable()?;
        let path = path.as_ref();
        File::open(path).map_err(Error::OtherIo)?;
        self.cfg.formfile = Some(path.to_string_lossy().into_owned());
        self.cfg.formtype = FormType::Image;
        Ok(())
    }

    /// Font for the printed text (base-14 name, case-sensitive).
    pub fn set_text_font(&mut self, name: &str) -> Result<()> {
        self.settable()?;
        check_font(name)?;
        self.cfg.font = name.to_string();
        Ok(())
    }

    /// Font for the ruler numbers.
    pub fn set_number_font(&mut self, name: &str) -> Result<()> {
        self.settable()?;
        check_font(name)?;
        self.cfg.nfont = name.to_string();
        Ok(())
    }

    /// Font for the ruler pitch labels.
    pub fn set_label_font(&mut self, name: &str) -> Result<()> {
        self.settable()?;
        check_font(name)?;
        self.cfg.nbold = name.to_string();
        Ok(())
    }

    /// Document title, stored into the info dictionary.
    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.settable()?;
        self.cfg.title = escape_pdf_string(title);
        Ok(())
    }

    /// Enable or disable LZW compression of content streams.  Even
    /// when enabled, a stream that fails to shrink is written raw.
    pub fn set_compression(&mut self, compress: bool) -> Result<()> {
        self.settable()?;
        self.cfg.compress = compress;
        Ok(())
    }

    // ----- printing -----------------------------------------------------

    /// Append printer output.
    ///
    /// Bytes may arrive in any chunking; control and escape sequences
    /// resume across calls.  LF advances the line, FF emits the page,
    /// CR is kept as an overprint marker.  The first effective output
    /// triggers header emission and freezes the configuration.
    pub fn print(&mut self, bytes: &[u8]) -> Result<()> {
        self.guard()?;
        let r = self.print_inner(bytes);
        self.seal(r)
    }

    fn print_inner(&mut self, bytes: &[u8]) -> Result<()> {
        let mut parsed = std::mem::take(&mut self.parse_buf);
        parsed.clear();

        if !self.written {
            // All values are final now; judge them together.  Failure
            // here reaches neither the file nor the parser state.
            self.cfg.validate_geometry()?;
            self.lpp = self.cfg.lpp();
            self.cfg.tof = Some(self.cfg.tof());
            self.tof = self.cfg.tof();

            self.active = true;
            if !self.initialized {
                self.init()?;
                self.initialized = true;
            }

            self.sha.update(bytes);
            let stripped = self.parser.parse(bytes, !self.resumed, &mut parsed);
            self.resumed = false;

            // Nothing effective yet: leave the file untouched so the
            // structure keeps being re-validated until data arrives.
            // A stripped FF counts as data, or a second FF would be
            // stripped on the next call.
            if parsed.is_empty() && !stripped {
                self.parse_buf = parsed;
                return Ok(());
            }

            self.write_header()?;
            if self.form_buf.is_empty() {
                self.setup_form()?;
            }
        } else {
            self.sha.update(bytes);
            self.parser.parse(bytes, false, &mut parsed);
        }

        // Pagination.  Text accumulates per line; LF advances, FF and
        // a full page emit.
        let mut pending: Vec<u16> = Vec::with_capacity(128);
        for i in 0..parsed.len() {
            let c = parsed[i];

            if c == 0x0C {
                if self.line == 0 {
                    self.line = self.tof + 1;
                }
                self.flush_pending(&mut pending);
                self.write_page()?;
                continue;
            }
            if self.line > self.lpp + self.tof {
                self.flush_pending(&mut pending);
                self.write_page()?;
            }
            if c == 0x0A {
                if self.line == 0 {
                    self.line = self.tof + 1;
                }
                self.flush_pending(&mut pending);
                self.line += 1;
                continue;
            }
            if self.line == 0 {
                self.line = self.tof + 1;
            }
            pending.push(c);
        }
        self.flush_pending(&mut pending);

        self.parse_buf = parsed;
        Ok(())
    }

    fn flush_pending(&mut self, pending: &mut Vec<u16>) {
        if !pending.is_empty() {
            self.lines.append(self.line, pending);
            pending.clear();
        }
    }

    /// Current 1-based logical page and line, counting previous
    /// sessions' pages.
    pub fn position(&self) -> (u64, u64) {
        let lpp = u64::from(self.cfg.lpp());
        let mut p = u64::from(self.page) + 1;
        let mut l = u64::from(self.line);
        if l == 0 {
            l = u64::from(self.cfg.tof()) + 1;
        }
        if l > lpp {
            l -= lpp - 1;
            p += 1;
        }
        p += u64::from(self.prev_page_count());
        (p, l)
    }

    fn prev_page_count(&self) -> u32 {
        self.append.as_ref().map_or(0, |a| a.prev_page_count)
    }

    // ----- checkpoint / snapshot / close --------------------------------

    /// Make the file a valid PDF as of this point and rewind so output
    /// continues where it left off.
    ///
    /// A partial page stays buffered in memory; the checkpointed file
    /// contains only complete pages.  No-op before the first write.
    pub fn checkpoint(&mut self) -> Result<()> {
        self.guard()?;
        let r = self.checkpoint_inner();
        self.seal(r)
    }

    fn checkpoint_inner(&mut self) -> Result<()> {
        if !self.written {
            return Ok(());
        }

        let saved_line = self.line;
        let saved_objects = self.table.count();
        let saved_sha = self.sha.clone();
        let pos = self.file.stream_position()?;
        self.checkpoint_pos = Some(pos);
        self.line = 0;

        let result = self.close_session(true);

        self.sha = saved_sha;
        self.line = saved_line;
        self.table.truncate(saved_objects);
        self.file.seek(SeekFrom::Start(pos))?;
        self.file.flush()?;

        self.written = false;
        self.resumed = true;

        log::debug!("checkpoint at offset {}, {} pages durable", pos, self.page);
        result
    }

    /// Checkpoint, then copy the whole file byte-exact to `path`.
    pub fn snapshot<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.checkpoint()?;
        let r = self.snapshot_inner(path.as_ref());
        self.seal(r)
    }

    fn snapshot_inner(&mut self, path: &Path) -> Result<()> {
        let mut dst = File::create(path).map_err(Error::OtherIo)?;
        let pos = self.file.stream_position()?;
        self.file.seek(SeekFrom::Start(0))?;
        let r = std::io::copy(&mut self.file, &mut dst);
        self.file.seek(SeekFrom::Start(pos))?;
        r?;
        Ok(())
    }

    /// Emit any partial page and the document metadata, then close the
    /// file and consume the session.
    pub fn close(mut self) -> Result<()> {
        self.guard()?;
        let r = self.close_session(false);
        if r.is_ok() {
            self.file.flush()?;
        }
        r
    }

    /// The work of close.  For a checkpoint everything is identical
    /// except that the partial line count has been parked at zero and
    /// the caller rewinds afterwards.
    fn close_session(&mut self, checkpoint: bool) -> Result<()> {
        if self.line != 0 && !self.written && self.initialized {
            // A checkpoint held a partial page and nothing has been
            // printed since: re-run the header path to write it.
            self.write_header()?;
            if self.form_buf.is_empty() {
                self.setup_form()?;
            }
        }

        if !self.written {
            // Nothing written this interval; the file is already in
            // its final (or checkpointed) state.
            return Ok(());
        }

        if self.line != 0 {
            self.write_page()?;
        }

        // Session page list.  Its parent is the anchor, whose object
        // number is known now: list, fonts, one leaf per page, anchor.
        let plist = self.alloc_object()?;
        let anchor = plist + 2 + self.page;

        let mut body = format!("{} 0 obj\n << /Type /Pages /Kids [", plist);
        for p in 0..self.page {
            body.push_str(&format!(" {} 0 R", plist + 2 + p));
        }
        body.push_str(&format!("] /Count {} /Parent {:010} 0 R >>\nendobj\n\n", self.page, anchor));
        self.file.write_all(body.as_bytes())?;

        // Font dictionary
        self.alloc_object()?;
        let body = format!(
            "{} 0 obj\n << /F1 << /Type /Font /Subtype /Type1 /BaseFont /{} >> /F2 << /Type /Font /Subtype /Type1 /BaseFont /{} >> /F3 << /Type /Font /Subtype /Type1 /BaseFont /{} >> >>\nendobj\n\n",
            plist + 1,
            self.cfg.font,
            self.cfg.nfont,
            self.cfg.nbold
        );
        self.file.write_all(body.as_bytes())?;

        // Page leaves
        for p in 0..self.page {
            let obj = self.alloc_object()?;
            let mut body = format!(
                "{} 0 obj\n << /Type /Page /Parent {} 0 R /Resources << /Font {} 0 R /ProcSet [/PDF /Text /ImageC /ImageI /ImageB]",
                obj,
                plist,
                plist + 1
            );
            if let Some(form) = self.form_obj {
                body.push_str(&format!(" /XObject << /form {} 0 R >>", form));
            }
            body.push_str(&format!(
                " >> /MediaBox [0 0 {} {}] /Contents {} 0 R >>\nendobj\n\n",
                real(self.cfg.wid * PT),
                real(self.cfg.len * PT),
                self.page_base + p
            ));
            self.file.write_all(body.as_bytes())?;
        }

        // Session anchor: adopts the previous sessions' subtree when
        // appending, and is what a later session will re-parent.
        let anchor_check = self.alloc_object()?;
        debug_assert_eq!(anchor, anchor_check);
        let mut body = format!("{} 0 obj\n << /Type /Pages /Kids [", anchor);
        if let Some(a) = &self.append {
            body.push_str(&format!("{} 0 R ", a.anchor_obj));
        }
        body.push_str(&format!(
            "{} 0 R] /Count {} >>\nendobj\n\n",
            plist,
            self.page + self.prev_page_count()
        ));
        self.file.write_all(body.as_bytes())?;

        // Catalog
        let cat = self.alloc_object()?;
        let mut body = format!(
            "{} 0 obj\n  << /Type /Catalog /Pages {} 0 R /PageLayout /SinglePage /ViewerPreferences << ",
            cat, anchor
        );
        body.push_str(if self.cfg.wid > self.cfg.len {
            " /Duplex /DuplexFlipLongEdge"
        } else {
            " /Duplex /DuplexFlipShortEdge"
        });
        if self.cfg.title != DEFAULT_TITLE {
            body.push_str(" /DisplayDocTitle true");
        }
        body.push_str(" /PickTrayByPDFSize true >> >>\nendobj\n\n");
        self.file.write_all(body.as_bytes())?;

        // Info dictionary.  Its exact bytes join the input stream in
        // the document ID digest.
        let now = chrono::Local::now().format("%Y%m%d%H%M%S").to_string();
        let ctime = match &self.append {
            Some(a) => a.ctime.clone(),
            None => now.clone(),
        };
        let iobj = self.alloc_object()?;
        let body = format!(
            "{} 0 obj\n  << /Title ({}) /Creator (Midnight Engineering) /Subject (Preserving the history of computing) /Producer ({}) /CreationDate (D:{}) /ModDate (D:{}) >>\nendobj\n\n",
            iobj, self.cfg.title, PRODUCER, ctime, now
        );
        self.sha.update(body.as_bytes());
        self.file.write_all(body.as_bytes())?;

        // Xref and trailer
        let xref_pos = self.file.stream_position()?;
        self.table.write_xref(&mut self.file)?;

        let digest = self.sha.clone().finalize();
        let nid: String = digest.iter().map(|b| format!("{:02X}", b)).collect();
        let oid = match &self.append {
            Some(a) => a.oid.clone(),
            None => nid.clone(),
        };

        let trailer = format!(
            "trailer\n << /Root {} 0 R /Size {} /Info {} 0 R /ID [<{}> <{}>] >>\nstartxref\n{}\n%%EOF\n",
            cat,
            self.table.count() + 1,
            iobj,
            oid,
            nid,
            xref_pos
        );
        self.file.write_all(trailer.as_bytes())?;

        // An appended trailer can land short of the previous EOF;
        // drop whatever is left over.
        let end = self.file.stream_position()?;
        self.file.set_len(end)?;

        // Hand the previous sessions' subtree to the new anchor.
        if let Some(patch) = self.anchor_patch_pos {
            self.file.seek(SeekFrom::Start(patch))?;
            write!(self.file, "{:010}", anchor)?;
        }

        if !checkpoint {
            log::debug!("closed: {} pages, {} objects", self.page, self.table.count());
        }
        Ok(())
    }

    // ----- internals ----------------------------------------------------

    fn guard(&self) -> Result<()> {
        match &self.fatal {
            Some(msg) => Err(Error::Poisoned(msg.clone())),
            None => Ok(()),
        }
    }

    fn seal<T>(&mut self, r: Result<T>) -> Result<T> {
        if let Err(e) = &r {
            if e.is_fatal() {
                self.fatal = Some(e.to_string());
            }
        }
        r
    }

    /// First-write inspection of the output file per the file mode.
    fn init(&mut self) -> Result<()> {
        match self.cfg.mode {
            FileMode::Append => {
                if let Some(info) = append::inspect(&mut self.file, &mut self.table)? {
                    // The old ID participates in the new one.
                    self.sha.update(info.oid.as_bytes());
                    self.page_base = info.root_obj;
                    self.append = Some(info);
                }
            },
            FileMode::New => {
                let end = self.file.seek(SeekFrom::End(0))?;
                if end != 0 {
                    return Err(Error::NotEmpty);
                }
            },
            FileMode::Replace => {
                self.file.set_len(0)?;
            },
        }
        if self.append.is_none() {
            self.file.seek(SeekFrom::Start(0))?;
            self.page_base = 1;
        }
        Ok(())
    }

    /// Emit the file header (new file) or rewrite the previous anchor
    /// with a patchable `/Parent` slot (append).  Runs again after
    /// every checkpoint; the header itself is only written once.
    fn write_header(&mut self) -> Result<()> {
        match &self.append {
            None => {
                if self.checkpoint_pos.is_none() {
                    self.file.write_all(HEADER)?;
                }
                self.written = true;
            },
            Some(info) => {
                let (count, count_end) = append::find_int(&info.anchor_body, "/Count")?;
                if count != info.prev_page_count {
                    return Err(Error::NoAppend("anchor page count changed"));
                }

                self.file.seek(SeekFrom::Start(info.anchor_offset))?;
                let prefix = format!(
                    "{} 0 obj\n{} /Parent ",
                    info.anchor_obj,
                    &info.anchor_body[..count_end]
                );
                self.file.write_all(prefix.as_bytes())?;

                // Ten digits, patched with the new anchor at close.
                self.anchor_patch_pos = Some(self.file.stream_position()?);
                let suffix = format!("{:10} 0 R {}\nendobj\n\n", "", &info.anchor_body[count_end..]);
                self.file.write_all(suffix.as_bytes())?;

                if let Some(pos) = self.checkpoint_pos {
                    self.file.seek(SeekFrom::Start(pos))?;
                }
                self.written = true;
            },
        }
        Ok(())
    }

    /// Build the per-page background, writing the image XObject first
    /// when the form is a JPEG.
    fn setup_form(&mut self) -> Result<()> {
        let mut dims = None;
        if self.cfg.formtype == FormType::Image {
            let path = self
                .cfg
                .formfile
                .clone()
                .ok_or(Error::Bugcheck("image form without a file"))?;
            let data = std::fs::read(path).map_err(Error::OtherIo)?;
            let (w, h) = jpeg::jpeg_dimensions(&data)?;

            let obj = self.alloc_object()?;
            let head = format!(
                "{} 0 obj\n<< /Type /XObject /Subtype /Image /Width {} /Height {} /Length {} /Filter /DCTDecode /BitsPerComponent 8 /ColorSpace /DeviceRGB >>\nstream\n",
                obj,
                w,
                h,
                data.len()
            );
            self.file.write_all(head.as_bytes())?;
            self.file.write_all(&data)?;
            self.file.write_all(b"\nendstream\nendobj\n\n")?;

            self.form_obj = Some(obj);
            self.page_base = obj + 1;
            dims = Some((w, h));
        }
        self.form_buf = form::build(&self.cfg, dims);
        Ok(())
    }

    fn alloc_object(&mut self) -> Result<u32> {
        let pos = self.file.stream_position()?;
        Ok(self.table.allocate(pos))
    }

    /// Render and write the current page's content stream, then reset
    /// for the next page, carrying any TOF-overflow lines forward.
    fn write_page(&mut self) -> Result<()> {
        let lm = self.cfg.margin * PT
            + ((self.cfg.wid - self.cfg.margin * 2.0) - self.cfg.cols as f64 / self.cfg.cpi) / 2.0
                * PT;

        if self.line > self.lpp {
            self.line = self.lpp;
        }
        let obj = self.alloc_object()?;

        self.page_buf.clear();
        self.page_buf.extend_from_slice(&self.form_buf);

        let leading = 72 / self.cfg.lpi;
        let text_top = (self.cfg.len * PT + 2.0) as u32;
        self.page_buf.extend_from_slice(
            format!(
                " q 0 Tr 0 0 0 rg BT /F1 {} Tf 1 0 0 1 {} {} Tm  {} TL 0 Tc 100 Tz 0 {} Td",
                leading,
                real(lm),
                real(0.0),
                leading,
                text_top
            )
            .as_bytes(),
        );

        for l in 1..=self.line.min(self.lines.allocated()) {
            let content = self.lines.get(l).unwrap_or(&[]);
            let mut online = false;

            for (idx, &ch) in content.iter().enumerate() {
                if !online {
                    self.page_buf.extend_from_slice(b" T* (");
                    online = true;
                }
                if ch == u16::from(b'\\') || ch == u16::from(b'(') || ch == u16::from(b')') {
                    self.page_buf.push(b'\\');
                } else if ch == 0x0D {
                    // Overprint: only worth a restart if visible data
                    // follows the marker.
                    let rest = &content[idx + 1..];
                    if rest.iter().any(|&c| c != 0x0D && c != u16::from(b' ')) {
                        self.page_buf.extend_from_slice(b")Tj 0 0 Td (");
                    }
                    continue;
                }
                self.page_buf.push(ch as u8);
            }

            if online {
                self.page_buf.extend_from_slice(b")Tj");
            } else {
                self.page_buf.extend_from_slice(b" T*");
            }
            self.lines.clear_line(l);
        }
        self.page_buf.extend_from_slice(b" ET Q");

        self.page += 1;
        self.line = 0;

        // Output that raced past the page end belongs at the top of
        // the new page.
        if self.lines.carry_overflow(self.lpp, self.tof) {
            self.line = self.tof + 1;
        }

        // A pitch change selected by CSI z lands between pages.
        if let Some(lpi) = self.parser.take_pitch_change() {
            if lpi != self.cfg.lpi {
                log::debug!("page {}: switching to {} LPI", self.page + 1, lpi);
                self.cfg.lpi = lpi;
            }
            self.lpp = self.cfg.lpp();
        }

        // Compress unless forbidden; write raw when LZW fails to
        // actually shrink the stream.
        let mut encoded = 0;
        if self.cfg.compress {
            encoded = self.lzw.encode(&self.page_buf).len();
        }
        if self.cfg.compress && encoded < self.page_buf.len() {
            let head = format!(
                "{} 0 obj\n  << /Length {} /DL {} /Filter /LZWDecode /DecodeParams << /EarlyChange 0 >> >>\nstream\n",
                obj,
                encoded,
                self.page_buf.len()
            );
            self.file.write_all(head.as_bytes())?;
            self.file.write_all(self.lzw.data())?;
        } else {
            let head = format!("{} 0 obj\n<< /Length {} >>\nstream\n", obj, self.page_buf.len());
            self.file.write_all(head.as_bytes())?;
            self.file.write_all(&self.page_buf)?;
        }
        self.file.write_all(b"\nendstream\nendobj\n\n")?;
        Ok(())
    }
}

impl std::fmt::Debug for PdfWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfWriter")
            .field("page", &self.page)
            .field("line", &self.line)
            .field("active", &self.active)
            .field("written", &self.written)
            .field("updating", &self.append.is_some())
            .finish_non_exhaustive()
    }
}

/// True when `path` starts with a `%PDF-1.<digits>` header line.
pub fn is_pdf_file<P: AsRef<Path>>(path: P) -> Result<bool> {
    let mut file = File::open(path)?;
    let mut buf = [0u8; 100];
    let n = file.read(&mut buf)?;
    let text = String::from_utf8_lossy(&buf[..n]);
    let line = match text.find('\n') {
        Some(i) => &text[..=i],
        None => &text,
    };
    Ok(append::check_pdf_header(line).is_ok())
}
