//! Append-mode inspection of an existing output file.
//!
//! Only files written by this engine are accepted: the layout produced
//! by a session close is rigid enough that the trailer, xref, catalog,
//! info dictionary and session anchor can be recovered with a
//! line-oriented scan instead of a general object parser.  Anything
//! that deviates is rejected rather than guessed at.
//!
//! The session anchor is the root `/Pages` node of the previous
//! session's subtree.  It sits immediately below the catalog, carries
//! no `/Parent`, and is the one object the new session rewrites in
//! place to splice itself into the page tree.

use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};

use crate::error::{Error, Result};
use crate::xref::ObjectTable;

/// Producer prefix that marks a file as ours.
pub const PRODUCER_MARKER: &str = "/Producer (LPTPDF Version ";

/// How far back from EOF the trailer scan reaches.
const TAIL_SCAN: u64 = 512;

/// State recovered from a file being appended to.
#[derive(Debug)]
pub struct AppendInfo {
    /// Original document ID, 40 uppercase hex digits
    pub oid: String,
    /// Original creation timestamp (the text inside `(D:...)`)
    pub ctime: String,
    /// Page count accumulated by previous sessions
    pub prev_page_count: u32,
    /// Object number of the previous session's anchor `/Pages`
    pub anchor_obj: u32,
    /// File offset of the anchor object
    pub anchor_offset: u64,
    /// Anchor object body (between `obj` and `endobj` lines)
    pub anchor_body: String,
    /// Index into `anchor_body` just past the `/Count` value
    pub count_end: usize,
    /// Object number of the previous info dictionary
    pub info_obj: u32,
    /// Object number of the previous catalog; new objects start here
    pub root_obj: u32,
}

/// Inspect `file` for appending.
///
/// Returns `Ok(None)` when the file is empty (write as new).  On
/// success the previous sessions' object offsets have been loaded into
/// `table` and the table is truncated so the next allocation reuses
/// the old catalog's object number.
pub fn inspect<R: Read + Seek>(file: &mut R, table: &mut ObjectTable) -> Result<Option<AppendInfo>> {
    let end = file.seek(SeekFrom::End(0))?;
    if end == 0 {
        return Ok(None);
    }

    let mut rdr = BufReader::new(file);
    rdr.seek(SeekFrom::Start(0))?;
    let header = read_line(&mut rdr)?;
    check_pdf_header(&header)?;

    let xpos = find_startxref(&mut rdr, end)?;
    if xpos <= 9 || xpos >= end {
        return Err(Error::NoAppend("startxref offset out of range"));
    }

    read_xref(&mut rdr, xpos, table)?;
    let trail = read_trailer(&mut rdr)?;

    let oid = find_id(&trail)?;
    let info_obj = find_ref(&trail, "/Info", table.count())?;
    let root_obj = find_ref(&trail, "/Root", table.count())?;
    if root_obj >= info_obj {
        return Err(Error::NoAppend("unexpected object ordering"));
    }

    // The info dictionary carries the producer marker; any other
    // producer means assumptions below do not hold.
    let (_, info_body) = read_object(&mut rdr, table, info_obj)?;
    if !info_body.contains(PRODUCER_MARKER) {
        return Err(Error::NotProduced);
    }

    let ctime_raw = find_string(&info_body, "/CreationDate")?;
    let ctime = ctime_raw
        .strip_prefix("(D:")
        .and_then(|s| s.strip_suffix(')'))
        .filter(|s| !s.is_empty())
        .ok_or(Error::NoAppend("malformed CreationDate"))?
        .to_string();

    let (_, cat_body) = read_object(&mut rdr, table, root_obj)?;
    if !cat_body.contains("/Type /Catalog") {
        return Err(Error::NoAppend("root is not a catalog"));
    }

    let anchor_obj = find_ref(&cat_body, "/Pages", table.count())?;
    if anchor_obj != root_obj - 1 {
        return Err(Error::NoAppend("catalog does not sit on the session anchor"));
    }

    let (anchor_offset, anchor_body) = read_object(&mut rdr, table, anchor_obj)?;
    if !anchor_body.contains("/Type /Pages") || anchor_body.contains("/Parent") {
        return Err(Error::NoAppend("anchor is not a root /Pages node"));
    }
    let (prev_page_count, count_end) = find_int(&anchor_body, "/Count")?;

    log::debug!(
        "appending: {} prior pages, anchor obj {}, new objects from {}",
        prev_page_count,
        anchor_obj,
        root_obj
    );

    // The old catalog and info objects are rewritten by this session.
    table.truncate(root_obj - 1);

    Ok(Some(AppendInfo {
        oid,
        ctime,
        prev_page_count,
        anchor_obj,
        anchor_offset,
        anchor_body,
        count_end,
        info_obj,
        root_obj,
    }))
}

/// Validate a `%PDF-1.<digits>` header line.
pub fn check_pdf_header(line: &str) -> Result<()> {
    let rest = line.strip_prefix("%PDF-1.").ok_or(Error::NotPdf)?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || rest.as_bytes().get(digits) != Some(&b'\n') {
        return Err(Error::NoAppend("unsupported header line"));
    }
    Ok(())
}

fn read_line<R: BufRead>(rdr: &mut R) -> Result<String> {
    let mut buf = Vec::new();
    rdr.read_until(b'\n', &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Locate the `startxref` pointer in the file tail.
///
/// A well-formed file ends `\nstartxref\n<offset>\n%%EOF\n`.
fn find_startxref<R: Read + Seek>(rdr: &mut BufReader<R>, end: u64) -> Result<u64> {
    let take = TAIL_SCAN.min(end);
    rdr.seek(SeekFrom::Start(end - take))?;
    let mut tail = Vec::with_capacity(take as usize);
    rdr.read_to_end(&mut tail)?;
    let tail = String::from_utf8_lossy(&tail);

    let at = tail.rfind("\nstartxref\n").ok_or(Error::NoAppend("no startxref"))?;
    let rest = &tail[at + "\nstartxref\n".len()..];
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || &rest[digits..] != "\n%%EOF\n" {
        return Err(Error::NoAppend("malformed file trailer"));
    }
    rest[..digits]
        .parse::<u64>()
        .map_err(|_| Error::NoAppend("startxref offset overflow"))
}

/// Load the xref table this engine wrote: one subsection from zero.
fn read_xref<R: Read + Seek>(
    rdr: &mut BufReader<R>,
    xpos: u64,
    table: &mut ObjectTable,
) -> Result<()> {
    rdr.seek(SeekFrom::Start(xpos))?;
    if read_line(rdr)? != "xref\n" {
        return Err(Error::NoAppend("no xref table at startxref"));
    }

    let header = read_line(rdr)?;
    let mut parts = header.trim_end().split(' ');
    let first: u32 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(Error::NoAppend("bad xref subsection"))?;
    let count: u32 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(Error::NoAppend("bad xref subsection"))?;
    // At minimum: free head, a page, the page list, anchor, catalog, info.
    if first != 0 || count < 4 || parts.next().is_some() {
        return Err(Error::NoAppend("unsupported xref shape"));
    }

    for index in 0..count {
        let entry = read_line(rdr)?;
        let bytes = entry.as_bytes();
        if bytes.len() < 18 || bytes[10] != b' ' || bytes[16] != b' ' {
            return Err(Error::NoAppend("bad xref entry"));
        }
        let offset: u64 = entry[..10].parse().map_err(|_| Error::NoAppend("bad xref entry"))?;
        let gen: u32 = entry[11..16].parse().map_err(|_| Error::NoAppend("bad xref entry"))?;
        let kind = bytes[17];

        if index == 0 {
            if kind != b'f' || gen != 65535 || offset != 0 {
                return Err(Error::NoAppend("missing free-list head"));
            }
            continue;
        }
        if kind != b'n' || gen != 0 || offset == 0 {
            return Err(Error::NoAppend("unsupported xref entry"));
        }
        table.allocate(offset);
    }
    Ok(())
}

/// Collect the trailer dictionary lines.
fn read_trailer<R: Read + Seek>(rdr: &mut BufReader<R>) -> Result<String> {
    loop {
        let line = read_line(rdr)?;
        if line.is_empty() {
            return Err(Error::NoAppend("no trailer after xref"));
        }
        if line == "trailer\n" {
            break;
        }
    }
    let mut trail = String::new();
    loop {
        let line = read_line(rdr)?;
        if line.is_empty() {
            return Err(Error::NoAppend("unterminated trailer"));
        }
        if line == "startxref\n" {
            break;
        }
        trail.push_str(&line);
    }
    if trail.is_empty() {
        return Err(Error::NoAppend("empty trailer"));
    }
    Ok(trail)
}

/// Read the body of object `id` (between the `obj` and `endobj`
/// lines), returning its file offset and text.
fn read_object<R: Read + Seek>(
    rdr: &mut BufReader<R>,
    table: &ObjectTable,
    id: u32,
) -> Result<(u64, String)> {
    let offset = table.offset(id).ok_or(Error::NoAppend("object not in xref"))?;
    rdr.seek(SeekFrom::Start(offset))?;

    let header = read_line(rdr)?;
    if header != format!("{} 0 obj\n", id) {
        return Err(Error::NoAppend("object header mismatch"));
    }

    let mut body = String::new();
    loop {
        let line = read_line(rdr)?;
        if line.is_empty() {
            return Err(Error::NoAppend("unterminated object"));
        }
        if line == "endobj\n" {
            break;
        }
        body.push_str(&line);
    }
    Ok((offset, body))
}

/// Extract the first `/ID` array element: 40 hex digits in `<>`.
fn find_id(trail: &str) -> Result<String> {
    let at = trail.find("/ID [").ok_or(Error::NoAppend("trailer has no /ID"))?;
    let rest = trail[at + 5..].trim_start_matches(' ');
    let hex = rest.strip_prefix('<').ok_or(Error::NoAppend("malformed /ID"))?;
    if hex.len() < 41 || !hex.is_char_boundary(40) || hex.as_bytes()[40] != b'>' {
        return Err(Error::NoAppend("malformed /ID"));
    }
    let id = &hex[..40];
    if !id.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::NoAppend("malformed /ID"));
    }
    Ok(id.to_string())
}

/// Find `name` followed by an indirect reference; the referent must be
/// an object the xref knows about.
pub(crate) fn find_ref(body: &str, name: &str, max_obj: u32) -> Result<u32> {
    let (value, end) = scan_number(body, name)?;
    if value == 0 || value > max_obj || !body[end..].starts_with(" 0 R") {
        return Err(Error::NoAppend("bad object reference"));
    }
    Ok(value)
}

/// Find `name` followed by an integer; returns the value and the index
/// just past its digits.
pub(crate) fn find_int(body: &str, name: &str) -> Result<(u32, usize)> {
    let (value, end) = scan_number(body, name)?;
    match body[end..].chars().next() {
        Some('\n') | Some(' ') | Some(']') => Ok((value, end)),
        _ => Err(Error::NoAppend("bad integer value")),
    }
}

fn scan_number(body: &str, name: &str) -> Result<(u32, usize)> {
    let at = body.find(name).ok_or(Error::NoAppend("missing required key"))?;
    let mut pos = at + name.len();
    let rest = body[pos..].trim_start();
    pos += body[pos..].len() - rest.len();
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err(Error::NoAppend("missing numeric value"));
    }
    let value = rest[..digits].parse().map_err(|_| Error::NoAppend("numeric overflow"))?;
    Ok((value, pos + digits))
}

/// Find `name` followed by a literal string, honoring escapes and
/// nested parentheses.  Returns the string including its parentheses.
pub(crate) fn find_string(body: &str, name: &str) -> Result<String> {
    let at = body.find(name).ok_or(Error::NoAppend("missing required key"))?;
    let rest = body[at + name.len()..].trim_start_matches(' ');
    if !rest.starts_with('(') {
        return Err(Error::NoAppend("missing string value"));
    }

    let bytes = rest.as_bytes();
    let mut depth = 1;
    let mut i = 1;
    while i < bytes.len() && depth > 0 {
        match bytes[i] {
            b'\\' => i += 1,
            b'(' => depth += 1,
            b')' => depth -= 1,
            _ => {},
        }
        i += 1;
    }
    if depth != 0 {
        return Err(Error::NoAppend("unterminated string value"));
    }
    Ok(rest[..i].to_string())
}
