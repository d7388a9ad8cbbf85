//! Document-structure tests: header, xref, trailer, IDs, viewer
//! preferences, and the LZW stream dictionary.

use lptpdf::{is_pdf_file, PdfWriter};

fn read(path: &std::path::Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

fn text_of(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

/// The startxref value near EOF.
fn startxref(text: &str) -> u64 {
    let at = text.rfind("startxref\n").unwrap();
    text[at + 10..].lines().next().unwrap().parse().unwrap()
}

fn trailer_ids(text: &str) -> (String, String) {
    let at = text.rfind("/ID [<").unwrap();
    let rest = &text[at + 6..];
    let first = &rest[..40];
    let second_at = rest.find("> <").unwrap() + 3;
    let second = &rest[second_at..second_at + 40];
    (first.to_string(), second.to_string())
}

#[test]
fn test_file_skeleton() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.print(b"Hello\n").unwrap();
    pdf.close().unwrap();

    let data = read(&path);
    let text = text_of(&data);

    // Header line plus a binary comment to force byte-mode readers.
    assert!(data.starts_with(b"%PDF-1.4\n%"));
    assert!(data[9..16].iter().any(|&b| b >= 0x80));
    assert!(text.ends_with("%%EOF\n"));
    assert!(is_pdf_file(&path).unwrap());

    // startxref points at the xref table.
    let xpos = startxref(&text) as usize;
    assert_eq!(&data[xpos..xpos + 5], b"xref\n");

    // One page: content, page list, fonts, leaf, anchor, catalog,
    // info = 7 objects, /Size 8.
    assert!(text.contains("/Size 8"));
    assert!(text.contains("xref\n0 8\n0000000000 65535 f \n"));

    // Both ID entries are the same 40-hex digest on a fresh file.
    let (oid, nid) = trailer_ids(&text);
    assert_eq!(oid, nid);
    assert_eq!(oid.len(), 40);
    assert!(oid.bytes().all(|b| b.is_ascii_hexdigit()));

    // Fixed info-dictionary fields.
    assert!(text.contains("/Producer (LPTPDF Version 1.0)"));
    assert!(text.contains("/Creator (Midnight Engineering)"));
    assert!(text.contains("/Title (Lineprinter data)"));
    assert!(text.contains("/CreationDate (D:"));

    // Font dictionary carries the three roles.
    assert!(text.contains("/F1 << /Type /Font /Subtype /Type1 /BaseFont /Courier >>"));
    assert!(text.contains("/F2 << /Type /Font /Subtype /Type1 /BaseFont /Times-Roman >>"));
    assert!(text.contains("/F3 << /Type /Font /Subtype /Type1 /BaseFont /Times-Bold >>"));

    // 14.875 x 11 in sheet in points; wide pages flip on the long edge.
    assert!(text.contains("/MediaBox [0 0 1071 792]"));
    assert!(text.contains("/Duplex /DuplexFlipLongEdge"));
    assert!(text.contains("/PickTrayByPDFSize true"));
    assert!(!text.contains("/DisplayDocTitle"));
}

#[test]
fn test_xref_offsets_point_at_objects() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.print(b"page one\x0cpage two\x0c").unwrap();
    pdf.close().unwrap();

    let data = read(&path);
    let text = text_of(&data);

    // Byte offsets must be resolved against the raw bytes; the lossy
    // text view shifts past the compressed streams.
    let xpos = startxref(&text) as usize;
    let table = String::from_utf8_lossy(&data[xpos..]).into_owned();
    let mut checked = 0;
    let mut lines = table.lines().skip(2); // "xref", "0 N"
    lines.next(); // free head
    for (index, line) in lines.enumerate() {
        if !line.ends_with(" n ") {
            break;
        }
        let offset: usize = line[..10].parse().unwrap();
        let expect = format!("{} 0 obj\n", index + 1);
        assert_eq!(
            &data[offset..offset + expect.len()],
            expect.as_bytes(),
            "xref entry {} points at the wrong place",
            index + 1
        );
        checked += 1;
    }
    // 2 content streams + list + fonts + 2 leaves + anchor + catalog
    // + info
    assert_eq!(checked, 9);
}

#[test]
fn test_content_stream_is_lzw_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.print(b"Hello\n").unwrap();
    pdf.close().unwrap();

    let data = read(&path);
    let text = text_of(&data);
    assert!(text.contains("/Filter /LZWDecode"));
    assert!(text.contains("/DecodeParams << /EarlyChange 0 >>"));

    // Decode the stream and find the page text.
    let dict_at = text.find("/Filter /LZWDecode").unwrap();
    let head = &text[..dict_at];
    let length: usize = {
        let at = head.rfind("/Length ").unwrap();
        text[at + 8..].split_whitespace().next().unwrap().parse().unwrap()
    };
    let start = text[dict_at..].find("stream\n").unwrap() + dict_at + 7;
    let body = &data[start..start + length];

    let decoded = weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8)
        .decode(body)
        .expect("stream decodes");
    let page = String::from_utf8_lossy(&decoded);
    assert!(page.contains(" T* (Hello)Tj"));
    assert!(page.contains(" ET Q"));

    // /DL records the decoded length.
    let dl: usize = {
        let at = text.find("/DL ").unwrap();
        text[at + 4..].split_whitespace().next().unwrap().parse().unwrap()
    };
    assert_eq!(dl, decoded.len());
}

#[test]
fn test_compression_off_writes_plain_streams() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_compression(false).unwrap();
    pdf.print(b"Hello\n").unwrap();
    pdf.close().unwrap();

    let text = text_of(&read(&path));
    assert!(!text.contains("/Filter"));
    assert!(text.contains(" T* (Hello)Tj"));
}

#[test]
fn test_custom_title_sets_viewer_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_title("SYS$OUTPUT (run 12)").unwrap();
    pdf.print(b"x\n").unwrap();
    pdf.close().unwrap();

    let text = text_of(&read(&path));
    assert!(text.contains("/Title (SYS$OUTPUT \\(run 12\\))"));
    assert!(text.contains("/DisplayDocTitle true"));
}

#[test]
fn test_portrait_page_flips_short_edge() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_page_width(8.5).unwrap();
    pdf.set_page_length(11.0).unwrap();
    pdf.set_cols(80).unwrap();
    pdf.print(b"x\n").unwrap();
    pdf.close().unwrap();

    let text = text_of(&read(&path));
    assert!(text.contains("/Duplex /DuplexFlipShortEdge"));
    assert!(text.contains("/MediaBox [0 0 612 792]"));
}

#[test]
fn test_new_mode_rejects_nonempty_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    std::fs::write(&path, b"old bytes").unwrap();

    let mut pdf = PdfWriter::open(&path).unwrap();
    assert!(matches!(pdf.print(b"x\n"), Err(lptpdf::Error::NotEmpty)));
    assert_eq!(read(&path), b"old bytes");
}

#[test]
fn test_replace_mode_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    std::fs::write(&path, b"previous contents, quite long, to be discarded").unwrap();

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_file_mode(lptpdf::FileMode::Replace).unwrap();
    pdf.print(b"fresh\n").unwrap();
    pdf.close().unwrap();

    let text = text_of(&read(&path));
    assert!(text.starts_with("%PDF-1.4\n"));
    assert!(text.ends_with("%%EOF\n"));
}

#[test]
fn test_page_leaf_references() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.print(b"one\x0ctwo\x0c").unwrap();
    pdf.close().unwrap();

    let text = text_of(&read(&path));
    // Objects: 1,2 content; 3 list; 4 fonts; 5,6 leaves; 7 anchor;
    // 8 catalog; 9 info.
    assert!(text.contains("3 0 obj\n << /Type /Pages /Kids [ 5 0 R 6 0 R] /Count 2 /Parent 0000000007 0 R >>"));
    assert!(text.contains("/Contents 1 0 R"));
    assert!(text.contains("/Contents 2 0 R"));
    assert!(text.contains("7 0 obj\n << /Type /Pages /Kids [3 0 R] /Count 2 >>"));
    assert!(text.contains("8 0 obj\n  << /Type /Catalog /Pages 7 0 R"));
    assert!(text.contains("/ProcSet [/PDF /Text /ImageC /ImageI /ImageB]"));
}
