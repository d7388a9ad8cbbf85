//! Form background variants exercised through whole files.

use lptpdf::PdfWriter;

fn read_text(path: &std::path::Path) -> String {
    String::from_utf8_lossy(&std::fs::read(path).unwrap()).into_owned()
}

/// First content stream body (compression is off in these tests).
fn first_stream(text: &str) -> &str {
    let start = text.find("stream\n").unwrap() + 7;
    let end = text[start..].find("\nendstream").unwrap();
    &text[start..start + end]
}

/// A minimal JPEG wrapper: SOI, APP0, SOF0 with the given size, EOI.
fn fake_jpeg(width: u16, height: u16) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    data.extend_from_slice(b"JFIF\0");
    data.extend_from_slice(&[0x01, 0x01, 0x00, 0x00, 0x48, 0x00, 0x48, 0x00, 0x00]);
    data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x0B, 0x08]);
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&[0x01, 0x01, 0x11, 0x00]);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

#[test]
fn test_greenbar_background_on_every_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("green.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_compression(false).unwrap();
    pdf.print(b"a\x0cb\x0c").unwrap();
    pdf.close().unwrap();

    let text = read_text(&path);
    // Both pages carry the same precomputed form prefix: one bar fill
    // each, and a fill-stroke close for holes and bars alike.
    assert_eq!(text.matches("0.880 0.960 0.880 rg").count(), 2);
    assert_eq!(text.matches(" B Q").count(), 4);
}

#[test]
fn test_plain_form_draws_only_holes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_compression(false).unwrap();
    pdf.set_form("plain").unwrap();
    pdf.set_lno_width(0.0).unwrap();
    pdf.print(b"text\n").unwrap();
    pdf.close().unwrap();

    let text = read_text(&path);
    let page = first_stream(&text);
    assert!(page.contains("0.90 0.90 0.90 rg"));
    assert!(!page.contains(" re"));
    assert!(!page.contains("(6)'"));
}

#[test]
fn test_bluebar_colors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blue.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_compression(false).unwrap();
    pdf.set_form("bluebar").unwrap();
    pdf.print(b"text\n").unwrap();
    pdf.close().unwrap();

    let text = read_text(&path);
    let page = first_stream(&text);
    assert!(page.contains("0.804 1.000 1.000 rg"));
    assert!(page.contains("0.794 0.900 0.900 RG"));
}

#[test]
fn test_image_form_embeds_xobject() {
    let dir = tempfile::tempdir().unwrap();
    let jpeg_path = dir.path().join("form.jpg");
    std::fs::write(&jpeg_path, fake_jpeg(640, 480)).unwrap();

    let path = dir.path().join("image.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_compression(false).unwrap();
    pdf.set_form_image(&jpeg_path).unwrap();
    pdf.print(b"overlay\x0csecond\x0c").unwrap();
    pdf.close().unwrap();

    let text = read_text(&path);

    // The XObject is written once, as object 1; content follows.
    assert!(text.contains(
        "1 0 obj\n<< /Type /XObject /Subtype /Image /Width 640 /Height 480"
    ));
    assert!(text.contains("/Filter /DCTDecode"));
    assert!(text.contains("/ColorSpace /DeviceRGB"));

    // Every page invokes it and lists it in its resources.
    assert_eq!(text.matches("/form Do").count(), 2);
    assert_eq!(text.matches("/XObject << /form 1 0 R >>").count(), 2);

    // Page content streams start at object 2.
    assert!(text.contains("/Contents 2 0 R"));
    assert!(text.contains("/Contents 3 0 R"));
}

#[test]
fn test_image_form_rejects_bad_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let not_jpeg = dir.path().join("form.jpg");
    std::fs::write(&not_jpeg, b"GIF89a not a jpeg").unwrap();

    let path = dir.path().join("image.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_form_image(&not_jpeg).unwrap();
    assert!(matches!(pdf.print(b"x\n"), Err(lptpdf::Error::BadJpeg)));
}

#[test]
fn test_missing_image_rejected_at_set() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    assert!(matches!(
        pdf.set_form_image(dir.path().join("absent.jpg")),
        Err(lptpdf::Error::OtherIo(_))
    ));
}

#[test]
fn test_unknown_form_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    assert!(matches!(pdf.set_form("tartan"), Err(lptpdf::Error::UnknownForm(_))));
}

#[test]
fn test_bar_height_must_cover_a_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("f.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_bar_height(0.1).unwrap();
    // 0.1 in is under one line at 6 LPI; caught at first print.
    assert!(matches!(pdf.print(b"x"), Err(lptpdf::Error::InconsistentGeometry(_))));
}
