//! Append, checkpoint, and snapshot behavior on real files.

use lptpdf::{FileMode, PdfWriter};

fn read_text(path: &std::path::Path) -> String {
    String::from_utf8_lossy(&std::fs::read(path).unwrap()).into_owned()
}

fn trailer_ids(text: &str) -> (String, String) {
    let at = text.rfind("/ID [<").unwrap();
    let rest = &text[at + 6..];
    let second_at = rest.find("> <").unwrap() + 3;
    (rest[..40].to_string(), rest[second_at..second_at + 40].to_string())
}

fn content_streams(text: &str) -> Vec<String> {
    let mut streams = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("stream\n") {
        let body = &rest[start + 7..];
        let end = body.find("\nendstream").expect("unterminated stream");
        streams.push(body[..end].to_string());
        rest = &body[end..];
    }
    streams
}

/// Write a one-page file and return its trailer IDs.
fn seed_file(path: &std::path::Path) -> (String, String) {
    let mut pdf = PdfWriter::open(path).unwrap();
    pdf.print(b"Hello\n").unwrap();
    pdf.close().unwrap();
    trailer_ids(&read_text(path))
}

#[test]
fn test_append_adds_a_session_subtree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grow.pdf");
    let (orig_id, _) = seed_file(&path);

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_file_mode(FileMode::Append).unwrap();
    pdf.print(b"Bye\n").unwrap();
    pdf.close().unwrap();

    let text = read_text(&path);

    // Two leaves across the two sessions, new root counts both.
    assert_eq!(text.matches("/Type /Page /Parent").count(), 2);

    // Original object layout: 1 content, 2 list, 3 fonts, 4 leaf,
    // 5 anchor, 6 catalog, 7 info.  The appending session starts at
    // the old catalog: 6 content, 7 list, 8 fonts, 9 leaf, 10 anchor,
    // 11 catalog, 12 info.
    assert!(text.contains("10 0 obj\n << /Type /Pages /Kids [5 0 R 7 0 R] /Count 2 >>"));
    assert!(text.contains("11 0 obj\n  << /Type /Catalog /Pages 10 0 R"));
    assert!(text.contains("/Size 13"));

    // The old anchor (whose kid is the first session's page list) now
    // carries a back-patched /Parent naming the new anchor.
    assert!(text.contains("5 0 obj\n << /Type /Pages /Kids [2 0 R] /Count 1 /Parent 0000000010 0 R"));

    // First /ID element survives, the second is fresh.
    let (oid, nid) = trailer_ids(&text);
    assert_eq!(oid, orig_id);
    assert_ne!(nid, orig_id);

    // Producer marker still present, so the file can be appended again.
    assert!(text.contains("/Producer (LPTPDF Version 1.0)"));
}

#[test]
fn test_append_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grow.pdf");
    let (orig_id, _) = seed_file(&path);

    for line in [&b"second\n"[..], &b"third\n"[..]] {
        let mut pdf = PdfWriter::open(&path).unwrap();
        pdf.set_file_mode(FileMode::Append).unwrap();
        pdf.print(line).unwrap();
        pdf.close().unwrap();
    }

    let text = read_text(&path);
    assert_eq!(text.matches("/Type /Page /Parent").count(), 3);
    assert!(text.contains("/Count 3 >>"));
    assert_eq!(trailer_ids(&text).0, orig_id);
}

#[test]
fn test_append_reports_continuing_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grow.pdf");
    seed_file(&path);

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_file_mode(FileMode::Append).unwrap();
    pdf.print(b"x\n").unwrap();
    let (page, _) = pdf.position();
    assert_eq!(page, 2);
    pdf.close().unwrap();
}

#[test]
fn test_append_rejects_foreign_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foreign.pdf");
    std::fs::write(
        &path,
        b"%PDF-1.7\nsome other writer's structure\nstartxref\n999\n%%EOF\n",
    )
    .unwrap();

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_file_mode(FileMode::Append).unwrap();
    let err = pdf.print(b"x\n").unwrap_err();
    assert!(matches!(err, lptpdf::Error::NoAppend(_)), "got {err:?}");
}

#[test]
fn test_append_rejects_non_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("junk.pdf");
    std::fs::write(&path, b"MZ\x90\x00 definitely not a pdf\n").unwrap();

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_file_mode(FileMode::Append).unwrap();
    assert!(matches!(pdf.print(b"x\n"), Err(lptpdf::Error::NotPdf)));
}

#[test]
fn test_append_to_empty_file_writes_new() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.pdf");
    std::fs::write(&path, b"").unwrap();

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_file_mode(FileMode::Append).unwrap();
    pdf.print(b"first\n").unwrap();
    pdf.close().unwrap();

    let text = read_text(&path);
    assert!(text.starts_with("%PDF-1.4\n"));
    assert_eq!(text.matches("/Type /Page /Parent").count(), 1);
}

#[test]
fn test_checkpoint_leaves_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ckpt.pdf");

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_compression(false).unwrap();
    pdf.print(b"page one\x0c").unwrap();
    pdf.checkpoint().unwrap();

    // At this instant the file is complete: header through %%EOF.
    let text = read_text(&path);
    assert!(text.starts_with("%PDF-1.4\n"));
    assert!(text.ends_with("%%EOF\n"));
    assert_eq!(text.matches("/Type /Page /Parent").count(), 1);
    assert!(lptpdf::is_pdf_file(&path).unwrap());

    // Keep printing; the final close supersedes the checkpoint state.
    pdf.print(b"page two\x0c").unwrap();
    pdf.close().unwrap();

    let text = read_text(&path);
    assert!(text.ends_with("%%EOF\n"));
    assert_eq!(text.matches("/Type /Page /Parent").count(), 2);
    let streams = content_streams(&text);
    assert!(streams[0].contains("(page one)Tj"));
    assert!(streams[1].contains("(page two)Tj"));
}

#[test]
fn test_checkpoint_then_close_matches_straight_run() {
    let dir = tempfile::tempdir().unwrap();
    let chk = dir.path().join("chk.pdf");
    let straight = dir.path().join("straight.pdf");

    let mut pdf = PdfWriter::open(&chk).unwrap();
    pdf.set_compression(false).unwrap();
    pdf.print(b"alpha\x0cbeta\n").unwrap();
    pdf.checkpoint().unwrap();
    pdf.print(b" continues\n\x0cgamma\n").unwrap();
    pdf.close().unwrap();

    let mut pdf = PdfWriter::open(&straight).unwrap();
    pdf.set_compression(false).unwrap();
    pdf.print(b"alpha\x0cbeta\n").unwrap();
    pdf.print(b" continues\n\x0cgamma\n").unwrap();
    pdf.close().unwrap();

    // Identical page content; only IDs and timestamps may differ.
    assert_eq!(content_streams(&read_text(&chk)), content_streams(&read_text(&straight)));
}

#[test]
fn test_checkpoint_holds_partial_page_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.pdf");

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_compression(false).unwrap();
    pdf.print(b"complete\x0cpartial line").unwrap();
    pdf.checkpoint().unwrap();

    // The checkpointed file has only the complete page.
    let text = read_text(&path);
    assert_eq!(text.matches("/Type /Page /Parent").count(), 1);
    assert!(!text.contains("partial line"));

    // The partial page emerges at close.
    pdf.close().unwrap();
    let text = read_text(&path);
    assert_eq!(text.matches("/Type /Page /Parent").count(), 2);
    assert!(content_streams(&text)[1].contains("(partial line)Tj"));
}

#[test]
fn test_checkpoint_before_output_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("noop.pdf");
    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.checkpoint().unwrap();
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    pdf.close().unwrap();
}

#[test]
fn test_append_after_checkpointed_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mix.pdf");

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.print(b"one\x0c").unwrap();
    pdf.checkpoint().unwrap();
    pdf.print(b"two\x0c").unwrap();
    pdf.close().unwrap();

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_file_mode(FileMode::Append).unwrap();
    pdf.print(b"three\x0c").unwrap();
    pdf.close().unwrap();

    let text = read_text(&path);
    assert_eq!(text.matches("/Type /Page /Parent").count(), 3);
    assert!(text.contains("/Count 3 >>"));
}

#[test]
fn test_snapshot_copies_consistent_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("live.pdf");
    let snap = dir.path().join("snap.pdf");

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_compression(false).unwrap();
    pdf.print(b"durable\x0c").unwrap();
    pdf.snapshot(&snap).unwrap();

    // Snapshot equals the live file at the checkpoint instant.
    assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&snap).unwrap());
    assert!(lptpdf::is_pdf_file(&snap).unwrap());

    // The live session continues unaffected.
    pdf.print(b"later\x0c").unwrap();
    pdf.close().unwrap();
    let text = read_text(&path);
    assert_eq!(text.matches("/Type /Page /Parent").count(), 2);

    let snap_text = read_text(&snap);
    assert_eq!(snap_text.matches("/Type /Page /Parent").count(), 1);
}

#[test]
fn test_appended_file_round_trips_through_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("full.pdf");
    let (orig_id, _) = seed_file(&path);

    let mut pdf = PdfWriter::open(&path).unwrap();
    pdf.set_file_mode(FileMode::Append).unwrap();
    pdf.print(b"more\x0c").unwrap();
    pdf.checkpoint().unwrap();

    let text = read_text(&path);
    assert_eq!(trailer_ids(&text).0, orig_id);
    assert_eq!(text.matches("/Type /Page /Parent").count(), 2);

    pdf.print(b"and more\x0c").unwrap();
    pdf.close().unwrap();

    let text = read_text(&path);
    assert_eq!(trailer_ids(&text).0, orig_id);
    assert_eq!(text.matches("/Type /Page /Parent").count(), 3);
    assert!(text.contains("/Count 3 >>"));
}
