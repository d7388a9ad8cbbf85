//! Minimal JPEG inspection for image-backed forms.
//!
//! The image bytes pass straight through into a `/DCTDecode` XObject;
//! the only decoding needed is the frame header scan that recovers the
//! pixel dimensions used to scale the image onto the page.

use crate::error::{Error, Result};

/// Extract `(width, height)` from a baseline or extended JPEG.
///
/// Accepts files that open with SOI followed by an APP0/APP1 segment
/// and walks the marker chain to the first SOF0–SOF3 frame header.
/// A scan-start (SOS) before any frame header rejects the file.
pub fn jpeg_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    if data.len() < 4
        || data[0] != 0xFF
        || data[1] != 0xD8
        || data[2] != 0xFF
        || (data[3] & !0x01) != 0xE0
    {
        return Err(Error::BadJpeg);
    }

    let mut pos = 2;
    loop {
        // Seek the next marker, tolerating fill bytes.
        while pos < data.len() && data[pos] != 0xFF {
            pos += 1;
        }
        while pos < data.len() && data[pos] == 0xFF {
            pos += 1;
        }
        if pos >= data.len() {
            return Err(Error::BadJpeg);
        }

        let marker = data[pos];
        pos += 1;

        if marker == 0xDA {
            // Scan data before any frame header
            return Err(Error::BadJpeg);
        }

        if (0xC0..=0xC3).contains(&marker) {
            // SOF segment: length(2) precision(1) height(2) width(2)
            if pos + 7 > data.len() {
                return Err(Error::BadJpeg);
            }
            let height = u32::from(data[pos + 3]) << 8 | u32::from(data[pos + 4]);
            let width = u32::from(data[pos + 5]) << 8 | u32::from(data[pos + 6]);
            return Ok((width, height));
        }

        if pos + 2 > data.len() {
            return Err(Error::BadJpeg);
        }
        let len = usize::from(data[pos]) << 8 | usize::from(data[pos + 1]);
        if len < 2 {
            return Err(Error::BadJpeg);
        }
        pos += len;
    }
}
