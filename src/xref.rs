//! Object allocation and the cross-reference table.
//!
//! Object IDs are handed out sequentially; allocating an ID records
//! the byte offset where that object's `N 0 obj` header is about to be
//! written.  When appending, offsets of the previous sessions' objects
//! are ingested first so the final table covers the whole file.

use std::io::{self, Write};

/// Append-only table of object file offsets.
///
/// Slot `k - 1` holds the offset of object `k`; object 0 is the
/// conventional free-list head and is synthesized at write time.
#[derive(Debug, Default)]
pub struct ObjectTable {
    offsets: Vec<u64>,
}

impl ObjectTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects allocated so far.
    pub fn count(&self) -> u32 {
        self.offsets.len() as u32
    }

    /// Allocate the next object ID, recording `offset` for it.
    pub fn allocate(&mut self, offset: u64) -> u32 {
        self.offsets.push(offset);
        self.offsets.len() as u32
    }

    /// Recorded offset of object `id`.
    pub fn offset(&self, id: u32) -> Option<u64> {
        if id == 0 {
            return None;
        }
        self.offsets.get((id - 1) as usize).copied()
    }

    /// Drop allocations above `count`, so the next [`allocate`]
    /// returns `count + 1`.  Offsets below stay valid; an appending
    /// session overwrites the old catalog and info IDs with new
    /// objects while everything beneath the anchor is preserved.
    ///
    /// [`allocate`]: Self::allocate
    pub fn truncate(&mut self, count: u32) {
        self.offsets.truncate(count as usize);
    }

    /// Emit the xref table.  Every entry line is exactly 20 bytes; the
    /// space before the newline is part of the required two-byte EOL.
    pub fn write_xref<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "xref")?;
        writeln!(w, "0 {}", self.offsets.len() + 1)?;
        writeln!(w, "{:010} {:05} f ", 0, 65535)?;
        for &offset in &self.offsets {
            writeln!(w, "{:010} {:05} n ", offset, 0)?;
        }
        Ok(())
    }
}
