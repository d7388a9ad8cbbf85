//! LZWDecode-compatible encoder for PDF content streams.
//!
//! Produces data for the `/LZWDecode` filter as specified in the PDF
//! Reference (Section 7.4.4), with `/EarlyChange 0` semantics:
//!
//! - MSB-first bit packing
//! - 9-bit initial codes, growing to at most 12 bits
//! - Clear code 256, EOD code 257, first assigned code 258
//! - Code width grows *after* the code numbered `2^width - 1` has been
//!   assigned, so the decoder reads the wider code only once codes that
//!   need it can appear
//! - A clear code is emitted and the dictionary rebuilt when code 4096
//!   would be assigned
//!
//! LZW trades some ratio against deflate for a much cheaper encode;
//! lineprinter output typically compresses around 5:1.  The page writer
//! falls back to an uncompressed stream when the encoded form is not
//! strictly smaller.

const CLEAR_CODE: u16 = 256;
const EOD_CODE: u16 = 257;
/// Codes 0..=255 are identity entries; 256 and 257 are reserved.
const ID_CODES: u16 = 258;

const MIN_BITS: u32 = 9;
const MAX_BITS: u32 = 12;
const DICT_SIZE: u16 = 1 << MAX_BITS;

/// Null link in the dictionary tree.
const TREE_NULL: u16 = u16::MAX;

/// Reusable LZW compressor.
///
/// The dictionary is a prefix tree: each entry records its first child
/// and a sibling link, so extending the running prefix by one byte is a
/// short list walk rather than a hash lookup.
pub struct LzwEncoder {
    out: Vec<u8>,
    bitbuf: u32,
    nbits: u32,
    /// First child of each code
    first: Vec<u16>,
    /// Next sibling of each code
    next: Vec<u16>,
    /// Extension byte of each code
    ch: Vec<u8>,
    /// Highest code assigned
    assigned: u16,
    /// Current code width in bits
    codesize: u32,
}

impl LzwEncoder {
    /// Create an encoder.  The output buffer is retained and reused
    /// across [`encode`](Self::encode) calls.
    pub fn new() -> Self {
        let mut enc = Self {
            out: Vec::new(),
            bitbuf: 0,
            nbits: 0,
            first: vec![TREE_NULL; DICT_SIZE as usize],
            next: vec![TREE_NULL; DICT_SIZE as usize],
            ch: vec![0; DICT_SIZE as usize],
            assigned: ID_CODES - 1,
            codesize: MIN_BITS,
        };
        enc.reset_dictionary();
        enc
    }

    /// Compress `data`, returning the encoded bytes.
    ///
    /// The returned slice is valid until the next call; callers that
    /// need to keep it copy it out.
    pub fn encode(&mut self, data: &[u8]) -> &[u8] {
        self.out.clear();
        self.bitbuf = 0;
        self.nbits = 0;
        self.reset_dictionary();

        self.write_bits(CLEAR_CODE, self.codesize);

        let mut iter = data.iter();
        let mut code = match iter.next() {
            Some(&b) => b as u16,
            None => {
                self.write_bits(EOD_CODE, self.codesize);
                self.flush_bits();
                return &self.out;
            },
        };

        for &k in iter {
            match self.lookup(code, k) {
                Some(child) => code = child,
                None => {
                    self.write_bits(code, self.codesize);
                    if self.add(code, k).is_none() {
                        // Dictionary full: clear at the current width,
                        // then start over at 9 bits.
                        self.write_bits(CLEAR_CODE, self.codesize);
                        self.reset_dictionary();
                    }
                    code = k as u16;
                },
            }
        }

        self.write_bits(code, self.codesize);
        self.write_bits(EOD_CODE, self.codesize);
        self.flush_bits();
        &self.out
    }

    /// Bytes produced by the most recent [`encode`](Self::encode).
    pub fn data(&self) -> &[u8] {
        &self.out
    }

    fn reset_dictionary(&mut self) {
        for i in 0..ID_CODES as usize {
            self.first[i] = TREE_NULL;
            self.next[i] = TREE_NULL;
        }
        self.assigned = ID_CODES - 1;
        self.codesize = MIN_BITS;
    }

    /// Find the code for prefix `code` extended by `k`.
    fn lookup(&self, code: u16, k: u8) -> Option<u16> {
        let mut nc = self.first[code as usize];
        while nc != TREE_NULL {
            if self.ch[nc as usize] == k {
                return Some(nc);
            }
            nc = self.next[nc as usize];
        }
        None
    }

    /// Add prefix `code` extended by `k`; `None` when the table is full.
    fn add(&mut self, code: u16, k: u8) -> Option<u16> {
        let nc = self.assigned + 1;
        if nc >= DICT_SIZE {
            return None;
        }
        self.assigned = nc;

        // EarlyChange=0: widen after assigning the last code of the
        // current width, unless already at the maximum.
        if u32::from(nc) == (1 << self.codesize) - 1 && self.codesize != MAX_BITS {
            self.codesize += 1;
        }

        self.ch[nc as usize] = k;
        self.first[nc as usize] = TREE_NULL;
        self.next[nc as usize] = self.first[code as usize];
        self.first[code as usize] = nc;
        Some(nc)
    }

    /// Shift `nbits` of `bits` into the accumulator, draining whole
    /// bytes from the high end.
    fn write_bits(&mut self, bits: u16, nbits: u32) {
        self.bitbuf = (self.bitbuf << nbits) | (u32::from(bits) & ((1 << nbits) - 1));
        self.nbits += nbits;
        while self.nbits >= 8 {
            self.nbits -= 8;
            self.out.push((self.bitbuf >> self.nbits) as u8);
        }
    }

    /// Pad the final partial byte with zero bits.
    fn flush_bits(&mut self) {
        if self.nbits > 0 {
            let pad = 8 - self.nbits;
            self.write_bits(0, pad);
        }
    }
}

impl Default for LzwEncoder {
    fn default() -> Self {
        Self::new()
    }
}
