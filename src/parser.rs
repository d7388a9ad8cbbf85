//! Terminal-style input parser.
//!
//! Consumes raw printer bytes in arbitrary chunks and emits a
//! canonicalized 16-bit character stream for pagination.  ESC and CSI
//! sequences are recognized and swallowed; the only sequence with an
//! effect is `CSI Pn z`, which selects the vertical pitch for the next
//! page.  Everything else about the state machine exists so that
//! malformed sequences are absorbed instead of leaking garbage into
//! the page.
//!
//! The parser is incremental: a sequence may be split across `parse`
//! calls and resumes where it left off.

/// Escape-sequence recognizer states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscState {
    /// Ordinary data
    Idle,
    /// After ESC
    EscSeq,
    /// After CSI, before any parameter
    Csi,
    /// Collecting CSI parameters
    CsiParam,
    /// Collecting CSI intermediates
    CsiInt,
    /// Malformed CSI: absorb until a final byte
    BadCsi,
    /// Malformed ESC sequence: absorb until a final byte
    BadEsc,
    /// OSC/PM/APC string: absorb until CAN, SUB, or ST
    BadStr,
}

/// Parameter slot holding "no value supplied".
const PARAM_DEFAULT: u16 = u16::MAX;
/// Parameters are capped below 2^15.
const PARAM_MAX: u32 = (1 << 15) - 1;
const MAX_PARAMS: usize = 16;
const MAX_INTERMEDIATES: usize = 4;

/// Incremental escape-stripping parser.
#[derive(Debug)]
pub struct InputParser {
    state: EscState,
    params: [u16; MAX_PARAMS],
    nparams: usize,
    nints: usize,
    private: Option<u8>,
    /// Vertical pitch selected by `CSI Pn z`, applied at the next page
    pending_lpi: Option<u32>,
}

impl InputParser {
    /// Create a parser in the idle state.
    pub fn new() -> Self {
        Self {
            state: EscState::Idle,
            params: [PARAM_DEFAULT; MAX_PARAMS],
            nparams: 0,
            nints: 0,
            private: None,
            pending_lpi: None,
        }
    }

    /// Pitch change requested since the last call, if any.
    pub fn take_pitch_change(&mut self) -> Option<u32> {
        self.pending_lpi.take()
    }

    /// Parse `bytes`, appending canonical characters to `out`.
    ///
    /// `initial` must be true only for the first data delivered to a
    /// fresh file (not after a checkpoint resume): a leading run of CR
    /// followed by at most one FF is stripped so that the customary
    /// printer-greeting form feed does not produce a blank first page.
    ///
    /// Returns true when an initial FF was stripped; the caller counts
    /// that as data even though nothing was emitted.
    pub fn parse(&mut self, bytes: &[u8], initial: bool, out: &mut Vec<u16>) -> bool {
        let mut initial = initial;
        let mut ff_seen = false;

        for &byte in bytes {
            let mut ch = u16::from(byte);

            // 7-bit code extension: ESC @ .. ESC _ become C1 controls.
            if self.state == EscState::EscSeq && (0x40..=0x5F).contains(&byte) {
                ch += 0x40;
                self.state = EscState::Idle;
            }

            // C0/C1 controls are recognized in every state.
            match ch {
                0x0A => {}, // LF: stored below
                0x0D => {
                    // CR: leading CRs before the initial FF vanish
                    if initial && !ff_seen {
                        continue;
                    }
                },
                0x0C => {
                    if initial && !ff_seen {
                        ff_seen = true;
                        continue;
                    }
                },
                0x18 | 0x1A => {
                    // CAN, SUB abort any sequence
                    self.state = EscState::Idle;
                    continue;
                },
                0x1B => {
                    self.state = EscState::EscSeq;
                    self.nints = 0;
                    self.nparams = 0;
                    self.private = None;
                    continue;
                },
                0x9B => {
                    self.state = EscState::Csi;
                    self.nints = 0;
                    self.nparams = 0;
                    self.private = None;
                    self.params = [PARAM_DEFAULT; MAX_PARAMS];
                    continue;
                },
                0x9C => {
                    // ST
                    self.state = EscState::Idle;
                    continue;
                },
                0x9D..=0x9F => {
                    // OSC, PM, APC open a control string
                    self.state = EscState::BadStr;
                    continue;
                },
                _ => {
                    if !self.advance(ch) {
                        continue;
                    }
                },
            }

            // Ordinary character, more or less.
            initial = false;
            out.push(ch);
        }

        ff_seen
    }

    /// Run one non-control character through the sequence recognizer.
    /// Returns true when the character should be emitted.
    fn advance(&mut self, ch: u16) -> bool {
        match self.state {
            EscState::Idle => {
                // Remaining C0 and C1 controls are dropped silently.
                !(ch < 0x20 || (0x7F..=0x9F).contains(&ch))
            },
            EscState::EscSeq => {
                if (0x20..=0x2F).contains(&ch) {
                    if self.nints < MAX_INTERMEDIATES {
                        self.nints += 1;
                    } else {
                        self.state = EscState::BadEsc;
                    }
                    return false;
                }
                if (0x30..=0x7E).contains(&ch) {
                    // No ESC finals have an action; discard the sequence.
                    self.state = EscState::Idle;
                    return false;
                }
                true
            },
            EscState::Csi => {
                if (0x3C..=0x3F).contains(&ch) {
                    self.private = Some(ch as u8);
                    self.state = EscState::CsiParam;
                    return false;
                }
                self.state = EscState::CsiParam;
                self.csi_param(ch)
            },
            EscState::CsiParam => self.csi_param(ch),
            EscState::CsiInt => self.csi_intermediate(ch),
            EscState::BadCsi => {
                if (0x40..=0x7E).contains(&ch) {
                    self.state = EscState::Idle;
                }
                false
            },
            EscState::BadEsc => {
                if (0x30..=0x7E).contains(&ch) {
                    self.state = EscState::Idle;
                }
                false
            },
            EscState::BadStr => false,
        }
    }

    fn csi_param(&mut self, ch: u16) -> bool {
        if (0x30..=0x3F).contains(&ch) {
            if ch == u16::from(b';') {
                if self.nparams + 1 < MAX_PARAMS {
                    self.nparams += 1;
                } else {
                    self.state = EscState::BadCsi;
                }
                return false;
            }
            if ch <= 0x39 {
                let digit = u32::from(ch) - 0x30;
                let slot = &mut self.params[self.nparams];
                if *slot == PARAM_DEFAULT {
                    *slot = digit as u16;
                } else {
                    let value = u32::from(*slot) * 10 + digit;
                    if value > PARAM_MAX {
                        self.state = EscState::BadCsi;
                    } else {
                        *slot = value as u16;
                    }
                }
                return false;
            }
            // 0x3A or a late private marker
            self.state = EscState::BadCsi;
            return false;
        }
        if self.params[self.nparams] != PARAM_DEFAULT {
            self.nparams += 1;
        }
        self.state = EscState::CsiInt;
        self.csi_intermediate(ch)
    }

    fn csi_intermediate(&mut self, ch: u16) -> bool {
        if (0x20..=0x2F).contains(&ch) {
            if self.nints < MAX_INTERMEDIATES {
                self.nints += 1;
            } else {
                self.state = EscState::BadCsi;
            }
            return false;
        }
        if (0x40..=0x7E).contains(&ch) {
            self.execute_csi(ch as u8);
            self.state = EscState::Idle;
            return false;
        }
        true
    }

    /// Execute a complete CSI sequence.  The only final with an action
    /// is `z` (vertical pitch select): Pn 1 or default selects 6 LPI,
    /// 2 selects 8 LPI, anything else is ignored.
    fn execute_csi(&mut self, final_byte: u8) {
        if final_byte != b'z' || self.nints != 0 || self.private.is_some() {
            return;
        }
        let p0 = match self.params[0] {
            PARAM_DEFAULT => 1,
            p => u32::from(p),
        };
        match p0 {
            1 => self.pending_lpi = Some(6),
            2 => self.pending_lpi = Some(8),
            _ => {},
        }
        if let Some(lpi) = self.pending_lpi {
            log::debug!("pitch change requested: {} LPI at next page", lpi);
        }
    }
}

impl Default for InputParser {
    fn default() -> Self {
        Self::new()
    }
}
