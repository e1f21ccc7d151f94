//! Serial terminal transcript.
//!
//! Bytes the guest transmits through the ACIA are not sent down a wire; they
//! are rendered into a terminal transcript, one byte at a time:
//!
//! | Byte | Effect |
//! |------|--------|
//! | CR | newline, column 0 |
//! | LF | newline, column 0, unless the previous byte is already a newline (CRLF collapses) |
//! | BS / DEL | remove the previous byte unless it is a newline, column - 1 |
//! | >= 0x20, TAB | append, column + 1 |
//! | other | ignored |
//!
//! Every byte sets a one-shot "scroll to bottom" flag for the presentation
//! layer. The buffer is kept NUL-terminated and never exceeds its capacity:
//! once it comes within 256 bytes of the limit, the oldest half is discarded.

/// Transcript capacity in bytes, including the NUL terminator.
pub const TRANSCRIPT_CAPACITY: usize = 65536;

const COMPACT_MARGIN: usize = 256;

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const BS: u8 = 0x08;
const DEL: u8 = 0x7F;
const TAB: u8 = b'\t';

/// Rolling terminal output log.
///
/// # Examples
///
/// ```rust
/// use sbc6502::Transcript;
///
/// let mut term = Transcript::new();
/// term.put_bytes(b"A\r\nB");
/// assert_eq!(term.as_bytes(), b"A\nB");
/// assert!(term.consume_scroll_to_bottom());
/// assert!(!term.consume_scroll_to_bottom());
/// ```
#[derive(Debug, Clone)]
pub struct Transcript {
    // content followed by a single NUL
    buf: Vec<u8>,
    capacity: usize,
    cursor_col: usize,
    scroll_to_bottom: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::with_capacity(TRANSCRIPT_CAPACITY)
    }

    /// Transcript with a custom capacity (clamped to leave room for compaction).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(COMPACT_MARGIN * 2);
        let mut buf = Vec::with_capacity(capacity);
        buf.push(0);
        Self {
            buf,
            capacity,
            cursor_col: 0,
            scroll_to_bottom: false,
        }
    }

    /// Render one transmitted byte.
    pub fn put_byte(&mut self, byte: u8) {
        match byte {
            CR => self.newline(),
            LF => {
                if self.last() != Some(LF) {
                    self.newline();
                }
            }
            BS | DEL => {
                if matches!(self.last(), Some(b) if b != LF) {
                    self.truncate_last();
                    self.cursor_col = self.cursor_col.saturating_sub(1);
                }
            }
            b if b >= 0x20 || b == TAB => {
                if self.append(b) {
                    self.cursor_col += 1;
                }
            }
            _ => {}
        }

        self.scroll_to_bottom = true;

        if self.len() > self.capacity - COMPACT_MARGIN {
            self.compact();
        }
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.put_byte(b);
        }
    }

    /// Transcript content without the NUL terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    /// Transcript content followed by its NUL terminator.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.buf
    }

    /// Transcript content as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }

    pub fn len(&self) -> usize {
        self.buf.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Column of the cursor on the current line.
    pub fn cursor_column(&self) -> usize {
        self.cursor_col
    }

    /// Returns whether output arrived since the last call, clearing the flag.
    pub fn consume_scroll_to_bottom(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_bottom)
    }

    /// Erase the transcript.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.buf.push(0);
        self.cursor_col = 0;
        self.scroll_to_bottom = true;
    }

    fn last(&self) -> Option<u8> {
        self.as_bytes().last().copied()
    }

    fn newline(&mut self) {
        self.append(LF);
        self.cursor_col = 0;
    }

    fn append(&mut self, byte: u8) -> bool {
        if self.len() >= self.capacity - 1 {
            return false;
        }
        let nul = self.buf.len() - 1;
        self.buf[nul] = byte;
        self.buf.push(0);
        true
    }

    fn truncate_last(&mut self) {
        self.buf.pop();
        if let Some(last) = self.buf.last_mut() {
            *last = 0;
        }
    }

    fn compact(&mut self) {
        let half = self.len() / 2;
        self.buf.drain(..half);
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
