//! Clipboard paste injection.
//!
//! Pasted text reaches the guest two ways at once:
//!
//! - as a byte stream for the serial ACIA, released one byte per tick batch
//!   and only while the guest's own input ring buffer has room
//! - as synthetic key presses for a keyboard device, released two events at
//!   a time once the keyboard has consumed the previous ones
//!
//! Live keyboard input goes through the same key queue so real and pasted
//! keys never interleave. Both queues sit behind one mutex; the injector is
//! shared as `Arc<PasteInjector>` with input threads.

use crate::config::PasteConfig;
use crate::input::{KeyEvent, Scancode};
use crate::MemoryBus;
use log::{debug, trace};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Key events released per drain.
pub const KEY_EVENTS_PER_DRAIN: usize = 2;

#[derive(Debug, Default)]
struct PasteQueues {
    keys: VecDeque<KeyEvent>,
    uart: VecDeque<u8>,
}

/// US-layout key for an ASCII character: scancode plus whether shift is held.
pub fn key_for_char(c: u8) -> Option<(Scancode, bool)> {
    if c.is_ascii_lowercase() {
        return Scancode::letter(c).map(|sc| (sc, false));
    }
    if c.is_ascii_uppercase() {
        return Scancode::letter(c).map(|sc| (sc, true));
    }
    if c.is_ascii_digit() {
        return Scancode::digit(c).map(|sc| (sc, false));
    }

    let shifted_digit = |d: u8| Scancode::digit(d).map(|sc| (sc, true));
    match c {
        b' ' => Some((Scancode::SPACE, false)),
        b'!' => shifted_digit(b'1'),
        b'"' => Some((Scancode::APOSTROPHE, true)),
        b'#' => shifted_digit(b'3'),
        b'$' => shifted_digit(b'4'),
        b'%' => shifted_digit(b'5'),
        b'&' => shifted_digit(b'7'),
        b'\'' => Some((Scancode::APOSTROPHE, false)),
        b'(' => shifted_digit(b'9'),
        b')' => shifted_digit(b'0'),
        b'*' => shifted_digit(b'8'),
        b'+' => Some((Scancode::EQUALS, true)),
        b',' => Some((Scancode::COMMA, false)),
        b'-' => Some((Scancode::MINUS, false)),
        b'.' => Some((Scancode::PERIOD, false)),
        b'/' => Some((Scancode::SLASH, false)),
        b':' => Some((Scancode::SEMICOLON, true)),
        b';' => Some((Scancode::SEMICOLON, false)),
        b'<' => Some((Scancode::COMMA, true)),
        b'=' => Some((Scancode::EQUALS, false)),
        b'>' => Some((Scancode::PERIOD, true)),
        b'?' => Some((Scancode::SLASH, true)),
        b'[' => Some((Scancode::LEFT_BRACKET, false)),
        b'\\' => Some((Scancode::BACKSLASH, false)),
        b']' => Some((Scancode::RIGHT_BRACKET, false)),
        b'^' => shifted_digit(b'6'),
        b'_' => Some((Scancode::MINUS, true)),
        b'`' => Some((Scancode::GRAVE, false)),
        b'{' => Some((Scancode::LEFT_BRACKET, true)),
        b'|' => Some((Scancode::BACKSLASH, true)),
        b'}' => Some((Scancode::RIGHT_BRACKET, true)),
        b'~' => Some((Scancode::GRAVE, true)),
        b'\t' => Some((Scancode::TAB, false)),
        b'\n' => Some((Scancode::RETURN, false)),
        _ => None,
    }
}

/// Shared paste and key-event queues.
///
/// # Examples
///
/// ```rust
/// use sbc6502::{FlatMemory, PasteInjector};
///
/// let paste = PasteInjector::default();
/// paste.set_uart_attached(true);
/// paste.paste("hi\n");
///
/// // Guest ring buffer empty (read ptr == write ptr): one byte per call
/// let memory = FlatMemory::new();
/// assert_eq!(paste.next_uart_byte(&memory, true), Some(b'h'));
/// assert_eq!(paste.next_uart_byte(&memory, true), Some(b'i'));
/// assert_eq!(paste.next_uart_byte(&memory, true), Some(b'\r'));
/// assert_eq!(paste.next_uart_byte(&memory, true), None);
/// ```
#[derive(Debug)]
pub struct PasteInjector {
    queues: Mutex<PasteQueues>,
    uart_attached: AtomicBool,
    flow: PasteConfig,
}

impl PasteInjector {
    pub fn new(flow: PasteConfig) -> Self {
        Self {
            queues: Mutex::new(PasteQueues::default()),
            uart_attached: AtomicBool::new(false),
            flow,
        }
    }

    /// Whether pasted text should also be queued as serial bytes.
    pub fn set_uart_attached(&self, attached: bool) {
        self.uart_attached.store(attached, Ordering::Relaxed);
    }

    pub fn uart_attached(&self) -> bool {
        self.uart_attached.load(Ordering::Relaxed)
    }

    fn lock(&self) -> MutexGuard<'_, PasteQueues> {
        // queues hold plain data, a panicked holder leaves them consistent
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `text` for delivery.
    ///
    /// Both Ctrl keys are released first since the paste shortcut leaves
    /// them held. Newlines become CR on the serial stream.
    pub fn paste(&self, text: &str) {
        self.paste_bytes(text.as_bytes());
    }

    /// Queue raw bytes for delivery. Bytes with no key mapping still go out
    /// on the serial stream.
    pub fn paste_bytes(&self, bytes: &[u8]) {
        let uart = self.uart_attached();
        let mut queues = self.lock();

        queues.keys.push_back(KeyEvent::up(Scancode::LEFT_CTRL));
        queues.keys.push_back(KeyEvent::up(Scancode::RIGHT_CTRL));

        for &c in bytes {
            if uart {
                queues.uart.push_back(if c == b'\n' { b'\r' } else { c });
            }

            if let Some((scancode, shift)) = key_for_char(c) {
                if shift {
                    queues.keys.push_back(KeyEvent::down(Scancode::LEFT_SHIFT));
                }
                queues.keys.push_back(KeyEvent::down(scancode));
                queues.keys.push_back(KeyEvent::up(scancode));
                if shift {
                    queues.keys.push_back(KeyEvent::up(Scancode::LEFT_SHIFT));
                }
            }
        }

        debug!(
            "pasted {} bytes ({} key events, {} serial bytes pending)",
            bytes.len(),
            queues.keys.len(),
            queues.uart.len()
        );
    }

    /// Queue a live key event behind any pending pasted keys.
    pub fn push_key(&self, event: KeyEvent) {
        self.lock().keys.push_back(event);
    }

    /// Next serial byte, if the guest can take one.
    ///
    /// Delivery requires the ACIA receive FIFO to be empty and the guest's
    /// input ring buffer (pointers read with side-effect-free `peek`) to hold
    /// fewer than the configured high-water mark.
    pub fn next_uart_byte<B: MemoryBus + ?Sized>(&self, bus: &B, rx_empty: bool) -> Option<u8> {
        let mut queues = self.lock();
        if queues.uart.is_empty() || !rx_empty {
            return None;
        }

        let write_ptr = bus.peek(self.flow.write_ptr_addr);
        let read_ptr = bus.peek(self.flow.read_ptr_addr);
        let used = write_ptr.wrapping_sub(read_ptr);
        if used >= self.flow.high_water {
            trace!("paste held back, guest buffer holds {} bytes", used);
            return None;
        }

        queues.uart.pop_front()
    }

    /// Up to two queued key events, released only when the keyboard is idle.
    pub fn drain_keys(&self, keyboard_idle: bool) -> Vec<KeyEvent> {
        if !keyboard_idle {
            return Vec::new();
        }
        let mut queues = self.lock();
        let count = queues.keys.len().min(KEY_EVENTS_PER_DRAIN);
        queues.keys.drain(..count).collect()
    }

    /// Drop everything still queued.
    pub fn clear(&self) {
        let mut queues = self.lock();
        queues.keys.clear();
        queues.uart.clear();
    }

    pub fn pending_keys(&self) -> usize {
        self.lock().keys.len()
    }

    pub fn pending_uart_bytes(&self) -> usize {
        self.lock().uart.len()
    }

    pub fn is_idle(&self) -> bool {
        let queues = self.lock();
        queues.keys.is_empty() && queues.uart.is_empty()
    }
}

impl Default for PasteInjector {
    fn default() -> Self {
        Self::new(PasteConfig::default())
    }
}
