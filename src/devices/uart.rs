//! W65C51 ACIA serial adapter with an attached terminal.
//!
//! The ACIA is wired as a loop-back terminal: bytes the guest transmits are
//! rendered into a [`Transcript`], and bytes typed or pasted by the user are
//! pushed into the receive FIFO for the guest to read.

use super::terminal::Transcript;
use super::{BusView, Device, InterruptController, InterruptSignal};
use crate::fifo::BoundedFifo;
use log::trace;
use std::any::Any;

/// Data register (R: receive, W: transmit).
pub const REG_DATA: u16 = 0x00;
/// Status register (R) / programmed reset (W).
pub const REG_STATUS: u16 = 0x01;
/// Command register (R/W).
pub const REG_COMMAND: u16 = 0x02;
/// Control register (R/W).
pub const REG_CONTROL: u16 = 0x03;

pub const STATUS_PE: u8 = 0x01;
pub const STATUS_FE: u8 = 0x02;
pub const STATUS_OVRN: u8 = 0x04;
pub const STATUS_RDRF: u8 = 0x08;
pub const STATUS_TDRE: u8 = 0x10;
pub const STATUS_DCD: u8 = 0x20;
pub const STATUS_DSR: u8 = 0x40;
pub const STATUS_IRQ: u8 = 0x80;

pub const CMD_DTR: u8 = 0x01;
/// Receiver IRQ disable (0 = enabled).
pub const CMD_RX_IRQ_DISABLE: u8 = 0x02;
pub const CMD_TX_MASK: u8 = 0x0C;
pub const CMD_ECHO: u8 = 0x10;

/// Receive FIFO depth.
pub const RX_BUFFER_SIZE: usize = 256;

/// Special keys a terminal window forwards to the ACIA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalKey {
    /// Typed character.
    Char(char),
    Enter,
    Backspace,
    Escape,
}

impl TerminalKey {
    /// Byte the terminal sends for this key, if any.
    ///
    /// Typed text is limited to 7-bit ASCII; CR, LF and BS arrive through the
    /// dedicated keys instead.
    pub fn to_byte(self) -> Option<u8> {
        match self {
            TerminalKey::Char(c) => {
                let code = c as u32;
                let excluded = matches!(c, '\r' | '\n' | '\x08');
                (code > 0 && code < 128 && !excluded).then_some(code as u8)
            }
            TerminalKey::Enter => Some(b'\r'),
            TerminalKey::Backspace => Some(0x08),
            TerminalKey::Escape => Some(0x1B),
        }
    }
}

/// W65C51 ACIA serial communication device.
///
/// ## Register Map (offsets from device base address)
///
/// | Offset | Read | Write |
/// |--------|------|-------|
/// | 0 | Receive data (pops RX FIFO) | Transmit data (to terminal) |
/// | 1 | Status | Programmed reset |
/// | 2 | Command | Command |
/// | 3 | Control | Control |
///
/// ## Status Register
///
/// | Bit | Name | Description |
/// |-----|------|-------------|
/// | 7 | IRQ | Interrupt pending (cleared by status read) |
/// | 6 | DSR | Data set ready |
/// | 5 | DCD | Data carrier detect |
/// | 4 | TDRE | Transmit data register empty (always 1) |
/// | 3 | RDRF | Receive data register full |
/// | 2 | OVRN | Overrun |
/// | 1 | FE | Framing error |
/// | 0 | PE | Parity error |
///
/// ## Interrupts
///
/// The IRQ line is asserted exactly while RDRF is set and command bit 1
/// (receiver IRQ disable) is clear. Every register change that can affect
/// that condition re-evaluates it and drives the configured line.
///
/// ## Receive FIFO
///
/// 256 bytes; when full, a new byte overwrites the oldest unread one. The
/// OVRN bit is not set by this path.
///
/// # Example
///
/// ```rust
/// use sbc6502::{Acia6551, Device, InterruptController};
///
/// let mut irq = InterruptController::new();
/// let mut acia = Acia6551::new(0x8400, 2);
///
/// acia.receive_byte(b'A', &mut irq);
/// assert!(irq.irq_asserted()); // RX interrupts enabled after reset
///
/// assert_eq!(acia.read(0x8400, &mut irq), Some(b'A'));
/// assert!(!irq.irq_asserted());
///
/// acia.write(0x8400, b'H', &mut irq);
/// acia.write(0x8400, b'I', &mut irq);
/// assert_eq!(acia.transcript().as_bytes(), b"HI");
/// ```
pub struct Acia6551 {
    base: u16,
    irq_line: u8,

    command: u8,
    control: u8,
    status: u8,

    rx: BoundedFifo<u8>,
    terminal: Transcript,

    on_transmit: Option<Box<dyn FnMut(u8)>>,
}

impl Acia6551 {
    /// Create an ACIA at `base` (claiming `base..=base+3`) driving `irq_line`.
    ///
    /// Line 0 leaves the device without an interrupt connection.
    pub fn new(base: u16, irq_line: u8) -> Self {
        Self {
            base,
            irq_line,
            command: 0x00,
            control: 0x00,
            status: STATUS_TDRE,
            rx: BoundedFifo::new(RX_BUFFER_SIZE),
            terminal: Transcript::new(),
            on_transmit: None,
        }
    }

    /// Observe every transmitted byte in addition to the transcript.
    ///
    /// The command-line runner uses this to mirror guest output to stdout.
    pub fn set_transmit_callback<F>(&mut self, callback: F)
    where
        F: FnMut(u8) + 'static,
    {
        self.on_transmit = Some(Box::new(callback));
    }

    /// Push a byte into the receive FIFO (terminal input, paste injection).
    ///
    /// A full FIFO loses its oldest unread byte.
    pub fn receive_byte(&mut self, byte: u8, irq: &mut InterruptController) {
        trace!(
            "[ACIA RX] 0x{:02X} '{}' (buf={}, RDRF={}, CMD=0x{:02X})",
            byte,
            printable(byte),
            self.rx.len(),
            self.status & STATUS_RDRF != 0,
            self.command
        );

        if let Some(lost) = self.rx.push(byte) {
            trace!("[ACIA RX] overflow, dropped 0x{:02X}", lost);
        }

        if self.status & STATUS_RDRF == 0 {
            self.status |= STATUS_RDRF;
            self.update_irq(irq);
        }
    }

    /// Forward a terminal key press to the receiver.
    pub fn terminal_key(&mut self, key: TerminalKey, irq: &mut InterruptController) {
        if let Some(byte) = key.to_byte() {
            self.receive_byte(byte, irq);
        }
    }

    pub fn is_rx_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn rx_len(&self) -> usize {
        self.rx.len()
    }

    pub fn status(&self) -> u8 {
        self.status
    }

    pub fn command(&self) -> u8 {
        self.command
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn irq_line(&self) -> u8 {
        self.irq_line
    }

    pub fn transcript(&self) -> &Transcript {
        &self.terminal
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.terminal
    }

    /// One-shot "new output" flag for terminal views.
    pub fn consume_scroll_to_bottom(&mut self) -> bool {
        self.terminal.consume_scroll_to_bottom()
    }

    /// Whether the receiver interrupt condition currently holds.
    pub fn irq_condition(&self) -> bool {
        self.status & STATUS_RDRF != 0 && self.command & CMD_RX_IRQ_DISABLE == 0
    }

    fn register(&self, addr: u16) -> Option<u16> {
        let reg = addr.checked_sub(self.base)?;
        (reg <= REG_CONTROL).then_some(reg)
    }

    fn update_irq(&mut self, irq: &mut InterruptController) {
        if self.irq_condition() {
            self.status |= STATUS_IRQ;
            irq.raise(self.irq_line, InterruptSignal::Raise);
        } else {
            self.status &= !STATUS_IRQ;
            irq.raise(self.irq_line, InterruptSignal::Release);
        }
    }

    fn transmit(&mut self, byte: u8) {
        trace!("[ACIA TX] 0x{:02X} '{}'", byte, printable(byte));
        self.terminal.put_byte(byte);
        if let Some(callback) = self.on_transmit.as_mut() {
            callback(byte);
        }
    }
}

fn printable(byte: u8) -> char {
    if (0x20..0x7F).contains(&byte) {
        byte as char
    } else {
        '.'
    }
}

impl Device for Acia6551 {
    fn name(&self) -> &str {
        "65C51 ACIA"
    }

    fn reset(&mut self, irq: &mut InterruptController) {
        self.command = 0x00;
        self.control = 0x00;
        self.status = STATUS_TDRE;
        self.rx.clear();
        irq.raise(self.irq_line, InterruptSignal::Release);
    }

    fn read(&mut self, addr: u16, irq: &mut InterruptController) -> Option<u8> {
        let value = match self.register(addr)? {
            REG_DATA => match self.rx.pop() {
                Some(byte) => {
                    trace!(
                        "[ACIA RD] 0x{:02X} '{}' (remaining={})",
                        byte,
                        printable(byte),
                        self.rx.len()
                    );
                    if self.rx.is_empty() {
                        self.status &= !STATUS_RDRF;
                    }
                    self.update_irq(irq);
                    byte
                }
                None => {
                    trace!("[ACIA RD] EMPTY (no data!)");
                    0x00
                }
            },
            REG_STATUS => {
                let status = self.status;
                // reading status acknowledges the interrupt flag
                self.status &= !STATUS_IRQ;
                status
            }
            REG_COMMAND => self.command,
            _ => self.control,
        };
        Some(value)
    }

    fn peek(&self, addr: u16) -> Option<u8> {
        let value = match self.register(addr)? {
            REG_DATA => self.rx.front().copied().unwrap_or(0x00),
            REG_STATUS => self.status,
            REG_COMMAND => self.command,
            _ => self.control,
        };
        Some(value)
    }

    fn write(&mut self, addr: u16, value: u8, irq: &mut InterruptController) -> bool {
        let Some(reg) = self.register(addr) else {
            return false;
        };
        match reg {
            REG_DATA => self.transmit(value),
            REG_STATUS => {
                // programmed reset
                self.command &= 0xE0;
                self.status &= !STATUS_OVRN;
            }
            REG_COMMAND => {
                self.command = value;
                self.update_irq(irq);
            }
            _ => self.control = value,
        }
        true
    }

    fn tick(&mut self, bus: &mut BusView<'_>, _delta_ticks: u32, _delta_seconds: f64) {
        if !self.rx.is_empty() && self.status & STATUS_RDRF == 0 {
            self.status |= STATUS_RDRF;
            self.update_irq(bus.interrupts());
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const BASE: u16 = 0x8400;
    const LINE: u8 = 2;

    fn setup() -> (Acia6551, InterruptController) {
        (Acia6551::new(BASE, LINE), InterruptController::new())
    }

    #[test]
    fn test_acia_new() {
        let (acia, _) = setup();
        assert_eq!(acia.status(), STATUS_TDRE);
        assert_eq!(acia.command(), 0x00);
        assert_eq!(acia.control(), 0x00);
        assert!(acia.is_rx_empty());
        assert!(acia.transcript().is_empty());
    }

    #[test]
    fn test_acia_claims_four_registers() {
        let (mut acia, mut irq) = setup();
        assert!(acia.peek(BASE - 1).is_none());
        for reg in 0..4 {
            assert!(acia.peek(BASE + reg).is_some());
        }
        assert!(acia.peek(BASE + 4).is_none());
        assert!(!acia.write(BASE + 4, 0xFF, &mut irq));
    }

    #[test]
    fn test_acia_transmit_to_transcript() {
        let (mut acia, mut irq) = setup();
        let transmitted = Rc::new(RefCell::new(Vec::new()));
        let transmitted_clone = Rc::clone(&transmitted);
        acia.set_transmit_callback(move |byte| transmitted_clone.borrow_mut().push(byte));

        for &b in b"OK\r\n" {
            assert!(acia.write(BASE + REG_DATA, b, &mut irq));
        }

        assert_eq!(acia.transcript().as_bytes(), b"OK\n");
        assert_eq!(*transmitted.borrow(), b"OK\r\n");
        assert!(acia.consume_scroll_to_bottom());
    }

    #[test]
    fn test_acia_receive_sets_rdrf_and_irq() {
        let (mut acia, mut irq) = setup();

        acia.receive_byte(0x41, &mut irq);

        assert_eq!(acia.status() & STATUS_RDRF, STATUS_RDRF);
        assert_eq!(acia.status() & STATUS_IRQ, STATUS_IRQ);
        assert_eq!(irq.line(LINE), Some(InterruptSignal::Raise));
        assert!(irq.irq_asserted());
    }

    #[test]
    fn test_acia_read_data_pops_in_order() {
        let (mut acia, mut irq) = setup();
        for &b in b"ABC" {
            acia.receive_byte(b, &mut irq);
        }

        assert_eq!(acia.read(BASE, &mut irq), Some(b'A'));
        assert_eq!(acia.read(BASE, &mut irq), Some(b'B'));
        assert_ne!(acia.status() & STATUS_RDRF, 0);
        assert!(irq.irq_asserted());

        assert_eq!(acia.read(BASE, &mut irq), Some(b'C'));
        assert_eq!(acia.status() & STATUS_RDRF, 0);
        assert!(!irq.irq_asserted());

        // Empty FIFO reads as zero
        assert_eq!(acia.read(BASE, &mut irq), Some(0x00));
    }

    #[test]
    fn test_acia_peek_data_is_pure() {
        let (mut acia, mut irq) = setup();
        acia.receive_byte(b'Z', &mut irq);

        assert_eq!(acia.peek(BASE), Some(b'Z'));
        assert_eq!(acia.peek(BASE), Some(b'Z'));
        assert_eq!(acia.rx_len(), 1);
        assert!(irq.irq_asserted());
    }

    #[test]
    fn test_acia_status_read_acknowledges_irq_bit() {
        let (mut acia, mut irq) = setup();
        acia.receive_byte(b'x', &mut irq);

        // Peek leaves the bit alone
        assert_ne!(acia.peek(BASE + REG_STATUS).unwrap() & STATUS_IRQ, 0);

        let status = acia.read(BASE + REG_STATUS, &mut irq).unwrap();
        assert_ne!(status & STATUS_IRQ, 0);
        assert_eq!(acia.status() & STATUS_IRQ, 0);
        // RDRF stays set until the data is read
        assert_ne!(acia.status() & STATUS_RDRF, 0);
    }

    #[test]
    fn test_acia_rx_irq_disable_bit() {
        let (mut acia, mut irq) = setup();
        acia.write(BASE + REG_COMMAND, CMD_RX_IRQ_DISABLE | CMD_DTR, &mut irq);

        acia.receive_byte(b'q', &mut irq);
        assert!(!irq.irq_asserted());
        assert_eq!(acia.status() & STATUS_IRQ, 0);

        // Re-enabling with data pending raises the line immediately
        acia.write(BASE + REG_COMMAND, CMD_DTR, &mut irq);
        assert!(irq.irq_asserted());
        assert_eq!(acia.read(BASE + REG_COMMAND, &mut irq), Some(CMD_DTR));
    }

    #[test]
    fn test_acia_programmed_reset() {
        let (mut acia, mut irq) = setup();
        acia.write(BASE + REG_COMMAND, 0xFF, &mut irq);
        acia.write(BASE + REG_CONTROL, 0x1E, &mut irq);
        acia.receive_byte(b'k', &mut irq);

        assert!(acia.write(BASE + REG_STATUS, 0x00, &mut irq));

        assert_eq!(acia.command(), 0xE0);
        assert_eq!(acia.control(), 0x1E);
        assert_eq!(acia.rx_len(), 1, "receive buffer untouched");
        assert_eq!(acia.status() & STATUS_OVRN, 0);
    }

    #[test]
    fn test_acia_control_register_stored() {
        let (mut acia, mut irq) = setup();
        acia.write(BASE + REG_CONTROL, 0x1F, &mut irq);
        assert_eq!(acia.read(BASE + REG_CONTROL, &mut irq), Some(0x1F));
    }

    #[test]
    fn test_acia_overflow_drops_oldest() {
        let (mut acia, mut irq) = setup();
        for i in 1..=257u16 {
            acia.receive_byte(i as u8, &mut irq);
        }
        assert_eq!(acia.rx_len(), 256);
        assert_eq!(acia.status() & STATUS_OVRN, 0);

        for expected in 2..=257u16 {
            assert_eq!(acia.read(BASE, &mut irq), Some(expected as u8));
        }
        assert!(acia.is_rx_empty());
        assert_eq!(acia.status() & STATUS_RDRF, 0);
    }

    #[test]
    fn test_acia_reset() {
        let (mut acia, mut irq) = setup();
        acia.write(BASE + REG_COMMAND, 0x0B, &mut irq);
        acia.write(BASE + REG_CONTROL, 0x1F, &mut irq);
        acia.write(BASE, b'!', &mut irq);
        acia.receive_byte(b'a', &mut irq);
        acia.write(BASE + REG_COMMAND, 0x00, &mut irq);
        assert!(irq.irq_asserted());

        acia.reset(&mut irq);

        assert_eq!(acia.command(), 0);
        assert_eq!(acia.control(), 0);
        assert_eq!(acia.status(), STATUS_TDRE);
        assert!(acia.is_rx_empty());
        assert!(!irq.irq_asserted());
        assert_eq!(acia.transcript().as_bytes(), b"!", "transcript survives reset");
    }

    #[test]
    fn test_acia_without_irq_line() {
        let mut irq = InterruptController::new();
        let mut acia = Acia6551::new(BASE, 0);
        acia.receive_byte(b'a', &mut irq);
        assert_ne!(acia.status() & STATUS_IRQ, 0);
        assert!(!irq.irq_asserted());
    }

    #[test]
    fn test_terminal_keys() {
        assert_eq!(TerminalKey::Char('a').to_byte(), Some(b'a'));
        assert_eq!(TerminalKey::Char('\r').to_byte(), None);
        assert_eq!(TerminalKey::Char('\n').to_byte(), None);
        assert_eq!(TerminalKey::Char('\x08').to_byte(), None);
        assert_eq!(TerminalKey::Char('é').to_byte(), None);
        assert_eq!(TerminalKey::Enter.to_byte(), Some(b'\r'));
        assert_eq!(TerminalKey::Backspace.to_byte(), Some(0x08));
        assert_eq!(TerminalKey::Escape.to_byte(), Some(0x1B));

        let (mut acia, mut irq) = setup();
        acia.terminal_key(TerminalKey::Char('\n'), &mut irq);
        assert!(acia.is_rx_empty());
        acia.terminal_key(TerminalKey::Enter, &mut irq);
        assert_eq!(acia.read(BASE, &mut irq), Some(b'\r'));
    }
}
