//! RAM device implementation.
//!
//! Provides readable and writable memory storage via the Device trait.

use super::{Device, InterruptController};
use std::any::Any;

/// Simple RAM device claiming a contiguous address window.
///
/// # Examples
///
/// ```rust
/// use sbc6502::{Device, InterruptController, RamDevice};
///
/// let mut irq = InterruptController::new();
/// let mut ram = RamDevice::new(0x0000, 0x8000); // 32KB at 0x0000-0x7FFF
///
/// assert!(ram.write(0x0042, 0xAA, &mut irq));
/// assert_eq!(ram.peek(0x0042), Some(0xAA));
/// assert_eq!(ram.peek(0x8000), None); // outside the window
/// ```
pub struct RamDevice {
    start: u16,
    data: Vec<u8>,
}

impl RamDevice {
    /// Create a RAM window of `size` bytes starting at `start`.
    ///
    /// All bytes are initialized to zero. The window is clipped at 0xFFFF.
    pub fn new(start: u16, size: usize) -> Self {
        let size = size.min(0x10000 - start as usize);
        Self {
            start,
            data: vec![0; size],
        }
    }

    /// Load bytes into RAM at the specified offset.
    ///
    /// Bytes that would fall past the end of the window are dropped.
    pub fn load_bytes(&mut self, offset: usize, bytes: &[u8]) {
        let start = offset.min(self.data.len());
        let end = (start + bytes.len()).min(self.data.len());
        self.data[start..end].copy_from_slice(&bytes[..end - start]);
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn offset(&self, addr: u16) -> Option<usize> {
        let offset = addr.checked_sub(self.start)? as usize;
        (offset < self.data.len()).then_some(offset)
    }
}

impl Device for RamDevice {
    fn name(&self) -> &str {
        "RAM"
    }

    fn read(&mut self, addr: u16, _irq: &mut InterruptController) -> Option<u8> {
        self.peek(addr)
    }

    fn peek(&self, addr: u16) -> Option<u8> {
        self.offset(addr).map(|i| self.data[i])
    }

    fn write(&mut self, addr: u16, value: u8, _irq: &mut InterruptController) -> bool {
        match self.offset(addr) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
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

    #[test]
    fn test_ram_new() {
        let ram = RamDevice::new(0x0000, 256);
        assert_eq!(ram.size(), 256);

        for addr in 0..256u16 {
            assert_eq!(ram.peek(addr), Some(0x00));
        }
        assert_eq!(ram.peek(256), None);
    }

    #[test]
    fn test_ram_read_write() {
        let mut irq = InterruptController::new();
        let mut ram = RamDevice::new(0x1000, 256);

        assert!(ram.write(0x1000, 0xAA, &mut irq));
        assert!(ram.write(0x10FF, 0xCC, &mut irq));
        assert!(!ram.write(0x0FFF, 0xBB, &mut irq));
        assert!(!ram.write(0x1100, 0xBB, &mut irq));

        assert_eq!(ram.read(0x1000, &mut irq), Some(0xAA));
        assert_eq!(ram.read(0x10FF, &mut irq), Some(0xCC));
        assert_eq!(ram.read(0x1001, &mut irq), Some(0x00));
    }

    #[test]
    fn test_ram_load_bytes() {
        let mut ram = RamDevice::new(0x0200, 256);

        let program = [0xA9, 0x42, 0x85, 0x10]; // LDA #$42, STA $10
        ram.load_bytes(0, &program);

        assert_eq!(ram.peek(0x0200), Some(0xA9));
        assert_eq!(ram.peek(0x0203), Some(0x10));

        // Tail past the window is dropped
        ram.load_bytes(254, &[1, 2, 3, 4]);
        assert_eq!(ram.peek(0x02FE), Some(1));
        assert_eq!(ram.peek(0x02FF), Some(2));
    }

    #[test]
    fn test_ram_window_clipped_at_top() {
        let ram = RamDevice::new(0xFF00, 0x1000);
        assert_eq!(ram.size(), 0x100);
        assert_eq!(ram.peek(0xFFFF), Some(0));
    }
}
