//! ROM device implementation.
//!
//! Provides read-only memory storage via the Device trait.

use super::{Device, InterruptController};
use std::any::Any;

/// Read-only memory device.
///
/// `RomDevice` claims reads and writes across its window. Writes are claimed
/// and silently dropped, matching typical ROM hardware behavior: a write to
/// the ROM window never falls through to a later device.
///
/// # Examples
///
/// ```rust
/// use sbc6502::{Device, InterruptController, RomDevice};
///
/// let mut irq = InterruptController::new();
/// let mut rom = RomDevice::new(0xC000, vec![0xEA; 0x4000]);
///
/// assert_eq!(rom.peek(0xC000), Some(0xEA));
///
/// // Writes are claimed but ignored
/// assert!(rom.write(0xC000, 0xFF, &mut irq));
/// assert_eq!(rom.peek(0xC000), Some(0xEA));
/// ```
pub struct RomDevice {
    start: u16,
    data: Vec<u8>,
}

impl RomDevice {
    /// Create a ROM window at `start` holding `data`.
    ///
    /// Data past 0xFFFF is dropped.
    pub fn new(start: u16, mut data: Vec<u8>) -> Self {
        data.truncate(0x10000 - start as usize);
        Self { start, data }
    }

    /// Replace the ROM image in place.
    ///
    /// Returns `false` (leaving the current image untouched) if `data` is not
    /// exactly the size of the window.
    pub fn set_contents(&mut self, data: &[u8]) -> bool {
        if data.len() != self.data.len() {
            return false;
        }
        self.data.copy_from_slice(data);
        true
    }

    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    fn offset(&self, addr: u16) -> Option<usize> {
        let offset = addr.checked_sub(self.start)? as usize;
        (offset < self.data.len()).then_some(offset)
    }
}

impl Device for RomDevice {
    fn name(&self) -> &str {
        "ROM"
    }

    fn read(&mut self, addr: u16, _irq: &mut InterruptController) -> Option<u8> {
        self.peek(addr)
    }

    fn peek(&self, addr: u16) -> Option<u8> {
        self.offset(addr).map(|i| self.data[i])
    }

    fn write(&mut self, addr: u16, _value: u8, _irq: &mut InterruptController) -> bool {
        self.offset(addr).is_some()
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
    fn test_rom_read() {
        let mut irq = InterruptController::new();
        let mut rom = RomDevice::new(0x8000, vec![0x01, 0x02, 0x03, 0x04]);

        assert_eq!(rom.read(0x8000, &mut irq), Some(0x01));
        assert_eq!(rom.read(0x8003, &mut irq), Some(0x04));
        assert_eq!(rom.read(0x8004, &mut irq), None);
        assert_eq!(rom.read(0x7FFF, &mut irq), None);
    }

    #[test]
    fn test_rom_write_ignored() {
        let mut irq = InterruptController::new();
        let mut rom = RomDevice::new(0x8000, vec![0xAA; 256]);

        assert!(rom.write(0x8000, 0xFF, &mut irq));
        assert!(rom.write(0x8064, 0xFF, &mut irq));
        assert!(!rom.write(0x8100, 0xFF, &mut irq));

        assert_eq!(rom.peek(0x8000), Some(0xAA));
        assert_eq!(rom.peek(0x8064), Some(0xAA));
    }

    #[test]
    fn test_rom_set_contents() {
        let mut rom = RomDevice::new(0x8000, vec![0x00; 4]);

        assert!(!rom.set_contents(&[1, 2, 3]));
        assert_eq!(rom.contents(), &[0, 0, 0, 0]);

        assert!(rom.set_contents(&[1, 2, 3, 4]));
        assert_eq!(rom.peek(0x8002), Some(3));
    }

    #[test]
    fn test_rom_with_reset_vector() {
        let mut data = vec![0; 0x8000];
        data[0x7FFC] = 0x00;
        data[0x7FFD] = 0x80;

        let rom = RomDevice::new(0x8000, data);

        assert_eq!(rom.peek(0xFFFC), Some(0x00));
        assert_eq!(rom.peek(0xFFFD), Some(0x80));
    }
}
