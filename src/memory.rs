//! # Memory Bus Abstraction
//!
//! This module provides the `MemoryBus` trait through which CPU-like devices,
//! debuggers and the paste injector see the machine's address space.
//!
//! ## Design Principles
//!
//! The MemoryBus trait follows 6502 hardware behavior:
//! - No bus errors - reads/writes always succeed
//! - Unclaimed reads return 0x00
//! - Writes to ROM/unclaimed regions are ignored
//! - Reads are split into a side-effecting `read` and a pure `peek`

/// Memory bus trait for reading and writing bytes.
///
/// # Design
///
/// - `read(&mut self)`: a real bus cycle; devices may change state (popping a
///   receive buffer, acknowledging an interrupt)
/// - `peek(&self)`: a debugger/inspector view that never perturbs any device
/// - `write(&mut self)`: mutable reference makes side effects explicit
/// - No error types: 6502 hardware has no bus error mechanism
///
/// # Examples
///
/// ```
/// use sbc6502::{FlatMemory, MemoryBus};
///
/// let mut mem = FlatMemory::new();
///
/// mem.write(0x1234, 0x42);
/// assert_eq!(mem.read(0x1234), 0x42);
/// assert_eq!(mem.peek(0x1234), 0x42);
/// ```
pub trait MemoryBus {
    /// Reads a byte from the specified 16-bit address.
    ///
    /// This method must never panic. Devices that claim the address may
    /// update internal state as a consequence of the access.
    fn read(&mut self, addr: u16) -> u8;

    /// Reads a byte without side effects on any device.
    ///
    /// Used by debugger views and by flow control that inspects guest memory.
    fn peek(&self, addr: u16) -> u8;

    /// Writes a byte to the specified 16-bit address.
    ///
    /// This method must never panic. If the address is read-only or unclaimed,
    /// implementations ignore the write (matching 6502 hardware behavior).
    fn write(&mut self, addr: u16, value: u8);

    /// Checks if the maskable IRQ input is asserted.
    ///
    /// The IRQ line on the 6502 is **level-sensitive** and **shared** among
    /// all devices; implementations backed by an interrupt controller report
    /// the aggregated wired-OR state here.
    ///
    /// Returns `false` for simple memory implementations without devices.
    fn irq_active(&self) -> bool {
        false
    }
}

/// Simple 64KB flat memory implementation.
///
/// Every address is plain RAM initialized to 0x00. Useful for tests that need
/// guest memory without a device registry.
///
/// # Examples
///
/// ```
/// use sbc6502::{FlatMemory, MemoryBus};
///
/// let mut memory = FlatMemory::new();
/// memory.write(0x0001, 0x20);
/// assert_eq!(memory.peek(0x0001), 0x20);
/// assert!(!memory.irq_active());
/// ```
pub struct FlatMemory {
    data: Box<[u8; 65536]>,
}

impl FlatMemory {
    /// Creates a new FlatMemory instance with all bytes initialized to zero.
    pub fn new() -> Self {
        Self {
            data: Box::new([0; 65536]),
        }
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus for FlatMemory {
    fn read(&mut self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn peek(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.data[addr as usize] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_memory_read_write() {
        let mut mem = FlatMemory::new();

        assert_eq!(mem.read(0x0000), 0x00);
        assert_eq!(mem.read(0xFFFF), 0x00);

        mem.write(0x1234, 0x42);
        assert_eq!(mem.read(0x1234), 0x42);

        // Neighbours unchanged
        assert_eq!(mem.peek(0x1233), 0x00);
        assert_eq!(mem.peek(0x1235), 0x00);
    }

    #[test]
    fn test_flat_memory_full_range() {
        let mut mem = FlatMemory::new();

        mem.write(0x0000, 0x01);
        mem.write(0x7FFF, 0x7F);
        mem.write(0x8000, 0x80);
        mem.write(0xFFFF, 0xFF);

        assert_eq!(mem.peek(0x0000), 0x01);
        assert_eq!(mem.peek(0x7FFF), 0x7F);
        assert_eq!(mem.peek(0x8000), 0x80);
        assert_eq!(mem.peek(0xFFFF), 0xFF);
    }
}
