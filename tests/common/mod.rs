//! Shared test devices.
#![allow(dead_code)]

use sbc6502::{BusView, Device, InputEvent, InterruptController, MemoryBus};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub const ACIA_DATA: u16 = 0x8400;
pub const ACIA_STATUS: u16 = 0x8401;
pub const ACIA_COMMAND: u16 = 0x8402;

/// Guest serial input ring buffer, as the BIOS keeps it.
pub const READ_PTR: u16 = 0x0000;
pub const WRITE_PTR: u16 = 0x0001;
pub const RING_BASE: u16 = 0x0200;

/// A 32KB ROM image whose reset vector points at 0x8000.
pub fn rom_image() -> Vec<u8> {
    let mut rom = vec![0xEA; 0x8000];
    rom[0x7FFC] = 0x00;
    rom[0x7FFD] = 0x80;
    rom
}

/// Stand-in for the CPU: on every tick with IRQ asserted it runs an
/// ACIA receive handler that appends to the guest ring buffer.
pub struct IsrCpu {
    pub ticks: Rc<Cell<u64>>,
    pub irq_seen: Rc<Cell<u32>>,
    pub destroyed: Rc<Cell<u32>>,
}

impl IsrCpu {
    pub fn new() -> Self {
        Self {
            ticks: Rc::new(Cell::new(0)),
            irq_seen: Rc::new(Cell::new(0)),
            destroyed: Rc::new(Cell::new(0)),
        }
    }
}

impl Device for IsrCpu {
    fn name(&self) -> &str {
        "CPU"
    }

    fn destroy(&mut self) {
        self.destroyed.set(self.destroyed.get() + 1);
    }

    fn read(&mut self, _addr: u16, _irq: &mut InterruptController) -> Option<u8> {
        None
    }

    fn peek(&self, _addr: u16) -> Option<u8> {
        None
    }

    fn write(&mut self, _addr: u16, _value: u8, _irq: &mut InterruptController) -> bool {
        false
    }

    fn tick(&mut self, bus: &mut BusView<'_>, delta_ticks: u32, _delta_seconds: f64) {
        self.ticks.set(self.ticks.get() + delta_ticks as u64);
        if !bus.irq_active() {
            return;
        }
        self.irq_seen.set(self.irq_seen.get() + 1);

        let status = bus.read(ACIA_STATUS);
        if status & 0x08 != 0 {
            let byte = bus.read(ACIA_DATA);
            let write_ptr = bus.read(WRITE_PTR);
            bus.write(RING_BASE + write_ptr as u16, byte);
            bus.write(WRITE_PTR, write_ptr.wrapping_add(1));
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Keyboard stand-in that records events and reports a private queue.
pub struct MockKeyboard {
    pub events: Rc<RefCell<Vec<InputEvent>>>,
    pub busy: Rc<Cell<bool>>,
}

impl MockKeyboard {
    pub fn new() -> Self {
        Self {
            events: Rc::new(RefCell::new(Vec::new())),
            busy: Rc::new(Cell::new(false)),
        }
    }
}

impl Device for MockKeyboard {
    fn name(&self) -> &str {
        "Keyboard"
    }

    fn read(&mut self, _addr: u16, _irq: &mut InterruptController) -> Option<u8> {
        None
    }

    fn peek(&self, _addr: u16) -> Option<u8> {
        None
    }

    fn write(&mut self, _addr: u16, _value: u8, _irq: &mut InterruptController) -> bool {
        false
    }

    fn event(&mut self, event: &InputEvent) {
        self.events.borrow_mut().push(*event);
    }

    fn input_pending(&self) -> bool {
        self.busy.get()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
