//! Fuzz target for ACIA register traffic.
//!
//! Drives arbitrary sequences of bus reads, writes, received bytes and ticks
//! at the ACIA and checks the receive-path invariants after every step.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sbc6502::{Acia6551, DeviceRegistry, InterruptController};

const BASE: u16 = 0x8400;

/// One bus-level operation
#[derive(Debug, Arbitrary)]
enum Op {
    /// Bus read of register `reg & 3`
    Read(u8),
    /// Debugger read of register `reg & 3`
    Peek(u8),
    /// Bus write of register `reg & 3`
    Write(u8, u8),
    /// Byte arriving from the terminal
    Receive(u8),
    /// Device tick
    Tick,
    /// System reset
    Reset,
}

fuzz_target!(|ops: Vec<Op>| {
    let mut irq = InterruptController::new();
    let mut devices = DeviceRegistry::new();
    let Ok(id) = devices.add_device(Box::new(Acia6551::new(BASE, 2))) else {
        return;
    };

    for op in ops {
        match op {
            Op::Read(reg) => {
                devices.read(BASE + (reg & 3) as u16, &mut irq);
            }
            Op::Peek(reg) => {
                let before = devices.get::<Acia6551>(id).map(|a| (a.status(), a.rx_len()));
                devices.peek(BASE + (reg & 3) as u16);
                let after = devices.get::<Acia6551>(id).map(|a| (a.status(), a.rx_len()));
                assert_eq!(before, after, "peek changed device state");
            }
            Op::Write(reg, value) => devices.write(BASE + (reg & 3) as u16, value, &mut irq),
            Op::Receive(byte) => {
                if let Some(acia) = devices.get_mut::<Acia6551>(id) {
                    acia.receive_byte(byte, &mut irq);
                }
            }
            Op::Tick => devices.tick_all(&mut irq, 400, 0.0001),
            Op::Reset => {
                devices.reset_all(&mut irq);
                irq.reset();
            }
        }

        if let Some(acia) = devices.get::<Acia6551>(id) {
            assert!(acia.rx_len() <= 256);
            assert_eq!(acia.is_rx_empty(), acia.status() & 0x08 == 0);
            assert!(!irq.irq_asserted() || !acia.is_rx_empty());
            assert!(acia.transcript().len() < acia.transcript().capacity());
        }
    }
});
