//! Fuzz target for paste translation and flow control.
//!
//! Pastes arbitrary text into a standard board and runs it with arbitrary
//! guest ring-buffer pointers, checking that serial delivery never exceeds
//! what was pasted and that key delivery stays within two events per pump.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sbc6502::{Machine, MachineConfig, MemoryBus};
use std::time::Duration;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    text: String,
    read_ptr: u8,
    write_ptr: u8,
    /// Tick batches to run (capped)
    batches: u8,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(mut machine) = Machine::standard(MachineConfig::default()) else {
        return;
    };
    if machine.load_rom(&vec![0xEA; 0x8000]).is_err() {
        return;
    }

    machine.write(0x0000, input.read_ptr);
    machine.write(0x0001, input.write_ptr);
    machine.paste_text(&input.text);

    let paste = machine.paste_handle();
    let queued = paste.pending_uart_bytes();
    assert_eq!(queued, input.text.len());

    let mut delivered = 0;
    for _ in 0..input.batches.min(64) {
        if !machine.is_uart_rx_empty() {
            machine.read(0x8400);
            delivered += 1;
        }
        machine.tick_elapsed(Duration::from_micros(100));
        assert!(machine.pump_key_events() <= 2);
    }

    let used = input.write_ptr.wrapping_sub(input.read_ptr);
    if used >= 192 {
        assert_eq!(delivered, 0);
        assert_eq!(paste.pending_uart_bytes(), queued);
    }
    assert!(delivered <= queued);
});
