//! Example driving the board with a stand-in CPU that echoes serial input.
//!
//! This example shows how to:
//! - Register a CPU-side device that services ACIA interrupts over the bus
//! - Load a ROM image, which resets the board and starts the scheduler
//! - Paste text through the flow-controlled paste path
//! - Read back what the guest transmitted from the terminal transcript
//!
//! Memory layout:
//! - 0x0000-0x7FFF: 32KB RAM
//! - 0x8400-0x8403: 65C51 ACIA (IRQ line 2)
//! - 0x8000-0xFFFF: 32KB ROM (minus the I/O window)

use sbc6502::{BusView, Device, InterruptController, Machine, MachineConfig, MemoryBus};
use std::any::Any;
use std::time::Duration;

const ACIA_DATA: u16 = 0x8400;
const ACIA_STATUS: u16 = 0x8401;

/// Interrupt handler that upper-cases every received byte and sends it back.
struct EchoCpu;

impl Device for EchoCpu {
    fn name(&self) -> &str {
        "Echo CPU"
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

    fn tick(&mut self, bus: &mut BusView<'_>, _delta_ticks: u32, _delta_seconds: f64) {
        if !bus.irq_active() {
            return;
        }
        // status read acknowledges, data read pops the FIFO
        if bus.read(ACIA_STATUS) & 0x08 != 0 {
            let byte = bus.read(ACIA_DATA);
            let echo = match byte {
                b'\r' => b'\n',
                b => b.to_ascii_uppercase(),
            };
            bus.write(ACIA_DATA, echo);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("65C51 ACIA Terminal Example");
    println!("===========================\n");

    let mut machine = Machine::with_cpu(MachineConfig::default(), Box::new(EchoCpu))?;

    if let Some(acia) = machine.uart_mut() {
        acia.set_transmit_callback(|byte| print!("{}", byte as char));
    }

    println!("Devices:");
    machine.load_rom(&vec![0xEA; 0x8000])?;
    for (id, name) in machine.device_names() {
        println!("  {:?}: {}", id, name);
    }

    let input = "hello acia\nsecond line\n";
    println!("\nPasting {:?}", input);
    machine.paste_text(input);

    println!("Output:");
    // One paste byte goes out per 100us batch
    let mut batches = 0;
    while machine.paste_handle().pending_uart_bytes() > 0 || !machine.is_uart_rx_empty() {
        batches += machine.tick_elapsed(Duration::from_millis(1));
    }
    // Let the handler pick up the final byte
    batches += machine.tick_elapsed(Duration::from_millis(1));

    println!("\nRan {} batches", batches);
    if let Some(transcript) = machine.transcript() {
        println!("Transcript ({} bytes):", transcript.len());
        print!("{}", transcript.to_string_lossy());
    }

    machine.shutdown();
    Ok(())
}
