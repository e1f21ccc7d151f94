//! Integration tests for the 65C51 ACIA device.
//!
//! These tests verify the ACIA works correctly when integrated with the
//! device registry, RAM and ROM, and with the machine's paste path.

mod common;

use common::{rom_image, ACIA_COMMAND, ACIA_DATA, ACIA_STATUS};
use sbc6502::{
    Acia6551, DeviceId, DeviceRegistry, InterruptController, Machine, MachineConfig, MemoryBus,
    RamDevice, RomDevice, TerminalKey,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

const STATUS_RDRF: u8 = 0x08;
const STATUS_TDRE: u8 = 0x10;
const STATUS_IRQ: u8 = 0x80;

fn board() -> (DeviceRegistry, InterruptController) {
    let mut devices = DeviceRegistry::new();
    devices
        .add_device(Box::new(RamDevice::new(0x0000, 0x8000)))
        .unwrap();
    devices
        .add_device(Box::new(Acia6551::new(0x8400, 2)))
        .unwrap();
    devices
        .add_device(Box::new(RomDevice::new(0x8000, rom_image())))
        .unwrap();
    (devices, InterruptController::new())
}

fn acia_id(devices: &DeviceRegistry) -> DeviceId {
    devices
        .names()
        .find(|(_, name)| *name == "65C51 ACIA")
        .map(|(id, _)| id)
        .unwrap()
}

#[test]
fn test_acia_shadows_rom() {
    let (mut devices, mut irq) = board();

    assert_eq!(devices.read(ACIA_STATUS, &mut irq) & STATUS_TDRE, STATUS_TDRE);
    assert_eq!(devices.peek(0x8404), 0xEA);
    assert_eq!(devices.peek(0x83FF), 0xEA);
}

#[test]
fn test_acia_transmit_via_registry() {
    let (mut devices, mut irq) = board();

    for &b in b"Hello\r\n" {
        devices.write(ACIA_DATA, b, &mut irq);
    }

    let acia = devices.get::<Acia6551>(acia_id(&devices)).unwrap();
    assert_eq!(acia.transcript().as_bytes(), b"Hello\n");
}

#[test]
fn test_acia_receive_via_registry() {
    let (mut devices, mut irq) = board();
    let id = acia_id(&devices);

    devices
        .get_mut::<Acia6551>(id)
        .unwrap()
        .receive_byte(b'R', &mut irq);

    let status = devices.peek(ACIA_STATUS);
    assert_eq!(status & STATUS_RDRF, STATUS_RDRF);
    assert_eq!(status & STATUS_IRQ, STATUS_IRQ);
    assert!(irq.irq_asserted());

    // Debugger peek of the data register leaves the byte in place
    assert_eq!(devices.peek(ACIA_DATA), b'R');
    assert_eq!(devices.read(ACIA_DATA, &mut irq), b'R');
    assert_eq!(devices.peek(ACIA_STATUS) & STATUS_RDRF, 0);
    assert!(!irq.irq_asserted());
}

#[test]
fn test_acia_rdrf_held_until_drained() {
    let (mut devices, mut irq) = board();
    let id = acia_id(&devices);

    {
        let acia = devices.get_mut::<Acia6551>(id).unwrap();
        acia.receive_byte(b'1', &mut irq);
        acia.receive_byte(b'2', &mut irq);
    }

    // Programmed reset keeps the receive buffer
    devices.write(ACIA_STATUS, 0, &mut irq);
    assert_eq!(devices.read(ACIA_DATA, &mut irq), b'1');

    devices.tick_all(&mut irq, 400, 0.0001);
    assert_ne!(devices.peek(ACIA_STATUS) & STATUS_RDRF, 0);
    assert_eq!(devices.read(ACIA_DATA, &mut irq), b'2');
}

#[test]
fn test_acia_transmit_callback_through_machine() {
    let mut machine = Machine::standard(MachineConfig::default()).unwrap();
    let output = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&output);
    machine
        .uart_mut()
        .unwrap()
        .set_transmit_callback(move |b| sink.borrow_mut().push(b));
    machine.load_rom(&rom_image()).unwrap();

    machine.write(ACIA_DATA, b'>');
    assert_eq!(*output.borrow(), b">");
    assert_eq!(machine.transcript().unwrap().as_bytes(), b">");
}

#[test]
fn test_transcript_survives_reset() {
    let mut machine = Machine::standard(MachineConfig::default()).unwrap();
    machine.load_rom(&rom_image()).unwrap();

    machine.write(ACIA_DATA, b'A');
    machine.write(ACIA_COMMAND, 0x0B);
    machine.reset();

    assert_eq!(machine.peek(ACIA_COMMAND), 0x00);
    assert_eq!(machine.transcript().unwrap().as_bytes(), b"A");
}

#[test]
fn test_terminal_keys_reach_receiver() {
    let mut machine = Machine::standard(MachineConfig::default()).unwrap();
    machine.load_rom(&rom_image()).unwrap();

    for key in [
        TerminalKey::Char('a'),
        TerminalKey::Backspace,
        TerminalKey::Escape,
        TerminalKey::Enter,
    ] {
        machine.terminal_key(key);
    }

    let received: Vec<u8> = (0..4).map(|_| machine.read(ACIA_DATA)).collect();
    assert_eq!(received, vec![b'a', 0x08, 0x1B, b'\r']);
    assert!(machine.is_uart_rx_empty());
}

#[test]
fn test_paste_fills_receiver_only_when_empty() {
    let mut machine = Machine::standard(MachineConfig::default()).unwrap();
    machine.load_rom(&rom_image()).unwrap();
    machine.paste_text("10 PRINT\n");

    machine.tick_elapsed(Duration::from_millis(1));
    // Nothing reads the receiver, so only the first byte arrived
    assert_eq!(machine.uart().unwrap().rx_len(), 1);

    let mut received = Vec::new();
    for _ in 0..20 {
        if !machine.is_uart_rx_empty() {
            received.push(machine.read(ACIA_DATA));
        }
        machine.tick_elapsed(Duration::from_micros(100));
    }
    assert_eq!(received, b"10 PRINT\r");
}
