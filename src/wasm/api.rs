//! WASM API for the single-board computer.
//!
//! Provides JavaScript-callable interfaces for ROM loading, real-time
//! ticking, terminal I/O and run control. The page drives the clock: it
//! passes the elapsed milliseconds of each animation frame to `tick`.

use crate::devices::uart::TerminalKey;
use crate::{Machine, MachineConfig, MemoryBus};
use std::time::Duration;
use wasm_bindgen::prelude::*;

/// JavaScript-compatible error wrapper
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsError {
    message: String,
}

#[wasm_bindgen]
impl JsError {
    #[wasm_bindgen(constructor)]
    pub fn new(message: &str) -> JsError {
        JsError {
            message: message.to_string(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

/// Main emulator interface for JavaScript
#[wasm_bindgen]
pub struct Sbc6502 {
    machine: Machine,
}

#[wasm_bindgen]
impl Sbc6502 {
    /// Create a standard board; every transmitted byte is passed to
    /// `on_transmit` as a one-character string.
    #[wasm_bindgen(constructor)]
    pub fn new(on_transmit: js_sys::Function) -> Result<Sbc6502, JsError> {
        let mut machine = Machine::standard(MachineConfig::default())
            .map_err(|e| JsError::new(&e.to_string()))?;

        if let Some(acia) = machine.uart_mut() {
            acia.set_transmit_callback(move |byte| {
                let char_str = String::from_utf8(vec![byte]).unwrap_or_else(|_| "?".to_string());
                let _ = on_transmit.call1(&JsValue::NULL, &JsValue::from_str(&char_str));
            });
        }

        Ok(Sbc6502 { machine })
    }

    /// Install a 32KB ROM image and reset
    pub fn load_rom(&mut self, image: &[u8]) -> Result<(), JsError> {
        self.machine
            .load_rom(image)
            .map_err(|e| JsError::new(&e.to_string()))
    }

    /// Advance by `elapsed_ms` of wall-clock time; returns batches run
    pub fn tick(&mut self, elapsed_ms: f64) -> u32 {
        if !elapsed_ms.is_finite() || elapsed_ms <= 0.0 {
            return 0;
        }
        let micros = (elapsed_ms * 1000.0) as u64;
        let batches = self.machine.tick_elapsed(Duration::from_micros(micros));
        self.machine.pump_key_events();
        batches
    }

    /// Queue clipboard text for throttled delivery
    pub fn paste(&mut self, text: &str) {
        self.machine.paste_text(text);
    }

    /// Push one byte into the ACIA receiver
    pub fn receive_byte(&mut self, byte: u8) {
        self.machine.uart_receive(byte);
    }

    /// Forward a terminal key; `key` is a single character or
    /// "Enter", "Backspace" or "Escape"
    pub fn terminal_key(&mut self, key: &str) -> bool {
        let key = match key {
            "Enter" => TerminalKey::Enter,
            "Backspace" => TerminalKey::Backspace,
            "Escape" => TerminalKey::Escape,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => TerminalKey::Char(c),
                    _ => return false,
                }
            }
        };
        self.machine.terminal_key(key)
    }

    /// Terminal transcript as text
    #[wasm_bindgen(getter)]
    pub fn terminal_text(&self) -> String {
        self.machine
            .transcript()
            .map(|t| t.to_string_lossy())
            .unwrap_or_default()
    }

    /// Whether output arrived since the last call
    pub fn consume_scroll_to_bottom(&mut self) -> bool {
        self.machine.consume_scroll_to_bottom()
    }

    pub fn reset(&mut self) {
        self.machine.reset();
    }

    pub fn pause(&mut self) {
        self.machine.pause();
    }

    pub fn resume(&mut self) {
        self.machine.resume();
    }

    #[wasm_bindgen(getter)]
    pub fn paused(&self) -> bool {
        self.machine.is_paused()
    }

    #[wasm_bindgen(getter)]
    pub fn program_loaded(&self) -> bool {
        self.machine.is_program_loaded()
    }

    #[wasm_bindgen(getter)]
    pub fn irq(&self) -> bool {
        self.machine.irq_active()
    }

    /// Side-effect-free read of a single byte
    pub fn peek_memory(&self, addr: u16) -> u8 {
        self.machine.peek(addr)
    }

    /// Read a 256-byte page (for memory views)
    pub fn get_memory_page(&self, page: u8) -> Vec<u8> {
        let start = (page as u16) << 8;
        (0..256).map(|i| self.machine.peek(start + i)).collect()
    }

    /// Write a single byte through the bus
    pub fn write_memory(&mut self, addr: u16, value: u8) {
        self.machine.write(addr, value);
    }
}
