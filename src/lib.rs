//! # 6502 Single-Board Computer Bus Core
//!
//! Hardware bus emulation for a DB6502-style single-board computer: a
//! memory-mapped device bus with claim-wins dispatch, a wired-OR interrupt
//! line, a real-time tick scheduler and a 65C51 ACIA with terminal semantics.
//!
//! The CPU, video and sound chips are external collaborators. They plug in
//! through the [`Device`] trait like every on-board peripheral.
//!
//! ## Quick Start
//!
//! ```rust
//! use sbc6502::{Machine, MachineConfig, MemoryBus};
//!
//! let mut machine = Machine::standard(MachineConfig::default()).unwrap();
//! machine.load_rom(&vec![0xEA; 0x8000]).unwrap();
//!
//! // The guest writes to the ACIA data register...
//! for &b in b"READY\r\n" {
//!     machine.write(0x8400, b);
//! }
//!
//! // ...and the terminal transcript shows it
//! assert_eq!(machine.transcript().unwrap().as_bytes(), b"READY\n");
//! ```
//!
//! ## Memory Map
//!
//! | Range | Device |
//! |-------|--------|
//! | 0x0000-0x7FFF | RAM (32KB) |
//! | 0x8400-0x8403 | 65C51 ACIA (IRQ line 2) |
//! | 0x8000-0xFFFF | ROM (32KB, registered last) |
//!
//! ## Modules
//!
//! - `devices` - Device trait, registry, interrupts, RAM/ROM, ACIA and terminal
//! - `machine` - Owning context tying bus, scheduler and input together
//! - `scheduler` - Wall-clock to tick batch conversion
//! - `paste` - Flow-controlled clipboard injection
//! - `fifo` - Bounded drop-oldest queue
//! - `memory` - MemoryBus trait and a flat test memory
//! - `config` - Memory map constants and TOML configuration

pub mod config;
pub mod devices;
pub mod fifo;
pub mod input;
pub mod machine;
pub mod memory;
pub mod paste;
pub mod scheduler;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export public API
pub use config::{ConfigError, MachineConfig};
pub use devices::uart::TerminalKey;
pub use devices::{
    Acia6551, BusError, BusView, Device, DeviceId, DeviceRegistry, FrameBuffer,
    InterruptController, InterruptSignal, RamDevice, RomDevice, Transcript,
};
pub use fifo::BoundedFifo;
pub use input::{InputEvent, KeyEvent, KeyTransition, Scancode};
pub use machine::{Machine, MachineError};
pub use memory::{FlatMemory, MemoryBus};
pub use paste::PasteInjector;
pub use scheduler::{Scheduler, TickPlan};
