//! WebAssembly bindings for the sbc6502 board.
//!
//! This module exposes the [`Machine`](crate::Machine) to JavaScript so the
//! board can run in a browser with an HTML terminal.

#[cfg(feature = "wasm")]
pub mod api;

#[cfg(feature = "wasm")]
pub use api::Sbc6502;
