//! Memory-mapped device support for the single-board computer bus.
//!
//! Every peripheral on the board (CPU, RAM, ROM, ACIA, video, sound, VIA,
//! keyboard) implements [`Device`] and is appended to a [`DeviceRegistry`]
//! during setup.
//!
//! # Architecture
//!
//! - **Device trait**: the capability set every peripheral offers
//! - **DeviceRegistry**: ordered device collection performing claim-wins dispatch
//! - **BusView**: the bus as seen by one device during its tick
//! - **Device implementations**: RAM, ROM, 65C51 ACIA
//!
//! # Claim-wins dispatch
//!
//! Devices decide for themselves which addresses they answer. A bus access
//! walks the devices in registration order and stops at the first one that
//! claims the address, so registration order is part of the memory map: I/O
//! devices registered before the ROM shadow the ROM where they overlap.
//!
//! # Example
//!
//! ```rust
//! use sbc6502::{DeviceRegistry, InterruptController, RamDevice, RomDevice};
//!
//! let mut irq = InterruptController::new();
//! let mut devices = DeviceRegistry::new();
//!
//! // 32KB RAM at 0x0000-0x7FFF, then 32KB ROM at 0x8000-0xFFFF
//! devices.add_device(Box::new(RamDevice::new(0x0000, 0x8000))).unwrap();
//! devices.add_device(Box::new(RomDevice::new(0x8000, vec![0xEA; 0x8000]))).unwrap();
//!
//! devices.write(0x1234, 0x42, &mut irq);
//! assert_eq!(devices.read(0x1234, &mut irq), 0x42);
//! assert_eq!(devices.peek(0x9000), 0xEA);
//! ```

use crate::config::REGISTRY_CAPACITY;
use crate::input::InputEvent;
use crate::MemoryBus;
use log::debug;
use std::any::Any;

pub mod interrupts;
pub mod ram;
pub mod rom;
pub mod terminal;
pub mod uart;

pub use interrupts::{InterruptController, InterruptSignal};
pub use ram::RamDevice;
pub use rom::RomDevice;
pub use terminal::Transcript;
pub use uart::Acia6551;

/// Value returned by reads no device claims.
pub const UNCLAIMED_READ: u8 = 0x00;

/// Pixel surface a device can expose for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pub width: u32,
    pub height: u32,
    /// RGB24, row-major.
    pub pixels: Vec<u8>,
}

/// Abstract interface for memory-mapped hardware devices.
///
/// Devices receive absolute bus addresses and report whether they claim them.
/// A device never learns its priority; that is implied by registration order.
///
/// # Contract
///
/// - **Bounded time**: every call runs to completion; a device that never
///   returns stalls the whole bus
/// - **No panics**: all operations must succeed or decline gracefully
/// - **`peek` is pure**: debugger reads must not change device state
/// - **Owned state**: the device exclusively owns its internal state
///
/// # Examples
///
/// ```rust
/// use sbc6502::{BusView, Device, InterruptController};
/// use std::any::Any;
///
/// struct Latch {
///     addr: u16,
///     value: u8,
/// }
///
/// impl Device for Latch {
///     fn name(&self) -> &str {
///         "latch"
///     }
///
///     fn read(&mut self, addr: u16, _irq: &mut InterruptController) -> Option<u8> {
///         self.peek(addr)
///     }
///
///     fn peek(&self, addr: u16) -> Option<u8> {
///         (addr == self.addr).then_some(self.value)
///     }
///
///     fn write(&mut self, addr: u16, value: u8, _irq: &mut InterruptController) -> bool {
///         if addr != self.addr {
///             return false;
///         }
///         self.value = value;
///         true
///     }
///
///     fn as_any(&self) -> &dyn Any {
///         self
///     }
///
///     fn as_any_mut(&mut self) -> &mut dyn Any {
///         self
///     }
/// }
/// ```
pub trait Device: Any {
    /// Human-readable device name, shown by presentation layers.
    fn name(&self) -> &str;

    /// Clear transient register and buffer state without reallocating.
    fn reset(&mut self, _irq: &mut InterruptController) {}

    /// Release resources at shutdown. Called once per device.
    fn destroy(&mut self) {}

    /// Bus read cycle. Returns `Some(value)` when the device claims `addr`.
    ///
    /// May have side effects (popping a receive buffer, acknowledging an
    /// interrupt) and may drive interrupt lines.
    fn read(&mut self, addr: u16, irq: &mut InterruptController) -> Option<u8>;

    /// Debugger read. Same claim as [`Device::read`] but never mutates state.
    fn peek(&self, addr: u16) -> Option<u8>;

    /// Bus write cycle. Returns `true` when the device claims `addr`.
    fn write(&mut self, addr: u16, value: u8, irq: &mut InterruptController) -> bool;

    /// Advance the device by `delta_ticks` clock ticks (`delta_seconds` of
    /// emulated time). `bus` gives access to every other registered device.
    fn tick(&mut self, _bus: &mut BusView<'_>, _delta_ticks: u32, _delta_seconds: f64) {}

    /// Host input event (keyboard, mouse).
    fn event(&mut self, _event: &InputEvent) {}

    /// Whether the device still holds unprocessed host input.
    ///
    /// Keyboard-style devices report their private queue here so synthetic
    /// key events are only released once the guest has consumed the last ones.
    fn input_pending(&self) -> bool {
        false
    }

    /// Renderable output surface, if the device has one.
    fn output(&self) -> Option<&FrameBuffer> {
        None
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Handle to a registered device (its registration index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(usize);

impl DeviceId {
    /// Registration index; lower indices win address claims.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Error returned when device registration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The registry already holds its maximum number of devices.
    RegistryFull {
        /// Number of slots available
        capacity: usize,
    },
}

impl std::fmt::Display for BusError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            BusError::RegistryFull { capacity } => {
                write!(f, "Device registry full ({} devices)", capacity)
            }
        }
    }
}

impl std::error::Error for BusError {}

struct Slot {
    device: Box<dyn Device>,
    visible: bool,
}

fn dispatch_read<'a>(
    slots: impl Iterator<Item = &'a mut Slot>,
    addr: u16,
    irq: &mut InterruptController,
) -> u8 {
    for slot in slots {
        if let Some(value) = slot.device.read(addr, irq) {
            return value;
        }
    }
    UNCLAIMED_READ
}

fn dispatch_peek<'a>(slots: impl Iterator<Item = &'a Slot>, addr: u16) -> u8 {
    slots
        .filter_map(|slot| slot.device.peek(addr))
        .next()
        .unwrap_or(UNCLAIMED_READ)
}

fn dispatch_write<'a>(
    slots: impl Iterator<Item = &'a mut Slot>,
    addr: u16,
    value: u8,
    irq: &mut InterruptController,
) {
    for slot in slots {
        if slot.device.write(addr, value, irq) {
            return;
        }
    }
    // Unclaimed writes are silently ignored
}

/// Ordered device collection with claim-wins address dispatch.
///
/// The registry is filled once during setup and is append-only afterwards.
/// Its capacity is fixed (15 devices by default, one slot of the 16-entry
/// table reserved as headroom).
pub struct DeviceRegistry {
    slots: Vec<Slot>,
    capacity: usize,
    destroyed: bool,
}

impl DeviceRegistry {
    /// Create an empty registry with the board's standard capacity.
    pub fn new() -> Self {
        Self::with_capacity(REGISTRY_CAPACITY)
    }

    /// Create an empty registry holding at most `capacity` devices.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            destroyed: false,
        }
    }

    /// Append a device. Its registration position fixes its claim priority.
    ///
    /// # Returns
    ///
    /// * `Ok(DeviceId)` - Device registered
    /// * `Err(BusError::RegistryFull)` - No slot left; a setup-time misconfiguration
    pub fn add_device(&mut self, device: Box<dyn Device>) -> Result<DeviceId, BusError> {
        if self.slots.len() >= self.capacity {
            return Err(BusError::RegistryFull {
                capacity: self.capacity,
            });
        }
        let id = DeviceId(self.slots.len());
        debug!("registered device #{} '{}'", id.0, device.name());
        self.slots.push(Slot {
            device,
            visible: true,
        });
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bus read: the first device claiming `addr` answers; unclaimed reads return 0.
    pub fn read(&mut self, addr: u16, irq: &mut InterruptController) -> u8 {
        dispatch_read(self.slots.iter_mut(), addr, irq)
    }

    /// Side-effect-free read for debuggers and memory inspectors.
    pub fn peek(&self, addr: u16) -> u8 {
        dispatch_peek(self.slots.iter(), addr)
    }

    /// Bus write: delivered to the first device claiming `addr`.
    pub fn write(&mut self, addr: u16, value: u8, irq: &mut InterruptController) {
        dispatch_write(self.slots.iter_mut(), addr, value, irq);
    }

    /// Reset every device in registration order.
    pub fn reset_all(&mut self, irq: &mut InterruptController) {
        for slot in &mut self.slots {
            slot.device.reset(irq);
        }
    }

    /// Destroy every device in registration order. Only the first call has an effect.
    pub fn destroy_all(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        for slot in &mut self.slots {
            slot.device.destroy();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Tick every device in registration order.
    ///
    /// Each device sees the rest of the bus through a [`BusView`] that keeps
    /// the registry's claim order but excludes the ticking device itself.
    pub fn tick_all(&mut self, irq: &mut InterruptController, delta_ticks: u32, delta_seconds: f64) {
        for index in 0..self.slots.len() {
            let (before, rest) = self.slots.split_at_mut(index);
            if let Some((current, after)) = rest.split_first_mut() {
                let mut bus = BusView {
                    before,
                    after,
                    interrupts: &mut *irq,
                };
                current.device.tick(&mut bus, delta_ticks, delta_seconds);
            }
        }
    }

    /// Deliver a host input event to every device.
    pub fn broadcast_event(&mut self, event: &InputEvent) {
        for slot in &mut self.slots {
            slot.device.event(event);
        }
    }

    pub fn device(&self, id: DeviceId) -> Option<&dyn Device> {
        self.slots.get(id.0).map(|slot| slot.device.as_ref())
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut dyn Device> {
        self.slots.get_mut(id.0).map(|slot| slot.device.as_mut())
    }

    /// Typed access to a registered device.
    pub fn get<T: Device>(&self, id: DeviceId) -> Option<&T> {
        self.device(id)?.as_any().downcast_ref::<T>()
    }

    /// Typed mutable access to a registered device.
    pub fn get_mut<T: Device>(&mut self, id: DeviceId) -> Option<&mut T> {
        self.device_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    /// Device names in registration order.
    pub fn names(&self) -> impl Iterator<Item = (DeviceId, &str)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (DeviceId(i), slot.device.name()))
    }

    /// Show or hide a device's output window. Returns `false` for unknown ids.
    pub fn set_visible(&mut self, id: DeviceId, visible: bool) -> bool {
        match self.slots.get_mut(id.0) {
            Some(slot) => {
                slot.visible = visible;
                true
            }
            None => false,
        }
    }

    pub fn is_visible(&self, id: DeviceId) -> bool {
        self.slots.get(id.0).is_some_and(|slot| slot.visible)
    }

    /// Output surfaces of visible devices, in registration order.
    pub fn visible_outputs(&self) -> impl Iterator<Item = (&str, &FrameBuffer)> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.visible)
            .filter_map(|slot| slot.device.output().map(|out| (slot.device.name(), out)))
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The bus as seen by one device during its tick.
///
/// Reads and writes dispatch claim-wins across every other registered device
/// in registration order; the interrupt controller is reachable for devices
/// that drive or sample interrupt lines.
pub struct BusView<'a> {
    before: &'a mut [Slot],
    after: &'a mut [Slot],
    interrupts: &'a mut InterruptController,
}

impl BusView<'_> {
    pub fn interrupts(&mut self) -> &mut InterruptController {
        self.interrupts
    }

    /// Drive an interrupt line (see [`InterruptController::raise`]).
    pub fn raise_interrupt(&mut self, line: u8, signal: InterruptSignal) -> bool {
        self.interrupts.raise(line, signal)
    }
}

impl MemoryBus for BusView<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        dispatch_read(
            self.before.iter_mut().chain(self.after.iter_mut()),
            addr,
            self.interrupts,
        )
    }

    fn peek(&self, addr: u16) -> u8 {
        dispatch_peek(self.before.iter().chain(self.after.iter()), addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        dispatch_write(
            self.before.iter_mut().chain(self.after.iter_mut()),
            addr,
            value,
            self.interrupts,
        );
    }

    fn irq_active(&self) -> bool {
        self.interrupts.irq_asserted()
    }
}
