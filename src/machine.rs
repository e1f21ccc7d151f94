//! The single-board computer as one owning context.
//!
//! [`Machine`] holds the device registry, interrupt controller, tick
//! scheduler and paste injector, plus the run state a frontend drives:
//! whether a program is loaded and whether execution is paused.
//!
//! The CPU is not part of this crate; it is a [`Device`] like any other,
//! registered first so it ticks first, and it reaches memory through the
//! [`BusView`](crate::BusView) handed to its `tick`.
//!
//! # Example
//!
//! ```rust
//! use sbc6502::{Machine, MachineConfig, MemoryBus};
//! use std::time::Duration;
//!
//! let mut machine = Machine::standard(MachineConfig::default()).unwrap();
//!
//! // Nothing runs until a ROM is loaded
//! assert_eq!(machine.tick_elapsed(Duration::from_millis(1)), 0);
//!
//! let mut rom = vec![0xEA; 0x8000];
//! rom[0x7FFC] = 0x00;
//! rom[0x7FFD] = 0x80;
//! machine.load_rom(&rom).unwrap();
//!
//! assert_eq!(machine.peek(0xFFFD), 0x80);
//! assert_eq!(machine.tick_elapsed(Duration::from_micros(300)), 3);
//! ```

use crate::config::{MachineConfig, ROM_SIZE, ROM_START};
use crate::devices::uart::TerminalKey;
use crate::devices::{
    Acia6551, BusError, Device, DeviceId, DeviceRegistry, FrameBuffer, InterruptController,
    InterruptSignal, RamDevice, RomDevice, Transcript,
};
use crate::input::{InputEvent, KeyEvent};
use crate::paste::PasteInjector;
use crate::scheduler::{Scheduler, TickPlan};
use crate::MemoryBus;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Errors from machine setup and ROM loading.
#[derive(Debug)]
pub enum MachineError {
    /// ROM image is not exactly the size of the ROM window.
    RomSize {
        /// Required image size
        expected: usize,
        /// Size supplied
        actual: usize,
    },
    /// ROM file does not exist.
    RomNotFound(PathBuf),
    /// ROM file could not be read.
    Io(std::io::Error),
    /// Device registration failed.
    Bus(BusError),
}

impl std::fmt::Display for MachineError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MachineError::RomSize { expected, actual } => write!(
                f,
                "ROM image must be {} bytes, got {} bytes",
                expected, actual
            ),
            MachineError::RomNotFound(path) => write!(f, "ROM file not found: {}", path.display()),
            MachineError::Io(e) => write!(f, "I/O error: {}", e),
            MachineError::Bus(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MachineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MachineError::Io(e) => Some(e),
            MachineError::Bus(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BusError> for MachineError {
    fn from(e: BusError) -> Self {
        MachineError::Bus(e)
    }
}

impl From<std::io::Error> for MachineError {
    fn from(e: std::io::Error) -> Self {
        MachineError::Io(e)
    }
}

/// Bus, interrupts, scheduling and run state of one emulated board.
pub struct Machine {
    config: MachineConfig,
    devices: DeviceRegistry,
    interrupts: InterruptController,
    scheduler: Scheduler,
    paste: Arc<PasteInjector>,

    uart: Option<DeviceId>,
    rom: Option<DeviceId>,
    keyboard: Option<DeviceId>,

    program_loaded: bool,
    paused: bool,
    rom_path: Option<PathBuf>,
}

impl Machine {
    /// Empty machine: no devices, no program.
    pub fn new(config: MachineConfig) -> Self {
        let scheduler = Scheduler::new(config.clock_hz);
        let paste = Arc::new(PasteInjector::new(config.paste.clone()));
        Self {
            config,
            devices: DeviceRegistry::new(),
            interrupts: InterruptController::new(),
            scheduler,
            paste,
            uart: None,
            rom: None,
            keyboard: None,
            program_loaded: false,
            paused: false,
            rom_path: None,
        }
    }

    /// Standard board: RAM, then the ACIA. The ROM is added on first load.
    pub fn standard(config: MachineConfig) -> Result<Self, MachineError> {
        let mut machine = Self::new(config);
        machine.add_standard_devices()?;
        Ok(machine)
    }

    /// Standard board with `cpu` registered ahead of every other device.
    pub fn with_cpu(config: MachineConfig, cpu: Box<dyn Device>) -> Result<Self, MachineError> {
        let mut machine = Self::new(config);
        machine.add_device(cpu)?;
        machine.add_standard_devices()?;
        Ok(machine)
    }

    fn add_standard_devices(&mut self) -> Result<(), MachineError> {
        let ram = self.config.ram.clone();
        let acia = self.config.acia.clone();
        self.add_ram(ram.start, ram.size)?;
        self.add_uart(acia.base, acia.irq)?;
        Ok(())
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Register a device after those already present.
    pub fn add_device(&mut self, device: Box<dyn Device>) -> Result<DeviceId, MachineError> {
        Ok(self.devices.add_device(device)?)
    }

    pub fn add_ram(&mut self, start: u16, size: usize) -> Result<DeviceId, MachineError> {
        self.add_device(Box::new(RamDevice::new(start, size)))
    }

    /// Register the ACIA; pasted text is then also routed to its receiver.
    pub fn add_uart(&mut self, base: u16, irq_line: u8) -> Result<DeviceId, MachineError> {
        let id = self.add_device(Box::new(Acia6551::new(base, irq_line)))?;
        self.uart = Some(id);
        self.paste.set_uart_attached(true);
        Ok(id)
    }

    /// Register the keyboard. Its `input_pending` gates synthetic key delivery.
    pub fn add_keyboard(&mut self, device: Box<dyn Device>) -> Result<DeviceId, MachineError> {
        let id = self.add_device(device)?;
        self.keyboard = Some(id);
        Ok(id)
    }

    /// Install a 32KB ROM image and reset the system.
    ///
    /// The first load registers the ROM device, after every other device so
    /// I/O windows inside the ROM range keep priority. Later loads replace
    /// its contents. A wrongly sized image changes nothing.
    pub fn load_rom(&mut self, image: &[u8]) -> Result<(), MachineError> {
        if image.len() != ROM_SIZE {
            warn!(
                "rejected ROM image of {} bytes (expected {})",
                image.len(),
                ROM_SIZE
            );
            return Err(MachineError::RomSize {
                expected: ROM_SIZE,
                actual: image.len(),
            });
        }

        let replaced = self
            .rom
            .and_then(|id| self.devices.get_mut::<RomDevice>(id))
            .map(|rom| rom.set_contents(image))
            .unwrap_or(false);
        if !replaced {
            let id = self
                .devices
                .add_device(Box::new(RomDevice::new(ROM_START, image.to_vec())))?;
            self.rom = Some(id);
        }

        info!("loaded {} byte ROM at 0x{:04X}", image.len(), ROM_START);
        self.program_loaded = true;
        self.reset();
        Ok(())
    }

    /// Load a ROM image from disk.
    pub fn load_rom_file(&mut self, path: impl AsRef<Path>) -> Result<(), MachineError> {
        let path = path.as_ref();
        let image = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MachineError::RomNotFound(path.to_path_buf()),
            _ => MachineError::Io(e),
        })?;
        self.load_rom(&image)?;
        info!("ROM file {}", path.display());
        self.rom_path = Some(path.to_path_buf());
        Ok(())
    }

    /// Path of the last ROM file loaded from disk.
    pub fn rom_path(&self) -> Option<&Path> {
        self.rom_path.as_deref()
    }

    pub fn is_program_loaded(&self) -> bool {
        self.program_loaded
    }

    /// Reset every device, release all interrupt lines and resume running.
    pub fn reset(&mut self) {
        self.devices.reset_all(&mut self.interrupts);
        self.interrupts.reset();
        self.paused = false;
        self.scheduler.restart_clock();
        info!("system reset");
    }

    /// Destroy every device. Later calls (and the drop) do nothing.
    pub fn shutdown(&mut self) {
        if !self.devices.is_destroyed() {
            debug!("shutting down {} devices", self.devices.len());
            self.devices.destroy_all();
        }
    }

    /// Advance by the wall-clock time since the previous call.
    ///
    /// Returns the number of batches run.
    pub fn tick(&mut self) -> u32 {
        if !self.is_running() {
            self.scheduler.restart_clock();
            return 0;
        }
        let plan = self.scheduler.advance(Instant::now());
        self.run_plan(plan)
    }

    /// Advance by an externally measured interval.
    pub fn tick_elapsed(&mut self, elapsed: Duration) -> u32 {
        let plan = self.scheduler.plan(elapsed);
        self.run_plan(plan)
    }

    /// Run `plan`: per batch, one throttled paste delivery then every device
    /// ticks in registration order.
    pub fn run_plan(&mut self, plan: TickPlan) -> u32 {
        if !self.is_running() {
            return 0;
        }
        for _ in 0..plan.batches {
            self.deliver_paste_byte();
            self.devices
                .tick_all(&mut self.interrupts, plan.ticks_per_batch, plan.seconds_per_batch);
        }
        plan.batches
    }

    fn is_running(&self) -> bool {
        self.program_loaded && !self.paused && !self.devices.is_destroyed()
    }

    fn deliver_paste_byte(&mut self) {
        let Some(id) = self.uart else {
            return;
        };
        let rx_empty = self
            .devices
            .get::<Acia6551>(id)
            .is_some_and(|acia| acia.is_rx_empty());
        if let Some(byte) = self.paste.next_uart_byte(&*self, rx_empty) {
            if let Some(acia) = self.devices.get_mut::<Acia6551>(id) {
                acia.receive_byte(byte, &mut self.interrupts);
            }
        }
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            self.scheduler.restart_clock();
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Queue clipboard text for keyboard and serial delivery.
    pub fn paste_text(&self, text: &str) {
        self.paste.paste(text);
    }

    /// Injector handle for input threads.
    pub fn paste_handle(&self) -> Arc<PasteInjector> {
        Arc::clone(&self.paste)
    }

    /// Queue a live key event (serialized with pasted keys).
    pub fn key_event(&self, event: KeyEvent) {
        self.paste.push_key(event);
    }

    /// Route a host input event: keys are queued, anything else is broadcast.
    pub fn input_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key(key) => self.key_event(key),
            other => self.devices.broadcast_event(&other),
        }
    }

    /// Deliver up to two queued key events to every device, once the
    /// keyboard device has drained its own queue. Returns the count delivered.
    pub fn pump_key_events(&mut self) -> usize {
        let keyboard_idle = self
            .keyboard
            .and_then(|id| self.devices.device(id))
            .map_or(true, |keyboard| !keyboard.input_pending());
        let events = self.paste.drain_keys(keyboard_idle);
        for event in &events {
            self.devices.broadcast_event(&InputEvent::Key(*event));
        }
        events.len()
    }

    /// Push a byte straight into the ACIA receiver.
    pub fn uart_receive(&mut self, byte: u8) -> bool {
        match self.uart.and_then(|id| self.devices.get_mut::<Acia6551>(id)) {
            Some(acia) => {
                acia.receive_byte(byte, &mut self.interrupts);
                true
            }
            None => false,
        }
    }

    /// Forward a terminal-window key to the ACIA.
    pub fn terminal_key(&mut self, key: TerminalKey) -> bool {
        match self.uart.and_then(|id| self.devices.get_mut::<Acia6551>(id)) {
            Some(acia) => {
                acia.terminal_key(key, &mut self.interrupts);
                true
            }
            None => false,
        }
    }

    pub fn uart(&self) -> Option<&Acia6551> {
        self.devices.get::<Acia6551>(self.uart?)
    }

    pub fn uart_mut(&mut self) -> Option<&mut Acia6551> {
        self.devices.get_mut::<Acia6551>(self.uart?)
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        self.uart().map(Acia6551::transcript)
    }

    /// Terminal output followed by its NUL terminator.
    pub fn transcript_with_nul(&self) -> Option<&[u8]> {
        self.transcript().map(Transcript::as_bytes_with_nul)
    }

    pub fn consume_scroll_to_bottom(&mut self) -> bool {
        self.uart_mut()
            .is_some_and(|acia| acia.consume_scroll_to_bottom())
    }

    /// Whether the ACIA receive FIFO is empty (`true` without an ACIA).
    pub fn is_uart_rx_empty(&self) -> bool {
        self.uart().map_or(true, Acia6551::is_rx_empty)
    }

    /// Drive an interrupt line on behalf of an external collaborator.
    pub fn raise_interrupt(&mut self, line: u8, signal: InterruptSignal) -> bool {
        self.interrupts.raise(line, signal)
    }

    pub fn interrupts(&self) -> &InterruptController {
        &self.interrupts
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut DeviceRegistry {
        &mut self.devices
    }

    /// Device names in registration order, for device windows.
    pub fn device_names(&self) -> Vec<(DeviceId, String)> {
        self.devices
            .names()
            .map(|(id, name)| (id, name.to_string()))
            .collect()
    }

    pub fn set_device_visible(&mut self, id: DeviceId, visible: bool) -> bool {
        self.devices.set_visible(id, visible)
    }

    pub fn visible_outputs(&self) -> impl Iterator<Item = (&str, &FrameBuffer)> + '_ {
        self.devices.visible_outputs()
    }
}

impl MemoryBus for Machine {
    fn read(&mut self, addr: u16) -> u8 {
        self.devices.read(addr, &mut self.interrupts)
    }

    fn peek(&self, addr: u16) -> u8 {
        self.devices.peek(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.devices.write(addr, value, &mut self.interrupts);
    }

    fn irq_active(&self) -> bool {
        self.interrupts.irq_asserted()
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
