//! Command-line terminal runner.
//!
//! Runs the board in real time with the ACIA wired to the console: guest
//! output goes to stdout, and each stdin line is pasted into the receiver
//! through the flow-controlled paste path. Lines starting with `.` are runner
//! commands:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `.reset` | system reset |
//! | `.break` | pause the board |
//! | `.run` | resume the board |
//! | `.quit` | exit |

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use sbc6502::{Machine, MachineConfig, PasteInjector};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const EXIT_DRAIN: Duration = Duration::from_millis(500);

#[derive(Parser, Debug)]
#[command(
    name = "sbc6502",
    version,
    about = "6502 single-board computer with a serial terminal on the console"
)]
struct Args {
    /// ROM image to load (32KB, mapped at 0x8000).
    #[arg(long, value_name = "PATH")]
    rom: Option<PathBuf>,

    /// Start paused; resume with `.run`.
    #[arg(long, default_value_t = false)]
    brk: bool,

    /// TOML machine configuration.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// More log output (repeat for more).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Less log output.
    #[arg(short, long, action = clap::ArgAction::Count)]
    quiet: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunnerCommand {
    Reset,
    Break,
    Run,
    Quit,
}

impl RunnerCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            ".reset" => Some(RunnerCommand::Reset),
            ".break" => Some(RunnerCommand::Break),
            ".run" => Some(RunnerCommand::Run),
            ".quit" => Some(RunnerCommand::Quit),
            _ => None,
        }
    }
}

fn log_level(verbose: u8, quiet: u8) -> LevelFilter {
    const LEVELS: [LevelFilter; 6] = [
        LevelFilter::Off,
        LevelFilter::Error,
        LevelFilter::Warn,
        LevelFilter::Info,
        LevelFilter::Debug,
        LevelFilter::Trace,
    ];
    let index = (2 + verbose as i32 - quiet as i32).clamp(0, LEVELS.len() as i32 - 1);
    LEVELS[index as usize]
}

fn init_logging(args: &Args) {
    env_logger::Builder::new()
        .filter_level(log_level(args.verbose, args.quiet))
        .parse_default_env()
        .init();
}

/// One line of console input.
#[derive(Debug, PartialEq, Eq)]
enum ConsoleLine<'a> {
    Command(RunnerCommand),
    /// Raw bytes to paste, line ending stripped
    Paste(&'a [u8]),
}

/// Split a raw stdin line into a runner command or paste bytes. Input is
/// not required to be UTF-8; anything that is not a command is pasted as is.
fn classify_line(raw: &[u8]) -> ConsoleLine<'_> {
    let line = raw.strip_suffix(b"\n").unwrap_or(raw);
    let line = line.strip_suffix(b"\r").unwrap_or(line);

    match std::str::from_utf8(line).ok().and_then(RunnerCommand::parse) {
        Some(command) => ConsoleLine::Command(command),
        None => ConsoleLine::Paste(line),
    }
}

/// Read stdin on its own thread; pasted lines go straight into the injector.
/// EOF sends `Quit`, a read error is forwarded to the main loop.
fn spawn_stdin_reader(paste: Arc<PasteInjector>) -> Receiver<io::Result<RunnerCommand>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut stdin = io::stdin().lock();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match stdin.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    let _ = tx.send(Err(err));
                    return;
                }
            }

            match classify_line(&buf) {
                ConsoleLine::Command(command) => {
                    if tx.send(Ok(command)).is_err() {
                        return;
                    }
                }
                ConsoleLine::Paste(bytes) => {
                    let mut line = bytes.to_vec();
                    line.push(b'\n');
                    paste.paste_bytes(&line);
                }
            }
        }
        let _ = tx.send(Ok(RunnerCommand::Quit));
    });
    rx
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let config = match &args.config {
        Some(path) => MachineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => MachineConfig::default(),
    };
    let rom = args.rom.clone().unwrap_or_else(|| config.default_rom.clone());

    let mut machine = Machine::standard(config).context("failed to set up the board")?;

    if let Some(acia) = machine.uart_mut() {
        acia.set_transmit_callback(|byte| {
            let mut out = io::stdout().lock();
            let _ = out.write_all(&[byte]);
            let _ = out.flush();
        });
    }

    machine
        .load_rom_file(&rom)
        .with_context(|| format!("failed to load ROM {}", rom.display()))?;

    if args.brk {
        info!("starting paused");
        machine.pause();
    }

    let commands = spawn_stdin_reader(machine.paste_handle());
    let mut quit_at: Option<Instant> = None;

    loop {
        match commands.try_recv() {
            Ok(Ok(RunnerCommand::Reset)) => machine.reset(),
            Ok(Ok(RunnerCommand::Break)) => machine.pause(),
            Ok(Ok(RunnerCommand::Run)) => machine.resume(),
            Ok(Err(err)) => return Err(err).context("failed to read stdin"),
            Ok(Ok(RunnerCommand::Quit)) | Err(TryRecvError::Disconnected) => {
                quit_at.get_or_insert_with(|| Instant::now() + EXIT_DRAIN);
            }
            Err(TryRecvError::Empty) => {}
        }

        // give the guest a moment to consume pasted input before exiting
        if let Some(deadline) = quit_at {
            let drained = machine.paste_handle().pending_uart_bytes() == 0;
            if drained || machine.is_paused() || Instant::now() >= deadline {
                break;
            }
        }

        machine.tick();
        machine.pump_key_events();
        thread::sleep(Duration::from_millis(1));
    }

    machine.shutdown();
    Ok(())
}
