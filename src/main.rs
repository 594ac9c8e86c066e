//! i4004 Emulator - CLI Entry Point
//!
//! Commands:
//! - `i4004-emu run <program>` - Run a binary image or ASM file
//! - `i4004-emu asm <source>` - Assemble to a binary image
//! - `i4004-emu disasm <image>` - Disassemble a binary image
//! - `i4004-emu hexdump <image>` - Hex dump a binary image

use clap::{Parser, Subcommand};
use i4004::cpu::LogTrace;
use i4004::{
    assemble, ConsoleTrap, Cpu, HaltReport, HaltTrap, Hooks, ProgramImage, RunConfig, RunOutcome, TrapMode,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "i4004-emu")]
#[command(version)]
#[command(about = "An instruction-level emulator of the Intel 4004 microprocessor")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts
    Run {
        /// Binary image, or an .asm source to assemble first
        program: PathBuf,
        /// JSON run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_steps: Option<u64>,
        /// Log every retired instruction
        #[arg(short, long)]
        trace: bool,
        /// Trap vector handling: off, halt or console
        #[arg(long)]
        trap: Option<TrapMode>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Assemble source to a binary image
    Asm {
        /// Path to the source file
        source: PathBuf,
        /// Output image (default: source with .bin extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write a listing file
        #[arg(short, long)]
        listing: Option<PathBuf>,
    },
    /// Disassemble a binary image to readable text
    Disasm {
        /// Path to the image
        image: PathBuf,
    },
    /// Hex dump a binary image
    Hexdump {
        /// Path to the image
        image: PathBuf,
        /// Bytes per line
        #[arg(short, long, default_value = "16")]
        width: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { program, config, max_steps, trace, trap, json } => {
            let mut run = match config {
                Some(path) => RunConfig::load(&path).unwrap_or_else(|e| fail(e)),
                None => RunConfig::default(),
            };
            if max_steps.is_some() {
                run.max_steps = max_steps;
            }
            run.trace |= trace;
            if let Some(mode) = trap {
                run.trap = mode;
            }
            init_logging(cli.verbose, run.trace);
            run_program(&program, &run, json);
        }
        Commands::Asm { source, output, listing } => {
            init_logging(cli.verbose, false);
            assemble_file(&source, output, listing);
        }
        Commands::Disasm { image } => {
            init_logging(cli.verbose, false);
            let image = ProgramImage::load(&image).unwrap_or_else(|e| fail(e));
            print!("{}", i4004::disassemble(image.as_bytes()));
        }
        Commands::Hexdump { image, width } => {
            init_logging(cli.verbose, false);
            let image = ProgramImage::load(&image).unwrap_or_else(|e| fail(e));
            print!("{}", image.hexdump(width));
        }
    }
}

/// Install the `tracing` subscriber. Tracing a run needs at least INFO.
fn init_logging(verbose: u8, trace_run: bool) {
    let level = match verbose {
        0 if trace_run => "info",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("error: {err}");
    std::process::exit(1);
}

/// Load an image, assembling `.asm` sources first.
fn load_program(path: &Path) -> ProgramImage {
    if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("asm")) {
        let source = std::fs::read_to_string(path).unwrap_or_else(|e| fail(format!("{}: {e}", path.display())));
        let assembly = assemble(&source).unwrap_or_else(|e| fail(e));
        tracing::info!(bytes = assembly.bytes.len(), "assembled {}", path.display());
        assembly.into_image().unwrap_or_else(|e| fail(e))
    } else {
        ProgramImage::load(path).unwrap_or_else(|e| fail(e))
    }
}

#[derive(Serialize)]
struct RunSummary<'a> {
    /// Set when the program halted.
    halt: Option<HaltReport>,
    /// Instructions retired.
    steps: u64,
    /// Console trap output.
    console: &'a str,
}

fn run_program(path: &Path, config: &RunConfig, json: bool) {
    let image = load_program(path);
    let mut cpu = Cpu::with_image(&image);

    let mut console = ConsoleTrap::new();
    let mut halt_trap = HaltTrap;
    let mut log = LogTrace;
    let mut hooks = Hooks::default();
    match config.trap {
        TrapMode::Off => {}
        TrapMode::Halt => hooks = hooks.with_trap(&mut halt_trap),
        TrapMode::Console => hooks = hooks.with_trap(&mut console),
    }
    if config.trace {
        hooks = hooks.with_trace(&mut log);
    }

    let outcome = cpu.run_with(&mut hooks, config.max_steps).unwrap_or_else(|e| fail(e));
    drop(hooks);

    let halt = match outcome {
        RunOutcome::Halted(report) => Some(report),
        RunOutcome::StepLimit { .. } => None,
    };

    if json {
        let summary = RunSummary { halt, steps: cpu.steps, console: &console.output };
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{text}"),
            Err(e) => fail(e),
        }
    } else {
        if !console.output.is_empty() {
            println!("{}", console.output);
        }
        println!("Steps:       {}", cpu.steps);
        println!("State:       {:?}", cpu.state);
        println!("Accumulator: {} ({})", cpu.regs.acc, cpu.regs.acc.value());
        println!("Carry:       {}", u8::from(cpu.regs.carry));
        println!("PC:          {}", cpu.regs.pc);
        println!("Stack:       {:?}", cpu.stack.frames());
        if halt.is_none() {
            println!();
            println!("Reached step limit ({}). Use --max-steps to increase.", cpu.steps);
        }
    }

    if halt.is_some_and(|report| report.reason.is_fatal()) {
        std::process::exit(1);
    }
}

fn assemble_file(source_path: &Path, output: Option<PathBuf>, listing: Option<PathBuf>) {
    let out_path = output.unwrap_or_else(|| source_path.with_extension("bin"));

    let source = std::fs::read_to_string(source_path)
        .unwrap_or_else(|e| fail(format!("{}: {e}", source_path.display())));
    let assembly = assemble(&source).unwrap_or_else(|e| fail(e));

    if let Err(e) = std::fs::write(&out_path, &assembly.bytes) {
        fail(format!("{}: {e}", out_path.display()));
    }
    println!("Assembled {} bytes to {}", assembly.bytes.len(), out_path.display());

    if let Some(listing_path) = listing {
        if let Err(e) = std::fs::write(&listing_path, assembly.listing_text()) {
            fail(format!("{}: {e}", listing_path.display()));
        }
        println!("Listing written to {}", listing_path.display());
    }
}
