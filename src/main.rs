//! byte8 - CLI Entry Point
//!
//! Commands:
//! - `byte8 run <image>` - Run a program image
//! - `byte8 debug <image>` - Interactive debugger
//! - `byte8 demo` - Run the built-in counting demo
//! - `byte8 test` - Built-in self-test

use clap::{Parser, Subcommand};
use serde::Serialize;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

#[derive(Parser)]
#[command(name = "byte8")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "A deterministic emulator for a minimal 8-bit processor")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv traces every instruction)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts or the step budget runs out
    Run {
        /// Path to the program image (.hex text or raw binary)
        image: String,
        /// Maximum number of instructions to execute
        #[arg(short, long, default_value = "10000")]
        max_steps: u64,
        /// Address to load the image at; execution starts here
        #[arg(short, long, default_value = "0")]
        origin: u8,
        /// Memory size in bytes (1-256)
        #[arg(long, default_value = "256")]
        memory_size: usize,
        /// Print the final state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    Debug {
        /// Path to the program image
        image: String,
        /// Memory size in bytes (1-256)
        #[arg(long, default_value = "256")]
        memory_size: usize,
    },
    /// Run the built-in demo program
    Demo {
        /// Maximum number of instructions to execute
        #[arg(short, long, default_value = "200")]
        max_steps: u64,
    },
    /// Run the built-in self-test
    Test,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { image, max_steps, origin, memory_size, json }) => {
            let config = byte8::MachineConfig { memory_size, origin };
            run_program(&image, &config, max_steps, json);
        }
        Some(Commands::Debug { image, memory_size }) => {
            let config = byte8::MachineConfig { memory_size, ..Default::default() };
            debug_program(&image, &config);
        }
        Some(Commands::Demo { max_steps }) => {
            run_demo(max_steps);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => {
            println!("byte8 v0.1.0");
            println!("A deterministic 8-bit processor emulator");
            println!();
            println!("Use --help for available commands");
            println!();
            run_demo(byte8::demo::DEMO_STEPS);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if let Err(e) = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("❌ Failed to initialise logging: {}", e);
    }
}

/// Final machine state as printed by `run --json`.
#[derive(Serialize)]
struct RunReport<'a> {
    steps: u64,
    halted: bool,
    registers: &'a byte8::Registers,
}

fn load_or_exit(path: &str) -> Vec<u8> {
    match byte8::load_image(path) {
        Ok(image) if image.is_empty() => {
            eprintln!("❌ Program image is empty");
            std::process::exit(1);
        }
        Ok(image) => image.bytes,
        Err(e) => {
            eprintln!("❌ Failed to load image: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_program(path: &str, config: &byte8::MachineConfig, max_steps: u64, json: bool) {
    use byte8::Machine;

    let program = load_or_exit(path);
    if !json {
        println!("🔧 Running: {} ({} bytes)", path, program.len());
    }

    let mut machine = match Machine::with_program(config, &program) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("❌ Failed to load program: {}", e);
            std::process::exit(1);
        }
    };

    let steps = match machine.run(max_steps) {
        Ok(steps) => steps,
        Err(e) => {
            eprintln!("❌ CPU error after {} steps: {}", machine.cycles, e);
            std::process::exit(1);
        }
    };

    if json {
        let report = RunReport { steps, halted: machine.is_halted(), registers: &machine.regs };
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to encode report: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!();
    println!("━━━ Result ━━━");
    print_state(&machine, steps);

    if steps >= max_steps && !machine.is_halted() {
        println!();
        println!("⚠️  Reached step limit ({}). Use --max-steps to increase.", max_steps);
    }
}

fn print_state(machine: &byte8::Machine, steps: u64) {
    println!("Steps:  {}", steps);
    println!("Halted: {}", machine.is_halted());
    println!("A:      {:#04x} ({})", machine.regs.a, machine.regs.a);
    println!("B:      {:#04x} ({})", machine.regs.b, machine.regs.b);
    println!("PC:     {:#04x}", machine.regs.pc);
    println!("OUT:    {:#04x} ({})", machine.regs.out, machine.regs.out);
    println!("Flags:  {}", machine.regs.flags);
}

#[cfg(feature = "tui")]
fn debug_program(path: &str, config: &byte8::MachineConfig) {
    use byte8::tui::run_debugger;

    let program = load_or_exit(path);
    println!("🔍 Loaded {} bytes from {}", program.len(), path);
    println!("🚀 Launching debugger...");

    if let Err(e) = run_debugger(*config, program) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(not(feature = "tui"))]
fn debug_program(_path: &str, _config: &byte8::MachineConfig) {
    eprintln!("❌ This build has no debugger (enable the `tui` feature)");
    std::process::exit(1);
}

fn run_demo(max_steps: u64) {
    match byte8::demo::run_demo(max_steps) {
        Ok((machine, _)) => {
            println!("OUT = {} A = {}", machine.output(), machine.regs.a);
        }
        Err(e) => {
            eprintln!("❌ Demo failed: {}", e);
            std::process::exit(1);
        }
    }
}

fn run_self_test() {
    use byte8::{Machine, MachineError, Instruction};

    println!("━━━ byte8 Self-Test ━━━");
    println!();

    let mut passed = 0;
    let mut failed = 0;

    let mut check = |name: &str, ok: bool| {
        if ok {
            println!("{}... ✓", name);
            passed += 1;
        } else {
            println!("{}... ✗", name);
            failed += 1;
        }
    };

    let program_with = |setup: &[Instruction], a: u8, b: u8| {
        let mut machine = Machine::new();
        let bytes: Vec<u8> = setup.iter().flat_map(|i| i.encode()).collect();
        machine.load_program(0, &bytes).map(|_| {
            machine.regs.a = a;
            machine.regs.b = b;
            machine
        })
    };

    // ADD carry out of bit 7
    let ok = program_with(&[Instruction::Add], 250, 10)
        .and_then(|mut m| m.step().map(|_| m))
        .map(|m| m.regs.a == 4 && m.regs.flags.carry)
        .unwrap_or(false);
    check("ADD 250 + 10 wraps with carry", ok);

    // SUB borrow
    let ok = program_with(&[Instruction::Sub], 5, 10)
        .and_then(|mut m| m.step().map(|_| m))
        .map(|m| m.regs.a == 251 && m.regs.flags.carry && m.regs.flags.negative)
        .unwrap_or(false);
    check("SUB 5 - 10 borrows", ok);

    // HLT stops the run loop
    let ok = program_with(&[Instruction::Hlt], 0, 0)
        .and_then(|mut m| Ok((m.run(10)?, m.run(10)?)))
        .map(|steps| steps == (1, 0))
        .unwrap_or(false);
    check("HLT ends the run", ok);

    // Invalid opcode is reported
    let mut machine = Machine::new();
    machine.mem.write(0, 0x10);
    let ok = matches!(machine.step(), Err(MachineError::InvalidOpcode { opcode: 0x10, .. }))
        && machine.regs.pc == 1;
    check("0x10 is an invalid opcode", ok);

    // Demo program
    let ok = byte8::demo::run_demo(byte8::demo::DEMO_STEPS)
        .map(|(m, steps)| steps == 200 && m.regs.a == 40 && m.output() == 40)
        .unwrap_or(false);
    check("Demo counts to 40 in 200 steps", ok);

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}
