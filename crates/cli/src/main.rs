//! m16 pipeline simulator CLI.
//!
//! This binary provides a single entry point for both workflows. It performs:
//! 1. **Assemble:** Translate a source file and print (or write) the
//!    listing: address, hex word, binary, source, disassembly.
//! 2. **Run:** Assemble, load, and execute a program cycle-by-cycle, with
//!    an optional per-cycle pipeline diagram and a final statistics report.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use m16_core::Cpu;
use m16_core::asm::Program;
use m16_core::isa::disasm::disassemble;
use m16_core::stats::StageSlot;

#[derive(Parser, Debug)]
#[command(
    name = "m16",
    author,
    version,
    about = "Cycle-accurate 16-bit MIPS-style pipeline simulator",
    long_about = "Assemble and run programs on a five-stage in-order pipeline \
with operand forwarding and hazard detection.\n\nExamples:\n  \
m16 asm program.s\n  m16 run program.s --trace\n  m16 run program.s --json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble a source file and print the program listing.
    Asm {
        /// Assembly source file.
        file: PathBuf,

        /// Write the hex words to a file, one per line, instead of the
        /// listing to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Assemble and run a program to completion.
    Run {
        /// Assembly source file.
        file: PathBuf,

        /// Print a five-column pipeline diagram after every cycle.
        #[arg(long)]
        trace: bool,

        /// Dump the final CPU state as JSON instead of the report.
        #[arg(long)]
        json: bool,

        /// Stop after this many cycles even if the program has not drained.
        #[arg(long, default_value_t = Cpu::RUN_CYCLE_LIMIT)]
        max_cycles: u64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Asm { file, output } => cmd_asm(&file, output.as_deref()),
        Commands::Run {
            file,
            trace,
            json,
            max_cycles,
        } => cmd_run(&file, trace, json, max_cycles),
    }
}

/// Reads and assembles a source file, exiting with a diagnostic on failure.
fn assemble_file(file: &std::path::Path) -> Program {
    let source = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error: cannot read {}: {err}", file.display());
            process::exit(1);
        }
    };
    match m16_core::assemble(&source) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("error: {}: {err}", file.display());
            process::exit(1);
        }
    }
}

fn cmd_asm(file: &std::path::Path, output: Option<&std::path::Path>) {
    let program = assemble_file(file);

    if let Some(path) = output {
        let mut text = program.hex_words().join("\n");
        text.push('\n');
        if let Err(err) = fs::write(path, text) {
            eprintln!("error: cannot write {}: {err}", path.display());
            process::exit(1);
        }
        return;
    }

    for entry in program.listing() {
        println!(
            "{:03}: {}  {}  {:<24} ; {}",
            entry.address, entry.hex, entry.binary, entry.disasm, entry.source
        );
    }
    if !program.labels.is_empty() {
        println!();
        for (label, addr) in &program.labels {
            println!("{label}: {addr}");
        }
    }
}

fn cmd_run(file: &std::path::Path, trace: bool, json: bool, max_cycles: u64) {
    let program = assemble_file(file);
    let mut cpu = Cpu::new();
    cpu.load(program.words);

    let mut executed = 0;
    while !cpu.halted && executed < max_cycles {
        let _ = cpu.step();
        executed += 1;
        if trace {
            print_pipeline_diagram(&cpu);
        }
    }

    if !cpu.halted {
        eprintln!("warning: stopped after {executed} cycles without draining");
    }

    if json {
        match serde_json::to_string_pretty(&cpu.state()) {
            Ok(text) => println!("{text}"),
            Err(err) => {
                eprintln!("error: cannot serialize state: {err}");
                process::exit(1);
            }
        }
        return;
    }

    print_report(&cpu);
}

/// Prints one five-column diagram row for the cycle just executed.
fn print_pipeline_diagram(cpu: &Cpu) {
    let Some(snapshot) = cpu.stats.pipeline_history.last() else {
        return;
    };
    let fmt_stage = |slot: &Option<StageSlot>| -> String {
        match slot {
            Some(s) => format!("[{:>3} {:<22}]", s.pc, disassemble(s.word)),
            None => format!("[{:^26}]", "-"),
        }
    };
    eprintln!(
        "cycle {:>4}: {} {} {} {} {}",
        snapshot.cycle,
        fmt_stage(&snapshot.fetch),
        fmt_stage(&snapshot.decode),
        fmt_stage(&snapshot.execute),
        fmt_stage(&snapshot.memory),
        fmt_stage(&snapshot.writeback),
    );
}

/// Prints the end-of-run report: registers, data memory, and pipeline
/// statistics.
fn print_report(cpu: &Cpu) {
    println!("\n=========================================================");

    println!("\n[Registers]");
    let regs = cpu.regs.snapshot();
    for i in (0..regs.len()).step_by(2) {
        println!(
            "  $r{:<2} = {:#06x} ({:<5})   $r{:<2} = {:#06x} ({:<5})",
            i,
            regs[i],
            regs[i],
            i + 1,
            regs[i + 1],
            regs[i + 1]
        );
    }

    println!("\n[Data Memory]");
    if cpu.mem.cells().is_empty() {
        println!("  (no cells written)");
    } else {
        for (addr, value) in cpu.mem.cells() {
            println!("  [{addr:#06x}] = {value:#06x} ({value})");
        }
    }

    let perf = cpu.stats.performance(cpu.cycle);
    println!("\n[Pipeline]");
    println!("  Cycles:               {}", perf.cycles);
    println!("  Instructions Retired: {}", perf.instructions);
    println!("  CPI:                  {:.2}", perf.cpi);
    println!(
        "  Stall Cycles:         {:<10} ({:.1}%)",
        perf.stall_cycles, perf.stall_rate
    );
    println!(
        "  Forward Cycles:       {:<10} ({:.1}%)",
        perf.forward_cycles, perf.forward_rate
    );
    println!("  Flushes:              {}", perf.flush_count);

    println!("=========================================================\n");
}
