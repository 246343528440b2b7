use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{bail, IntoDiagnostic, Result};

use simple8::{CpuState, Debugger, DebuggerOptions, Output, Termination};

/// Assembler and emulator for a small 8-bit educational CPU.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.asm` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run text `.asm` or binary `.bin` file directly and output to terminal
    Run {
        /// `.asm` or `.bin` file to run
        name: PathBuf,
        #[command(flatten)]
        opts: RunOptions,
        /// Stop after this many instructions, even if the program has not halted
        #[arg(long)]
        max_steps: Option<u64>,
    },
    /// Run text `.asm` file directly and with debugger
    Debug {
        /// `.asm` or `.bin` file to run
        name: PathBuf,
        /// Read debugger commands from argument
        #[arg(short, long)]
        command: Option<String>,
        #[command(flatten)]
        opts: RunOptions,
    },
    /// Create binary `.bin` file and `.lst` listing to run later or view compiled data
    Compile {
        /// `.asm` file to compile
        name: PathBuf,
        /// Destination to output .bin file
        dest: Option<PathBuf>,
    },
    /// Check a `.asm` file without running or outputting binary
    Check {
        /// File to check
        name: PathBuf,
    },
}

#[derive(clap::Args, Clone, Copy, Default)]
struct RunOptions {
    /// Produce minimal output, suited for blackbox tests
    #[arg(short, long)]
    minimal: bool,
    /// Print every instruction as it is executed (also `SIMPLE8_TRACE=1`)
    #[arg(short, long)]
    trace: bool,
}

fn main() -> miette::Result<()> {
    use MsgColor::*;
    let args = Args::parse();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(simple8::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        if let Some(path) = args.path {
            return run(&path, None, RunOptions::default(), None);
        }
        println!("\n~ simple8 v{VERSION} ~");
        println!("{SHORT_INFO}");
        std::process::exit(0);
    };

    match command {
        Command::Run {
            name,
            opts,
            max_steps,
        } => run(&name, None, opts, max_steps),
        Command::Debug {
            name,
            command,
            opts,
        } => run(&name, Some(DebuggerOptions { command }), opts, None),
        Command::Compile { name, dest } => {
            file_message(Green, "Assembling", &name);
            let contents = fs::read_to_string(&name).into_diagnostic()?;
            let assembly = simple8::assemble(&contents)?;

            let out_file_name = match dest {
                Some(dest) => dest,
                None => name.with_extension("bin"),
            };
            let listing_file_name = out_file_name.with_extension("lst");
            fs::write(&out_file_name, &assembly.bytes).into_diagnostic()?;
            fs::write(&listing_file_name, assembly.listing_text() + "\n").into_diagnostic()?;

            message(Green, "Finished", "emit binary");
            file_message(Green, "Saved", &out_file_name);
            file_message(Green, "Saved", &listing_file_name);
            Ok(())
        }
        Command::Check { name } => {
            file_message(Green, "Checking", &name);
            let contents = fs::read_to_string(&name).into_diagnostic()?;
            let _ = simple8::assemble(&contents)?;
            message(Green, "Success", "no errors found!");
            Ok(())
        }
    }
}

#[allow(unused)]
enum MsgColor {
    Green,
    Cyan,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(
    name: &Path,
    debugger_opts: Option<DebuggerOptions>,
    opts: RunOptions,
    max_steps: Option<u64>,
) -> Result<()> {
    use MsgColor::*;

    let Some(ext) = name.extension() else {
        bail!("File has no extension. Exiting...");
    };
    let (bytes, labels) = match ext.to_str() {
        Some("bin") => {
            file_message(Green, "Loading", name);
            (fs::read(name).into_diagnostic()?, Vec::new())
        }
        Some("asm") => {
            file_message(Green, "Assembling", name);
            let contents = fs::read_to_string(name).into_diagnostic()?;
            let assembly = simple8::assemble(&contents)?;
            (assembly.bytes, assembly.labels)
        }
        _ => bail!("File has unknown extension. Exiting..."),
    };
    let mut state = CpuState::with_program(&bytes)?;

    Output::set_minimal(opts.minimal);
    Output::set_trace(opts.trace || trace_from_env());

    if let Some(debugger_opts) = debugger_opts {
        message(Green, "Debugging", "emitted binary");
        Debugger::new(debugger_opts, state.clone(), labels).run(&mut state)?;
        file_message(Green, "Completed", name);
        return Ok(());
    }

    println!("Initial state:");
    Output::Normal.print_registers(&state);

    message(Green, "Running", "emitted binary");
    let termination = match max_steps {
        Some(max_steps) => simple8::run_with_limit(&mut state, max_steps)?,
        None => simple8::run(&mut state)?,
    };
    Output::Normal.start_new_line();
    match termination {
        Termination::Halted => message(Green, "Halted", "reached HLT"),
        Termination::AddressExhausted => message(Cyan, "Stopped", "reached end of memory"),
        Termination::StepLimit => message(Red, "Stopped", "step limit reached"),
    }

    println!("Final state:");
    Output::Normal.print_registers(&state);
    println!("Memory dump:");
    println!("{}", state.memory_dump(0, simple8::MEMORY_SIZE));

    file_message(Green, "Completed", name);
    Ok(())
}

/// `SIMPLE8_TRACE=1` enables tracing without the flag.
fn trace_from_env() -> bool {
    std::env::var("SIMPLE8_TRACE").is_ok_and(|value| value == "1")
}

const SHORT_INFO: &str = r"
An assembler and emulator for a small 8-bit educational CPU.
Please use `-h` or `--help` to access the usage instructions and documentation.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
