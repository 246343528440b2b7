mod breakpoint;
mod command;
mod source;

use fxhash::FxHashMap;

use self::breakpoint::Breakpoints;
use self::command::{Address, Command, Location};
use self::source::{SourceMode, SourceReader};
use crate::error::ExecError;
use crate::output::{Condition, Output};
use crate::runtime::{self, Step};
use crate::state::CpuState;
use crate::{dprint, dprintln};

/// Leave this as a struct, in case more options are added in the future. Plus it is more explicit.
#[derive(Debug, Default)]
pub struct DebuggerOptions {
    /// Commands to run instead of reading from stdin, separated by `;` or newlines.
    pub command: Option<String>,
}

pub struct Debugger {
    /// Must not be mutated.
    initial_state: CpuState,
    labels: FxHashMap<String, usize>,

    status: Status,
    command_source: SourceMode,

    breakpoints: Breakpoints,
    /// Used to allow breakpoint to be passed on second attempt.
    current_breakpoint: Option<u8>,

    /// Amount of instructions executed since last command.
    instruction_count: u32,
    /// Whether the instruction pointer should be displayed on next command prompt.
    should_echo_ip: bool,
}

/// The current status of the debugger execution loop.
#[derive(Debug, Default)]
enum Status {
    /// Keep executing user commands, until one changes the debugger status.
    #[default]
    WaitForAction,
    /// Execute `count` instructions.
    ///
    /// Stop execution early if breakpoint, `HLT` or end of memory is reached.
    Step { count: u32 },
    /// Execute all instructions until breakpoint, `HLT` or end of memory is reached.
    Continue,
}

impl Debugger {
    pub fn new(
        opts: DebuggerOptions,
        initial_state: CpuState,
        labels: impl IntoIterator<Item = (String, usize)>,
    ) -> Self {
        Self {
            initial_state,
            labels: labels.into_iter().collect(),

            status: Status::default(),
            command_source: SourceMode::from(opts.command),

            breakpoints: Breakpoints::default(),
            current_breakpoint: None,

            instruction_count: 0,
            should_echo_ip: true,
        }
    }

    /// Run the command loop until `quit` or the end of command input.
    ///
    /// Only an invalid opcode stops the debugger early.
    pub fn run(&mut self, state: &mut CpuState) -> Result<(), ExecError> {
        loop {
            match self.status {
                Status::WaitForAction => {
                    if !self.next_action(state) {
                        return Ok(());
                    }
                }
                Status::Step { .. } | Status::Continue => {
                    if self.check_interrupts(state) {
                        self.status = Status::WaitForAction;
                        continue;
                    }
                    self.execute(state)?;
                }
            }
        }
    }

    /// Execute one instruction, pausing when a `Step` count runs out or the program stops.
    fn execute(&mut self, state: &mut CpuState) -> Result<(), ExecError> {
        let result = runtime::step(state)?;
        self.instruction_count += 1;

        if let Status::Step { count } = &mut self.status {
            *count -= 1;
            if *count == 0 {
                self.status = Status::WaitForAction;
            }
        }

        match result {
            Step::Continuing => (),
            Step::Halted => {
                dprintln!(Always, "Reached HLT. Pausing execution.");
                self.status = Status::WaitForAction;
            }
            Step::AddressExhausted => {
                dprintln!(Always, "Reached end of memory. Pausing execution.");
                self.status = Status::WaitForAction;
            }
        }
        Ok(())
    }

    /// Whether execution must pause before the next instruction.
    ///
    /// An 'interrupt' here is a breakpoint, or a program which cannot continue.
    fn check_interrupts(&mut self, state: &CpuState) -> bool {
        if state.is_halted() || state.is_exhausted() {
            dprintln!(
                Always,
                "Program has stopped. Use `reset` to run it again."
            );
            return true;
        }

        // Remember if previous cycle paused on the same breakpoint. If so, don't break now.
        let ip = state.ip() as u8;
        if self.breakpoints.contains(ip) && self.current_breakpoint != Some(ip) {
            dprintln!(Always, "Reached breakpoint. Pausing execution.");
            self.current_breakpoint = Some(ip);
            return true;
        }
        self.current_breakpoint = None;
        false
    }

    /// Returns `false` if the debugger should stop.
    fn next_action(&mut self, state: &mut CpuState) -> bool {
        Output::Debugger(Condition::Always).start_new_line();

        if self.instruction_count > 0 {
            dprintln!(
                Always,
                "Executed {} instruction{}.",
                self.instruction_count,
                if self.instruction_count == 1 { "" } else { "s" },
            );
            self.instruction_count = 0;
        }
        if self.should_echo_ip {
            dprintln!(Sometimes, "Instruction pointer at: 0x{:02X}.", state.ip());
            self.should_echo_ip = false;
        }

        // Convert `EOF` to `quit` command
        let command = self.next_command().unwrap_or(Command::Quit);

        match command {
            Command::Quit => return false,

            Command::Help => {
                dprintln!(Always, "\n{}", include_str!("./help.txt"));
            }

            Command::Continue => {
                self.status = Status::Continue;
                self.should_echo_ip = true;
                dprintln!(Sometimes, "Continuing...");
            }
            Command::Step { count } => {
                self.status = Status::Step { count };
                self.should_echo_ip = true;
            }

            Command::Registers => {
                dprintln!(Sometimes, "Registers:");
                Output::Debugger(Condition::Always).print_registers(state);
            }

            Command::Dump { start, end } => {
                let (Some(start), Some(end)) =
                    (self.resolve_address(&start), self.resolve_address(&end))
                else {
                    return true;
                };
                if start > end {
                    dprintln!(Always, "Start address is after end address.");
                    return true;
                }
                let dump = state.memory_dump(start as usize, end as usize + 1);
                Output::Debugger(Condition::Always).print_str(&format!("{}\n", dump));
            }

            Command::Get { location } => match location {
                Location::Register(register) => {
                    dprintln!(Sometimes, "Register {}:", register);
                    Output::Debugger(Condition::Always).print_byte(state.reg(register));
                }
                Location::InstructionPointer => {
                    dprintln!(Sometimes, "Instruction pointer:");
                    Output::Debugger(Condition::Always).print_str(&format!("0x{:02X}\n", state.ip()));
                }
                Location::Memory(address) => {
                    let Some(address) = self.resolve_address(&address) else {
                        return true;
                    };
                    dprintln!(Sometimes, "Memory at address 0x{:02X}:", address);
                    Output::Debugger(Condition::Always).print_byte(state.mem(address));
                }
            },

            Command::Set { location, value } => match location {
                Location::Register(register) => {
                    state.set_reg(register, value);
                    dprintln!(Always, "Updated register {}.", register);
                }
                Location::InstructionPointer => {
                    state.set_ip(value);
                    self.should_echo_ip = true;
                    dprintln!(Always, "Set instruction pointer to 0x{:02X}.", value);
                }
                Location::Memory(address) => {
                    let Some(address) = self.resolve_address(&address) else {
                        return true;
                    };
                    state.set_mem(address, value);
                    dprintln!(Always, "Updated memory at address 0x{:02X}.", address);
                }
            },

            Command::Reset => {
                *state = self.initial_state.clone();
                self.current_breakpoint = None;
                self.should_echo_ip = true;
                dprintln!(Always, "Reset program to initial state.");
            }

            Command::BreakAdd { address } => {
                let Some(address) = self.resolve_address(&address) else {
                    return true;
                };
                if self.breakpoints.insert(address) {
                    dprintln!(Always, "Added breakpoint at 0x{:02X}.", address);
                } else {
                    dprintln!(Always, "Breakpoint already exists at 0x{:02X}.", address);
                }
            }
            Command::BreakRemove { address } => {
                let Some(address) = self.resolve_address(&address) else {
                    return true;
                };
                if self.breakpoints.remove(address) {
                    dprintln!(Always, "Removed breakpoint at 0x{:02X}.", address);
                } else {
                    dprintln!(Always, "No breakpoint exists at 0x{:02X}.", address);
                }
            }
            Command::BreakList => {
                if self.breakpoints.is_empty() {
                    dprintln!(Always, "No breakpoints exist.");
                } else {
                    dprintln!(Sometimes, "Breakpoints:");
                    for (i, address) in self.breakpoints.iter().enumerate() {
                        if Output::is_minimal() {
                            dprintln!(Always, "0x{:02X}", address);
                            continue;
                        }
                        let branch = if i + 1 == self.breakpoints.len() {
                            "╰─"
                        } else {
                            "├─"
                        };
                        dprint!(Always, "{} 0x{:02X}", branch, address);
                        if let Some(label) = self.label_at(address) {
                            dprint!(Always, "  ──  {}", label);
                        }
                        dprintln!(Always);
                    }
                }
            }
        }

        true
    }

    /// Returns `None` on EOF.
    fn next_command(&mut self) -> Option<Command> {
        // Loop until valid command or EOF
        loop {
            let line = self.command_source.read()?.trim();
            // Necessary, since `Command::try_from` assumes non-empty line
            if line.is_empty() {
                continue;
            }

            match Command::try_from(line) {
                Ok(command) => return Some(command),
                Err(error) => {
                    dprintln!(Always, "{}", error);
                    dprintln!(Always, "Type `help` for a list of commands.");
                }
            }
        }
    }

    fn resolve_address(&self, address: &Address) -> Option<u8> {
        match address {
            Address::Literal(address) => Some(*address),
            Address::Label(name) => {
                let Some(address) = self.labels.get(name).copied() else {
                    dprintln!(Always, "Label not found named `{}`.", name);
                    return None;
                };
                let Ok(address) = u8::try_from(address) else {
                    dprintln!(Always, "Label `{}` is out of bounds of memory.", name);
                    return None;
                };
                dprintln!(Sometimes, "Label `{}` is at address 0x{:02X}.", name, address);
                Some(address)
            }
        }
    }

    fn label_at(&self, address: u8) -> Option<&str> {
        self.labels
            .iter()
            .filter(|(_, addr)| **addr == address as usize)
            .map(|(name, _)| name.as_str())
            .min()
    }
}
