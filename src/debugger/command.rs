use std::fmt;

use thiserror::Error;

use crate::parser::{self, parse_literal};
use crate::state::Register;

#[derive(Debug, PartialEq)]
pub enum Command {
    Help,
    Step { count: u32 },
    Continue,
    Quit,
    Registers,
    Reset,
    Dump { start: Address, end: Address },
    Get { location: Location },
    Set { location: Location, value: u8 },
    BreakAdd { address: Address },
    BreakRemove { address: Address },
    BreakList,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CommandName {
    Help,
    Step,
    Continue,
    Quit,
    Registers,
    Reset,
    Dump,
    Get,
    Set,
    BreakAdd,
    BreakRemove,
    BreakList,
}

/// Register, instruction pointer, or memory address.
#[derive(Clone, Debug, PartialEq)]
pub enum Location {
    Register(Register),
    InstructionPointer,
    Memory(Address),
}

/// Memory address, given directly or by label.
#[derive(Clone, Debug, PartialEq)]
pub enum Address {
    Literal(u8),
    /// Uppercase, to match the assembler's symbol table.
    Label(String),
}

/// Error parsing a command.
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Not a command: `{0}`.")]
    InvalidCommand(String),
    #[error("Missing subcommand: `break (add|remove|list)`.")]
    MissingSubcommand,
    #[error("Invalid subcommand: `break {0}`.")]
    InvalidSubcommand(String),
    #[error("In command `{command_name}`:\n    Missing argument `{argument_name}`.")]
    MissingArgument {
        command_name: CommandName,
        argument_name: &'static str,
    },
    #[error("In command `{command_name}`:\n    Too many arguments, expected at most {expected}.")]
    TooManyArguments {
        command_name: CommandName,
        expected: u8,
    },
    #[error("In command `{command_name}`:\n    Invalid value for `{argument_name}`: `{string}`.")]
    InvalidValue {
        command_name: CommandName,
        argument_name: &'static str,
        string: String,
    },
}

#[rustfmt::skip]
const COMMANDS: CommandNameList = &[
    (CommandName::Help,      &["help", "--help", "h", "-h"]),
    (CommandName::Step,      &["step", "s"]),
    (CommandName::Continue,  &["continue", "cont", "c"]),
    (CommandName::Quit,      &["quit", "q", "exit"]),
    (CommandName::Registers, &["registers", "reg", "r"]),
    (CommandName::Reset,     &["reset"]),
    (CommandName::Dump,      &["dump", "d"]),
    (CommandName::Get,       &["get", "g"]),
    (CommandName::Set,       &["set"]),
];
const BREAK_COMMAND: CandidateList = &["break", "b"];
#[rustfmt::skip]
const BREAK_SUBCOMMANDS: CommandNameList = &[
    (CommandName::BreakList,   &["list", "l"]),
    (CommandName::BreakAdd,    &["add", "a"]),
    (CommandName::BreakRemove, &["remove", "r"]),
];

/// A [`CommandName`] with a list of name candidates.
type CommandNameList<'a> = &'a [(CommandName, CandidateList<'a>)];
/// List of single-word aliases for a command or subcommand.
type CandidateList<'a> = &'a [&'a str];

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Help => "help",
            Self::Step => "step",
            Self::Continue => "continue",
            Self::Quit => "quit",
            Self::Registers => "registers",
            Self::Reset => "reset",
            Self::Dump => "dump",
            Self::Get => "get",
            Self::Set => "set",
            Self::BreakAdd => "break add",
            Self::BreakRemove => "break remove",
            Self::BreakList => "break list",
        };
        f.write_str(name)
    }
}

impl TryFrom<&str> for Command {
    type Error = CommandError;

    /// Assumes line is non-empty.
    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let mut args = Args {
            iter: line.split_whitespace(),
            command_name: CommandName::Help,
        };
        args.command_name = parse_command_name(&mut args)?;
        args.parse_command()
    }
}

/// Returns the first [`CommandName`] with a candidate matching `name` (case insensitive).
fn find_name_match(name: &str, commands: CommandNameList) -> Option<CommandName> {
    commands
        .iter()
        .find(|(_, candidates)| name_matches(name, candidates))
        .map(|(command, _)| *command)
}

fn name_matches(name: &str, candidates: CandidateList) -> bool {
    candidates
        .iter()
        .any(|candidate| name.eq_ignore_ascii_case(candidate))
}

fn parse_command_name(args: &mut Args) -> Result<CommandName, CommandError> {
    let command_name = args.iter.next().unwrap_or("");

    if let Some(command) = find_name_match(command_name, COMMANDS) {
        return Ok(command);
    }

    if name_matches(command_name, BREAK_COMMAND) {
        let Some(subcommand_name) = args.iter.next() else {
            return Err(CommandError::MissingSubcommand);
        };
        return find_name_match(subcommand_name, BREAK_SUBCOMMANDS)
            .ok_or_else(|| CommandError::InvalidSubcommand(subcommand_name.to_string()));
    }

    Err(CommandError::InvalidCommand(command_name.to_string()))
}

/// Whitespace-separated arguments following a command name.
struct Args<'a> {
    iter: std::str::SplitWhitespace<'a>,
    command_name: CommandName,
}

impl<'a> Args<'a> {
    fn parse_command(&mut self) -> Result<Command, CommandError> {
        let mut expected_args = 0;

        let command = match self.command_name {
            // Allow trailing arguments
            CommandName::Help => return Ok(Command::Help),

            CommandName::Continue => Command::Continue,
            CommandName::Quit => Command::Quit,
            CommandName::Registers => Command::Registers,
            CommandName::Reset => Command::Reset,
            CommandName::BreakList => Command::BreakList,

            CommandName::Step => {
                expected_args = 1;
                let count = match self.iter.next() {
                    Some(string) => self.count(string)?,
                    None => 1,
                };
                Command::Step { count }
            }
            CommandName::Dump => {
                expected_args = 2;
                let start = match self.iter.next() {
                    Some(string) => self.address("start", string)?,
                    None => Address::Literal(0x00),
                };
                let end = match self.iter.next() {
                    Some(string) => self.address("end", string)?,
                    None => Address::Literal(0xFF),
                };
                Command::Dump { start, end }
            }
            CommandName::Get => {
                expected_args = 1;
                let location = self.next_location()?;
                Command::Get { location }
            }
            CommandName::Set => {
                expected_args = 2;
                let location = self.next_location()?;
                let string = self.next_required("value")?;
                let value = parser::parse_byte(&string.to_ascii_uppercase())
                    .map_err(|_| self.invalid("value", string))?;
                Command::Set { location, value }
            }
            CommandName::BreakAdd => {
                expected_args = 1;
                let string = self.next_required("address")?;
                Command::BreakAdd {
                    address: self.address("address", string)?,
                }
            }
            CommandName::BreakRemove => {
                expected_args = 1;
                let string = self.next_required("address")?;
                Command::BreakRemove {
                    address: self.address("address", string)?,
                }
            }
        };

        if self.iter.next().is_some() {
            return Err(CommandError::TooManyArguments {
                command_name: self.command_name,
                expected: expected_args,
            });
        }
        Ok(command)
    }

    fn next_required(&mut self, argument_name: &'static str) -> Result<&'a str, CommandError> {
        self.iter.next().ok_or(CommandError::MissingArgument {
            command_name: self.command_name,
            argument_name,
        })
    }

    fn next_location(&mut self) -> Result<Location, CommandError> {
        let string = self.next_required("location")?;
        if let Ok(register) = string.parse::<Register>() {
            return Ok(Location::Register(register));
        }
        if string.eq_ignore_ascii_case("ip") {
            return Ok(Location::InstructionPointer);
        }
        self.address("location", string).map(Location::Memory)
    }

    /// Positive step count. Zero is treated as one.
    fn count(&self, string: &str) -> Result<u32, CommandError> {
        parse_literal(string)
            .ok()
            .and_then(|count| u32::try_from(count).ok())
            .map(|count| count.max(1))
            .ok_or_else(|| self.invalid("count", string))
    }

    fn address(&self, argument_name: &'static str, string: &str) -> Result<Address, CommandError> {
        let upper = string.to_ascii_uppercase();
        if parser::is_label(&upper) {
            return Ok(Address::Label(upper));
        }
        parser::parse_byte(&upper)
            .map(Address::Literal)
            .map_err(|_| self.invalid(argument_name, string))
    }

    fn invalid(&self, argument_name: &'static str, string: &str) -> CommandError {
        CommandError::InvalidValue {
            command_name: self.command_name,
            argument_name,
            string: string.to_string(),
        }
    }
}
