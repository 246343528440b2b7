use std::io::{self, BufRead, IsTerminal, Write};

use crate::dprintln;

/// Where debugger commands are read from.
#[allow(private_interfaces)]
#[derive(Debug)]
pub enum SourceMode {
    Argument(Argument),
    Stdin(Stdin),
    Terminal(Terminal),
}

// Command-line argument
#[derive(Debug)]
struct Argument {
    buffer: String,
    /// Byte index
    cursor: usize,
}

// Stdin which is not attached to a terminal, i.e. piped.
#[derive(Debug)]
struct Stdin {
    stdin: io::Stdin,
    /// Line may contain multiple commands
    buffer: String,
    cursor: usize,
}

// Interactive terminal
#[derive(Debug)]
struct Terminal {
    term: console::Term,
    buffer: String,
    /// Byte index
    cursor: usize,
}

pub trait SourceReader {
    /// `None` indicates EOF
    /// Returned string slice MAY include leading or trailing whitespace
    fn read(&mut self) -> Option<&str>;
}

impl SourceMode {
    pub fn from(argument: Option<String>) -> Self {
        if let Some(argument) = argument {
            return SourceMode::Argument(Argument::from(argument));
        }
        let stdin = io::stdin();
        if stdin.is_terminal() {
            return SourceMode::Terminal(Terminal::new());
        }
        SourceMode::Stdin(Stdin::from(stdin))
    }
}

impl SourceReader for SourceMode {
    fn read(&mut self) -> Option<&str> {
        let command = match self {
            Self::Argument(argument) => argument.read(),
            Self::Stdin(stdin) => stdin.read(),
            Self::Terminal(terminal) => return terminal.read(),
        };
        // Echo command for non-terminal source, since it is not typed by the user
        if let Some(command) = command.map(str::trim).filter(|c| !c.is_empty()) {
            dprintln!(Sometimes, "\x1b[1mCommand:\x1b[0m {}", command);
        }
        command
    }
}

impl Argument {
    fn from(source: String) -> Self {
        Self {
            buffer: source,
            cursor: 0,
        }
    }
}

impl SourceReader for Argument {
    fn read(&mut self) -> Option<&str> {
        // EOF
        if self.cursor >= self.buffer.len() {
            return None;
        }
        Some(next_command(&self.buffer, &mut self.cursor))
    }
}

impl Stdin {
    fn from(stdin: io::Stdin) -> Self {
        Self {
            stdin,
            buffer: String::new(),
            cursor: 0,
        }
    }
}

impl SourceReader for Stdin {
    fn read(&mut self) -> Option<&str> {
        if self.cursor >= self.buffer.len() {
            self.buffer.clear();
            self.cursor = 0;
            // Read errors are treated as EOF
            match self.stdin.lock().read_line(&mut self.buffer) {
                Ok(0) | Err(_) => return None,
                Ok(_) => (),
            }
        }
        Some(next_command(&self.buffer, &mut self.cursor))
    }
}

impl Terminal {
    fn new() -> Self {
        Self {
            term: console::Term::stdout(),
            buffer: String::new(),
            cursor: 0,
        }
    }

    /// Returns `false` on EOF or terminal error.
    fn read_line(&mut self) -> bool {
        loop {
            if write!(self.term, "\x1b[1;34mCommand: \x1b[0m").is_err() {
                return false;
            }
            match self.term.read_line() {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => {
                    self.buffer = line;
                    self.cursor = 0;
                    return true;
                }
                Err(_) => return false,
            }
        }
    }
}

impl SourceReader for Terminal {
    fn read(&mut self) -> Option<&str> {
        // Reached end of line buffer: read new line
        if self.cursor >= self.buffer.len() && !self.read_line() {
            return None;
        }
        Some(next_command(&self.buffer, &mut self.cursor))
    }
}

/// Take characters from `cursor` until the next `;` or newline, advancing past the delimiter.
fn next_command<'a>(buffer: &'a str, cursor: &mut usize) -> &'a str {
    let rest = &buffer[*cursor..];
    match rest.find(['\n', ';']) {
        Some(index) => {
            *cursor += index + 1;
            &rest[..index]
        }
        None => {
            *cursor = buffer.len();
            rest
        }
    }
}
