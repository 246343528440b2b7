use std::cell::RefCell;
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::state::CpuState;

#[macro_export]
macro_rules! dprint {
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        let s = format!(
            $fmt
            $($tt)*
        );
        $crate::output::Output::Debugger($cond).print_str(&s);
    }};
}

#[macro_export]
macro_rules! dprintln {
    ( $cond:expr ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        $crate::output::Output::Debugger($cond).print_str("\n");
    }};
    ( $cond:expr, $fmt:literal $($tt:tt)* ) => {{
        #[allow(unused_imports)]
        use $crate::output::Condition::*;
        let s = format!(
            concat!($fmt, "\n")
            $($tt)*
        );
        $crate::output::Output::Debugger($cond).print_str(&s);
    }};
}

/// Destination of a message.
///
/// Program results go to stdout; debugger and trace messages go to stderr.
#[derive(Clone, Copy, Debug)]
pub enum Output {
    Normal,
    Debugger(Condition),
}

/// Whether a debugger message is shown in `--minimal` mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    Always,
    Sometimes,
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl Output {
    thread_local! {
        static IS_LINE_START: RefCell<bool> = const { RefCell::new(true) };
        static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
        static IS_TRACE: RefCell<bool> = const { RefCell::new(false) };
    }

    pub fn set_minimal(new_value: bool) -> bool {
        Self::IS_MINIMAL.with(|value| value.replace(new_value))
    }
    /// May be called before [`Output::set_minimal`].
    pub fn is_minimal() -> bool {
        Self::IS_MINIMAL.with(|value| *value.borrow())
    }
    pub fn set_trace(new_value: bool) -> bool {
        Self::IS_TRACE.with(|value| value.replace(new_value))
    }
    /// Whether every executed instruction is reported.
    pub fn is_trace() -> bool {
        Self::IS_TRACE.with(|value| *value.borrow())
    }

    fn set_line_start(new_value: bool) -> bool {
        Self::IS_LINE_START.with(|value| value.replace(new_value))
    }
    fn is_line_start() -> bool {
        Self::IS_LINE_START.with(|value| *value.borrow())
    }
    fn set_line_start_from_str(string: &str) {
        if let Some(ch) = Decolored::new(string).last() {
            Output::set_line_start(ch == '\n');
        }
    }

    pub fn print_str(&self, string: &str) {
        match self {
            Self::Normal => {
                print!("{}", string);
                Self::set_line_start_from_str(string);
            }
            Self::Debugger(condition) => match (Self::is_minimal(), *condition) {
                (false, _) => {
                    eprint!("{}", ColoredString::from(string).blue());
                    Self::set_line_start_from_str(string);
                }
                // Always remove color if `--minimal`
                (true, Condition::Always) => {
                    eprint_colorless(string);
                    Self::set_line_start_from_str(string);
                }
                (true, Condition::Sometimes) => (),
            },
        }
    }

    pub fn start_new_line(&self) {
        if !Self::is_line_start() {
            self.print_str("\n");
        }
    }

    pub fn print_registers(&self, state: &CpuState) {
        if Self::is_minimal() {
            self.print_str(&format!("{}\n", state));
            return;
        }
        self.print_str("\x1b[2m────────────────────────────────────────\x1b[0m\n");
        for line in state.to_string().lines() {
            match line.split_once(':') {
                Some((name, rest)) => self.print_str(&format!("\x1b[1m{}\x1b[0m:{}\n", name, rest)),
                None => self.print_str(&format!("{}\n", line)),
            }
        }
        self.print_str("\x1b[2m────────────────────────────────────────\x1b[0m\n");
    }

    /// Byte as hex, unsigned, signed and (if printable) ASCII.
    pub fn print_byte(&self, value: u8) {
        if Self::is_minimal() {
            self.print_str(&format!("0x{:02X}\n", value));
            return;
        }
        let ch = match value {
            0x21..=0x7e => value as char,
            _ => ' ',
        };
        self.print_str(&format!(
            "0x{:02X}  {:4}  {:4}  {}\n",
            value, value, value as i8, ch
        ));
    }
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl<'a> Iterator for Decolored<'a> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}

fn eprint_colorless(string: &str) {
    eprint!("{}", Decolored::new(string).collect::<String>());
}
