// Assembling
pub mod opcode;
mod parser;
pub use parser::{parse_byte, parse_literal, AsmParser};
mod air;
pub use air::{Air, AirStmt, Assembly, DbValue, ListingLine, StmtKind};

// Running
mod state;
pub use state::{CpuState, Flag, Flags, Register, MEMORY_SIZE, RETURN_SLOT};
mod runtime;
pub use runtime::{run, run_with_limit, step, Step, Termination};
#[macro_use]
mod output;
pub use output::{Condition, Output};
mod debugger;
pub use debugger::{Debugger, DebuggerOptions};

mod error;
pub use error::{AsmErrorKind, AssemblyError, ExecError, LoadError};

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;

/// Assemble `src` into a memory image, a listing and a symbol table.
///
/// Runs both passes: the first binds labels, the second emits bytes.
pub fn assemble(src: &str) -> Result<Assembly, AssemblyError> {
    AsmParser::new(src).parse()?.emit()
}
