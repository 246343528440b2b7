use std::fmt;
use std::ops::Range;

use miette::{Diagnostic, LabeledSpan, SourceCode, SourceSpan};
use thiserror::Error;

/// Reason an assembly pass was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AsmErrorKind {
    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),
    #[error("missing operand for `{0}`")]
    MissingOperand(&'static str),
    #[error("`{mnemonic}` takes no operand, found `{operand}`")]
    UnexpectedOperand {
        mnemonic: &'static str,
        operand: String,
    },
    #[error("value {0} does not fit in a byte")]
    OutOfRange(i64),
    #[error("malformed numeric literal `{0}`")]
    BadLiteral(String),
    #[error("label `{0}` cannot be used as a data literal")]
    LabelAsData(String),
    #[error("`{0}` is neither a label nor an address")]
    UnresolvedLabel(String),
    #[error("label `{0}` is declared more than once")]
    DuplicateLabel(String),
    #[error("invalid label name `{0}`")]
    InvalidLabel(String),
    #[error("`{0}` directive requires a value")]
    EmptyDirective(&'static str),
}

impl AsmErrorKind {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownMnemonic(_) => "asm::unknown_mnemonic",
            Self::MissingOperand(_) => "asm::missing_operand",
            Self::UnexpectedOperand { .. } => "asm::unexpected_operand",
            Self::OutOfRange(_) => "asm::out_of_range",
            Self::BadLiteral(_) => "asm::bad_lit",
            Self::LabelAsData(_) => "asm::label_as_data",
            Self::UnresolvedLabel(_) => "asm::unresolved_label",
            Self::DuplicateLabel(_) => "asm::duplicate_label",
            Self::InvalidLabel(_) => "asm::invalid_label",
            Self::EmptyDirective(_) => "asm::empty_directive",
        }
    }

    fn help(&self) -> &'static str {
        match self {
            Self::UnknownMnemonic(_) => "check the opcode table for the list of instructions",
            Self::MissingOperand(_) => "this instruction expects a value or an address to follow",
            Self::UnexpectedOperand { .. } => "remove the operand, registers are part of the mnemonic",
            Self::OutOfRange(_) => "values must be in the range 0 to 255 (0x00 to 0xFF)",
            Self::BadLiteral(_) => "literals are decimal, or prefixed with 0x, 0b or 0o",
            Self::LabelAsData(_) => "labels are only valid as jump, call, load or store targets",
            Self::UnresolvedLabel(_) => "declare the label with `NAME:` somewhere in the file",
            Self::DuplicateLabel(_) => "labels may only be declared once per file",
            Self::InvalidLabel(_) => "labels start with a letter or `_` followed by letters, digits or `_`",
            Self::EmptyDirective(_) => "`ORG` takes an address, `DB` takes one or more bytes",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::UnknownMnemonic(_) => "unknown instruction",
            Self::MissingOperand(_) => "missing operand",
            Self::UnexpectedOperand { .. } => "unexpected operand",
            Self::OutOfRange(_) => "out-of-range value",
            Self::BadLiteral(_) => "incorrect literal",
            Self::LabelAsData(_) => "label used as data",
            Self::UnresolvedLabel(_) => "unresolved reference",
            Self::DuplicateLabel(_) => "duplicate label",
            Self::InvalidLabel(_) => "invalid label",
            Self::EmptyDirective(_) => "empty directive",
        }
    }
}

/// Fatal assembly failure, reported against the offending source line.
#[derive(Debug, Error)]
#[error("line {line}: {kind}")]
pub struct AssemblyError {
    pub kind: AsmErrorKind,
    /// 1-based line number.
    pub line: usize,
    /// The offending line, as written.
    pub text: String,
    span: SourceSpan,
    src: String,
}

impl AssemblyError {
    pub(crate) fn new(kind: AsmErrorKind, line: usize, span: Range<usize>, src: &str) -> Self {
        Self {
            kind,
            line,
            text: src[span.clone()].to_string(),
            span: span.into(),
            src: src.to_string(),
        }
    }
}

impl Diagnostic for AssemblyError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.help()))
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::at(
            self.span,
            self.kind.label(),
        ))))
    }
}

/// Failure to place a program into memory.
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
pub enum LoadError {
    #[error("program of {size} bytes at 0x{start:02X} does not fit in {capacity} bytes of memory")]
    #[diagnostic(
        code(load::too_large),
        help("check `ORG` directives, the last byte must be at address 0xFF or lower")
    )]
    TooLarge {
        start: usize,
        size: usize,
        capacity: usize,
    },
}

/// Fatal runtime failure.
#[derive(Clone, Debug, PartialEq, Eq, Error, Diagnostic)]
pub enum ExecError {
    #[error("invalid opcode 0x{opcode:02X} at address 0x{address:02X}")]
    #[diagnostic(
        code(exec::invalid_opcode),
        help("execution ran into data, or a jump targets the middle of an instruction")
    )]
    InvalidOpcode { opcode: u8, address: u8 },
}
