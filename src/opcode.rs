use std::fmt;

/// How an instruction's second byte is interpreted.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    /// Single byte instruction.
    None,
    /// Literal value byte.
    Immediate,
    /// Memory address byte, may be given as a label.
    Address,
}

/// Static description of a single instruction encoding.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OpcodeInfo {
    /// Normalized mnemonic, including any fixed register operands (eg. `MOV A,B`).
    pub mnemonic: &'static str,
    pub code: u8,
    /// Encoded length in bytes, either 1 or 2.
    pub len: u8,
    pub mode: Mode,
}

impl fmt::Display for OpcodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic)
    }
}

const fn op(mnemonic: &'static str, code: u8, mode: Mode) -> OpcodeInfo {
    let len = match mode {
        Mode::None => 1,
        Mode::Immediate | Mode::Address => 2,
    };
    OpcodeInfo {
        mnemonic,
        code,
        len,
        mode,
    }
}

/// Every instruction understood by the assembler and the emulator.
///
/// This is a binary contract: codes must never be renumbered.
#[rustfmt::skip]
pub const OPCODES: &[OpcodeInfo] = &[
    // Arithmetic
    op("ADD B",   0x02, Mode::None),
    op("ADD C",   0x03, Mode::None),
    op("ADC B",   0x04, Mode::None),
    op("SUB B",   0x05, Mode::None),
    op("SUB C",   0x06, Mode::None),
    op("SUC B",   0x07, Mode::None),
    op("CMP",     0x08, Mode::None),
    op("INR A",   0x09, Mode::None),
    op("INR B",   0x0A, Mode::None),
    op("INR C",   0x0B, Mode::None),
    op("DCR A",   0x0C, Mode::None),
    op("DCR B",   0x0D, Mode::None),
    op("DCR C",   0x0E, Mode::None),
    // Logic
    op("ANA B",   0x0F, Mode::None),
    op("ANA C",   0x10, Mode::None),
    op("TST",     0x11, Mode::None),
    op("ORA B",   0x12, Mode::None),
    op("ORA C",   0x13, Mode::None),
    op("XRA B",   0x14, Mode::None),
    op("XRA C",   0x15, Mode::None),
    op("CMA",     0x16, Mode::None),
    op("ANI",     0x17, Mode::Immediate),
    op("ORI",     0x18, Mode::Immediate),
    op("XRI",     0x19, Mode::Immediate),
    // Register to register
    op("MOV A,B", 0x1A, Mode::None),
    op("MOV A,C", 0x1B, Mode::None),
    op("MOV B,A", 0x1C, Mode::None),
    op("MOV B,C", 0x1D, Mode::None),
    op("MOV C,A", 0x1E, Mode::None),
    op("MOV C,B", 0x1F, Mode::None),
    op("MVI A",   0x20, Mode::Immediate),
    op("MVI B",   0x21, Mode::Immediate),
    op("MVI C",   0x22, Mode::Immediate),
    // Memory access
    op("LDA",     0x23, Mode::Address),
    op("LDB",     0x24, Mode::Address),
    op("LDC",     0x25, Mode::Address),
    op("STA",     0x26, Mode::Address),
    op("LDA C",   0x29, Mode::None),
    op("STA C",   0x2A, Mode::None),
    // Branches
    op("JMP",     0x2B, Mode::Address),
    op("JS",      0x2C, Mode::Address),
    op("JZ",      0x2D, Mode::Address),
    op("JC",      0x2E, Mode::Address),
    op("JV",      0x2F, Mode::Address),
    // Subroutines
    op("CALL",    0x30, Mode::Address),
    op("RET",     0x31, Mode::None),
    // Miscellaneous
    op("NOP",     0x3E, Mode::None),
    op("HLT",     0x3F, Mode::None),
];

/// Exact lookup of a normalized mnemonic.
pub fn lookup(mnemonic: &str) -> Option<&'static OpcodeInfo> {
    OPCODES
        .iter()
        .find(|info| info.mnemonic.eq_ignore_ascii_case(mnemonic))
}

/// Reverse lookup, used for diagnostics and tracing.
pub fn by_code(code: u8) -> Option<&'static OpcodeInfo> {
    OPCODES.iter().find(|info| info.code == code)
}

/// Find the longest mnemonic that starts `code`, returning it with the remaining operand text.
///
/// `code` must already be uppercased and comma-normalized (see [`normalize`]).
/// Some mnemonics are prefixes of others (`LDA` and `LDA C`), so a key only matches when it is
/// followed by whitespace or the end of the line.
pub fn match_mnemonic(code: &str) -> Option<(&'static OpcodeInfo, &str)> {
    OPCODES
        .iter()
        .filter(|info| {
            code.strip_prefix(info.mnemonic)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        })
        .max_by_key(|info| info.mnemonic.len())
        .map(|info| (info, code[info.mnemonic.len()..].trim()))
}

/// Uppercase a line of code and remove whitespace around commas, so that `mov a , b` matches
/// the table key `MOV A,B`.
pub fn normalize(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    for (i, word) in code.trim().to_ascii_uppercase().split(',').enumerate() {
        if i > 0 {
            out.truncate(out.trim_end().len());
            out.push(',');
            out.push_str(word.trim_start());
        } else {
            out.push_str(word);
        }
    }
    out
}
