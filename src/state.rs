use std::fmt;
use std::str::FromStr;

use crate::error::LoadError;

/// Size of the flat address space, code and data alike.
pub const MEMORY_SIZE: usize = 0x100;

/// `CALL` saves its return address here; `RET` jumps back to it.
///
/// There is only one slot, so a nested `CALL` overwrites the outer return address.
pub const RETURN_SLOT: u8 = 0xFF;

/// General purpose registers.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Register {
    /// Accumulator, destination of most ALU instructions.
    A = 0,
    B,
    /// Also used as an address register by `LDA C` and `STA C`.
    C,
}

impl Register {
    pub const ALL: [Register; 3] = [Register::A, Register::B, Register::C];
}

impl FromStr for Register {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Register::A),
            "B" => Ok(Register::B),
            "C" => Ok(Register::C),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::A => "A",
            Register::B => "B",
            Register::C => "C",
        };
        f.write_str(name)
    }
}

/// Condition flags, set by every ALU instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flag {
    Zero,
    Sign,
    Overflow,
    Carry,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Flags {
    pub zero: bool,
    pub sign: bool,
    pub overflow: bool,
    pub carry: bool,
}

impl Flags {
    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::Zero => self.zero,
            Flag::Sign => self.sign,
            Flag::Overflow => self.overflow,
            Flag::Carry => self.carry,
        }
    }
}

/// Complete machine state during runtime.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CpuState {
    pub(crate) mem: [u8; MEMORY_SIZE],
    /// Instruction pointer. May step one or two past the last address, which ends execution.
    pub(crate) ip: u16,
    pub(crate) reg: [u8; 3],
    pub(crate) flags: Flags,
    pub(crate) halted: bool,
}

impl Default for CpuState {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuState {
    /// Zeroed memory, registers and flags.
    pub fn new() -> Self {
        CpuState {
            mem: [0; MEMORY_SIZE],
            ip: 0,
            reg: [0; 3],
            flags: Flags::default(),
            halted: false,
        }
    }

    /// Fresh state with `program` loaded at address 0.
    pub fn with_program(program: &[u8]) -> Result<Self, LoadError> {
        let mut state = Self::new();
        state.load(program)?;
        Ok(state)
    }

    pub fn load(&mut self, program: &[u8]) -> Result<(), LoadError> {
        self.load_at(0, program)
    }

    /// Copy `program` into memory starting at `start`, leaving the rest untouched.
    pub fn load_at(&mut self, start: usize, program: &[u8]) -> Result<(), LoadError> {
        let end = start + program.len();
        if end > MEMORY_SIZE {
            return Err(LoadError::TooLarge {
                start,
                size: program.len(),
                capacity: MEMORY_SIZE,
            });
        }
        self.mem[start..end].copy_from_slice(program);
        Ok(())
    }

    /// Clear everything, including memory.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn ip(&self) -> u16 {
        self.ip
    }

    pub fn set_ip(&mut self, ip: u8) {
        self.ip = ip as u16;
    }

    pub fn reg(&self, reg: Register) -> u8 {
        self.reg[reg as usize]
    }

    pub fn set_reg(&mut self, reg: Register, value: u8) {
        self.reg[reg as usize] = value;
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn flag(&self, flag: Flag) -> bool {
        self.flags.get(flag)
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Whether the instruction pointer has run off the end of memory.
    pub fn is_exhausted(&self) -> bool {
        self.ip as usize >= MEMORY_SIZE
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.mem
    }

    pub fn mem(&self, addr: u8) -> u8 {
        self.mem[addr as usize]
    }

    /// Direct write, bypassing the engine. Flags are not affected.
    pub fn set_mem(&mut self, addr: u8, value: u8) {
        self.mem[addr as usize] = value;
    }

    /// Byte at the instruction pointer, or `None` past the end of memory.
    pub fn current(&self) -> Option<u8> {
        self.mem.get(self.ip as usize).copied()
    }

    /// Hex dump of `start..end`, 16 bytes per line.
    pub fn memory_dump(&self, start: usize, end: usize) -> String {
        let end = end.min(MEMORY_SIZE);
        let start = start.min(end);
        self.mem[start..end]
            .chunks(16)
            .enumerate()
            .map(|(i, chunk)| {
                let bytes = chunk
                    .iter()
                    .map(|byte| format!("{:02X}", byte))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("{:02X}: {}", start + i * 16, bytes)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for CpuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bit = |set: bool| set as u8;
        writeln!(f, "Instruction pointer: {:02X}", self.ip)?;
        writeln!(
            f,
            "Registers: A: {:02X}  B: {:02X}  C: {:02X}",
            self.reg(Register::A),
            self.reg(Register::B),
            self.reg(Register::C),
        )?;
        writeln!(
            f,
            "Flags:     Z: {}  S: {}  V: {}  C: {}",
            bit(self.flags.zero),
            bit(self.flags.sign),
            bit(self.flags.overflow),
            bit(self.flags.carry),
        )?;
        match self.current() {
            Some(byte) => write!(f, "Memory content at IP ({:02X}): {:02X}", self.ip, byte),
            None => write!(f, "Reached end of memory!"),
        }
    }
}
