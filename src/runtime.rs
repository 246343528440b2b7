use crate::dprintln;
use crate::error::ExecError;
use crate::opcode;
use crate::output::Output;
use crate::state::{CpuState, Flag, Flags, Register, RETURN_SLOT};

/// Result of executing a single instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    Continuing,
    Halted,
    /// The instruction pointer ran past the last address.
    AddressExhausted,
}

/// Why [`run`] stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Termination {
    Halted,
    AddressExhausted,
    /// Only returned by [`run_with_limit`].
    StepLimit,
}

/// Execute until `HLT` or until the instruction pointer leaves memory.
pub fn run(state: &mut CpuState) -> Result<Termination, ExecError> {
    loop {
        match step(state)? {
            Step::Continuing => (),
            Step::Halted => return Ok(Termination::Halted),
            Step::AddressExhausted => return Ok(Termination::AddressExhausted),
        }
    }
}

/// Like [`run`], but give up after `max_steps` instructions.
pub fn run_with_limit(state: &mut CpuState, max_steps: u64) -> Result<Termination, ExecError> {
    for _ in 0..max_steps {
        match step(state)? {
            Step::Continuing => (),
            Step::Halted => return Ok(Termination::Halted),
            Step::AddressExhausted => return Ok(Termination::AddressExhausted),
        }
    }
    Ok(Termination::StepLimit)
}

/// Execute exactly one fetch-decode-execute cycle.
///
/// A halted or exhausted machine is left untouched.
pub fn step(state: &mut CpuState) -> Result<Step, ExecError> {
    if state.halted {
        return Ok(Step::Halted);
    }
    if state.is_exhausted() {
        return Ok(Step::AddressExhausted);
    }

    let address = state.ip as u8;
    let opcode = state.fetch();
    if Output::is_trace() {
        let name = opcode::by_code(opcode).map_or("???", |info| info.mnemonic);
        dprintln!(Always, "{:02X}: {}", address, name);
    }
    if !state.execute(opcode) {
        return Err(ExecError::InvalidOpcode { opcode, address });
    }

    Ok(if state.halted {
        Step::Halted
    } else if state.is_exhausted() {
        Step::AddressExhausted
    } else {
        Step::Continuing
    })
}

impl CpuState {
    /// Read the byte at the instruction pointer and advance past it.
    ///
    /// Operand reads wrap within the 8-bit address space; the pointer itself does not, so a
    /// read at the last address still ends execution on the next check.
    fn fetch(&mut self) -> u8 {
        let byte = self.mem[(self.ip & 0xFF) as usize];
        self.ip += 1;
        byte
    }

    /// Dispatch a single opcode. Returns `false` if no instruction has this code.
    ///
    /// Memory operands are 8-bit, so no access can fall outside memory.
    fn execute(&mut self, opcode: u8) -> bool {
        use Register::*;

        match opcode {
            // Arithmetic
            0x02 => self.add(B, 0),
            0x03 => self.add(C, 0),
            // Carry-in is always set, the carry flag is not consulted
            0x04 => self.add(B, 1),
            0x05 => self.sub(B, 1),
            0x06 => self.sub(C, 1),
            // Always borrows
            0x07 => self.sub(B, 0),
            0x08 => {
                self.alu_add(self.reg(A), !self.reg(B), 1);
            }
            0x09 => self.inr(A),
            0x0A => self.inr(B),
            0x0B => self.inr(C),
            0x0C => self.dcr(A),
            0x0D => self.dcr(B),
            0x0E => self.dcr(C),

            // Logic
            0x0F => self.logic(self.reg(B), |x, y| x & y),
            0x10 => self.logic(self.reg(C), |x, y| x & y),
            0x11 => {
                let (a, b) = (self.reg(A), self.reg(B));
                self.set_flags((a & b) as u16, a, b);
            }
            0x12 => self.logic(self.reg(B), |x, y| x | y),
            0x13 => self.logic(self.reg(C), |x, y| x | y),
            0x14 => self.logic(self.reg(B), |x, y| x ^ y),
            0x15 => self.logic(self.reg(C), |x, y| x ^ y),
            0x16 => {
                let a = self.reg(A);
                let res = self.set_flags(!a as u16, a, 0);
                self.set_reg(A, res);
            }
            0x17 => {
                let imm = self.fetch();
                self.logic(imm, |x, y| x & y);
            }
            0x18 => {
                let imm = self.fetch();
                self.logic(imm, |x, y| x | y);
            }
            0x19 => {
                let imm = self.fetch();
                self.logic(imm, |x, y| x ^ y);
            }

            // Register to register, flags untouched from here on
            0x1A => self.mov(A, B),
            0x1B => self.mov(A, C),
            0x1C => self.mov(B, A),
            0x1D => self.mov(B, C),
            0x1E => self.mov(C, A),
            0x1F => self.mov(C, B),
            0x20 => self.mvi(A),
            0x21 => self.mvi(B),
            0x22 => self.mvi(C),

            // Memory access
            0x23 => self.load_direct(A),
            0x24 => self.load_direct(B),
            0x25 => self.load_direct(C),
            0x26 => {
                let addr = self.fetch();
                self.set_mem(addr, self.reg(A));
            }
            0x29 => {
                let addr = self.reg(C);
                self.set_reg(A, self.mem(addr));
            }
            0x2A => {
                let addr = self.reg(C);
                self.set_mem(addr, self.reg(A));
            }

            // Branches
            0x2B => {
                self.ip = self.fetch() as u16;
            }
            0x2C => self.jump_if(Flag::Sign),
            0x2D => self.jump_if(Flag::Zero),
            0x2E => self.jump_if(Flag::Carry),
            0x2F => self.jump_if(Flag::Overflow),

            // Subroutines
            0x30 => {
                let target = self.fetch();
                // Return address is the byte after the operand
                self.set_mem(RETURN_SLOT, self.ip as u8);
                self.ip = target as u16;
            }
            0x31 => {
                self.ip = self.mem(RETURN_SLOT) as u16;
            }

            0x3E => (),
            0x3F => {
                self.halted = true;
            }

            _ => return false,
        }
        true
    }

    /// Add with a widened sum and set all four flags from the effective operands.
    fn alu_add(&mut self, op1: u8, op2: u8, carry_in: u8) -> u8 {
        let total = op1 as u16 + op2 as u16 + carry_in as u16;
        self.set_flags(total, op1, op2)
    }

    /// Truncate `total` to a byte, updating flags. Returns the truncated result.
    fn set_flags(&mut self, total: u16, op1: u8, op2: u8) -> u8 {
        let res = total as u8;
        let sign = |val: u8| val & 0x80 != 0;
        self.flags = Flags {
            zero: res == 0,
            sign: sign(res),
            carry: total > 0xFF,
            overflow: sign(op1) == sign(op2) && sign(res) != sign(op1),
        };
        res
    }

    fn add(&mut self, src: Register, carry_in: u8) {
        let res = self.alu_add(self.reg(Register::A), self.reg(src), carry_in);
        self.set_reg(Register::A, res);
    }

    /// Subtraction adds the one's complement, plus one unless borrowing.
    fn sub(&mut self, src: Register, carry_in: u8) {
        let res = self.alu_add(self.reg(Register::A), !self.reg(src), carry_in);
        self.set_reg(Register::A, res);
    }

    fn inr(&mut self, reg: Register) {
        let res = self.alu_add(self.reg(reg), 1, 0);
        self.set_reg(reg, res);
    }

    fn dcr(&mut self, reg: Register) {
        let res = self.alu_add(self.reg(reg), !1, 1);
        self.set_reg(reg, res);
    }

    /// Bitwise operation between `A` and `op2`, result in `A`.
    fn logic(&mut self, op2: u8, op: fn(u8, u8) -> u8) {
        let a = self.reg(Register::A);
        let res = self.set_flags(op(a, op2) as u16, a, op2);
        self.set_reg(Register::A, res);
    }

    fn mov(&mut self, dest: Register, src: Register) {
        self.set_reg(dest, self.reg(src));
    }

    fn mvi(&mut self, dest: Register) {
        let imm = self.fetch();
        self.set_reg(dest, imm);
    }

    fn load_direct(&mut self, dest: Register) {
        let addr = self.fetch();
        self.set_reg(dest, self.mem(addr));
    }

    /// Jump to the operand if `flag` is set, otherwise skip over it.
    fn jump_if(&mut self, flag: Flag) {
        if self.flag(flag) {
            self.ip = self.fetch() as u16;
        } else {
            self.ip += 1;
        }
    }
}
