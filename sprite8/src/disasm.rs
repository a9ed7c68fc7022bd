//! Disassembler.
use std::fmt::{self, Write as FmtWrite};

use crate::{
    bytecode::word,
    constants::{Address, MEM_SIZE, MEM_START},
    decode::{decode, Op},
};

/// A decoded instruction and where it was found.
pub struct Instr {
    /// Address in memory where the instruction is located.
    pub addr: Address,
    /// The original bytes that were read from the buffer.
    pub bytes: [u8; 2],
    pub op: Op,
}

impl Instr {
    /// Original bytes encoded into a `u16`.
    #[inline(always)]
    pub fn bytecode(&self) -> u16 {
        word(self.bytes)
    }
}

/// Renders a program image as one instruction per line.
///
/// The buffer is assumed to be loaded at `MEM_START`. Data mixed in
/// with code is decoded as if it were instructions.
pub struct Disassembler<'a> {
    bytecode: &'a [u8],
}

impl<'a> Disassembler<'a> {
    pub fn new(bytecode: &'a [u8]) -> Self {
        Self { bytecode }
    }

    /// Iterate over the decoded instructions.
    ///
    /// A trailing odd byte is not an instruction and is skipped.
    pub fn instructions(&self) -> impl Iterator<Item = Instr> + 'a {
        self.bytecode
            .chunks_exact(2)
            .enumerate()
            .map(|(i, pair)| (MEM_START + i * 2, [pair[0], pair[1]]))
            .take_while(|(addr, _)| *addr < MEM_SIZE)
            .map(|(addr, bytes)| Instr {
                addr: addr as Address,
                bytes,
                op: decode(word(bytes)),
            })
    }

    /// Write every instruction to the given writer.
    pub fn disassemble<W: FmtWrite>(&self, w: &mut W) -> fmt::Result {
        for instr in self.instructions() {
            writeln!(w, "0x{:04X} {:04X} {}", instr.addr, instr.bytecode(), instr.op)?;
        }

        Ok(())
    }
}
