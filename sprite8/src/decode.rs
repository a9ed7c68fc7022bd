//! Instruction decoding.
//!
//! The top nibble of an instruction word selects its family. Most families
//! contain a single instruction, but families `0`, `8`, `E` and `F` are
//! further identified by their low nibble or low byte.
use std::fmt;

use crate::{bytecode::*, constants::Address};

/// A decoded instruction with its operands extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Op {
    /// 00E0 (CLS)
    ///
    /// Clear the screen.
    ClearScreen,
    /// 00EE (RET)
    ///
    /// Return from the sub-routine.
    Return,
    /// 0nnn (SYS addr)
    ///
    /// Call a machine code routine on the original hardware.
    /// Ignored by modern interpreters.
    Sys { address: Address },
    /// 1nnn (JP addr)
    ///
    /// Jump to the address in `nnn`.
    Jump { address: Address },
    /// 2nnn (CALL addr)
    ///
    /// Call the sub-routine at address `nnn`.
    Call { address: Address },
    /// 3xnn (SE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` equals value `nn`
    Skip_Eq_Byte { vx: u8, nn: u8 },
    /// 4xnn (SNE Vx, byte)
    ///
    /// Skip the next instruction if register `Vx` does not equal value `nn`.
    Skip_NotEq_Byte { vx: u8, nn: u8 },
    /// 5xy0 (SE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` equals register `Vy`.
    Skip_Eq { vx: u8, vy: u8 },
    /// 6xnn (LD Vx, byte)
    Load_Byte { vx: u8, nn: u8 },
    /// 7xnn (ADD Vx, byte)
    ///
    /// Add byte to the value in register `Vx`, store the result in `Vx`.
    /// Carry flag is not set.
    Add_Byte { vx: u8, nn: u8 },

    // ------------------------------------------------------------------------
    // Math
    /// 8xy0 (LD Vx, Vy)
    ///
    /// Store the value of register VY in register VX.
    Load_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy1 (OR Vx, Vy)
    Or_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy2 (AND Vx, Vy)
    And_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy3 (XOR Vx, Vy)
    Xor_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy4 (ADD Vx, Vy)
    ///
    /// ADDs VX to VY, and stores the result in VX.
    /// Overflow is wrapped. If overflowed, set VF to 1, else 0.
    Add_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy5 (SUB Vx, Vy)
    ///
    /// Subtracts VY from VX, and stores the result in VX.
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    Sub_Vx_Vy { vx: u8, vy: u8 },
    /// 8xy6 (SHR Vx)
    ///
    /// VF is set to the least-significant bit of Vx, then Vx is shifted right by 1.
    /// VY is unused.
    ShiftRight { vx: u8, vy: u8 },
    /// 8xy7 (SUBN Vx, Vy)
    ///
    /// Subtracts VX from VY, and stores the result in VX.
    /// VF is set to 0 when there is a borrow, set to 1 when there isn't.
    SubReverse_Vx_Vy { vx: u8, vy: u8 },
    /// 8xyE (SHL Vx)
    ///
    /// VF is set to the most-significant bit of Vx, then Vx is shifted left by 1.
    /// VY is unused.
    ShiftLeft { vx: u8, vy: u8 },

    /// 9xy0 (SNE Vx, Vy)
    ///
    /// Skip the next instruction if register `Vx` does not equal register `Vy`.
    Skip_NotEq { vx: u8, vy: u8 },
    /// Annn (LD I, addr)
    ///
    /// Load address into register `I`.
    Load_Address { address: Address },
    /// Bnnn (JP V0, addr)
    ///
    /// Jump to location nnn + V0.
    Jump_V0 { address: Address },
    /// Cxnn (RND Vx, byte)
    ///
    /// Generate random number, masked by `nn`.
    Random { vx: u8, nn: u8 },
    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw an `n` row sprite to the display buffer.
    Draw { vx: u8, vy: u8, n: u8 },

    // ------------------------------------------------------------------------
    // Keyboard
    /// Ex9E (SKP Vx)
    Skip_Key { vx: u8 },
    /// ExA1 (SKNP Vx)
    Skip_NotKey { vx: u8 },

    // ------------------------------------------------------------------------
    // Timers and memory
    /// Fx07 (LD Vx, DT)
    Load_Vx_Delay { vx: u8 },
    /// Fx0A (LD Vx, K)
    ///
    /// Wait for a key press, store the value of the key in Vx.
    Load_Vx_Key { vx: u8 },
    /// Fx15 (LD DT, Vx)
    Load_Delay_Vx { vx: u8 },
    /// Fx18 (LD ST, Vx)
    Load_Sound_Vx { vx: u8 },
    /// Fx1E (ADD I, Vx)
    Add_Address_Vx { vx: u8 },
    /// Fx29 (LD F, Vx)
    ///
    /// Point `I` at the font glyph for the digit in `Vx`.
    Load_Font { vx: u8 },
    /// Fx33 (LD B, Vx)
    Store_Bcd { vx: u8 },
    /// Fx55 (LD [I], Vx)
    Store_Registers { vx: u8 },
    /// Fx65 (LD Vx, [I])
    Load_Registers { vx: u8 },

    /// Any word that does not encode an instruction.
    ///
    /// Executes as a no-op.
    Unknown(u16),
}

/// Decode an instruction word.
///
/// This is a pure function; undefined encodings resolve to [`Op::Unknown`].
pub fn decode(word: u16) -> Op {
    let vx = op_x(word);
    let vy = op_y(word);
    let n = op_n(word);
    let nn = op_nn(word);
    let nnn = op_nnn(word);

    match op_code(word) {
        // Miscellaneous instructions identified by nnn
        0x0 => match nnn {
            0x0E0 => Op::ClearScreen,
            0x0EE => Op::Return,
            _ => Op::Sys { address: nnn },
        },
        0x1 => Op::Jump { address: nnn },
        0x2 => Op::Call { address: nnn },
        0x3 => Op::Skip_Eq_Byte { vx, nn },
        0x4 => Op::Skip_NotEq_Byte { vx, nn },
        0x5 if n == 0 => Op::Skip_Eq { vx, vy },
        0x6 => Op::Load_Byte { vx, nn },
        0x7 => Op::Add_Byte { vx, nn },
        // Arithmetic instructions identified by n
        0x8 => match n {
            0x0 => Op::Load_Vx_Vy { vx, vy },
            0x1 => Op::Or_Vx_Vy { vx, vy },
            0x2 => Op::And_Vx_Vy { vx, vy },
            0x3 => Op::Xor_Vx_Vy { vx, vy },
            0x4 => Op::Add_Vx_Vy { vx, vy },
            0x5 => Op::Sub_Vx_Vy { vx, vy },
            0x6 => Op::ShiftRight { vx, vy },
            0x7 => Op::SubReverse_Vx_Vy { vx, vy },
            0xE => Op::ShiftLeft { vx, vy },
            _ => Op::Unknown(word),
        },
        0x9 if n == 0 => Op::Skip_NotEq { vx, vy },
        0xA => Op::Load_Address { address: nnn },
        0xB => Op::Jump_V0 { address: nnn },
        0xC => Op::Random { vx, nn },
        0xD => Op::Draw { vx, vy, n },
        // Keyboard instructions identified by nn
        0xE => match nn {
            0x9E => Op::Skip_Key { vx },
            0xA1 => Op::Skip_NotKey { vx },
            _ => Op::Unknown(word),
        },
        // Timer and memory instructions identified by nn
        0xF => match nn {
            0x07 => Op::Load_Vx_Delay { vx },
            0x0A => Op::Load_Vx_Key { vx },
            0x15 => Op::Load_Delay_Vx { vx },
            0x18 => Op::Load_Sound_Vx { vx },
            0x1E => Op::Add_Address_Vx { vx },
            0x29 => Op::Load_Font { vx },
            0x33 => Op::Store_Bcd { vx },
            0x55 => Op::Store_Registers { vx },
            0x65 => Op::Load_Registers { vx },
            _ => Op::Unknown(word),
        },
        _ => Op::Unknown(word),
    }
}

/// Renders the conventional assembly mnemonic.
impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Op::ClearScreen => write!(f, "CLS"),
            Op::Return => write!(f, "RET"),
            Op::Sys { address } => write!(f, "SYS 0x{address:03X}"),
            Op::Jump { address } => write!(f, "JP 0x{address:03X}"),
            Op::Call { address } => write!(f, "CALL 0x{address:03X}"),
            Op::Skip_Eq_Byte { vx, nn } => write!(f, "SE v{vx:X}, {nn}"),
            Op::Skip_NotEq_Byte { vx, nn } => write!(f, "SNE v{vx:X}, {nn}"),
            Op::Skip_Eq { vx, vy } => write!(f, "SE v{vx:X}, v{vy:X}"),
            Op::Load_Byte { vx, nn } => write!(f, "LD v{vx:X}, {nn}"),
            Op::Add_Byte { vx, nn } => write!(f, "ADD v{vx:X}, {nn}"),
            // ------
            Op::Load_Vx_Vy { vx, vy } => write!(f, "LD v{vx:X}, v{vy:X}"),
            Op::Or_Vx_Vy { vx, vy } => write!(f, "OR v{vx:X}, v{vy:X}"),
            Op::And_Vx_Vy { vx, vy } => write!(f, "AND v{vx:X}, v{vy:X}"),
            Op::Xor_Vx_Vy { vx, vy } => write!(f, "XOR v{vx:X}, v{vy:X}"),
            Op::Add_Vx_Vy { vx, vy } => write!(f, "ADD v{vx:X}, v{vy:X}"),
            Op::Sub_Vx_Vy { vx, vy } => write!(f, "SUB v{vx:X}, v{vy:X}"),
            Op::ShiftRight { vx, .. } => write!(f, "SHR v{vx:X}"),
            Op::SubReverse_Vx_Vy { vx, vy } => write!(f, "SUBN v{vx:X}, v{vy:X}"),
            Op::ShiftLeft { vx, .. } => write!(f, "SHL v{vx:X}"),
            // ------
            Op::Skip_NotEq { vx, vy } => write!(f, "SNE v{vx:X}, v{vy:X}"),
            Op::Load_Address { address } => write!(f, "LD I, 0x{address:03X}"),
            Op::Jump_V0 { address } => write!(f, "JP v0, 0x{address:03X}"),
            Op::Random { vx, nn } => write!(f, "RND v{vx:X}, {nn}"),
            Op::Draw { vx, vy, n } => write!(f, "DRW v{vx:X}, v{vy:X}, {n}"),
            // ------
            Op::Skip_Key { vx } => write!(f, "SKP v{vx:X}"),
            Op::Skip_NotKey { vx } => write!(f, "SKNP v{vx:X}"),
            Op::Load_Vx_Delay { vx } => write!(f, "LD v{vx:X}, DT"),
            Op::Load_Vx_Key { vx } => write!(f, "LD v{vx:X}, K"),
            Op::Load_Delay_Vx { vx } => write!(f, "LD DT, v{vx:X}"),
            Op::Load_Sound_Vx { vx } => write!(f, "LD ST, v{vx:X}"),
            Op::Add_Address_Vx { vx } => write!(f, "ADD I, v{vx:X}"),
            Op::Load_Font { vx } => write!(f, "LD F, v{vx:X}"),
            Op::Store_Bcd { vx } => write!(f, "LD B, v{vx:X}"),
            Op::Store_Registers { vx } => write!(f, "LD [I], v{vx:X}"),
            Op::Load_Registers { vx } => write!(f, "LD v{vx:X}, [I]"),
            Op::Unknown(word) => write!(f, "0x{word:04X}"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_single_families() {
        assert_eq!(decode(0x1234), Op::Jump { address: 0x234 });
        assert_eq!(decode(0x2ABC), Op::Call { address: 0xABC });
        assert_eq!(decode(0x3A42), Op::Skip_Eq_Byte { vx: 0xA, nn: 0x42 });
        assert_eq!(decode(0x4A42), Op::Skip_NotEq_Byte { vx: 0xA, nn: 0x42 });
        assert_eq!(decode(0x6F01), Op::Load_Byte { vx: 0xF, nn: 0x01 });
        assert_eq!(decode(0x7001), Op::Add_Byte { vx: 0x0, nn: 0x01 });
        assert_eq!(decode(0xA123), Op::Load_Address { address: 0x123 });
        assert_eq!(decode(0xB300), Op::Jump_V0 { address: 0x300 });
        assert_eq!(decode(0xC1FF), Op::Random { vx: 0x1, nn: 0xFF });
        assert_eq!(decode(0xD125), Op::Draw { vx: 1, vy: 2, n: 5 });
    }

    #[test]
    fn test_decode_system_family() {
        assert_eq!(decode(0x00E0), Op::ClearScreen);
        assert_eq!(decode(0x00EE), Op::Return);
        assert_eq!(decode(0x0000), Op::Sys { address: 0x000 });
        assert_eq!(decode(0x0123), Op::Sys { address: 0x123 });
    }

    #[test]
    fn test_decode_math_family() {
        let expected = [
            (0x8120, Op::Load_Vx_Vy { vx: 1, vy: 2 }),
            (0x8121, Op::Or_Vx_Vy { vx: 1, vy: 2 }),
            (0x8122, Op::And_Vx_Vy { vx: 1, vy: 2 }),
            (0x8123, Op::Xor_Vx_Vy { vx: 1, vy: 2 }),
            (0x8124, Op::Add_Vx_Vy { vx: 1, vy: 2 }),
            (0x8125, Op::Sub_Vx_Vy { vx: 1, vy: 2 }),
            (0x8126, Op::ShiftRight { vx: 1, vy: 2 }),
            (0x8127, Op::SubReverse_Vx_Vy { vx: 1, vy: 2 }),
            (0x812E, Op::ShiftLeft { vx: 1, vy: 2 }),
        ];
        for (word, op) in expected {
            assert_eq!(decode(word), op, "word 0x{word:04X}");
        }

        for n in [0x8, 0x9, 0xA, 0xB, 0xC, 0xD, 0xF] {
            let word = 0x8120 | n;
            assert_eq!(decode(word), Op::Unknown(word));
        }
    }

    #[test]
    fn test_decode_key_and_misc_families() {
        assert_eq!(decode(0xE39E), Op::Skip_Key { vx: 3 });
        assert_eq!(decode(0xE3A1), Op::Skip_NotKey { vx: 3 });
        assert_eq!(decode(0xE300), Op::Unknown(0xE300));

        assert_eq!(decode(0xF507), Op::Load_Vx_Delay { vx: 5 });
        assert_eq!(decode(0xF50A), Op::Load_Vx_Key { vx: 5 });
        assert_eq!(decode(0xF515), Op::Load_Delay_Vx { vx: 5 });
        assert_eq!(decode(0xF518), Op::Load_Sound_Vx { vx: 5 });
        assert_eq!(decode(0xF51E), Op::Add_Address_Vx { vx: 5 });
        assert_eq!(decode(0xF529), Op::Load_Font { vx: 5 });
        assert_eq!(decode(0xF533), Op::Store_Bcd { vx: 5 });
        assert_eq!(decode(0xF555), Op::Store_Registers { vx: 5 });
        assert_eq!(decode(0xF565), Op::Load_Registers { vx: 5 });
        assert_eq!(decode(0xF5FF), Op::Unknown(0xF5FF));
    }

    /// The register comparison families require a zero low nibble.
    #[test]
    fn test_decode_register_skip_requires_zero_nibble() {
        assert_eq!(decode(0x5120), Op::Skip_Eq { vx: 1, vy: 2 });
        assert_eq!(decode(0x5121), Op::Unknown(0x5121));
        assert_eq!(decode(0x9120), Op::Skip_NotEq { vx: 1, vy: 2 });
        assert_eq!(decode(0x912F), Op::Unknown(0x912F));
    }

    #[test]
    fn test_mnemonics() {
        assert_eq!(decode(0x00E0).to_string(), "CLS");
        assert_eq!(decode(0x1234).to_string(), "JP 0x234");
        assert_eq!(decode(0xF10A).to_string(), "LD v1, K");
        assert_eq!(decode(0xDAB3).to_string(), "DRW vA, vB, 3");
        assert_eq!(decode(0x812F).to_string(), "0x812F");
    }
}
