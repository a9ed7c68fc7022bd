//! Helpers for extracting fields from instruction words.
//!
//! Every instruction is a big-endian 16-bit word made of four nibbles.
//!
//! ```text
//! 0xF000  op    instruction family
//! 0x0F00  x     register index
//! 0x00F0  y     register index
//! 0x000F  n     4-bit immediate
//! 0x00FF  nn    8-bit immediate
//! 0x0FFF  nnn   12-bit address
//! ```

/// Combine two bytes from memory into an instruction word.
#[inline(always)]
pub fn word(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// Extract the instruction family from the top nibble.
#[inline(always)]
pub fn op_code(word: u16) -> u8 {
    ((word & 0xF000) >> 12) as u8
}

/// Extract operand NNN, a 12-bit address.
#[inline(always)]
pub fn op_nnn(word: u16) -> u16 {
    word & 0x0FFF
}

/// Extract operand NN, the low byte.
#[inline(always)]
pub fn op_nn(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// Extract operand VX.
#[inline(always)]
pub fn op_x(word: u16) -> u8 {
    ((word & 0x0F00) >> 8) as u8
}

/// Extract operand VY.
#[inline(always)]
pub fn op_y(word: u16) -> u8 {
    ((word & 0x00F0) >> 4) as u8
}

/// Extract operand N, the low nibble.
#[inline(always)]
pub fn op_n(word: u16) -> u8 {
    (word & 0x000F) as u8
}
