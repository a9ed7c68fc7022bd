//! Result and errors.
use std::fmt::{self, Display, Formatter};

use crate::constants::Address;

pub type Chip8Result<T> = std::result::Result<T, Chip8Error>;

#[derive(Debug)]
pub enum Chip8Error {
    /// Attempt to load a bytecode program that can't fit in memory.
    InvalidProgramSize { size: usize, capacity: usize },
    /// Subroutine call while the call stack is full.
    ///
    /// `pc` is the address of the offending instruction.
    StackOverflow { pc: Address },
    /// Return from subroutine while the call stack is empty.
    StackUnderflow { pc: Address },
    /// An instruction tried to read or write outside of the 4KB memory space.
    AddressOutOfRange { address: usize },
    Io(std::io::Error),
    Fmt(fmt::Error),
}

impl Display for Chip8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProgramSize { size, capacity } => write!(
                f,
                "program too large for VM memory: {size} bytes, capacity is {capacity} bytes"
            ),
            Self::StackOverflow { pc } => write!(f, "call stack overflow at 0x{pc:03X}"),
            Self::StackUnderflow { pc } => write!(f, "call stack underflow at 0x{pc:03X}"),
            Self::AddressOutOfRange { address } => {
                write!(f, "memory address 0x{address:04X} out of range")
            }
            Self::Io(err) => write!(f, "{}", err),
            Self::Fmt(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Chip8Error {}

impl From<fmt::Error> for Chip8Error {
    fn from(err: fmt::Error) -> Self {
        Chip8Error::Fmt(err)
    }
}

impl From<std::io::Error> for Chip8Error {
    fn from(err: std::io::Error) -> Self {
        Chip8Error::Io(err)
    }
}
