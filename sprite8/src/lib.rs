//! CHIP-8 virtual machine.
//!
//! The [`Chip8Vm`](prelude::Chip8Vm) owns the whole machine state and is
//! advanced one instruction at a time with `tick()`. Rendering, input polling
//! and pacing are left to the host.
mod bytecode;
pub mod constants;
mod cpu;
mod decode;
mod disasm;
mod error;
mod interp;
mod keypad;
mod vm;

pub use self::{
    decode::{decode, Op},
    error::{Chip8Error, Chip8Result},
    keypad::{InvalidKeyCode, KeyCode},
};

pub mod prelude {
    pub use super::{
        cpu::Chip8Cpu,
        decode::{decode, Op},
        disasm::{Disassembler, Instr},
        error::{Chip8Error, Chip8Result},
        keypad::KeyCode,
        vm::{check_program_size, Chip8Conf, Chip8Vm, Flow, Policy},
    };
}
