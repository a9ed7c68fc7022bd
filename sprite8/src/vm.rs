//! Virtual machine.
use std::{
    fmt::{self, Write},
    time::{SystemTime, UNIX_EPOCH},
};

use rand::{rngs::StdRng, SeedableRng};

use crate::{
    bytecode,
    constants::*,
    cpu::Chip8Cpu,
    decode::{decode, Op},
    disasm::Disassembler,
    error::{Chip8Error, Chip8Result},
    keypad::KeyCode,
};

pub struct Chip8Vm {
    pub(crate) cpu: Chip8Cpu,
    pub(crate) rng: StdRng,
    /// Image of the currently loaded program, kept for [`Chip8Vm::reset`].
    program: Vec<u8>,
    pub(crate) conf: Chip8Conf,
}

impl Chip8Vm {
    /// Creates a machine with an empty program space.
    pub fn new(conf: Chip8Conf) -> Self {
        let mut vm = Chip8Vm {
            cpu: Chip8Cpu::new(),
            rng: seed_rng(conf.rng_seed),
            program: Vec::new(),
            conf,
        };
        vm.load_builtin_font();
        vm
    }

    /// Creates a machine with the given program image loaded at `MEM_START`.
    pub fn with_program(conf: Chip8Conf, bytecode: &[u8]) -> Chip8Result<Self> {
        let mut vm = Self::new(conf);
        vm.load_bytecode(bytecode)?;
        Ok(vm)
    }

    /// Configuration that was used to instantiate the VM.
    pub fn config(&self) -> &Chip8Conf {
        &self.conf
    }

    fn load_builtin_font(&mut self) {
        let start = FONTSET_START as usize;
        self.cpu.ram[start..start + FONTSET_DATA_LENGTH].copy_from_slice(&FONTSET);
    }

    /// Load a program image, replacing all machine state.
    ///
    /// If the program does not fit in memory the machine is left untouched.
    pub fn load_bytecode(&mut self, bytecode: &[u8]) -> Chip8Result<()> {
        if !check_program_size(bytecode) {
            return Err(Chip8Error::InvalidProgramSize {
                size: bytecode.len(),
                capacity: PROGRAM_CAPACITY,
            });
        }

        self.program = bytecode.to_vec();
        self.reset();

        log::debug!("loaded program of {} bytes", bytecode.len());

        Ok(())
    }

    /// Restart the loaded program from a clean power-on state.
    ///
    /// The random source is seeded again, so with a fixed seed in the
    /// configuration a reset machine replays the exact same run.
    pub fn reset(&mut self) {
        // Start with clean memory to avoid leaking previous program.
        self.cpu.clear();

        // Reset fonts
        self.load_builtin_font();

        // Load program into virtual RAM
        self.cpu.ram[MEM_START..MEM_START + self.program.len()].copy_from_slice(&self.program);

        self.rng = seed_rng(self.conf.rng_seed);
    }

    pub fn display_buffer(&self) -> &[u32; DISPLAY_BUFFER_SIZE] {
        &self.cpu.display
    }

    /// Read-only view of the machine state.
    pub fn cpu(&self) -> &Chip8Cpu {
        &self.cpu
    }

    pub fn delay_timer(&self) -> u8 {
        self.cpu.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.cpu.sound_timer
    }

    /// Sets the keyboard key input state.
    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.cpu.set_key_state(key.as_u8(), pressed);
    }

    /// Direct access to the keypad, for hosts that poll all keys at once.
    pub fn keypad_mut(&mut self) -> &mut [bool; KEY_COUNT as usize] {
        &mut self.cpu.keys
    }

    /// Clear the keyboard input state, setting all keys to up.
    pub fn clear_keys(&mut self) {
        self.cpu.clear_keys()
    }
}

/// Checks that the program fits between `MEM_START` and the end of memory.
#[inline]
pub fn check_program_size(bytecode: &[u8]) -> bool {
    bytecode.len() <= PROGRAM_CAPACITY
}

fn seed_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            // Reproducibility across runs is not a goal, so the wall clock is good enough.
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default();
            StdRng::seed_from_u64(nanos)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Flow {
    Ok,
    /// Program counter has jumped to a new address.
    ///
    /// This is returned when the interpreter encounters:
    ///
    /// - 1nnn (`JP addr`)
    /// - 2nnn (`CALL addr`)
    /// - 00EE (`RET`)
    /// - Bnnn (`JP V0, addr`)
    Jump,
    /// The display buffer changed and should be presented.
    Draw,
    /// The sound timer was set to a non-zero value.
    Sound,
    /// Wait for a keypress.
    ///
    /// This is triggered by the opcode `Fx0A` (`LD Vx, K`), which stops
    /// execution until a key is pressed, and loads the key value into `Vx`.
    KeyWait,
}

/// VM Configuration Parameters.
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Chip8Conf {
    /// Handling of call stack and memory bound violations.
    pub policy: Policy,
    /// Seed for the random number instruction.
    ///
    /// When `None`, the seed is taken from the system clock.
    pub rng_seed: Option<u64>,
}

/// What happens when a program breaks the limits of the machine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Policy {
    /// Stack overflow, stack underflow and out of range memory
    /// access are returned as errors from [`Chip8Vm::tick`].
    #[default]
    Strict,
    /// Calls past the stack limit and returns on an empty stack are ignored.
    /// Memory addresses wrap around the 12-bit address space.
    Compatible,
}

/// Interpreter
impl Chip8Vm {
    /// Advance the machine by exactly one instruction.
    ///
    /// Fetches the word at the program counter, advances the counter,
    /// executes the instruction, and finally counts down the timers.
    pub fn tick(&mut self) -> Chip8Result<Flow> {
        // Each instruction is two bytes, with the opcode identity in the first 4-bit nibble.
        let pc = self.cpu.pc;
        let word = bytecode::word(self.cpu.instr());

        self.cpu.pc = pc.wrapping_add(2);

        let op = decode(word);
        op_trace(pc, word, &op);

        let flow = self.exec(pc, op)?;

        // Count down timers
        self.cpu.tick_delay();
        self.cpu.tick_sound();

        Ok(flow)
    }

    /// Run the given number of ticks, stopping at the first error.
    ///
    /// Returns the control flow of the last executed instruction.
    pub fn run_steps(&mut self, step_count: usize) -> Chip8Result<Flow> {
        let mut flow = Flow::Ok;

        for _ in 0..step_count {
            flow = self.tick()?;
        }

        Ok(flow)
    }
}

/// Troubleshooting
impl Chip8Vm {
    /// Returns the disassembled contents of program memory as a human readable string.
    pub fn dump_ram(&self, count: usize) -> Result<String, fmt::Error> {
        let end = (MEM_START + count).min(MEM_SIZE);
        let mut buf = String::new();

        Disassembler::new(&self.cpu.ram[MEM_START..end]).disassemble(&mut buf)?;

        Ok(buf)
    }

    pub fn dump_display(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                if self.cpu.display[x + y * DISPLAY_WIDTH] == PIXEL_ON {
                    write!(buf, "#")?;
                } else {
                    write!(buf, ".")?;
                }
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }

    pub fn dump_keys(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        if self.cpu.any_key() {
            write!(buf, "keys: ")?;
            for i in 0..KEY_COUNT {
                if self.cpu.key_state(i) {
                    write!(buf, "k{i:x}")?;
                }
            }
        }

        Ok(buf)
    }
}

#[cfg(feature = "op_trace")]
#[inline]
fn op_trace(pc: Address, word: u16, op: &Op) {
    log::trace!("{pc:04X}: {word:04X} {op}");
}

#[cfg(not(feature = "op_trace"))]
#[inline]
fn op_trace(_: Address, _: u16, _: &Op) {}

#[cfg(test)]
mod test {
    use super::*;

    fn seeded() -> Chip8Conf {
        Chip8Conf {
            rng_seed: Some(0xC8),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_machine_state() {
        let vm = Chip8Vm::with_program(seeded(), &[0x12, 0x00]).unwrap();

        assert_eq!(vm.cpu.pc, MEM_START as Address);
        assert_eq!(vm.cpu.sp, 0);
        assert_eq!(vm.cpu.address, 0);
        assert_eq!(vm.cpu.registers, [0; REGISTER_COUNT]);
        assert!(vm.display_buffer().iter().all(|px| *px == PIXEL_OFF));

        let font = FONTSET_START as usize;
        assert_eq!(&vm.cpu.ram[font..font + FONTSET_DATA_LENGTH], &FONTSET[..]);
        assert_eq!(&vm.cpu.ram[MEM_START..MEM_START + 2], &[0x12, 0x00]);
        assert_eq!(vm.cpu.ram[MEM_START + 2], 0);
    }

    #[test]
    fn test_program_size_limit() {
        let largest = vec![0xAA; PROGRAM_CAPACITY];
        let vm = Chip8Vm::with_program(seeded(), &largest).unwrap();
        assert_eq!(vm.cpu.ram[MEM_SIZE - 1], 0xAA);

        let too_large = vec![0xAA; PROGRAM_CAPACITY + 1];
        match Chip8Vm::with_program(seeded(), &too_large) {
            Err(Chip8Error::InvalidProgramSize { size, capacity }) => {
                assert_eq!(size, PROGRAM_CAPACITY + 1);
                assert_eq!(capacity, PROGRAM_CAPACITY);
            }
            _ => panic!("expected invalid program size"),
        }
    }

    /// A failed load must not disturb the running program.
    #[test]
    fn test_failed_load_keeps_state() {
        let mut vm = Chip8Vm::with_program(seeded(), &[0x61, 0x07]).unwrap();
        vm.tick().unwrap();

        assert!(vm.load_bytecode(&vec![0; PROGRAM_CAPACITY + 1]).is_err());
        assert_eq!(vm.cpu.registers[1], 0x07);
        assert_eq!(vm.cpu.pc, MEM_START as Address + 2);
    }

    /// Fx0A (LD Vx, K)
    ///
    /// Wait for a keypress, then store the key value in Vx.
    /// The VM must stall while waiting, and signal the state to the outer executer.
    #[test]
    #[rustfmt::skip]
    fn test_key_wait() {
        let mut vm = Chip8Vm::with_program(seeded(), &[
            0xF1, 0x0A, // LD v1, K
            0x62, 0x42  // LD v2, 0x42  ; sentinal
        ]).unwrap();

        // machine must stall
        for _ in 0..6 {
            assert_eq!(vm.cpu.pc, MEM_START as Address);
            assert_eq!(vm.tick().unwrap(), Flow::KeyWait);
        }
        assert_eq!(vm.cpu.pc, MEM_START as Address);

        // machine has yielded, waiting for any key to be pressed.
        vm.set_key(KeyCode::KeyA, true);

        // machine will now advance
        vm.tick().unwrap();
        assert_eq!(vm.cpu.pc, MEM_START as Address + 2);
        assert_eq!(vm.cpu.registers[1], 0x0A);

        // Ensure the machine is continuing
        vm.tick().unwrap();
        assert_eq!(vm.cpu.pc, MEM_START as Address + 4);
        assert_eq!(vm.cpu.registers[2], 0x42); // sentinal
    }

    /// Timers count down after the instruction executed, so a timer
    /// set this tick is already one lower when the tick returns.
    #[test]
    #[rustfmt::skip]
    fn test_timers_decrement_after_execution() {
        let mut vm = Chip8Vm::with_program(seeded(), &[
            0x60, 0x03, // LD v0, 3
            0xF0, 0x15, // LD DT, v0
            0xF0, 0x18, // LD ST, v0
            0xF1, 0x07, // LD v1, DT
        ]).unwrap();

        vm.tick().unwrap();
        assert_eq!(vm.tick().unwrap(), Flow::Ok);
        assert_eq!(vm.delay_timer(), 2);

        assert_eq!(vm.tick().unwrap(), Flow::Sound);
        assert_eq!(vm.delay_timer(), 1);
        assert_eq!(vm.sound_timer(), 2);

        vm.tick().unwrap();
        assert_eq!(vm.cpu.registers[1], 1);
        assert_eq!(vm.delay_timer(), 0);
        assert_eq!(vm.sound_timer(), 1);
    }

    #[test]
    fn test_reset_replays_program() {
        let mut vm = Chip8Vm::with_program(seeded(), &[0xC0, 0xFF, 0x12, 0x00]).unwrap();
        vm.tick().unwrap();
        let first = vm.cpu.registers[0];

        vm.reset();
        assert_eq!(vm.cpu.registers[0], 0);
        assert_eq!(vm.cpu.pc, MEM_START as Address);

        vm.tick().unwrap();
        assert_eq!(vm.cpu.registers[0], first);
    }

    #[test]
    fn test_run_steps_stops_at_error() {
        // RET on an empty stack
        let mut vm = Chip8Vm::with_program(seeded(), &[0x60, 0x01, 0x00, 0xEE, 0x61, 0x01]).unwrap();
        assert!(matches!(
            vm.run_steps(3),
            Err(Chip8Error::StackUnderflow { pc: 0x202 })
        ));
        assert_eq!(vm.cpu.registers[0], 1);
        assert_eq!(vm.cpu.registers[1], 0);
    }

    #[test]
    fn test_dump_display() {
        let mut vm = Chip8Vm::with_program(seeded(), &[0xD0, 0x01]).unwrap();
        vm.cpu.address = MEM_START as Address + 0x10;
        vm.cpu.ram[MEM_START + 0x10] = 0b1010_0000;
        vm.tick().unwrap();

        let dump = vm.dump_display().unwrap();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), DISPLAY_HEIGHT);
        assert!(lines[0].starts_with("#.#."));
        assert!(lines[1].chars().all(|c| c == '.'));
    }

    #[test]
    fn test_dump_ram() {
        let vm = Chip8Vm::with_program(seeded(), &[0x00, 0xE0, 0x12, 0x00]).unwrap();
        let dump = vm.dump_ram(4).unwrap();
        assert_eq!(dump, "0x0200 00E0 CLS\n0x0202 1200 JP 0x200\n");
    }

    #[test]
    fn test_dump_keys() {
        let mut vm = Chip8Vm::new(seeded());
        assert_eq!(vm.dump_keys().unwrap(), "");

        vm.keypad_mut()[0x3] = true;
        vm.set_key(KeyCode::KeyF, true);
        assert_eq!(vm.dump_keys().unwrap(), "keys: k3kf");

        vm.clear_keys();
        assert_eq!(vm.dump_keys().unwrap(), "");
    }
}
