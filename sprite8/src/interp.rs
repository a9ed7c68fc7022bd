//! Instruction semantics.
use rand::Rng;

use crate::{
    constants::*,
    decode::Op,
    error::{Chip8Error, Chip8Result},
    vm::{Chip8Vm, Flow, Policy},
};

impl Chip8Vm {
    /// Execute a decoded instruction.
    ///
    /// The program counter has already been advanced past the instruction,
    /// `pc` is the address the instruction was fetched from.
    pub(crate) fn exec(&mut self, pc: Address, op: Op) -> Chip8Result<Flow> {
        let mut control_flow = Flow::Ok;

        match op {
            // 00E0 (CLS)
            //
            // Clear display
            Op::ClearScreen => {
                self.cpu.clear_display();
                control_flow = Flow::Draw;
            }
            // 00EE (RET)
            //
            // Return from a subroutine.
            // Subtract 1 from the stack pointer, then set the program counter
            // to the address at the top of the stack.
            Op::Return => {
                if self.cpu.sp == 0 {
                    return self.violation(Chip8Error::StackUnderflow { pc });
                }

                self.cpu.sp -= 1;
                self.cpu.pc = self.cpu.stack[self.cpu.sp];
                control_flow = Flow::Jump;
            }
            // 0nnn (SYS addr)
            //
            // Machine code routines can't be emulated.
            Op::Sys { address } => {
                log::trace!("ignoring SYS 0x{address:03X} at 0x{pc:03X}");
            }
            // 1nnn (JP addr)
            //
            // Jump to address.
            Op::Jump { address } => {
                self.cpu.pc = address;
                control_flow = Flow::Jump;
            }
            // 2nnn (CALL addr)
            //
            // Call subroutine at NNN.
            // The return address is the instruction after the call.
            Op::Call { address } => {
                if self.cpu.sp >= STACK_SIZE {
                    return self.violation(Chip8Error::StackOverflow { pc });
                }

                self.cpu.stack[self.cpu.sp] = self.cpu.pc;
                self.cpu.sp += 1;
                self.cpu.pc = address;
                control_flow = Flow::Jump;
            }
            // 3xnn (SE Vx, byte)
            //
            // Skip the next instruction if register VX equals value NN.
            Op::Skip_Eq_Byte { vx, nn } => {
                self.skip_if(self.reg(vx) == nn);
            }
            // 4xnn (SNE Vx, byte)
            //
            // Skip the next instruction if register VX does not equal value NN.
            Op::Skip_NotEq_Byte { vx, nn } => {
                self.skip_if(self.reg(vx) != nn);
            }
            // 5xy0 (SE Vx, Vy)
            Op::Skip_Eq { vx, vy } => {
                self.skip_if(self.reg(vx) == self.reg(vy));
            }
            // 6xnn (LD Vx, byte)
            Op::Load_Byte { vx, nn } => {
                self.cpu.registers[vx as usize] = nn;
            }
            // 7xnn (ADD Vx, byte)
            //
            // Add value NN to register VX. Carry flag is not set.
            Op::Add_Byte { vx, nn } => {
                let x = self.reg(vx);
                self.cpu.registers[vx as usize] = x.wrapping_add(nn);
            }
            // ----------------------------------------------------------------
            // 8xy0 (LD Vx, Vy)
            Op::Load_Vx_Vy { vx, vy } => {
                let y = self.reg(vy);
                self.cpu.registers[vx as usize] = y;
            }
            // 8xy1 (OR Vx, Vy)
            Op::Or_Vx_Vy { vx, vy } => {
                let y = self.reg(vy);
                self.cpu.registers[vx as usize] |= y;
            }
            // 8xy2 (AND Vx, Vy)
            Op::And_Vx_Vy { vx, vy } => {
                let y = self.reg(vy);
                self.cpu.registers[vx as usize] &= y;
            }
            // 8xy3 (XOR Vx, Vy)
            Op::Xor_Vx_Vy { vx, vy } => {
                let y = self.reg(vy);
                self.cpu.registers[vx as usize] ^= y;
            }
            // 8xy4 (ADD Vx, Vy)
            //
            // Overflow is wrapped. If overflow, set VF to 1, else 0.
            Op::Add_Vx_Vy { vx, vy } => {
                let (result, carry) = self.reg(vx).overflowing_add(self.reg(vy));
                self.set_with_flag(vx, result, carry);
            }
            // 8xy5 (SUB Vx, Vy)
            //
            // VF is set to 0 when there is a borrow, set to 1 when there isn't.
            Op::Sub_Vx_Vy { vx, vy } => {
                let (x, y) = (self.reg(vx), self.reg(vy));
                self.set_with_flag(vx, x.wrapping_sub(y), x >= y);
            }
            // 8xy6 (SHR Vx)
            //
            // VF receives the bit shifted out.
            Op::ShiftRight { vx, .. } => {
                let x = self.reg(vx);
                self.set_with_flag(vx, x >> 1, x & 0b1 != 0);
            }
            // 8xy7 (SUBN Vx, Vy)
            //
            // Subtracts VX from VY, and stores the result in VX.
            Op::SubReverse_Vx_Vy { vx, vy } => {
                let (x, y) = (self.reg(vx), self.reg(vy));
                self.set_with_flag(vx, y.wrapping_sub(x), y >= x);
            }
            // 8xyE (SHL Vx)
            Op::ShiftLeft { vx, .. } => {
                let x = self.reg(vx);
                self.set_with_flag(vx, x << 1, x & 0b1000_0000 != 0);
            }
            // ----------------------------------------------------------------
            // 9xy0 (SNE Vx, Vy)
            Op::Skip_NotEq { vx, vy } => {
                self.skip_if(self.reg(vx) != self.reg(vy));
            }
            // Annn (LD I, addr)
            //
            // Set address register I to value NNN.
            Op::Load_Address { address } => {
                self.cpu.address = address;
            }
            // Bnnn (JP V0, addr)
            //
            // The target may pass the end of memory; fetch masks it.
            Op::Jump_V0 { address } => {
                self.cpu.pc = address + self.reg(0) as Address;
                control_flow = Flow::Jump;
            }
            // Cxnn (RND Vx, byte)
            //
            // Set register VX to the result of bitwise AND between a random number and NN.
            Op::Random { vx, nn } => {
                self.cpu.registers[vx as usize] = self.rng.gen::<u8>() & nn;
            }
            // Dxyn (DRW Vx, Vy, nibble)
            Op::Draw { vx, vy, n } => {
                self.draw(vx, vy, n)?;
                control_flow = Flow::Draw;
            }
            // ----------------------------------------------------------------
            // Ex9E (SKP Vx)
            Op::Skip_Key { vx } => {
                self.skip_if(self.cpu.key_state(self.reg(vx)));
            }
            // ExA1 (SKNP Vx)
            Op::Skip_NotKey { vx } => {
                self.skip_if(!self.cpu.key_state(self.reg(vx)));
            }
            // ----------------------------------------------------------------
            // Fx07 (LD Vx, DT)
            Op::Load_Vx_Delay { vx } => {
                self.cpu.registers[vx as usize] = self.cpu.delay_timer;
            }
            // Fx0A (LD Vx, K)
            //
            // Wait for a key press, store the value of the key in Vx.
            // Waiting is done by executing this instruction again on the next tick.
            Op::Load_Vx_Key { vx } => {
                if let Some(k) = self.cpu.first_key() {
                    self.cpu.registers[vx as usize] = k;
                } else {
                    // rewind the program counter to stall the machine
                    self.cpu.pc = self.cpu.pc.wrapping_sub(2);
                    control_flow = Flow::KeyWait;
                }
            }
            // Fx15 (LD DT, Vx)
            Op::Load_Delay_Vx { vx } => {
                self.cpu.delay_timer = self.reg(vx);
            }
            // Fx18 (LD ST, Vx)
            Op::Load_Sound_Vx { vx } => {
                self.cpu.sound_timer = self.reg(vx);
                if self.cpu.sound_timer > 0 {
                    control_flow = Flow::Sound;
                }
            }
            // Fx1E (ADD I, Vx)
            //
            // No overflow flag.
            Op::Add_Address_Vx { vx } => {
                self.cpu.address = self.cpu.address.wrapping_add(self.reg(vx) as Address);
            }
            // Fx29 (LD F, Vx)
            //
            // Set I = location of sprite for digit Vx.
            Op::Load_Font { vx } => {
                let x = self.reg(vx) as Address;
                self.cpu.address = FONTSET_START + x * FONTSET_HEIGHT as Address;
            }
            // Fx33 (LD B, Vx)
            //
            // Store the binary-coded decimal representation of Vx
            // in the memory locations I, I+1, and I+2.
            Op::Store_Bcd { vx } => {
                let addr = self.cpu.address as usize;
                self.check_range(addr, 3)?;

                let x = self.reg(vx);
                let digits = [x / 100, x / 10 % 10, x % 10];
                for (i, digit) in digits.into_iter().enumerate() {
                    let d = self.mem_addr(addr + i)?;
                    self.cpu.ram[d] = digit;
                }
            }
            // Fx55 (LD [I], Vx)
            //
            // Store registers V0 through Vx in memory starting at location I.
            Op::Store_Registers { vx } => {
                let addr = self.cpu.address as usize;
                let count = vx as usize + 1;
                self.check_range(addr, count)?;

                for v in 0..count {
                    let d = self.mem_addr(addr + v)?;
                    self.cpu.ram[d] = self.cpu.registers[v];
                }
            }
            // Fx65 (LD Vx, [I])
            //
            // Read registers V0 through Vx from memory starting at location I.
            Op::Load_Registers { vx } => {
                let addr = self.cpu.address as usize;
                let count = vx as usize + 1;
                self.check_range(addr, count)?;

                for v in 0..count {
                    let d = self.mem_addr(addr + v)?;
                    self.cpu.registers[v] = self.cpu.ram[d];
                }
            }
            // ----------------------------------------------------------------
            // Undefined encodings are ignored.
            Op::Unknown(word) => {
                log::trace!("ignoring undefined opcode {word:04X} at 0x{pc:03X}");
            }
        }

        Ok(control_flow)
    }

    /// Dxyn (DRW Vx, Vy, nibble)
    ///
    /// Draw sprite to the display buffer, at coordinate as per registers Vx and Vy.
    /// Sprite is encoded as 8 pixels wide, N pixels high, stored in bits located in
    /// memory pointed to by address register I.
    ///
    /// The starting coordinate wraps around the display, but the sprite itself
    /// is clipped at the right and bottom edges.
    ///
    /// If the drawing operation erases existing pixels in the display buffer, register VF is set to
    /// 1, and set to 0 if no display bits are unset. This is used for collision detection.
    fn draw(&mut self, vx: u8, vy: u8, n: u8) -> Chip8Result<()> {
        let x0 = self.reg(vx) as usize % DISPLAY_WIDTH;
        let y0 = self.reg(vy) as usize % DISPLAY_HEIGHT;
        let addr = self.cpu.address as usize;
        self.check_range(addr, n as usize)?;

        self.cpu.registers[FLAG_REGISTER] = 0;
        let mut is_erased = false;

        for r in 0..n as usize {
            let y = y0 + r;
            if y >= DISPLAY_HEIGHT {
                break;
            }

            // Each row is 8 bits representing the 8 pixels of the sprite.
            let row = self.cpu.ram[self.mem_addr(addr + r)?];

            for c in 0..SPRITE_WIDTH {
                let x = x0 + c;
                if x >= DISPLAY_WIDTH {
                    break;
                }
                if (row >> (7 - c)) & 1 == 0 {
                    continue;
                }

                let d = x + y * DISPLAY_WIDTH;
                let old_px = self.cpu.display[d];

                // XOR erases a pixel when both the old and new values are both 1.
                is_erased |= old_px == PIXEL_ON;

                self.cpu.display[d] = old_px ^ PIXEL_ON;
            }
        }

        // If a pixel was erased, then a collision occurred.
        self.cpu.registers[FLAG_REGISTER] = is_erased as u8;

        Ok(())
    }

    #[inline(always)]
    fn reg(&self, v: u8) -> u8 {
        self.cpu.registers[v as usize]
    }

    /// Skip the next instruction when the condition holds.
    #[inline(always)]
    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.cpu.pc = self.cpu.pc.wrapping_add(2);
        }
    }

    /// Store an arithmetic result, then the flag.
    ///
    /// The flag is written last, so when VF is the destination it holds the flag.
    #[inline(always)]
    fn set_with_flag(&mut self, vx: u8, result: u8, flag: bool) {
        self.cpu.registers[vx as usize] = result;
        self.cpu.registers[FLAG_REGISTER] = flag as u8;
    }

    /// Resolve a memory address according to the configured policy.
    #[inline]
    fn mem_addr(&self, address: usize) -> Chip8Result<usize> {
        if address < MEM_SIZE {
            return Ok(address);
        }

        match self.conf.policy {
            Policy::Strict => Err(Chip8Error::AddressOutOfRange { address }),
            Policy::Compatible => Ok(address & ADDRESS_MASK),
        }
    }

    /// Validate a whole memory range before an instruction touches it,
    /// so a failing instruction leaves no partial writes behind.
    #[inline]
    fn check_range(&self, start: usize, len: usize) -> Chip8Result<()> {
        if len == 0 {
            return Ok(());
        }
        self.mem_addr(start)?;
        self.mem_addr(start + len - 1)?;
        Ok(())
    }

    /// Report a broken machine limit according to the configured policy.
    ///
    /// In compatible mode the offending instruction is skipped.
    fn violation(&self, err: Chip8Error) -> Chip8Result<Flow> {
        match self.conf.policy {
            Policy::Strict => Err(err),
            Policy::Compatible => {
                log::warn!("ignored: {err}");
                Ok(Flow::Ok)
            }
        }
    }
}
