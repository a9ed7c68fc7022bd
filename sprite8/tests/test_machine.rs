use sprite8::{constants::*, prelude::*};

fn seeded(seed: u64) -> Chip8Conf {
    Chip8Conf {
        rng_seed: Some(seed),
        ..Default::default()
    }
}

fn machine(program: &[u8]) -> Chip8Vm {
    Chip8Vm::with_program(seeded(1), program).unwrap()
}

#[test]
fn test_jump() {
    let mut vm = machine(&[0x12, 0x34]);
    assert_eq!(vm.tick().unwrap(), Flow::Jump);

    let cpu = vm.cpu();
    assert_eq!(cpu.pc(), 0x234);
    assert_eq!(cpu.sp(), 0);
    assert_eq!(cpu.index(), 0);
    assert_eq!(cpu.registers(), &[0; REGISTER_COUNT]);
    assert!(vm.display_buffer().iter().all(|px| *px == PIXEL_OFF));
}

#[test]
#[rustfmt::skip]
fn test_add_with_carry() {
    let mut vm = machine(&[
        0x60, 0xFF, // LD v0, 0xFF
        0x61, 0x02, // LD v1, 0x02
        0x80, 0x14, // ADD v0, v1
    ]);
    vm.run_steps(3).unwrap();

    assert_eq!(vm.cpu().registers()[0], 0x01);
    assert_eq!(vm.cpu().registers()[0xF], 1);
}

#[test]
#[rustfmt::skip]
fn test_bcd() {
    let mut vm = machine(&[
        0x63, 157,  // LD v3, 157
        0xA3, 0x00, // LD I, 0x300
        0xF3, 0x33, // LD B, v3
    ]);
    vm.run_steps(3).unwrap();

    assert_eq!(&vm.cpu().ram()[0x300..0x303], &[1, 5, 7]);
}

#[test]
#[rustfmt::skip]
fn test_draw_collision() {
    let mut vm = machine(&[
        0xA2, 0x0A, // LD I, 0x20A
        0xD0, 0x01, // DRW v0, v0, 1
        0xD0, 0x01, // DRW v0, v0, 1
        0x12, 0x06, // JP 0x206
        0x00, 0x00,
        0b1111_0000, 0x00,
    ]);

    vm.run_steps(2).unwrap();
    assert_eq!(&vm.display_buffer()[..5], &[PIXEL_ON, PIXEL_ON, PIXEL_ON, PIXEL_ON, PIXEL_OFF]);
    assert_eq!(vm.cpu().registers()[0xF], 0);

    // drawing the same sprite again erases it and reports the collision
    assert_eq!(vm.tick().unwrap(), Flow::Draw);
    assert!(vm.display_buffer().iter().all(|px| *px == PIXEL_OFF));
    assert_eq!(vm.cpu().registers()[0xF], 1);
}

#[test]
#[rustfmt::skip]
fn test_font_sprite() {
    let mut vm = machine(&[
        0x65, 0x08, // LD v5, 8
        0xF5, 0x29, // LD F, v5
        0xD0, 0x05, // DRW v0, v0, 5
    ]);
    vm.run_steps(3).unwrap();

    let dump = vm.dump_display().unwrap();
    let rows: Vec<&str> = dump.lines().take(5).map(|line| &line[..4]).collect();
    assert_eq!(rows, vec!["####", "#..#", "####", "#..#", "####"]);
}

#[test]
#[rustfmt::skip]
fn test_key_wait() {
    let mut vm = machine(&[
        0xF3, 0x0A, // LD v3, K
        0x12, 0x02, // JP 0x202
    ]);

    assert_eq!(vm.tick().unwrap(), Flow::KeyWait);
    assert_eq!(vm.cpu().pc(), 0x200);

    vm.set_key(KeyCode::KeyA, true);
    assert_eq!(vm.tick().unwrap(), Flow::Ok);
    assert_eq!(vm.cpu().registers()[3], 0xA);
    assert_eq!(vm.cpu().pc(), 0x202);
}

/// Program where the instruction at 0x200 + 2i calls 0x200 + 2(i + 1).
fn nested_calls(count: u16) -> Vec<u8> {
    (0..count)
        .flat_map(|i| (0x2000 | (MEM_START as u16 + (i + 1) * 2)).to_be_bytes())
        .collect()
}

#[test]
fn test_sixteen_nested_calls() {
    let mut vm = machine(&nested_calls(16));
    for _ in 0..16 {
        assert_eq!(vm.tick().unwrap(), Flow::Jump);
    }
    assert_eq!(vm.cpu().sp(), STACK_SIZE);
    assert_eq!(vm.cpu().stack().len(), STACK_SIZE);
}

#[test]
fn test_seventeenth_call_overflows() {
    let mut vm = machine(&nested_calls(17));
    vm.run_steps(16).unwrap();

    let err = vm.tick().unwrap_err();
    assert!(matches!(err, Chip8Error::StackOverflow { pc: 0x220 }));
    assert_eq!(err.to_string(), "call stack overflow at 0x220");
}

#[test]
fn test_return_on_empty_stack() {
    let mut vm = machine(&[0x00, 0xEE]);
    assert!(matches!(
        vm.tick(),
        Err(Chip8Error::StackUnderflow { .. })
    ));
}

#[test]
fn test_compatible_policy_keeps_running() {
    let conf = Chip8Conf {
        policy: Policy::Compatible,
        rng_seed: Some(1),
    };
    let mut vm = Chip8Vm::with_program(conf, &[0x00, 0xEE, 0x61, 0x09]).unwrap();
    vm.run_steps(2).unwrap();
    assert_eq!(vm.cpu().registers()[1], 9);
}

#[test]
fn test_program_too_large() {
    let rom = vec![0u8; PROGRAM_CAPACITY + 1];
    assert!(!check_program_size(&rom));
    assert!(matches!(
        Chip8Vm::with_program(Chip8Conf::default(), &rom),
        Err(Chip8Error::InvalidProgramSize { .. })
    ));
}

#[test]
#[rustfmt::skip]
fn test_seeded_runs_are_reproducible() {
    let program = [
        0xC0, 0xFF, // RND v0, 0xFF
        0xC1, 0xFF, // RND v1, 0xFF
        0xA3, 0x00, // LD I, 0x300
        0xF1, 0x55, // LD [I], v1
        0xD0, 0x15, // DRW v0, v1, 5
        0x12, 0x00, // JP 0x200
    ];

    let run = |seed| {
        let mut vm = Chip8Vm::with_program(seeded(seed), &program).unwrap();
        vm.run_steps(60).unwrap();
        (*vm.cpu().registers(), vm.cpu().ram().to_vec(), vm.display_buffer().to_vec())
    };

    assert_eq!(run(7), run(7));
}

#[test]
fn test_pixels_are_all_or_nothing() {
    let mut vm = machine(&[0xA0, 0x50, 0xC0, 0xFF, 0xC1, 0xFF, 0xD0, 0x15, 0x12, 0x02]);
    vm.run_steps(40).unwrap();
    assert!(vm
        .display_buffer()
        .iter()
        .all(|px| *px == PIXEL_ON || *px == PIXEL_OFF));
}
