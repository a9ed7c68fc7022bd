//! Entrypoint for CLI
mod clock;
mod config;
mod error;

use std::{env, error::Error, fs, time::Instant};

use log::{error, info, warn};
use sprite8::prelude::*;

use self::{clock::Clock, config::RunConf, error::AppError};

static USAGE: &str = r#"
usage: sprite8 CMD FILE [CONFIG]

commands:
    run     Run the target ROM file and print the final display
    dis     Disassemble the the target ROM into readable assembly

examples:
    sprite8 run maze.rom
    sprite8 run maze.rom maze.yaml
    sprite8 dis maze.rom

The log level is read from RUST_LOG.
"#;

fn run_bytecode(filepath: &str, config: Option<&str>) -> Result<(), AppError> {
    let conf = match config {
        Some(path) => RunConf::from_file(path)?,
        None => RunConf::default(),
    };

    info!("load rom: {filepath}");
    let bytecode = fs::read(filepath)?;

    let mut vm = Chip8Vm::with_program(conf.machine.clone(), bytecode.as_slice())?;
    for keycode in conf.keys()? {
        vm.set_key(keycode, true);
    }

    let mut clock = Clock::new(conf.clock_frequency);
    let mut result = Ok(());

    let start = Instant::now();
    for _ in 0..conf.steps {
        clock.wait();

        if let Err(err) = vm.tick() {
            error!("halted at 0x{:03X}: {err}", vm.cpu().pc());
            result = Err(err);
            break;
        }
    }
    let end = Instant::now();

    info!(
        "time taken: {}ms",
        end.duration_since(start).as_nanos() as f64 / 1000000.0
    ); // to millis
    println!("{}", vm.dump_display()?);
    println!(
        "delay timer: {}, sound timer: {}",
        vm.delay_timer(),
        vm.sound_timer()
    );

    result?;

    Ok(())
}

fn run_disassembler(filepath: &str) -> Result<(), AppError> {
    info!("disassemble rom: {filepath}");
    let bytecode = fs::read(filepath)?;

    if !check_program_size(&bytecode) {
        warn!("{} bytes will not fit in memory", bytecode.len());
    }

    let mut buf = String::new();
    Disassembler::new(bytecode.as_slice()).disassemble(&mut buf)?;
    print!("{buf}");

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    match parse_args(env::args().skip(1)) {
        Some(Cmd::Run { filepath, config }) => run_bytecode(&filepath, config.as_deref())?,
        Some(Cmd::Dis { filepath }) => run_disassembler(&filepath)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Option<Cmd> {
    let cmd = args.next()?;

    // don't format me T.T
    match cmd.as_str() {
        "run" => Some(Cmd::Run {
            filepath: args.next()?,
            config: args.next(),
        }),
        "dis" => Some(Cmd::Dis {
            filepath: args.next()?,
        }),
        _ => None,
    }
}

fn print_usage() {
    println!("sprite8 v{}", env!("CARGO_PKG_VERSION"));
    println!("{USAGE}");
}

#[derive(Debug, PartialEq, Eq)]
enum Cmd {
    /// Run file
    Run {
        filepath: String,
        config: Option<String>,
    },
    /// Disassemble
    Dis { filepath: String },
}
