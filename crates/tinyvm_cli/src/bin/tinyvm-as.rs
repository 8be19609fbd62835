//! Assembler front end: `tinyvm-as <source> <target>` writes `<target>.o`
//! (the binary object image) and `<target>.txt` (the human disassembly
//! log), mirroring the reference `translator.py`'s `main()`.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use tinyvm_asm::object;
use tinyvm_cli::{io_err, CliError};

#[derive(Parser)]
#[command(name = "tinyvm-as")]
#[command(about = "Two-pass assembler for the tinyvm instruction set")]
struct Args {
    /// Source file in the NASM-like tinyvm assembly syntax.
    source: PathBuf,
    /// Output basename; writes `<target>.o` and `<target>.txt`.
    target: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let source = fs::read_to_string(&args.source).map_err(|e| io_err(&args.source, e))?;

    let assembled = tinyvm_asm::assemble(&source)?;
    info!(
        "assembled {} data words, {} instructions, entry point {:#x}",
        assembled.data.len(),
        assembled.code.len(),
        assembled.entry_point
    );

    let object_path = args.target.with_extension("o");
    let log_path = args.target.with_extension("txt");

    let mut object_file = fs::File::create(&object_path).map_err(|e| io_err(&object_path, e))?;
    object::write(&mut object_file, &assembled.data, &assembled.code, assembled.entry_point)?;

    fs::write(&log_path, &assembled.log).map_err(|e| io_err(&log_path, e))?;

    Ok(())
}
