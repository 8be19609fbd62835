//! Simulator front end: `tinyvm-sim <object-basename> <input-file>` loads
//! `<object-basename>.o`, runs it to `HLT` against the scheduled input
//! characters, and prints the collected out-port-0 buffer to stdout.
//! Mirrors the reference `machine.py`'s `main()`; the per-tick log is
//! written to `<object-basename>.log` (the reference writes a fixed
//! `log.txt` — kept per-run here so successive simulations don't clobber
//! each other's logs).

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use tinyvm_asm::object;
use tinyvm_cli::{io_err, CliError};
use tinyvm_core::Simulator;

#[derive(Parser)]
#[command(name = "tinyvm-sim")]
#[command(about = "Tick-accurate simulator for the tinyvm instruction set")]
struct Args {
    /// Object file basename (without the `.o` extension).
    object: PathBuf,
    /// Input-schedule file: one `(tick, 'c')` line per scheduled character.
    input: PathBuf,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(&args) {
        Ok(stdout) => {
            print!("{stdout}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            error!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<String, CliError> {
    let object_path = args.object.with_extension("o");
    let object_file = fs::File::open(&object_path).map_err(|e| io_err(&object_path, e))?;
    let image = object::read(object_file)?;

    let schedule = tinyvm_cli::read_schedule(&args.input)?;
    info!("loaded {} scheduled input events", schedule.len());

    let simulator = Simulator::new(image, schedule);
    let output = simulator.run()?;

    let log_path = object_path.with_extension("log");
    fs::write(&log_path, &output.log).map_err(|e| io_err(&log_path, e))?;

    Ok(output.stdout)
}
