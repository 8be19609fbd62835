//! Tick-accurate micro-architectural simulator for the tinyvm instruction
//! set: control unit, datapath, ALU, memory-mapped I/O, and the input-driven
//! interrupt facility.
//!
//! `Simulator` is the `System`-shaped entry point (mirroring the teacher's
//! own top-level `System` struct): it owns the control unit and exposes a
//! single `run()`-to-completion call that returns the collected stdout
//! buffer plus the per-tick execution log.

#[macro_use]
extern crate log;

mod alu;
mod control_unit;
mod datapath;
mod interrupt;
pub mod ps;

pub mod error;

#[cfg(test)]
mod test;

pub use alu::{Alu, Op as AluOp};
pub use control_unit::ControlUnit;
pub use datapath::{Datapath, InputEvent, Operand};
pub use error::RuntimeError;
pub use ps::ProcessorStatus;

use tinyvm_asm::isa::{CODE_SIZE, DATA_SIZE};
use tinyvm_asm::object::Image;

/// Wires a decoded object image and an input schedule into a runnable
/// simulator. Data/code memories are allocated once here and live for the
/// run, per spec.md §3's lifecycle note.
pub struct Simulator {
    pub cu: ControlUnit,
}

pub struct RunOutput {
    pub stdout: String,
    pub log: String,
    /// Datapath state at halt — registers, SP, PS, and both memories.
    /// Exposed (rather than dropped with the rest of the control unit) so
    /// callers that don't route every result through `PRINTI`/`OUT` can
    /// still assert on final register/stack state, per spec.md §8's
    /// boundary behaviors.
    pub datapath: Datapath,
}

impl Simulator {
    pub fn new(image: Image, input_schedule: Vec<InputEvent>) -> Self {
        debug_assert_eq!(image.data.len(), DATA_SIZE);
        debug_assert_eq!(image.code.len(), CODE_SIZE);
        Simulator {
            cu: ControlUnit::new(image.data, image.code, image.entry_point, input_schedule),
        }
    }

    /// Runs to `HLT` (or a fatal error) and returns the collected out-port-0
    /// buffer plus the per-instruction execution log.
    pub fn run(mut self) -> Result<RunOutput, RuntimeError> {
        let stdout = self.cu.run()?;
        info!("halted after {} instructions, {} ticks", self.cu.counter, self.cu.tick);
        Ok(RunOutput { stdout, log: self.cu.log, datapath: self.cu.datapath })
    }
}

/// The implicit sentinel event the simulator appends to the schedule: one
/// NUL a long time (1000 ticks) after the last explicit event, so a program
/// polling `PS.E` via `JNE` always eventually sees input end. Exposed so the
/// CLI can apply it uniformly regardless of how the schedule file parsed.
pub fn with_sentinel(mut events: Vec<InputEvent>) -> Vec<InputEvent> {
    events.sort_by_key(|e| e.tick);
    let last_tick = events.last().map(|e| e.tick).unwrap_or(1);
    events.push(InputEvent { tick: last_tick + 1000, ch: 0 });
    events
}
