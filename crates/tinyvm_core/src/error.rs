//! The two fatal-error categories that can occur once a program is already
//! running (translator errors live in `tinyvm_asm::Error` instead). Both
//! abort the run immediately — there is no partial-recovery policy, per
//! spec.md §7.

use thiserror::Error;

use crate::alu::DivideByZero;

#[derive(Debug, Error)]
pub enum DatapathError {
    #[error("register r{0} is not wired into the datapath (only r0..r{1} are live)")]
    UnknownRegister(u8, u8),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Datapath(#[from] DatapathError),
    #[error(transparent)]
    Arithmetic(#[from] DivideByZero),
    #[error("input port {0} has no pending scheduled event")]
    StarvedInputPort(u32),
    #[error("code address {0:#x} does not decode to a known opcode")]
    BadOpcode(u32),
}
