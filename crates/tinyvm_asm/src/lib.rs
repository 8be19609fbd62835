//! Two-pass assembler for the tinyvm instruction set: lexes and classifies
//! source lines, resolves labels and checks operand types, then encodes a
//! bit-exact binary image plus a human-readable disassembly log.

pub mod isa;
pub mod ir;
mod lex;
mod parse;
mod gen;
pub mod decode;
pub mod object;

pub use isa::{Opcode, ArgKind, DATA_SIZE, CODE_SIZE, NUM_REGISTERS};
pub use object::{Image, ObjectError};

use std::fmt;

#[derive(thiserror::Error, Debug)]
pub struct Error {
    pub(crate) line: usize,
    pub(crate) message: String,
}

impl Error {
    pub fn line(&self) -> usize {
        self.line
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "line {}: {}", self.line, self.message)
        }
    }
}

pub struct Assembled {
    pub data: Vec<u32>,
    pub code: Vec<u32>,
    pub entry_point: u32,
    pub log: String,
}

/// Runs all three assembler stages over `source` and returns the encoded
/// image plus the disassembly log the CLI writes to `<target>.txt`.
pub fn assemble(source: &str) -> Result<Assembled, Error> {
    let program = parse::parse(source)?;

    let mut code = Vec::with_capacity(program.code.len());
    let mut log = String::new();
    for (addr, cmd) in program.code.iter().enumerate() {
        let encoded = gen::encode(addr as u32, cmd);
        code.push(encoded.word);
        log.push_str(&encoded.log_line);
        log.push('\n');
    }

    Ok(Assembled { data: program.data, code, entry_point: program.entry_point, log })
}
