//! The inverse of `gen`'s encoding: pulls opcode and operand fields back out
//! of a fetched 32-bit instruction word. Used by the simulator's control
//! unit, which only ever sees words, never source text.

use tinyvm_util::Bit;

use crate::isa::Opcode;

/// One decoded non-addressed operand: either a general-register index or an
/// immediate value, per that argument's is-register flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Register(u8),
    Immediate(u32),
}

pub struct Addressed {
    pub arg1_reg: u8,
    pub reg_base: bool,
    pub indirect: bool,
    pub second: u32,
}

pub fn opcode(word: u32) -> Option<Opcode> {
    Opcode::from_u8(word.bit_range(24, 31) as u8)
}

pub fn decode_addressed(word: u32) -> Addressed {
    Addressed {
        arg1_reg: word.bit_range(11, 21) as u8,
        reg_base: word.bit(23),
        indirect: word.bit(22),
        second: word.bit_range(0, 10),
    }
}

pub fn decode_non_addressed(word: u32) -> [Operand; 3] {
    let ranges = [(23, 14, 20), (22, 7, 13), (21, 0, 6)];
    ranges.map(|(flag_bit, lo, hi)| {
        let value = word.bit_range(lo, hi);
        if word.bit(flag_bit) {
            Operand::Register(value as u8)
        } else {
            Operand::Immediate(value)
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gen;
    use crate::ir::{ResolvedArg, ResolvedOperand};
    use crate::parse::ParsedCommand;

    #[test]
    fn addressed_round_trips() {
        let cmd = ParsedCommand {
            opcode: Opcode::St,
            args: vec![
                ResolvedOperand { arg: ResolvedArg::Register(2), indirect: false, display: "r2".into() },
                ResolvedOperand { arg: ResolvedArg::Value(100), indirect: false, display: "100".into() },
            ],
            line: 1,
        };
        let word = gen::encode(0, &cmd).word;
        assert_eq!(opcode(word), Some(Opcode::St));
        let fields = decode_addressed(word);
        assert_eq!(fields.arg1_reg, 2);
        assert!(!fields.reg_base);
        assert_eq!(fields.second, 100);
    }

    #[test]
    fn non_addressed_round_trips() {
        let cmd = ParsedCommand {
            opcode: Opcode::Add,
            args: vec![
                ResolvedOperand { arg: ResolvedArg::Register(0), indirect: false, display: "r0".into() },
                ResolvedOperand { arg: ResolvedArg::Register(1), indirect: false, display: "r1".into() },
                ResolvedOperand { arg: ResolvedArg::Register(2), indirect: false, display: "r2".into() },
            ],
            line: 1,
        };
        let word = gen::encode(0, &cmd).word;
        let [a, b, c] = decode_non_addressed(word);
        assert_eq!(a, Operand::Register(0));
        assert_eq!(b, Operand::Register(1));
        assert_eq!(c, Operand::Register(2));
    }
}
