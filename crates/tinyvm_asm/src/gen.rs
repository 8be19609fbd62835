//! Stage 3: bit-exact instruction encoding and the human-readable
//! disassembly log.
//!
//! The instruction word is documented bit-numbered MSB-first (bit 0 is the
//! most significant bit of the big-endian word), which is the opposite of
//! `tinyvm_util`'s `Bit`/`BitSet` convention (bit 0 is least significant).
//! Every field position below has already been translated once, here, from
//! the MSB-first description into ordinary (LSB-first) bit ranges:
//!
//! Addressed form (LD/ST):    opcode=24..=31  reg_base=23  indirect=22  first_reg=11..=21  second=0..=10
//! Non-addressed form:        opcode=24..=31  is_reg[0]=23 is_reg[1]=22 is_reg[2]=21  arg1=14..=20  arg2=7..=13  arg3=0..=6

use tinyvm_util::BitSet;

use crate::ir::ResolvedArg;
use crate::isa::Opcode;
use crate::parse::ParsedCommand;

pub struct Encoded {
    pub word: u32,
    pub log_line: String,
}

fn operand_value(arg: ResolvedArg) -> u32 {
    match arg {
        ResolvedArg::Register(idx) => idx as u32,
        ResolvedArg::Value(v) => v,
    }
}

fn encode_addressed(opcode: Opcode, cmd: &ParsedCommand) -> u32 {
    let first = operand_value(cmd.args[0].arg);
    let second_is_reg = matches!(cmd.args[1].arg, ResolvedArg::Register(_));
    let second = operand_value(cmd.args[1].arg);

    0u32
        .set_bit_range(24, 31, opcode as u32)
        .set_bit(23, second_is_reg)
        .set_bit(22, cmd.args[1].indirect)
        .set_bit_range(11, 21, first)
        .set_bit_range(0, 10, second)
}

fn encode_non_addressed(opcode: Opcode, cmd: &ParsedCommand) -> u32 {
    let mut word = 0u32.set_bit_range(24, 31, opcode as u32);
    let ranges = [(23, 14, 20), (22, 7, 13), (21, 0, 6)];
    for (i, (flag_bit, lo, hi)) in ranges.into_iter().enumerate() {
        let (is_reg, value) = match cmd.args.get(i) {
            Some(operand) => (
                matches!(operand.arg, ResolvedArg::Register(_)),
                operand_value(operand.arg),
            ),
            None => (false, 0),
        };
        word = word.set_bit(flag_bit, is_reg).set_bit_range(lo, hi, value);
    }
    word
}

fn log_line(addr: u32, word: u32, opcode: Opcode, cmd: &ParsedCommand) -> String {
    let hex_addr = format!("{:#x}", addr);
    let hex_word = format!("{word:08x}");
    let d: Vec<&str> = cmd.args.iter().map(|a| a.display.as_str()).collect();
    let body = match opcode {
        Opcode::Vec => format!("int_vector: handle_addr = {}", d[0]),
        Opcode::Ld => format!("ld:  {} <- {}", d[0], d[1]),
        Opcode::St => format!("st:  {} -> {}", d[0], d[1]),
        Opcode::Add => format!("add: {} <- {} + {}", d[0], d[1], d[2]),
        Opcode::Mod => format!("mod: {} <- {} % {}", d[0], d[1], d[2]),
        Opcode::Div => format!("div: {} <- {} // {}", d[0], d[1], d[2]),
        Opcode::Inc => format!("inc: {} <- {} + 1", d[0], d[0]),
        Opcode::Dec => format!("dec: {} <- {} - 1", d[0], d[0]),
        Opcode::Beq => format!("beq: if Z ip <- {}", d[0]),
        Opcode::Bne => format!("bne: if !Z ip <- {}", d[0]),
        Opcode::Out => format!("out: {} output {}", d[0], d[1]),
        Opcode::In => format!("in:  {} input {}", d[0], d[1]),
        Opcode::Printi => format!("print int {}", d[0]),
        Opcode::Hlt => "hlt".to_string(),
        Opcode::Mov => format!("mov: {} <- {}", d[0], d[1]),
        Opcode::Cmp => format!("cmp: ps <- {} - {}", d[0], d[1]),
        Opcode::Jmp => format!("jmp: ip <- {}", d[0]),
        Opcode::Jne => format!("je: if !E ip <- {}", d[0]),
        Opcode::Push => format!("push: stack <- {}", d[0]),
        Opcode::Pop => format!("push: {} <- stack", d[0]),
        Opcode::Int => "int".to_string(),
        Opcode::Iret => "iret".to_string(),
        Opcode::Call => format!("call {}", d[0]),
        Opcode::Ret => "ret".to_string(),
        Opcode::Nop => "nop".to_string(),
    };
    format!("{hex_addr:5}   --   {hex_word}   --   {body}")
}

pub fn encode(addr: u32, cmd: &ParsedCommand) -> Encoded {
    let opcode = opcode_of(cmd);
    let word = if opcode == Opcode::Vec {
        operand_value(cmd.args[0].arg)
    } else if opcode.is_addressed() {
        encode_addressed(opcode, cmd)
    } else {
        encode_non_addressed(opcode, cmd)
    };
    Encoded { word, log_line: log_line(addr, word, opcode, cmd) }
}

fn opcode_of(cmd: &ParsedCommand) -> Opcode {
    cmd.opcode
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ir::ResolvedOperand;

    fn reg(idx: u8) -> ResolvedOperand {
        ResolvedOperand { arg: ResolvedArg::Register(idx), indirect: false, display: format!("r{idx}") }
    }

    fn val(v: u32) -> ResolvedOperand {
        ResolvedOperand { arg: ResolvedArg::Value(v), indirect: false, display: v.to_string() }
    }

    #[test]
    fn encode_add_non_addressed() {
        let cmd = ParsedCommand { opcode: Opcode::Add, args: vec![reg(0), reg(1), reg(2)], line: 1 };
        let enc = encode(0, &cmd);
        assert_eq!(enc.word >> 24, Opcode::Add as u32);
        // reg flags for all three args set
        assert_eq!((enc.word >> 21) & 0b111, 0b111);
    }

    #[test]
    fn encode_ld_immediate_address() {
        let cmd = ParsedCommand { opcode: Opcode::Ld, args: vec![reg(0), val(42)], line: 1 };
        let enc = encode(0, &cmd);
        assert_eq!(enc.word >> 24, Opcode::Ld as u32);
        assert_eq!((enc.word >> 23) & 1, 0); // not register-based
        assert_eq!(enc.word & 0x7ff, 42);
    }

    #[test]
    fn encode_st_indirect_register() {
        let mut cmd_arg = reg(1);
        cmd_arg.indirect = true;
        let cmd = ParsedCommand { opcode: Opcode::St, args: vec![reg(0), cmd_arg], line: 1 };
        let enc = encode(0, &cmd);
        assert_eq!((enc.word >> 23) & 1, 1); // register base
        assert_eq!((enc.word >> 22) & 1, 1); // indirect
    }

    #[test]
    fn vec_word_is_raw_address() {
        let cmd = ParsedCommand { opcode: Opcode::Vec, args: vec![val(0x20)], line: 1 };
        let enc = encode(0, &cmd);
        assert_eq!(enc.word, 0x20);
    }
}
