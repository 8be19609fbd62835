//! The instruction set shared between the assembler and the simulator.
//!
//! Opcode numbers are part of the binary ABI (object files produced by one
//! version of this crate must stay readable by another), so they are written
//! out explicitly rather than left to enum-discriminant inference.

use std::fmt;

/// Number of 32-bit words in data memory.
pub const DATA_SIZE: usize = 2048;
/// Number of 32-bit words in code memory.
pub const CODE_SIZE: usize = 128;
/// Number of general registers actually wired into the datapath.
pub const NUM_REGISTERS: usize = 4;
/// Register fields are 11 bits wide, though only `NUM_REGISTERS` are live.
pub const MAX_REGISTER: u8 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Vec = 0,
    Mov = 2,
    Add = 3,
    Inc = 4,
    Dec = 5,
    Beq = 6,
    Bne = 7,
    Jmp = 8,
    Out = 9,
    In = 10,
    Hlt = 11,
    Cmp = 12,
    Push = 13,
    Pop = 14,
    Int = 15,
    Ld = 16,
    Iret = 17,
    Mod = 18,
    Div = 19,
    Printi = 20,
    Call = 21,
    Ret = 22,
    Jne = 23,
    Nop = 24,
    St = 32,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match value {
            0 => Vec,
            2 => Mov,
            3 => Add,
            4 => Inc,
            5 => Dec,
            6 => Beq,
            7 => Bne,
            8 => Jmp,
            9 => Out,
            10 => In,
            11 => Hlt,
            12 => Cmp,
            13 => Push,
            14 => Pop,
            15 => Int,
            16 => Ld,
            17 => Iret,
            18 => Mod,
            19 => Div,
            20 => Printi,
            21 => Call,
            22 => Ret,
            23 => Jne,
            24 => Nop,
            32 => St,
            _ => return None,
        })
    }

    /// Opcodes that use the addressed (LD/ST) word layout.
    pub fn is_addressed(self) -> bool {
        matches!(self, Opcode::Ld | Opcode::St)
    }

    pub fn mnemonic(self) -> &'static str {
        use Opcode::*;
        match self {
            Vec => "vec",
            Mov => "mov",
            Add => "add",
            Inc => "inc",
            Dec => "dec",
            Beq => "beq",
            Bne => "bne",
            Jmp => "jmp",
            Out => "out",
            In => "in",
            Hlt => "hlt",
            Cmp => "cmp",
            Push => "push",
            Pop => "pop",
            Int => "int",
            Ld => "ld",
            Iret => "iret",
            Mod => "mod",
            Div => "div",
            Printi => "printi",
            Call => "call",
            Ret => "ret",
            Jne => "jne",
            Nop => "nop",
            St => "st",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mnemonic().to_uppercase())
    }
}

/// What an operand can mean once the assembler has seen enough context
/// (labels in scope) to judge it. Several of these can apply to the same
/// token at once (e.g. a bare `5` is both a `Constant` and, if small enough,
/// a valid `DataAddress`/`CodeAddress`); stage 2 intersects the token's
/// candidate set against an instruction's declared operand set and errors if
/// that intersection is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    Register,
    Constant,
    CodeAddress,
    DataAddress,
    CodeLabel,
    DataLabel,
}

/// Per-mnemonic argument template: how many operands, and which kinds are
/// accepted in each position. Mirrors the `instructions` table in the
/// reference translator.
pub struct InsnTemplate {
    pub opcode: Opcode,
    pub arg_kinds: &'static [&'static [ArgKind]],
}

pub fn template(mnemonic: &str) -> Option<&'static InsnTemplate> {
    use ArgKind::*;
    use Opcode::*;

    static REG: &[ArgKind] = &[Register];
    static REG_OR_CONST: &[ArgKind] = &[Register, Constant];
    static CODE_ADDR_OR_LABEL: &[ArgKind] = &[CodeAddress, CodeLabel];
    static DATA_ADDR_OR_REG_OR_LABEL: &[ArgKind] = &[DataAddress, DataLabel, Register];
    static CONST: &[ArgKind] = &[Constant];
    static MOV_SRC: &[ArgKind] = &[Register, Constant, DataLabel, CodeLabel];

    macro_rules! t {
        ($op:expr, $($kinds:expr),* $(,)?) => {
            &InsnTemplate { opcode: $op, arg_kinds: &[$($kinds),*] }
        };
    }

    Some(match mnemonic {
        "vec" => t!(Vec, CODE_ADDR_OR_LABEL),
        "ld" => t!(Ld, REG, DATA_ADDR_OR_REG_OR_LABEL),
        "st" => t!(St, REG, DATA_ADDR_OR_REG_OR_LABEL),
        "add" => t!(Add, REG, REG, REG),
        "mod" => t!(Mod, REG, REG_OR_CONST, REG_OR_CONST),
        "div" => t!(Div, REG, REG_OR_CONST, REG_OR_CONST),
        "inc" => t!(Inc, REG),
        "dec" => t!(Dec, REG),
        "beq" => t!(Beq, CODE_ADDR_OR_LABEL),
        "bne" => t!(Bne, CODE_ADDR_OR_LABEL),
        "out" => t!(Out, REG, CONST),
        "in" => t!(In, REG, CONST),
        "printi" => t!(Printi, REG),
        "hlt" => &InsnTemplate { opcode: Hlt, arg_kinds: &[] },
        "mov" => t!(Mov, REG, MOV_SRC),
        "cmp" => t!(Cmp, REG_OR_CONST, REG_OR_CONST),
        "jmp" => t!(Jmp, CODE_ADDR_OR_LABEL),
        "jne" => t!(Jne, CODE_ADDR_OR_LABEL),
        "push" => t!(Push, REG_OR_CONST),
        "pop" => t!(Pop, REG_OR_CONST),
        "int" => &InsnTemplate { opcode: Int, arg_kinds: &[] },
        "iret" => &InsnTemplate { opcode: Iret, arg_kinds: &[] },
        "call" => t!(Call, CODE_ADDR_OR_LABEL),
        "ret" => &InsnTemplate { opcode: Ret, arg_kinds: &[] },
        "nop" => &InsnTemplate { opcode: Nop, arg_kinds: &[] },
        _ => return None,
    })
}

pub fn is_register_name(s: &str) -> Option<u8> {
    let rest = s.strip_prefix('r')?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index: u32 = rest.parse().ok()?;
    if index <= MAX_REGISTER as u32 {
        Some(index as u8)
    } else {
        None
    }
}
