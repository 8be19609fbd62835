//! Processor status: six named flags, plus a bit-exact packing into one
//! word so IRET can restore it from a stack cell.
//!
//! The reference implementation pushes a live reference to its `ps` dict
//! onto the data stack (Python doesn't need a word encoding for this); a
//! fixed-width simulator does, so this module's packed layout is this
//! crate's own choice, grounded on the "PS as a record" design note rather
//! than on any literal original bit layout.

use tinyvm_util::{Bit, BitSet};

use crate::alu::Flags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorStatus {
    pub zero: bool,
    pub negative: bool,
    pub wrapped: bool,
    pub interrupts_enabled: bool,
    pub interrupts_armed: bool,
    pub input_end: bool,
}

impl Default for ProcessorStatus {
    /// PS starts with IA=true and every other flag false, per the reset
    /// invariant in the data model.
    fn default() -> Self {
        ProcessorStatus {
            zero: false,
            negative: false,
            wrapped: false,
            interrupts_enabled: false,
            interrupts_armed: true,
            input_end: false,
        }
    }
}

impl ProcessorStatus {
    /// The PS a handler runs under: W/N/Z don't carry meaning until the
    /// handler's own ALU ops set them, interrupts are re-armed only by the
    /// handler's own discipline (IA=false keeps nested interrupts out),
    /// and E is cleared since handler entry isn't itself an input event.
    pub fn handler_entry() -> Self {
        ProcessorStatus {
            zero: false,
            negative: false,
            wrapped: false,
            interrupts_enabled: true,
            interrupts_armed: false,
            input_end: false,
        }
    }

    /// Copies only Z/N/W from the ALU's last result, per `signal_latch_ps`.
    pub fn latch_alu_flags(&mut self, flags: Flags) {
        self.zero = flags.zero;
        self.negative = flags.negative;
        self.wrapped = flags.wrapped;
    }

    pub fn encode(self) -> u32 {
        0u32.set_bit(0, self.zero)
            .set_bit(1, self.negative)
            .set_bit(2, self.wrapped)
            .set_bit(3, self.interrupts_enabled)
            .set_bit(4, self.interrupts_armed)
            .set_bit(5, self.input_end)
    }

    pub fn decode(word: u32) -> Self {
        ProcessorStatus {
            zero: word.bit(0),
            negative: word.bit(1),
            wrapped: word.bit(2),
            interrupts_enabled: word.bit(3),
            interrupts_armed: word.bit(4),
            input_end: word.bit(5),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reset_state() {
        let ps = ProcessorStatus::default();
        assert!(ps.interrupts_armed);
        assert!(!ps.interrupts_enabled);
        assert!(!ps.input_end);
    }

    #[test]
    fn encode_decode_round_trips() {
        let ps = ProcessorStatus { zero: true, negative: false, wrapped: true, interrupts_enabled: true, interrupts_armed: false, input_end: true };
        assert_eq!(ProcessorStatus::decode(ps.encode()), ps);
    }
}
