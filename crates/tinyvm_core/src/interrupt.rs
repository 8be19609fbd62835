//! The per-port scheduled input queue and the interrupt-entry sequence the
//! control unit runs after every completed instruction.
//!
//! Grounded on the reference `ControlUnit.renew_input`/`check_interruption`/
//! `interrupt`. `renew_input`'s sliding-window trim is preserved exactly,
//! including its quirk (Open Question #2 in spec.md §9): it keeps the
//! *last* past-due event at the queue head instead of dropping it, so an
//! interrupt fires using that stale event rather than the next pending one.

use tinyvm_asm::isa::NUM_REGISTERS;

use crate::datapath::Datapath;
use crate::ps::ProcessorStatus;

/// Drops every event whose tick is strictly before the most recent "due"
/// event, but keeps that most recent one at the front of the queue — it is
/// still the candidate `check_interruption` inspects next, even though it
/// already fired once, matching `renew_input`'s index-tracking loop.
pub fn renew_input(datapath: &mut Datapath, port: u32, tick: u64) {
    let Some(queue) = datapath.in_buffers.get_mut(&port) else { return };
    let mut keep_from = 0;
    for (i, event) in queue.iter().enumerate() {
        if event.tick > tick {
            break;
        }
        keep_from = i;
    }
    if keep_from > 0 {
        queue.drain(..keep_from);
    }
}

/// True when an interrupt should be raised this instruction boundary:
/// `PS.IA` is set, `PS.E` is clear, and the head of `port`'s queue is due.
pub fn is_due(datapath: &Datapath, port: u32, tick: u64) -> bool {
    if !datapath.ps.interrupts_armed || datapath.ps.input_end {
        return false;
    }
    datapath
        .in_buffers
        .get(&port)
        .and_then(|q| q.first())
        .is_some_and(|event| event.tick <= tick)
}

/// Runs `renew_input` then, if an interrupt is due on `port`, pushes every
/// general register, the PS word, and `current_ip`, installs the handler
/// PS, and returns the new IP (read from `vec_word`, the code word at
/// address 0). Returns `None` when no interrupt fires, leaving the caller's
/// IP untouched.
pub fn check_interruption(
    datapath: &mut Datapath,
    port: u32,
    tick: u64,
    current_ip: u32,
    vec_word: u32,
) -> Option<u32> {
    renew_input(datapath, port, tick);
    if !is_due(datapath, port, tick) {
        return None;
    }
    for idx in 0..NUM_REGISTERS as u8 {
        let value = datapath.resolve(crate::datapath::Operand::Register(idx));
        datapath.push(value);
    }
    datapath.push(datapath.ps.encode() as i32);
    datapath.push(current_ip as i32);
    datapath.ps = ProcessorStatus::handler_entry();
    Some(vec_word)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::datapath::InputEvent;
    use tinyvm_asm::isa::DATA_SIZE;

    fn dp(events: Vec<(u64, u8)>) -> Datapath {
        let events = events.into_iter().map(|(tick, ch)| InputEvent { tick, ch }).collect();
        Datapath::new(vec![0; DATA_SIZE], events)
    }

    #[test]
    fn renew_keeps_latest_due_event_at_head() {
        let mut d = dp(vec![(1, b'a'), (5, b'b'), (20, b'c')]);
        renew_input(&mut d, 1, 10);
        let queue = &d.in_buffers[&1];
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].ch, b'b');
        assert_eq!(queue[1].ch, b'c');
    }

    #[test]
    fn future_event_never_fires() {
        let d = dp(vec![(100, b'a')]);
        assert!(!is_due(&d, 1, 10));
    }

    #[test]
    fn interrupt_pushes_registers_ps_and_ip() {
        let mut d = dp(vec![(0, b'a')]);
        d.registers = [1, 2, 3, 4];
        let sp_before = d.sp;
        let new_ip = check_interruption(&mut d, 1, 0, 0x10, 0x42).unwrap();
        assert_eq!(new_ip, 0x42);
        assert!(!d.ps.interrupts_armed);
        assert_ne!(d.sp, sp_before);
    }

    #[test]
    fn not_armed_means_no_interrupt() {
        let mut d = dp(vec![(0, b'a')]);
        d.ps.interrupts_armed = false;
        assert!(check_interruption(&mut d, 1, 0, 0, 0).is_none());
    }

    #[test]
    fn input_end_suppresses_interrupt() {
        let mut d = dp(vec![(0, b'a')]);
        d.ps.input_end = true;
        assert!(check_interruption(&mut d, 1, 0, 0, 0).is_none());
    }
}
