//! End-to-end simulator tests: assemble a source string, run it to `HLT`,
//! and assert on the collected stdout. Mirrors the concrete scenarios in
//! spec.md §8.

use tinyvm_asm::isa::{CODE_SIZE, DATA_SIZE};
use tinyvm_asm::object::Image;

use crate::{with_sentinel, InputEvent, RunOutput, RuntimeError, Simulator};

fn padded(mut data: Vec<u32>, mut code: Vec<u32>, entry_point: u32) -> Image {
    data.resize(DATA_SIZE, 0);
    code.resize(CODE_SIZE, 0);
    Image { data, code, entry_point }
}

fn run_program(source: &str, schedule: Vec<(u64, u8)>) -> Result<RunOutput, RuntimeError> {
    let assembled = tinyvm_asm::assemble(source).unwrap_or_else(|e| panic!("{e}"));
    let events = schedule.into_iter().map(|(tick, ch)| InputEvent { tick, ch }).collect();
    let image = padded(assembled.data, assembled.code, assembled.entry_point);
    Simulator::new(image, with_sentinel(events)).run()
}

#[test]
fn hello() {
    // A data directive's numeric literals always land before its string
    // literals, whatever order they're written in (the assembler's `db`
    // handling processes numbers, then strings, per line) — so the `db 0`
    // sentinel lives on its own line, after the characters it terminates.
    // `r2` walks `msg`'s two characters via register-base addressing,
    // exercising the per-character LD/OUT loop spec.md scenario 1 describes
    // rather than loading just the first byte.
    let src = "\
section .data
msg: db 'hi'
end: db 0
section .text
_start:
mov r2, msg
mov r1, 2
loop:
ld r0, r2
out r0, 0
inc r2
dec r1
bne loop
hlt
";
    let out = run_program(src, vec![]).unwrap();
    assert_eq!(out.stdout, "hi");
}

#[test]
fn arithmetic_wrap_sets_w_and_n() {
    // Non-addressed instructions only carry a 7-bit immediate field, so
    // `i32::MAX` can't be written as a `mov` literal; it has to come in
    // through a full 32-bit data word instead, the way a real program would
    // stage a large constant.
    let src = "\
section .data
maxval: dd 2147483647
section .text
_start:
ld r0, maxval
inc r0
hlt
";
    let out = run_program(src, vec![]).unwrap();
    assert_eq!(out.datapath.registers[0], i32::MIN);
    assert!(out.datapath.ps.wrapped);
    assert!(out.datapath.ps.negative);
    assert!(!out.datapath.ps.zero);
}

#[test]
fn cat_via_interrupt() {
    let src = "\
section .data
section .text
vec handler
_start:
loop:
jne loop
hlt
handler:
in r0, 1
out r0, 0
iret
";
    let out = run_program(src, vec![(5, 'a'), (10, 'b'), (20, '\0')]).unwrap();
    assert_eq!(out.stdout, "ab");
}

#[test]
fn call_ret_accumulates() {
    let src = "\
section .data
section .text
_start:
mov r0, 0
call add_one
call add_one
call add_one
hlt
add_one:
inc r0
ret
";
    let out = run_program(src, vec![]).unwrap();
    assert_eq!(out.datapath.registers[0], 3);
}

#[test]
fn cmp_beq_prints_equal_value() {
    let src = "\
section .data
section .text
_start:
mov r0, 5
mov r1, 5
cmp r0, r1
beq eq_lbl
hlt
eq_lbl:
printi r0
hlt
";
    let out = run_program(src, vec![]).unwrap();
    assert_eq!(out.stdout, "5");
}

#[test]
fn divide_by_zero_is_fatal() {
    let src = "\
section .data
section .text
_start:
mov r0, 0
div r1, r0, r0
hlt
";
    assert!(matches!(run_program(src, vec![]), Err(RuntimeError::Arithmetic(_))));
}

#[test]
fn stack_wrap_push_pop_round_trips() {
    let src = "\
section .data
section .text
_start:
mov r0, 11
push r0
pop r1
hlt
";
    let out = run_program(src, vec![]).unwrap();
    assert_eq!(out.datapath.registers[1], 11);
    assert_eq!(out.datapath.sp, 0);
}

/// `DATA_SIZE + 1` pushes wrap the stack exactly once: the `(DATA_SIZE+1)`th
/// push lands on the same cell the very first push used, overwriting it, per
/// spec.md §8's "push DATA_SIZE+1 items; last push overwrites the first
/// pushed word" boundary behavior. `r1` is loaded from a full-width data word
/// (`DATA_SIZE + 1` doesn't fit a 7-bit immediate) so the loop can compare
/// against it with a register-register `cmp`.
#[test]
fn stack_wrap_last_push_overwrites_first() {
    let src = "\
section .data
limit: dd 2049
section .text
_start:
ld r1, limit
mov r0, 0
loop:
push r0
inc r0
cmp r0, r1
bne loop
pop r2
hlt
";
    let out = run_program(src, vec![]).unwrap();
    // Push #1 (value 0) lands at data[DATA_SIZE-1]; push #(DATA_SIZE+1)
    // (value DATA_SIZE) wraps SP all the way back around to that same cell
    // and overwrites it.
    assert_eq!(out.datapath.data_memory[DATA_SIZE - 1], DATA_SIZE as u32);
    // The trailing `pop` reads that overwritten cell back, not the value
    // originally pushed there.
    assert_eq!(out.datapath.registers[2], DATA_SIZE as i32);
    assert_eq!(out.datapath.sp, 0);
}
