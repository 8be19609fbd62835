//! Fetch/decode/execute loop: one iteration per machine instruction, bumping
//! the tick counter once per micro-operation and delegating to one of five
//! per-shape executors.
//!
//! Grounded line-for-line on the reference `ControlUnit.decode_and_execute`
//! and its `execute_*` methods — the tick counts per micro-op are copied
//! exactly. One deliberate deviation from the reference, documented in
//! `DESIGN.md`: `check_interruption` runs after *every* completed
//! instruction except `HLT`, matching spec.md §4.3 step 5 verbatim, rather
//! than the reference's narrower skip-after-unconditional-branch behavior.
//! A second deliberate deviation, also in `DESIGN.md`: `INC`/`DEC` write
//! back through `signal_latch_register` because the ALU op computed their
//! result there, but `PUSH`/`POP`/`PRINTI` do not get a blanket post-match
//! re-latch the way the reference's `execute_unary_instruction` applies it
//! unconditionally — that call is a no-op for `PUSH`/`POP` (which already
//! wrote back what they needed) and would otherwise clobber `PRINTI`'s
//! register with a stale ALU result.

use tinyvm_asm::decode::{self, Operand as DecOperand};
use tinyvm_asm::isa::Opcode;

use crate::alu::Op as AluOp;
use crate::datapath::{Datapath, DrSource, InputEvent, Operand};
use crate::error::RuntimeError;

/// Input port the interrupt discipline polls; the only live input port
/// (`in_ports = [1]` in the reference).
const INPUT_PORT: u32 = 1;

pub struct ControlUnit {
    pub ip: u32,
    pub cr: u32,
    pub counter: u64,
    pub tick: u64,
    pub active: bool,
    pub datapath: Datapath,
    code_memory: Vec<u32>,
    pub log: String,
}

fn to_operand(op: DecOperand) -> Operand {
    match op {
        DecOperand::Register(idx) => Operand::Register(idx),
        DecOperand::Immediate(v) => Operand::Immediate(v as i32),
    }
}

impl ControlUnit {
    pub fn new(
        data_memory: Vec<u32>,
        code_memory: Vec<u32>,
        entry_point: u32,
        input_schedule: Vec<InputEvent>,
    ) -> Self {
        ControlUnit {
            ip: entry_point,
            cr: 0,
            counter: 0,
            tick: 0,
            active: false,
            datapath: Datapath::new(data_memory, input_schedule),
            code_memory,
            log: String::new(),
        }
    }

    fn tick(&mut self, n: u64) {
        self.tick += n;
    }

    fn vec_word(&self) -> u32 {
        self.code_memory[0]
    }

    /// Runs to `HLT` (or a fatal error) and returns the concatenated
    /// out-port-0 buffer.
    pub fn run(&mut self) -> Result<String, RuntimeError> {
        self.active = true;
        while self.active {
            self.step()?;
        }
        Ok(self.datapath.out_buffers.get(&0).cloned().unwrap_or_default())
    }

    /// Runs exactly one fetch/decode/execute cycle.
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        self.cr = self.code_memory[self.ip as usize % self.code_memory.len()];
        self.datapath
            .execute_alu(AluOp::IncRight, Operand::Immediate(0), Operand::Immediate(self.ip as i32))
            .expect("inc_right never divides");
        self.ip = self.datapath.alu.result as u32;
        self.tick(1);

        let opcode = decode::opcode(self.cr).ok_or(RuntimeError::BadOpcode(self.cr))?;
        if opcode.is_addressed() {
            self.execute_addressed(opcode)?;
        } else {
            self.execute_non_addressed(opcode)?;
        }

        if self.active {
            if let Some(new_ip) =
                crate::interrupt::check_interruption(&mut self.datapath, INPUT_PORT, self.tick, self.ip, self.vec_word())
            {
                self.ip = new_ip;
            }
        }

        self.counter += 1;
        self.log_state(opcode);
        Ok(())
    }

    fn log_state(&mut self, opcode: Opcode) {
        let ps = self.datapath.ps;
        self.log.push_str(&format!(
            "counter: {:6} | tick: {:6} | IP: {:3} | instruction: {:#010x} | opcode: {:>4} | PS: {{Z:{}, N:{}, W:{}, I:{}, IA:{}, E:{}}}\n",
            self.counter,
            self.tick,
            self.ip,
            self.cr,
            opcode.mnemonic().to_uppercase(),
            ps.zero, ps.negative, ps.wrapped, ps.interrupts_enabled, ps.interrupts_armed, ps.input_end,
        ));
    }

    fn execute_addressed(&mut self, opcode: Opcode) -> Result<(), RuntimeError> {
        let fields = decode::decode_addressed(self.cr);
        let arg1 = fields.arg1_reg;

        if fields.reg_base {
            self.datapath
                .execute_alu(AluOp::SkipLeft, Operand::Register(fields.second as u8), Operand::Immediate(0))
                .expect("skip_left never divides");
        } else {
            self.datapath
                .execute_alu(AluOp::SkipRight, Operand::Immediate(0), Operand::Immediate(fields.second as i32))
                .expect("skip_right never divides");
        }
        self.datapath.latch_ar();
        self.tick(1);

        if fields.indirect {
            self.datapath.latch_dr(DrSource::Memory);
            self.tick(1);
            self.datapath
                .execute_alu(AluOp::SkipRight, Operand::Immediate(0), Operand::Dr)
                .expect("skip_right never divides");
            self.datapath.latch_ar();
            self.tick(1);
        }

        match opcode {
            Opcode::St => {
                self.datapath
                    .execute_alu(AluOp::SkipLeft, Operand::Register(arg1), Operand::Immediate(0))
                    .expect("skip_left never divides");
                self.datapath.latch_dr(DrSource::Alu);
                self.tick(1);
                self.datapath.mem_write();
            }
            Opcode::Ld => {
                self.datapath.mem_read();
                self.tick(1);
                self.datapath
                    .execute_alu(AluOp::SkipRight, Operand::Immediate(0), Operand::Dr)
                    .expect("skip_right never divides");
                self.datapath.latch_register(arg1)?;
            }
            _ => unreachable!("execute_addressed only dispatches LD/ST"),
        }
        self.datapath.latch_ps();
        self.tick(1);
        Ok(())
    }

    fn execute_non_addressed(&mut self, opcode: Opcode) -> Result<(), RuntimeError> {
        let operands = decode::decode_non_addressed(self.cr).map(to_operand);
        match opcode {
            Opcode::Beq | Opcode::Bne | Opcode::Jne | Opcode::Jmp | Opcode::Call => {
                self.execute_branch(opcode, operands[0])
            }
            Opcode::Inc | Opcode::Dec | Opcode::Push | Opcode::Pop | Opcode::Printi => {
                self.execute_unary(opcode, operands[0])
            }
            Opcode::Add | Opcode::Mov | Opcode::Cmp | Opcode::Mod | Opcode::Div => {
                self.execute_binary(opcode, operands)
            }
            Opcode::In | Opcode::Out => self.execute_io(opcode, operands[0], operands[1]),
            Opcode::Hlt | Opcode::Iret | Opcode::Ret | Opcode::Nop | Opcode::Int => {
                self.execute_zero_arg(opcode)
            }
            Opcode::Vec | Opcode::Ld | Opcode::St => {
                return Err(RuntimeError::BadOpcode(self.cr));
            }
        }
    }

    /// `IP <- target` through the ALU's `skip_right`, the way every taken
    /// branch latches it.
    fn jump_to(&mut self, target: Operand) {
        self.datapath
            .execute_alu(AluOp::SkipRight, Operand::Immediate(0), target)
            .expect("skip_right never divides");
        self.ip = self.datapath.alu.result as u32;
        self.tick(1);
    }

    fn execute_branch(&mut self, opcode: Opcode, target: Operand) -> Result<(), RuntimeError> {
        match opcode {
            Opcode::Beq => {
                self.tick(1);
                if self.datapath.ps.zero {
                    self.jump_to(target);
                }
            }
            Opcode::Bne => {
                self.tick(1);
                if !self.datapath.ps.zero {
                    self.jump_to(target);
                }
            }
            Opcode::Jne => {
                if !self.datapath.ps.input_end {
                    self.jump_to(target);
                }
            }
            Opcode::Jmp => self.jump_to(target),
            Opcode::Call => {
                self.datapath.push(self.ip as i32);
                self.tick(1);
                self.jump_to(target);
            }
            _ => unreachable!("execute_branch only dispatches branch opcodes"),
        }
        Ok(())
    }

    fn execute_unary(&mut self, opcode: Opcode, arg: Operand) -> Result<(), RuntimeError> {
        let reg = match arg {
            Operand::Register(idx) => idx,
            Operand::Immediate(_) => {
                // PUSH/POP accept an immediate operand (push a literal,
                // or discard into a scratch pop); only a register arg
                // can be a latch target.
                0
            }
        };
        match opcode {
            Opcode::Inc => {
                self.datapath
                    .execute_alu(AluOp::IncLeft, arg, Operand::Immediate(0))?;
                self.datapath.latch_ps();
                self.tick(1);
                self.datapath.latch_register(reg)?;
                self.tick(1);
            }
            Opcode::Dec => {
                self.datapath
                    .execute_alu(AluOp::DecLeft, arg, Operand::Immediate(0))?;
                self.datapath.latch_ps();
                self.tick(1);
                self.datapath.latch_register(reg)?;
                self.tick(1);
            }
            Opcode::Push => {
                let value = self.datapath.resolve(arg);
                self.datapath.push(value);
                self.tick(1);
            }
            Opcode::Pop => {
                let value = self.datapath.pop();
                if let Operand::Register(idx) = arg {
                    self.datapath.latch_register_raw(idx, value)?;
                }
                self.tick(1);
            }
            Opcode::Printi => {
                if let Operand::Register(idx) = arg {
                    self.datapath.print(idx)?;
                }
                self.tick(10);
            }
            _ => unreachable!("execute_unary only dispatches unary opcodes"),
        }
        Ok(())
    }

    /// `rd`'s register index, for the arms that write a destination register.
    /// `CMP` never reaches this — it only ever reads its two operands, so it
    /// has no destination to resolve and must accept an immediate first
    /// operand (`cmp 5, r0` is a valid program per its `REG_OR_CONST,
    /// REG_OR_CONST` template in `isa.rs`).
    fn binary_dest(&self, rd: Operand) -> Result<u8, RuntimeError> {
        match rd {
            Operand::Register(idx) => Ok(idx),
            Operand::Immediate(_) => Err(RuntimeError::BadOpcode(self.cr)),
        }
    }

    fn execute_binary(&mut self, opcode: Opcode, args: [Operand; 3]) -> Result<(), RuntimeError> {
        let [rd, ra, rb] = args;
        match opcode {
            Opcode::Add => {
                let rd_idx = self.binary_dest(rd)?;
                self.datapath
                    .execute_alu(AluOp::SkipLeft, rb, Operand::Immediate(0))
                    .expect("skip_left never divides");
                self.datapath.latch_dr(DrSource::Alu);
                self.tick(1);
                self.datapath.execute_alu(AluOp::Add, ra, rb)?;
                self.datapath.latch_ps();
                self.datapath.latch_register(rd_idx)?;
                self.tick(1);
            }
            Opcode::Mov => {
                let rd_idx = self.binary_dest(rd)?;
                self.datapath
                    .execute_alu(AluOp::SkipLeft, ra, Operand::Immediate(0))
                    .expect("skip_left never divides");
                self.datapath.latch_register(rd_idx)?;
                self.tick(1);
            }
            Opcode::Cmp => {
                self.datapath.execute_alu(AluOp::Sub, rd, ra)?;
                self.datapath.latch_ps();
                self.tick(1);
            }
            Opcode::Mod => {
                let rd_idx = self.binary_dest(rd)?;
                self.datapath
                    .execute_alu(AluOp::SkipLeft, rb, Operand::Immediate(0))
                    .expect("skip_left never divides");
                self.datapath.latch_dr(DrSource::Alu);
                self.tick(1);
                self.datapath.execute_alu(AluOp::Mod, ra, Operand::Dr)?;
                self.datapath.latch_ps();
                self.datapath.latch_register(rd_idx)?;
                self.tick(1);
            }
            Opcode::Div => {
                let rd_idx = self.binary_dest(rd)?;
                self.datapath
                    .execute_alu(AluOp::SkipLeft, rb, Operand::Immediate(0))
                    .expect("skip_left never divides");
                self.datapath.latch_dr(DrSource::Alu);
                self.tick(1);
                self.datapath.execute_alu(AluOp::Div, ra, Operand::Dr)?;
                self.datapath.latch_ps();
                self.datapath.latch_register(rd_idx)?;
                self.tick(1);
            }
            _ => unreachable!("execute_binary only dispatches binary opcodes"),
        }
        Ok(())
    }

    fn execute_io(&mut self, opcode: Opcode, rd_or_rs: Operand, port: Operand) -> Result<(), RuntimeError> {
        let port = match port {
            Operand::Immediate(v) => v as u32,
            Operand::Register(idx) => self.datapath.resolve(Operand::Register(idx)) as u32,
        };
        match opcode {
            Opcode::In => {
                self.datapath.input(port)?;
                self.tick(1);
                self.datapath
                    .execute_alu(AluOp::SkipRight, Operand::Immediate(0), Operand::Dr)
                    .expect("skip_right never divides");
                if let Operand::Register(idx) = rd_or_rs {
                    self.datapath.latch_register(idx)?;
                }
                self.tick(1);
            }
            Opcode::Out => {
                self.datapath
                    .execute_alu(AluOp::SkipLeft, rd_or_rs, Operand::Immediate(0))
                    .expect("skip_left never divides");
                self.datapath.latch_dr(DrSource::Alu);
                self.tick(1);
                self.datapath.output(port);
                self.tick(1);
            }
            _ => unreachable!("execute_io only dispatches IN/OUT"),
        }
        Ok(())
    }

    fn execute_zero_arg(&mut self, opcode: Opcode) -> Result<(), RuntimeError> {
        match opcode {
            Opcode::Hlt => {
                self.active = false;
                self.tick(1);
            }
            Opcode::Ret => {
                let ip = self.datapath.pop();
                self.ip = ip as u32;
                self.tick(1);
            }
            Opcode::Iret => {
                let ip = self.datapath.pop();
                self.ip = ip as u32;
                self.tick(1);

                let saved_e = self.datapath.ps.input_end;
                let ps_word = self.datapath.pop();
                self.datapath.ps = crate::ps::ProcessorStatus::decode(ps_word as u32);
                self.datapath.ps.input_end = saved_e;
                self.tick(1);

                for idx in (0..tinyvm_asm::isa::NUM_REGISTERS as u8).rev() {
                    let value = self.datapath.pop();
                    self.datapath.latch_register_raw(idx, value)?;
                    self.tick(1);
                }
            }
            Opcode::Nop | Opcode::Int => {}
            _ => unreachable!("execute_zero_arg only dispatches zero-arg opcodes"),
        }
        Ok(())
    }
}
