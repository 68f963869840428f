use super::constants::*;
use super::error::VmError;
use super::instr::{BinaryOp, Instruction, NullaryOp, UnaryOp};
use super::io::{InputQueue, OutputSink};
use super::memory::{checked_index, Bank};
use super::Word;

pub enum TickResult {
    Running,
    Halted,
    ReturnedToTopLevel,
}

/// Owns the entire machine state and implements the fetch-dispatch loop.
/// This is the only thing in the crate that mutates VM state; everything
/// above it (`Vm`) is a thin, public-facing shell.
pub struct Core {
    pc: Word,
    top: Word,
    bp: Word,
    data: Bank,
    stack: Bank,
    instructions: Vec<Instruction>,
    input: InputQueue,
    output: OutputSink,
}

impl Core {
    pub fn new(instructions: Vec<Instruction>, initial_data: &[Word], input: InputQueue) -> Core {
        Core {
            pc: 0,
            top: 0,
            bp: 0,
            data: Bank::with_initial(initial_data),
            stack: Bank::new(),
            instructions,
            input,
            output: OutputSink::new(),
        }
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    pub fn into_output(self) -> OutputSink {
        self.output
    }

    pub fn pc(&self) -> Word {
        self.pc
    }

    pub fn top(&self) -> Word {
        self.top
    }

    pub fn bp(&self) -> Word {
        self.bp
    }

    /// Executes one fetch-dispatch cycle. Every opcode that does not
    /// explicitly set `pc` causes it to advance by one afterwards.
    pub fn tick(&mut self) -> Result<TickResult, VmError> {
        let pc = self.pc;
        let instr = *self
            .instructions
            .get(pc_index(pc)?)
            .ok_or(VmError::IllegalInstruction { pc })?;

        log::trace!(
            "pc={pc:>5} top={top:>5} bp={bp:>5}  {instr}",
            top = self.top,
            bp = self.bp
        );

        let mut jumped = false;

        let result = match instr {
            Instruction::Nullary(op) => self.exec_nullary(op, pc, &mut jumped)?,
            Instruction::Unary(op, a) => self.exec_unary(op, a, pc, &mut jumped)?,
            Instruction::Binary(op, a, b) => self.exec_binary(op, a, b, pc, &mut jumped)?,
        };

        if !jumped {
            self.pc = self.pc.wrapping_add(1);
        }

        Ok(result)
    }

    fn exec_nullary(
        &mut self,
        op: NullaryOp,
        pc: Word,
        jumped: &mut bool,
    ) -> Result<TickResult, VmError> {
        match op {
            NullaryOp::Halt => return Ok(TickResult::Halted),
            NullaryOp::Nop => {}
            NullaryOp::Dup => {
                let v = self.peek(0, pc)?;
                self.push(v, pc)?;
            }
            NullaryOp::Add => self.binop(pc, |b, a| b.wrapping_add(a))?,
            NullaryOp::Sub => self.binop(pc, |b, a| b.wrapping_sub(a))?,
            NullaryOp::Mul => self.binop(pc, |b, a| b.wrapping_mul(a))?,
            NullaryOp::Div => {
                let a = self.peek(0, pc)?;
                if a == 0 {
                    return Err(VmError::DivideByZero { pc });
                }
                self.binop(pc, |b, a| floor_div(b, a))?;
            }
            NullaryOp::Equ => self.relop(pc, |b, a| b == a)?,
            NullaryOp::NEqu => self.relop(pc, |b, a| b != a)?,
            NullaryOp::Lss => self.relop(pc, |b, a| b < a)?,
            NullaryOp::LssEq => self.relop(pc, |b, a| b <= a)?,
            NullaryOp::Gtr => self.relop(pc, |b, a| b > a)?,
            NullaryOp::GtrEq => self.relop(pc, |b, a| b >= a)?,
            // Bitwise complement, not arithmetic negation.
            NullaryOp::Neg => {
                let v = self.peek(0, pc)?;
                let idx = self.top_minus(1, pc)?;
                self.set_stack(idx, !v, pc)?;
            }
            NullaryOp::Ret => {
                if self.top == 0 {
                    return Ok(TickResult::ReturnedToTopLevel);
                }
                let ra = self.pop(pc)?;
                self.pc = ra;
                *jumped = true;
            }
            NullaryOp::Read => {
                let v = self.input.pop().ok_or(VmError::InputExhausted { pc })?;
                self.push(v, pc)?;
            }
            NullaryOp::Write => {
                let v = self.pop(pc)?;
                self.output.push_str(&v.to_string());
            }
            NullaryOp::WriteS => {
                let ptr = self.pop(pc)?;
                self.write_string(ptr, pc)?;
            }
            NullaryOp::Print => {
                self.output.flush_line();
                self.top = self.top.wrapping_sub(1);
            }
            NullaryOp::Leave => {
                let old_bp = self.bp;
                let dl_addr = checked_index(old_bp.wrapping_add(FRAME_DYNAMIC_LINK as Word), pc)?;
                let new_bp = self.stack.get(dl_addr).ok_or(VmError::MemoryFault { pc })?;
                self.top = old_bp.wrapping_add(1);
                self.bp = new_bp;
            }
        }

        Ok(TickResult::Running)
    }

    fn exec_unary(
        &mut self,
        op: UnaryOp,
        a: Word,
        pc: Word,
        jumped: &mut bool,
    ) -> Result<TickResult, VmError> {
        match op {
            UnaryOp::Const => self.push(a, pc)?,
            UnaryOp::Jmp => {
                self.pc = a;
                *jumped = true;
            }
            UnaryOp::FJmp => {
                let v = self.pop(pc)?;
                if v == 0 {
                    self.pc = a;
                } else {
                    self.pc = self.pc.wrapping_add(1);
                }
                *jumped = true;
            }
            UnaryOp::LoadG => {
                let v = self.read_ctrl(a, pc)?;
                self.push(v, pc)?;
            }
            UnaryOp::StoG => {
                let v = self.pop(pc)?;
                if a == CTRL_PC {
                    self.pc = v;
                    *jumped = true;
                } else {
                    self.write_ctrl(a, v, pc)?;
                }
            }
            UnaryOp::Enter => self.enter(a, pc)?,
        }
        Ok(TickResult::Running)
    }

    fn exec_binary(
        &mut self,
        op: BinaryOp,
        a: Word,
        b: Word,
        pc: Word,
        jumped: &mut bool,
    ) -> Result<TickResult, VmError> {
        match op {
            BinaryOp::Load => {
                let base = self.follow_chain(a, self.bp, pc)?;
                let addr = checked_index(base.wrapping_add(FRAME_LOCALS as Word).wrapping_add(b), pc)?;
                let v = self.stack.get(addr).ok_or(VmError::MemoryFault { pc })?;
                self.push(v, pc)?;
            }
            BinaryOp::Sto => {
                let base = self.follow_chain(a, self.bp, pc)?;
                let addr = checked_index(base.wrapping_add(FRAME_LOCALS as Word).wrapping_add(b), pc)?;
                let v = self.pop(pc)?;
                self.stack.set(addr, v).ok_or(VmError::MemoryFault { pc })?;
            }
            BinaryOp::Call => {
                let ret_addr = self.top_index(pc)?;
                let lld_addr = self.top_plus_index(1, pc)?;
                self.stack
                    .set(ret_addr, pc.wrapping_add(1))
                    .ok_or(VmError::MemoryFault { pc })?;
                self.stack.set(lld_addr, a).ok_or(VmError::MemoryFault { pc })?;
                self.top = self.top.wrapping_add(2);
                self.pc = b;
                *jumped = true;
            }
            BinaryOp::LoadArr => self.load_arr(a, b, pc)?,
            BinaryOp::StoArr => self.sto_arr(a, b, pc)?,
        }
        Ok(TickResult::Running)
    }

    // ----- stack helpers -----

    fn top_index(&self, pc: Word) -> Result<usize, VmError> {
        checked_index(self.top, pc)
    }

    fn top_plus_index(&self, offset: Word, pc: Word) -> Result<usize, VmError> {
        checked_index(self.top.wrapping_add(offset), pc)
    }

    fn top_minus(&self, offset: Word, pc: Word) -> Result<usize, VmError> {
        checked_index(self.top.wrapping_sub(offset), pc)
    }

    fn push(&mut self, value: Word, pc: Word) -> Result<(), VmError> {
        let idx = self.top_index(pc)?;
        self.stack.set(idx, value).ok_or(VmError::MemoryFault { pc })?;
        self.top = self.top.wrapping_add(1);
        Ok(())
    }

    fn pop(&mut self, pc: Word) -> Result<Word, VmError> {
        let idx = self.top_minus(1, pc)?;
        let v = self.stack.get(idx).ok_or(VmError::MemoryFault { pc })?;
        self.top = self.top.wrapping_sub(1);
        Ok(v)
    }

    fn peek(&self, depth: Word, pc: Word) -> Result<Word, VmError> {
        let idx = self.top_minus(1 + depth, pc)?;
        self.stack.get(idx).ok_or(VmError::MemoryFault { pc })
    }

    fn set_stack(&mut self, idx: usize, value: Word, pc: Word) -> Result<(), VmError> {
        self.stack.set(idx, value).ok_or(VmError::MemoryFault { pc })
    }

    /// `a = S[TOP-1]`, `b = S[TOP-2]`; stores `f(b, a)` into `S[TOP-2]`; `TOP -= 1`.
    fn binop(&mut self, pc: Word, f: impl Fn(Word, Word) -> Word) -> Result<(), VmError> {
        let a = self.pop(pc)?;
        let b = self.pop(pc)?;
        self.push(f(b, a), pc)
    }

    fn relop(&mut self, pc: Word, f: impl Fn(Word, Word) -> bool) -> Result<(), VmError> {
        self.binop(pc, |b, a| if f(b, a) { 1 } else { 0 })
    }

    // ----- control registers -----

    fn read_ctrl(&self, a: Word, pc: Word) -> Result<Word, VmError> {
        match a {
            CTRL_PC => Ok(self.pc),
            CTRL_TOP => Ok(self.top),
            CTRL_BP => Ok(self.bp),
            _ => {
                let idx = checked_index(a.wrapping_sub(DATA_BASE), pc)?;
                self.data.get(idx).ok_or(VmError::MemoryFault { pc })
            }
        }
    }

    fn write_ctrl(&mut self, a: Word, value: Word, pc: Word) -> Result<(), VmError> {
        match a {
            CTRL_TOP => self.top = value,
            CTRL_BP => self.bp = value,
            _ => {
                let idx = checked_index(a.wrapping_sub(DATA_BASE), pc)?;
                self.data.set(idx, value).ok_or(VmError::MemoryFault { pc })?;
            }
        }
        Ok(())
    }

    // ----- lexical scoping -----

    fn follow_chain(&self, levels: Word, bp: Word, pc: Word) -> Result<Word, VmError> {
        let mut cur = bp;
        let mut remaining = levels;
        while remaining > 0 {
            let idx = checked_index(cur.wrapping_add(FRAME_STATIC_LINK as Word), pc)?;
            cur = self.stack.get(idx).ok_or(VmError::MemoryFault { pc })?;
            remaining -= 1;
        }
        Ok(cur)
    }

    fn enter(&mut self, locals: Word, pc: Word) -> Result<(), VmError> {
        let lld = self.peek(0, pc)?;
        let caller_bp = self.bp;
        let sl = self.follow_chain(lld, caller_bp, pc)?;

        let old_top = self.top;
        let new_bp = old_top.wrapping_sub(2);
        let sl_addr = checked_index(new_bp.wrapping_add(FRAME_STATIC_LINK as Word), pc)?;
        let dl_addr = checked_index(new_bp.wrapping_add(FRAME_DYNAMIC_LINK as Word), pc)?;
        self.stack.set(sl_addr, sl).ok_or(VmError::MemoryFault { pc })?;
        self.stack
            .set(dl_addr, caller_bp)
            .ok_or(VmError::MemoryFault { pc })?;

        self.bp = new_bp;
        // Reserves the two link words written here (SL, DL) plus `locals`
        // slots, on top of the two (RA, LLD) `Call` already placed.
        self.top = old_top.wrapping_add(locals).wrapping_add(2);
        Ok(())
    }

    // ----- array indexing -----

    fn load_arr(&mut self, a: Word, rank: Word, pc: Word) -> Result<(), VmError> {
        let rank = checked_rank(rank, 0, pc)?;
        let mut idx = vec![0; rank];
        let mut dim = vec![0; rank];
        for i in 0..rank {
            idx[i] = self.peek_usize(2 * rank - 1 - i, pc)?;
            dim[i] = self.peek_usize(rank - 1 - i, pc)?;
        }
        let offset = array_offset(&idx, &dim, pc)?;
        let addr = checked_index(a.wrapping_sub(DATA_BASE).wrapping_add(offset), pc)?;
        let v = self.data.get(addr).ok_or(VmError::MemoryFault { pc })?;
        self.top = self
            .top
            .wrapping_sub(Word::try_from(2 * rank).map_err(|_| VmError::IllegalInstruction { pc })?)
            .wrapping_add(1);
        self.push_no_grow(v, pc)
    }

    fn sto_arr(&mut self, a: Word, rank: Word, pc: Word) -> Result<(), VmError> {
        let rank = checked_rank(rank, 1, pc)?;
        let mut idx = vec![0; rank];
        let mut dim = vec![0; rank];
        for i in 0..rank {
            idx[i] = self.peek_usize(rank - 1 - i, pc)?;
            dim[i] = self.peek_usize(2 * rank - 1 - i, pc)?;
        }
        let v = self.peek_usize(2 * rank, pc)?;
        let offset = array_offset(&idx, &dim, pc)?;
        let addr = checked_index(a.wrapping_sub(DATA_BASE).wrapping_add(offset), pc)?;
        self.data.set(addr, v).ok_or(VmError::MemoryFault { pc })?;
        self.top = self
            .top
            .wrapping_sub(Word::try_from(2 * rank + 1).map_err(|_| VmError::IllegalInstruction { pc })?);
        Ok(())
    }

    /// `peek` with a `usize` depth, for array-indexing code that computes
    /// depths from a rank already bounds-checked against stack capacity.
    fn peek_usize(&self, depth: usize, pc: Word) -> Result<Word, VmError> {
        let depth = Word::try_from(depth).map_err(|_| VmError::IllegalInstruction { pc })?;
        self.peek(depth, pc)
    }

    /// Writes a value already computed in place of the last popped operand,
    /// after the caller has already adjusted `top` downward. Bypasses the
    /// normal push bookkeeping since `top` was pre-adjusted by the array ops.
    fn push_no_grow(&mut self, value: Word, pc: Word) -> Result<(), VmError> {
        let idx = self.top_minus(1, pc)?;
        self.stack.set(idx, value).ok_or(VmError::MemoryFault { pc })
    }

    fn write_string(&mut self, ptr: Word, pc: Word) -> Result<(), VmError> {
        if ptr < DATA_BASE {
            return Err(VmError::NullStringPointer { pc });
        }
        let mut idx = ptr.wrapping_sub(DATA_BASE);
        loop {
            let data_idx = checked_index(idx, pc)?;
            let word = self.data.get(data_idx).ok_or(VmError::MemoryFault { pc })?;
            if word == 0 {
                break;
            }
            self.output
                .push_char(char::from_u32(word as u32).unwrap_or('\u{FFFD}'));
            if idx == 0 {
                return Err(VmError::MemoryFault { pc });
            }
            idx -= 1;
        }
        Ok(())
    }
}

fn pc_index(pc: Word) -> Result<usize, VmError> {
    usize::try_from(pc)
        .ok()
        .filter(|&idx| idx < MEM_SIZE)
        .ok_or(VmError::IllegalInstruction { pc })
}

fn floor_div(dividend: Word, divisor: Word) -> Word {
    let q = dividend.wrapping_div(divisor);
    let r = dividend.wrapping_rem(divisor);
    if r != 0 && (r < 0) != (divisor < 0) {
        q.wrapping_sub(1)
    } else {
        q
    }
}

/// Validates a `LoadArr`/`StoArr` rank operand before any depth arithmetic is
/// done on it. `extra` is 1 for `StoArr`'s value slot, 0 for `LoadArr`. A
/// rank whose `2*rank + extra` operand slots can't possibly fit below `TOP`
/// in a 4096-word stack is rejected here rather than overflowing `Word`
/// later: the stack could never have held that many operands anyway.
fn checked_rank(rank: Word, extra: usize, pc: Word) -> Result<usize, VmError> {
    let rank = usize::try_from(rank).map_err(|_| VmError::IllegalInstruction { pc })?;
    if 2 * rank + extra > MEM_SIZE {
        return Err(VmError::IllegalInstruction { pc });
    }
    Ok(rank)
}

fn array_offset(idx: &[Word], dim: &[Word], pc: Word) -> Result<Word, VmError> {
    for (i, d) in idx.iter().zip(dim.iter()) {
        if *i < 0 || *i >= *d {
            return Err(VmError::IndexOutOfBounds { pc });
        }
    }
    let mut offset: Word = 0;
    for (i, d) in idx.iter().zip(dim.iter()) {
        offset = offset.wrapping_mul(*d).wrapping_add(*i);
    }
    Ok(offset)
}
