use super::Word;
use thiserror::Error;

/// The closed set of ways a Tastier program can fault. Every variant carries
/// the program counter at the time of the fault, since the VM aborts rather
/// than recovering.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum VmError {
    #[error("index out of bounds (pc={pc})")]
    IndexOutOfBounds { pc: Word },

    #[error("null string pointer (pc={pc})")]
    NullStringPointer { pc: Word },

    #[error("input exhausted (pc={pc})")]
    InputExhausted { pc: Word },

    #[error("illegal instruction (pc={pc})")]
    IllegalInstruction { pc: Word },

    #[error("divide by zero (pc={pc})")]
    DivideByZero { pc: Word },

    #[error("memory fault (pc={pc})")]
    MemoryFault { pc: Word },
}

impl VmError {
    /// The program counter of the instruction that faulted.
    pub fn pc(&self) -> Word {
        match *self {
            VmError::IndexOutOfBounds { pc }
            | VmError::NullStringPointer { pc }
            | VmError::InputExhausted { pc }
            | VmError::IllegalInstruction { pc }
            | VmError::DivideByZero { pc }
            | VmError::MemoryFault { pc } => pc,
        }
    }
}
