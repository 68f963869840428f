//! Stack-based virtual machine for the Tastier toy language.
//!
//! The machine has three fixed-size memory banks (instructions, data,
//! stack), a fetch-dispatch core (`core`), and a thin public `Vm` shell.
//! `instr` documents the instruction set; `core` documents the calling
//! convention at each opcode handler.

mod constants;
mod core;
mod error;
mod instr;
mod io;
mod memory;
mod vm;

/// The machine's native word size. Arithmetic on it wraps rather than
/// panics, matching the two's-complement semantics of the target machine.
pub type Word = i16;

pub use constants::MEM_SIZE;
pub use error::VmError;
pub use instr::{BinaryOp, Instruction, NullaryOp, UnaryOp};
pub use io::InputQueue;
pub use vm::{Outcome, Vm};
