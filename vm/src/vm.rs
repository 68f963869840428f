use super::core::{Core, TickResult};
use super::error::VmError;
use super::instr::Instruction;
use super::io::InputQueue;
use super::Word;

/// How a program's execution came to an end.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// A `Halt` instruction was executed.
    Halted,
    /// A `Ret` executed with an empty call chain (`TOP == 0`).
    ReturnedToTopLevel,
}

/// Public entry point for loading and running a Tastier program.
pub struct Vm {
    core: Core,
}

impl Vm {
    pub fn new(instructions: Vec<Instruction>, initial_data: &[Word]) -> Vm {
        Vm::with_input(instructions, initial_data, InputQueue::new(std::iter::empty()))
    }

    pub fn with_input(
        instructions: Vec<Instruction>,
        initial_data: &[Word],
        input: InputQueue,
    ) -> Vm {
        Vm {
            core: Core::new(instructions, initial_data, input),
        }
    }

    /// Runs until `Halt`, a top-level `Ret`, or a fault.
    pub fn run(&mut self) -> Result<Outcome, VmError> {
        loop {
            match self.core.tick()? {
                TickResult::Running => continue,
                TickResult::Halted => return Ok(Outcome::Halted),
                TickResult::ReturnedToTopLevel => return Ok(Outcome::ReturnedToTopLevel),
            }
        }
    }

    /// Completed output lines produced by `Print` so far.
    pub fn output_lines(&self) -> &[String] {
        self.core.output().lines()
    }

    pub fn into_output_lines(self) -> Vec<String> {
        self.core.into_output().into_lines()
    }

    pub fn pc(&self) -> Word {
        self.core.pc()
    }

    pub fn top(&self) -> Word {
        self.core.top()
    }

    pub fn bp(&self) -> Word {
        self.core.bp()
    }
}
