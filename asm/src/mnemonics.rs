use crate::error::{Error, Result};
use crate::labels::LabelMap;
use tastier_vm::{BinaryOp, Instruction, NullaryOp, UnaryOp, Word};

/// One operand as it appears in source: either an already-known integer, or
/// a label name still awaiting resolution.
pub enum Operand<'i> {
    Int(Word),
    Label(&'i str),
}

fn resolve(_mnemonic: &str, operand: &Operand, labels: &LabelMap) -> Result<Word> {
    match operand {
        Operand::Int(v) => Ok(*v),
        Operand::Label(name) => labels
            .get(*name)
            .copied()
            .ok_or_else(|| Error::UndefinedLabel((*name).to_owned())),
    }
}

fn require_int(mnemonic: &str, operand: &Operand) -> Result<Word> {
    match operand {
        Operand::Int(v) => Ok(*v),
        Operand::Label(name) => Err(Error::LabelNotAllowed {
            mnemonic: mnemonic.to_owned(),
            label: (*name).to_owned(),
        }),
    }
}

fn arity_error(mnemonic: &str, expected: usize, found: usize) -> Error {
    Error::WrongOperandCount {
        mnemonic: mnemonic.to_owned(),
        expected,
        found,
    }
}

/// Builds one `Instruction` from a mnemonic and its (already-parsed but not
/// yet address-resolved) operands. Only `Jmp`, `FJmp`, and `Call` may take a
/// label operand; everywhere else a label is a mistake on the caller's part.
pub fn build(mnemonic: &str, operands: &[Operand], labels: &LabelMap) -> Result<Instruction> {
    macro_rules! nullary {
        ($op:expr) => {{
            if !operands.is_empty() {
                return Err(arity_error(mnemonic, 0, operands.len()));
            }
            Ok(Instruction::nullary($op))
        }};
    }

    macro_rules! unary_int {
        ($op:expr) => {{
            match operands {
                [a] => Ok(Instruction::unary($op, require_int(mnemonic, a)?)),
                _ => Err(arity_error(mnemonic, 1, operands.len())),
            }
        }};
    }

    macro_rules! unary_target {
        ($op:expr) => {{
            match operands {
                [a] => Ok(Instruction::unary($op, resolve(mnemonic, a, labels)?)),
                _ => Err(arity_error(mnemonic, 1, operands.len())),
            }
        }};
    }

    macro_rules! binary_int {
        ($op:expr) => {{
            match operands {
                [a, b] => Ok(Instruction::binary(
                    $op,
                    require_int(mnemonic, a)?,
                    require_int(mnemonic, b)?,
                )),
                _ => Err(arity_error(mnemonic, 2, operands.len())),
            }
        }};
    }

    match mnemonic {
        "Halt" => nullary!(NullaryOp::Halt),
        "Nop" => nullary!(NullaryOp::Nop),
        "Dup" => nullary!(NullaryOp::Dup),
        "Add" => nullary!(NullaryOp::Add),
        "Sub" => nullary!(NullaryOp::Sub),
        "Mul" => nullary!(NullaryOp::Mul),
        "Div" => nullary!(NullaryOp::Div),
        "Equ" => nullary!(NullaryOp::Equ),
        "NEqu" => nullary!(NullaryOp::NEqu),
        "Lss" => nullary!(NullaryOp::Lss),
        "LssEq" => nullary!(NullaryOp::LssEq),
        "Gtr" => nullary!(NullaryOp::Gtr),
        "GtrEq" => nullary!(NullaryOp::GtrEq),
        "Neg" => nullary!(NullaryOp::Neg),
        "Ret" => nullary!(NullaryOp::Ret),
        "Read" => nullary!(NullaryOp::Read),
        "Write" => nullary!(NullaryOp::Write),
        "WriteS" => nullary!(NullaryOp::WriteS),
        "Print" => nullary!(NullaryOp::Print),
        "Leave" => nullary!(NullaryOp::Leave),

        "StoG" => unary_int!(UnaryOp::StoG),
        "LoadG" => unary_int!(UnaryOp::LoadG),
        "Const" => unary_int!(UnaryOp::Const),
        "Enter" => unary_int!(UnaryOp::Enter),
        "Jmp" => unary_target!(UnaryOp::Jmp),
        "FJmp" => unary_target!(UnaryOp::FJmp),

        "Load" => binary_int!(BinaryOp::Load),
        "Sto" => binary_int!(BinaryOp::Sto),
        "StoArr" => binary_int!(BinaryOp::StoArr),
        "LoadArr" => binary_int!(BinaryOp::LoadArr),

        "Call" => match operands {
            [a, b] => Ok(Instruction::binary(
                BinaryOp::Call,
                require_int(mnemonic, a)?,
                resolve(mnemonic, b, labels)?,
            )),
            _ => Err(arity_error(mnemonic, 2, operands.len())),
        },

        other => Err(Error::UnknownMnemonic(other.to_owned())),
    }
}
