use crate::Rule;
use thiserror::Error;

/// Assembler-pipeline errors, kept distinct from `tastier_vm::VmError` because
/// they belong to a different stage: this crate never touches running VM
/// state, it only ever produces (or fails to produce) a loadable image.
#[derive(Error, Clone, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] Box<pest::error::Error<Rule>>),

    #[error("undefined label `{0}`")]
    UndefinedLabel(String),

    #[error("label `{0}` defined more than once")]
    DuplicateLabel(String),

    #[error("unknown mnemonic `{0}`")]
    UnknownMnemonic(String),

    #[error("`{mnemonic}` expects {expected} operand(s), found {found}")]
    WrongOperandCount {
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("`{mnemonic}` expects an integer operand, found label `{label}`")]
    LabelNotAllowed { mnemonic: String, label: String },

    #[error("invalid integer literal `{0}`")]
    InvalidInt(String),
}

impl From<pest::error::Error<Rule>> for Error {
    fn from(err: pest::error::Error<Rule>) -> Error {
        Error::Parse(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
