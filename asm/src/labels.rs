use crate::error::{Error, Result};
use std::collections::HashMap;
use tastier_vm::Word;

/// Maps a label (a procedure/global name or a bare instruction label) to the
/// resolved address it stands for: an instruction-memory index for code
/// labels, or a data-memory address (`DATA_BASE + slot`) for globals.
pub type LabelMap = HashMap<String, Word>;

pub fn insert_unique(labels: &mut LabelMap, name: &str, address: Word) -> Result<()> {
    if labels.insert(name.to_owned(), address).is_some() {
        return Err(Error::DuplicateLabel(name.to_owned()));
    }
    Ok(())
}
