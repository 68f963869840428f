//! Assembler for the [tastier-vm](../tastier_vm/index.html) virtual machine.
//!
//! [`assemble`] turns the line-oriented textual assembly format into an
//! [`Image`]: a sequence of decoded [`Instruction`](tastier_vm::Instruction)s
//! plus an initial data-memory image, ready to hand to
//! [`tastier_vm::Vm::new`].
//!
//! Parsing is implemented with [pest]: a grammar file, a first pass that
//! builds a label table, and a second pass that emits resolved instructions.

mod error;
mod labels;
mod mnemonics;

use labels::LabelMap;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;
use tastier_vm::{Instruction, Word};

pub use error::{Error, Result};

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct TastierParser;

/// A fully resolved, loadable program: decoded instructions plus the
/// zero-initialized data slots reserved by `.var`/`.const` declarations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Image {
    pub instructions: Vec<Instruction>,
    pub data: Vec<Word>,
}

pub fn assemble(source: &str) -> Result<Image> {
    let program = TastierParser::parse(Rule::program, source)?
        .next()
        .expect("program rule always produces exactly one pair");

    let stmts: Vec<Pair<Rule>> = program
        .into_inner()
        .filter(|pair| pair.as_rule() == Rule::stmt)
        .collect();

    let (labels, data_len) = build_label_table(&stmts)?;
    let instructions = emit_instructions(&stmts, &labels)?;

    Ok(Image {
        instructions,
        data: vec![0; data_len],
    })
}

fn parse_int(pair: Pair<Rule>) -> Result<Word> {
    pair.as_str()
        .parse()
        .map_err(|_| Error::InvalidInt(pair.as_str().to_owned()))
}

/// First pass: walks every statement, assigning instruction-memory indices
/// to code labels and data-memory slots to `.var`/`.const` declarations.
/// `.proc` and `.external` declarations are recorded structurally but do not
/// themselves reserve storage.
fn build_label_table(stmts: &[Pair<Rule>]) -> Result<(LabelMap, usize)> {
    let mut labels = LabelMap::new();
    let mut instr_index: Word = 0;
    let mut data_slots: Word = 0;
    let mut declared_names: Word = 0;

    for stmt in stmts {
        let mut pending_label: Option<&str> = None;
        let mut has_instruction = false;

        for inner in stmt.clone().into_inner() {
            match inner.as_rule() {
                Rule::label => pending_label = Some(inner.as_str()),
                Rule::directive => {
                    let directive = inner.into_inner().next().expect("directive has one body");
                    match directive.as_rule() {
                        Rule::names_dir => {
                            let mut parts = directive.into_inner();
                            declared_names = parse_int(parts.next().unwrap())?;
                        }
                        Rule::var_dir | Rule::const_dir => {
                            let is_var = directive.as_rule() == Rule::var_dir;
                            let mut parts = directive.into_inner();
                            let name = if is_var {
                                let _ty = parts.next().unwrap();
                                parts.next().unwrap()
                            } else {
                                parts.next().unwrap()
                            };
                            labels::insert_unique(
                                &mut labels,
                                name.as_str(),
                                data_base() + data_slots,
                            )?;
                            data_slots += 1;
                        }
                        Rule::proc_dir | Rule::ext_var_dir | Rule::ext_proc_dir => {
                            // Declared but not address-bearing on its own; see module doc.
                        }
                        _ => unreachable!("unexpected directive rule"),
                    }
                }
                Rule::instruction => has_instruction = true,
                _ => unreachable!("unexpected stmt child"),
            }
        }

        if let Some(name) = pending_label {
            labels::insert_unique(&mut labels, name, instr_index)?;
        }
        if has_instruction {
            instr_index += 1;
        }
    }

    let data_len = std::cmp::max(data_slots, declared_names) as usize;
    Ok((labels, data_len))
}

/// Global data address of the first user-visible slot (`D[0]`), mirroring
/// `tastier_vm`'s `CTRL_PC`/`CTRL_TOP`/`CTRL_BP` reserving the first three
/// `LoadG`/`StoG` selectors.
fn data_base() -> Word {
    3
}

fn emit_instructions(stmts: &[Pair<Rule>], labels: &LabelMap) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();

    for stmt in stmts {
        for inner in stmt.clone().into_inner() {
            if inner.as_rule() != Rule::instruction {
                continue;
            }
            let mut parts = inner.into_inner();
            let mnemonic = parts.next().expect("instruction has a mnemonic").as_str();
            let operands: Vec<mnemonics::Operand> = parts
                .map(|operand_pair| {
                    let operand = operand_pair
                        .into_inner()
                        .next()
                        .expect("operand has one body");
                    match operand.as_rule() {
                        Rule::int => parse_int(operand).map(mnemonics::Operand::Int),
                        Rule::ident => Ok(mnemonics::Operand::Label(operand.as_str())),
                        _ => unreachable!("unexpected operand rule"),
                    }
                })
                .collect::<Result<_>>()?;

            instructions.push(mnemonics::build(mnemonic, &operands, labels)?);
        }
    }

    Ok(instructions)
}
