use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tastier_vm::{InputQueue, Vm};

/// Assembles and runs a Tastier VM program.
#[derive(Parser, Debug)]
#[command(name = "tastier-vm", version, about)]
struct Cli {
    /// Path to the assembled program's source text.
    program: PathBuf,

    /// Path to a whitespace-separated file of signed 16-bit input words.
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Enable per-instruction trace logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "trace" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), DriverError> {
    let source = std::fs::read_to_string(&cli.program)
        .map_err(|err| DriverError::Io(cli.program.clone(), err))?;
    let image = tastier_asm::assemble(&source).map_err(DriverError::Assemble)?;

    let input = match &cli.input {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|err| DriverError::Io(path.clone(), err))?;
            InputQueue::new(parse_words(&text)?)
        }
        None => InputQueue::new(std::iter::empty()),
    };

    let mut vm = Vm::with_input(image.instructions, &image.data, input);
    let outcome = vm.run().map_err(DriverError::Vm)?;
    log::debug!("run finished: {outcome:?}");

    for line in vm.output_lines() {
        println!("{line}");
    }

    Ok(())
}

fn parse_words(text: &str) -> Result<Vec<tastier_vm::Word>, DriverError> {
    text.split_whitespace()
        .map(|tok| tok.parse().map_err(|_| DriverError::InvalidInputWord(tok.to_owned())))
        .collect()
}

#[derive(Debug)]
enum DriverError {
    Io(PathBuf, std::io::Error),
    Assemble(tastier_asm::Error),
    Vm(tastier_vm::VmError),
    InvalidInputWord(String),
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::Io(path, err) => write!(f, "{}: {err}", path.display()),
            DriverError::Assemble(err) => write!(f, "assembly error: {err}"),
            DriverError::Vm(err) => write!(f, "vm fault at pc={}: {err}", err.pc()),
            DriverError::InvalidInputWord(tok) => write!(f, "invalid input word `{tok}`"),
        }
    }
}

impl std::error::Error for DriverError {}
