use std::fs::File;
use std::io::{self, BufRead, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use rox::ast_printer::AstPrinter;
use rox::diagnostics::{Diagnostics, ErrorFormat};
use rox::interpreter::Interpreter;
use rox::lox::{Lox, Status};
use rox::parser::Parser;
use rox::scanner::Scanner;

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,

    /// How errors are printed on stderr: `text` or `json`
    #[arg(long, global = true, default_value_t = ErrorFormat::Text)]
    error_format: ErrorFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize { filename: PathBuf },

    /// Parses input from a file as a program and prints its AST
    Parse { filename: PathBuf },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: PathBuf },

    /// Runs input from a file as a Lox program
    Run { filename: PathBuf },

    /// Starts an interactive session (the default)
    Repl,
}

/// Source bytes, scanned in place from the mapping.
enum SourceFile {
    Mapped(Mmap),
    // Zero-length files cannot be mapped.
    Empty,
}

impl Deref for SourceFile {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            SourceFile::Mapped(map) => map,
            SourceFile::Empty => &[],
        }
    }
}

fn read_file(filename: &Path) -> Result<SourceFile> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;

    let len = file
        .metadata()
        .context(format!("Failed to stat file {:?}", filename))?
        .len();

    if len == 0 {
        return Ok(SourceFile::Empty);
    }

    // SAFETY: the file is opened read-only and is not expected to change while
    // the interpreter runs.
    let map = unsafe { Mmap::map(&file) }.context(format!("Failed to map file {:?}", filename))?;

    info!("Mapped {} bytes from {:?}", map.len(), filename);

    Ok(SourceFile::Mapped(map))
}

fn init_logger() -> Result<()> {
    // Create or open the log file
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            // Strip the crate prefix from the module path
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug) // Default to Debug, override with RUST_LOG
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn report(diagnostics: &mut Diagnostics, format: ErrorFormat) {
    if diagnostics.has_errors() {
        eprint!("{}", diagnostics.render(format));
        debug!("Reported {} error(s)", diagnostics.drain().len());
    }
}

fn tokenize(filename: &Path, format: ErrorFormat) -> Result<Status> {
    info!("Running Tokenize subcommand");

    let buf = read_file(filename)?;
    let mut status = Status::Ok;

    for token in Scanner::new(&buf) {
        match token {
            Ok(token) => println!("{}", token),
            Err(e) => {
                status = Status::StaticError;
                eprintln!("{}", format.format(&e));
            }
        }
    }

    Ok(status)
}

fn parse(filename: &Path, format: ErrorFormat) -> Result<Status> {
    info!("Running Parse subcommand");

    let buf = read_file(filename)?;
    let (tokens, lex_errors) = Scanner::new(&buf).scan_all();

    let mut diagnostics = Diagnostics::new();
    diagnostics.extend(lex_errors);

    match Parser::new(&tokens).parse() {
        Ok(program) if !diagnostics.has_errors() => {
            println!("{}", AstPrinter::print_program(&program));
            return Ok(Status::Ok);
        }
        Ok(_) => {}
        Err(errors) => diagnostics.extend(errors),
    }

    report(&mut diagnostics, format);
    Ok(Status::StaticError)
}

fn evaluate(filename: &Path, format: ErrorFormat) -> Result<Status> {
    info!("Running Evaluate subcommand");

    let buf = read_file(filename)?;
    let (tokens, lex_errors) = Scanner::new(&buf).scan_all();

    let mut diagnostics = Diagnostics::new();
    diagnostics.extend(lex_errors);

    let expr = match Parser::new(&tokens).parse_expression() {
        Ok(expr) if !diagnostics.has_errors() => expr,
        Ok(_) => {
            report(&mut diagnostics, format);
            return Ok(Status::StaticError);
        }
        Err(e) => {
            diagnostics.push(e);
            report(&mut diagnostics, format);
            return Ok(Status::StaticError);
        }
    };

    let mut interpreter = Interpreter::new(io::stdout());

    match interpreter.evaluate(&expr) {
        Ok(value) => {
            println!("{}", value);
            Ok(Status::Ok)
        }
        Err(e) => {
            eprintln!("{}", format.format(&e));
            Ok(Status::RuntimeError)
        }
    }
}

fn run(filename: &Path, format: ErrorFormat) -> Result<Status> {
    info!("Running Run subcommand");

    let buf = read_file(filename)?;
    let source = std::str::from_utf8(&buf)
        .context(format!("File {:?} is not valid UTF-8", filename))?;
    debug!("Provided input:\n {}", source);

    let stdout = io::stdout();
    let mut lox = Lox::new(stdout.lock());

    let status = lox.run(source);
    report(lox.diagnostics_mut(), format);

    Ok(status)
}

fn repl(format: ErrorFormat) -> Result<Status> {
    info!("Starting REPL");

    let stdin = io::stdin();
    let mut lox = Lox::new(io::stdout());
    let mut line = String::new();

    loop {
        print!("> ");
        io::stdout().flush().context("Failed to flush prompt")?;

        line.clear();
        if stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?
            == 0
        {
            println!();
            break;
        }

        let input = line.trim();
        if input == "exit" {
            break;
        }
        if input.is_empty() {
            continue;
        }

        // Errors are reported but the session keeps its state.
        lox.run(input);
        report(lox.diagnostics_mut(), format);
    }

    info!("REPL finished");
    Ok(Status::Ok)
}

fn main() -> Result<ExitCode> {
    let args: Cli = Cli::parse();

    // Initialize logger only if --log flag is provided
    if args.log {
        init_logger()?;
    } else {
        // Initialize a minimal logger to avoid "no logger" errors
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let format = args.error_format;

    let status = match args.commands.unwrap_or(Commands::Repl) {
        Commands::Tokenize { filename } => tokenize(&filename, format)?,
        Commands::Parse { filename } => parse(&filename, format)?,
        Commands::Evaluate { filename } => evaluate(&filename, format)?,
        Commands::Run { filename } => run(&filename, format)?,
        Commands::Repl => repl(format)?,
    };

    debug!("Exiting with {:?}", status);

    // Exit codes are 0, 65 and 70, all of which fit in a u8.
    Ok(ExitCode::from(status.exit_code() as u8))
}
