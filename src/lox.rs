//! Whole‑pipeline driver: scan → parse → resolve → evaluate.
//!
//! A [`Lox`] value keeps its interpreter between calls to [`Lox::run`], so a
//! REPL can define a function on one line and call it on the next.

use std::io::Write;

use log::{debug, info};

use crate::diagnostics::Diagnostics;
use crate::interpreter::{Interpreter, InterpreterOptions};
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;

/// How far a run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    /// Lexing, parsing or resolution failed; nothing was executed.
    StaticError,
    /// Execution started and was aborted by a runtime error.
    RuntimeError,
}

impl Status {
    /// Conventional `sysexits`-style process exit code.
    pub fn exit_code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::StaticError => 65,
            Status::RuntimeError => 70,
        }
    }
}

pub struct Lox<'w> {
    interpreter: Interpreter<'w>,
    diagnostics: Diagnostics,
    next_id: usize,
}

impl<'w> Lox<'w> {
    pub fn new<W: Write + 'w>(output: W) -> Self {
        Self::with_options(output, InterpreterOptions::default())
    }

    pub fn with_options<W: Write + 'w>(output: W, options: InterpreterOptions) -> Self {
        Self {
            interpreter: Interpreter::with_options(output, options),
            diagnostics: Diagnostics::new(),
            next_id: 0,
        }
    }

    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    /// Run one chunk of source against the persistent global state.
    pub fn run(&mut self, source: &str) -> Status {
        info!("Running {} bytes of source", source.len());

        let (tokens, lex_errors) = Scanner::new(source.as_bytes()).scan_all();

        let mut parser = Parser::with_first_id(&tokens, self.next_id);
        let parsed = parser.parse();
        self.next_id = parser.next_id();

        // Parse errors are reported alongside lex errors so one pass shows both.
        let statements = match parsed {
            Ok(statements) if lex_errors.is_empty() => statements,
            Ok(_) => {
                self.diagnostics.extend(lex_errors);
                return Status::StaticError;
            }
            Err(parse_errors) => {
                self.diagnostics.extend(lex_errors);
                self.diagnostics.extend(parse_errors);
                return Status::StaticError;
            }
        };

        let locals = match Resolver::new().resolve(&statements) {
            Ok(locals) => locals,
            Err(errors) => {
                self.diagnostics.extend(errors);
                return Status::StaticError;
            }
        };

        self.interpreter.resolve(locals);

        match self.interpreter.interpret(&statements) {
            Ok(()) => Status::Ok,
            Err(e) => {
                debug!("Runtime error: {}", e);
                self.diagnostics.push(e);
                Status::RuntimeError
            }
        }
    }
}
