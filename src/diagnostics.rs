//! Error collection and rendering.
//!
//! Every phase pushes its [`LoxError`]s into a [`Diagnostics`] collector; the
//! caller decides when and how to print them.  Two renderings exist: the
//! classic `[line N] Error: ...` text and one JSON object per error.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::Serialize;

use crate::error::LoxError;

/// How collected errors are rendered for the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorFormat {
    #[default]
    Text,
    Json,
}

impl ErrorFormat {
    /// Render one error, without a trailing newline.
    pub fn format(&self, error: &LoxError) -> String {
        match self {
            ErrorFormat::Text => error.to_string(),
            ErrorFormat::Json => {
                let record = ErrorRecord {
                    line: error.line(),
                    kind: error.kind_name(),
                    message: error.message(),
                };

                // A struct of plain strings and integers always serialises.
                serde_json::to_string(&record).unwrap_or_default()
            }
        }
    }
}

impl FromStr for ErrorFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ErrorFormat::Text),
            "json" => Ok(ErrorFormat::Json),
            other => Err(format!("unknown error format '{}'", other)),
        }
    }
}

impl fmt::Display for ErrorFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorFormat::Text => write!(f, "text"),
            ErrorFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Serialize)]
struct ErrorRecord {
    line: Option<usize>,

    #[serde(rename = "type")]
    kind: &'static str,

    message: String,
}

/// Ordered collector of errors produced by any phase.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<LoxError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: LoxError) {
        debug!("Diagnostic recorded: {}", error);

        self.errors.push(error);
    }

    pub fn extend<I: IntoIterator<Item = LoxError>>(&mut self, errors: I) {
        for error in errors {
            self.push(error);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Remove and return every collected error, oldest first.
    pub fn drain(&mut self) -> Vec<LoxError> {
        std::mem::take(&mut self.errors)
    }

    /// Render all collected errors, one per line.
    pub fn render(&self, format: ErrorFormat) -> String {
        let mut out = String::new();

        for error in &self.errors {
            out.push_str(&format.format(error));
            out.push('\n');
        }

        out
    }
}
