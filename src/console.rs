//! Operator I/O.
//!
//! All prompts go through `Console` so sessions can be driven from scripted
//! input in tests. End of input counts as the operator interrupting.

use std::fmt::Display;
use std::io::{self, BufRead, StdinLock, Stdout, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("operator interrupted input")]
    Interrupted,
    #[error("failed to read operator input: {0}")]
    Io(#[from] io::Error),
}

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `text` without a newline and read one line, with surrounding
    /// whitespace removed. Bytes that are not UTF-8 become U+FFFD, so the
    /// caller sees an answer it rejects rather than a read error.
    pub fn prompt(&mut self, text: &str) -> Result<String, PromptError> {
        write!(self.output, "{}", text)?;
        self.output.flush()?;

        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            return Err(PromptError::Interrupted);
        }
        Ok(String::from_utf8_lossy(&line).trim().to_string())
    }

    pub fn say(&mut self, text: impl Display) -> Result<(), PromptError> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    pub fn blank(&mut self) -> Result<(), PromptError> {
        writeln!(self.output)?;
        Ok(())
    }

    pub fn output(&self) -> &W {
        &self.output
    }
}
