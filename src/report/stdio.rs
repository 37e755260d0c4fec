//! Result lines on stdout.
//!
//! Stdout carries one line per exchange result and nothing else. Logs go
//! to stderr through the tracing subscriber.

use std::io::{self, Write};

use super::render::{render_json, render_text, Operation};
use crate::error::Result;
use crate::register::RegisterResult;

/// How each result line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Writes one line per result and counts device rejections.
///
/// Each line is flushed as soon as it is written, so results already
/// reported survive a later transport failure.
pub struct Reporter<W = io::Stdout> {
    out: W,
    format: OutputFormat,
    rejected: usize,
}

impl Reporter<io::Stdout> {
    /// Report to the process stdout.
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(io::stdout(), format)
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            rejected: 0,
        }
    }

    /// Render and write the line for one result.
    pub fn report(&mut self, operation: Operation, result: &RegisterResult) -> Result<()> {
        let line = match self.format {
            OutputFormat::Text => render_text(operation, result),
            OutputFormat::Json => render_json(operation, result)?,
        };

        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;

        if let RegisterResult::Rejected(_) = result {
            self.rejected += 1;
        }
        Ok(())
    }

    /// Device rejections reported so far.
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
