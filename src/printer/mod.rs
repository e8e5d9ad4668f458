//! Printers: captured interpreter output and markdown (termimad).

use std::io::{self, Write};

use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use termimad::MadSkin;

use crate::execution::ExecutionResult;

/// Relays captured output: `stdout` verbatim, `stderr` highlighted in red.
#[derive(Debug, Clone, Copy)]
pub struct OutputPrinter {
    pub color: bool,
}

impl OutputPrinter {
    /// Colour only when our own stderr is a terminal.
    pub fn detect() -> Self {
        Self { color: io::stderr().is_terminal() }
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn print(&self, result: &ExecutionResult) {
        let _ = self.write_to(result, &mut io::stdout().lock(), &mut io::stderr().lock());
    }

    pub fn write_to(
        &self,
        result: &ExecutionResult,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<()> {
        if !result.stdout.is_empty() {
            out.write_all(result.stdout.as_bytes())?;
            out.flush()?;
        }
        if !result.stderr.is_empty() {
            if self.color {
                write!(err, "{}", result.stderr.red())?;
            } else {
                err.write_all(result.stderr.as_bytes())?;
            }
            err.flush()?;
        }
        Ok(())
    }
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) { self.skin.print_text(text); println!(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(printer: OutputPrinter, r: &ExecutionResult) -> (String, String) {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        printer.write_to(r, &mut out, &mut err).unwrap();
        (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn channels_stay_separate() {
        let r = ExecutionResult { stdout: "hi\n".into(), stderr: "Execution Error: x\n".into() };
        let (out, err) = render(OutputPrinter::plain(), &r);
        assert_eq!(out, "hi\n");
        assert_eq!(err, "Execution Error: x\n");
    }

    #[test]
    fn colour_wraps_stderr_only() {
        let r = ExecutionResult { stdout: "hi\n".into(), stderr: "bad\n".into() };
        let (out, err) = render(OutputPrinter { color: true }, &r);
        assert_eq!(out, "hi\n");
        assert!(err.starts_with("\u{1b}[31m"));
        assert!(err.contains("bad"));
    }
}
