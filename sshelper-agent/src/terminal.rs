//! Line-oriented terminal used by the interactive loops

use sshelper_error::{Error, Result};
use std::io::{BufRead, Stdout, StdinLock, Write};

/// Where the loops read lines from and print to
pub trait Terminal {
    /// Print `prompt` without a newline and read one line.
    /// Returns `None` at end of input.
    fn prompt(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Read every remaining line until end of input
    fn read_to_end(&mut self) -> Result<Vec<String>>;

    /// Print a line
    fn say(&mut self, text: &str) -> Result<()>;
}

/// A terminal over any reader and writer
pub struct LineTerminal<R, W> {
    input: R,
    output: W,
}

/// The process's stdin and stdout
pub type StdTerminal = LineTerminal<StdinLock<'static>, Stdout>;

impl StdTerminal {
    pub fn stdio() -> Self {
        LineTerminal::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> LineTerminal<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| Error::from(e).with_operation("terminal::read_line"))?;
        if read == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }
}

impl<R: BufRead, W: Write> Terminal for LineTerminal<R, W> {
    fn prompt(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{}", prompt)
            .and_then(|_| self.output.flush())
            .map_err(|e| Error::from(e).with_operation("terminal::prompt"))?;
        self.read_line()
    }

    fn read_to_end(&mut self) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        while let Some(line) = self.read_line()? {
            lines.push(line);
        }
        Ok(lines)
    }

    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)
            .and_then(|_| self.output.flush())
            .map_err(|e| Error::from(e).with_operation("terminal::say"))
    }
}
