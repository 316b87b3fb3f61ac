//! Row output: one tab-separated line per header or sample.

use std::io::{self, Write};

/// Cell separator.
pub const SEPARATOR: &str = "\t";

/// Line sink for header and data rows.
pub trait RowWriter {
    fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// Writes lines to any `Write`, flushing after each so rows show up as they
/// are sampled even when stdout is piped.
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    inner: W,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> RowWriter for StreamWriter<W> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\n")?;
        self.inner.flush()
    }
}

/// Collects lines in memory.
impl RowWriter for Vec<String> {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}

/// Joins cells with [`SEPARATOR`], without a trailing separator.
///
/// Tabs and line breaks inside a cell are replaced with spaces, so every row
/// stays one line with one cell per column.
pub fn join_cells<S: AsRef<str>>(cells: &[S]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str(SEPARATOR);
        }
        line.extend(cell.as_ref().chars().map(|c| match c {
            '\t' | '\n' | '\r' => ' ',
            other => other,
        }));
    }
    line
}
