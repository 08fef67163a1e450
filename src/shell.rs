//! Interactive front end
//!
//! Line-oriented session used by `norkv-cli`: read key/value pairs until
//! `END`, then flush, replay and print the stored log.

use std::io::{BufRead, Write};

use crate::error::Result;
use crate::flash::FlashDevice;
use crate::map::MapStore;

/// Key line that ends input
pub const END_SENTINEL: &str = "END";

/// Outcome of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Entries appended during the session
    pub added: usize,
    /// Entries in the log after the final replay
    pub stored: usize,
}

/// Drive one session against `store`
///
/// A value that parses fully as `u32` is stored as an integer, anything
/// else as a string. A rejected entry is reported and ends input early.
pub fn run<D, R, W>(store: &mut MapStore<D>, mut input: R, output: &mut W) -> Result<SessionSummary>
where
    D: FlashDevice,
    R: BufRead,
    W: Write,
{
    let mut added = 0;

    loop {
        let Some(key) = prompt(&mut input, output, "Enter key (or 'END' to finish): ")? else {
            break;
        };
        if key == END_SENTINEL {
            break;
        }

        let Some(value) = prompt(&mut input, output, "Enter value: ")? else {
            break;
        };

        let result = match value.parse::<u32>() {
            Ok(number) => store.add_integer(&key, number),
            Err(_) => store.add_string(&key, &value),
        };

        if let Err(e) = result {
            writeln!(output, "Failed to add entry: {}", e)?;
            break;
        }
        added += 1;
    }

    let log = store.reload()?;

    writeln!(output)?;
    writeln!(output, "--- Stored Map Entries ---")?;
    write!(output, "{}", log)?;
    writeln!(output, "--------------------------")?;

    Ok(SessionSummary {
        added,
        stored: log.len(),
    })
}

/// Print `label` and read one line without its line ending. `None` at end of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, label: &str) -> Result<Option<String>> {
    write!(output, "{}", label)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }

    let trimmed = line.trim_end_matches(['\n', '\r']);
    Ok(Some(trimmed.to_string()))
}
