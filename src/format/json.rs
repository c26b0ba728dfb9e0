//! JSON rendering of the entry trees

use std::io::{self, Write};

use crate::entry::Entry;

pub fn render(out: &mut dyn Write, entries: &[Entry]) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, entries).map_err(io::Error::from)?;
    writeln!(out)
}
