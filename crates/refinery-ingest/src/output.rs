//! JSON lines output for gene sets

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_jsonlines::JsonLinesWriter;
use tracing::info;

use crate::error::Result;

/// Write one JSON document per line, returning the number written
pub fn write_json_lines<W, T>(out: W, records: &[T]) -> Result<usize>
where
    W: Write,
    T: Serialize,
{
    let mut writer = JsonLinesWriter::new(out);
    for record in records {
        writer.write(record)?;
    }
    writer.flush()?;
    Ok(records.len())
}

/// Write to `path`, or stdout when no path is given
pub fn write_records<T: Serialize>(path: Option<&Path>, records: &[T]) -> Result<usize> {
    let written = match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            write_json_lines(BufWriter::new(File::create(path)?), records)?
        },
        None => write_json_lines(io::stdout().lock(), records)?,
    };

    match path {
        Some(path) => info!("Wrote {} records to {}", written, path.display()),
        None => info!("Wrote {} records to stdout", written),
    }
    Ok(written)
}
