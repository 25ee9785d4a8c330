//! Report writers.
//!
//! The summary normally goes to stdout at shutdown; the CLI can also keep a
//! copy on disk.

use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write a rendered summary to any writer, followed by a newline
pub fn write_report(writer: &mut impl Write, summary: &str) -> Result<(), OutputError> {
    writeln!(writer, "{}", summary)?;
    writer.flush()?;
    Ok(())
}

/// Save a rendered summary to `path`, replacing any existing file
///
/// # Errors
/// * `OutputError::InvalidPath` - `path` is empty, names a directory, or
///   its parent directory cannot be created
/// * `OutputError::WriteFailed` - the file cannot be created or written
pub fn write_report_file(summary: &str, path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    validate_output_path(path)?;
    ensure_parent_dir(path)?;

    let mut report = BufWriter::new(File::create(path)?);
    write_report(&mut report, summary)?;

    info!(
        "Saved spike report to {} ({} lines)",
        path.display(),
        summary.lines().count()
    );
    Ok(())
}

/// Reject paths a report can never be saved to
pub fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("no report path given".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "{} is a directory, expected a report file",
            path.display()
        )));
    }

    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<(), OutputError> {
    let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    if dir.exists() {
        return Ok(());
    }

    debug!("Creating report directory {}", dir.display());
    fs::create_dir_all(dir).map_err(|e| {
        OutputError::InvalidPath(format!("cannot create {}: {}", dir.display(), e))
    })
}
