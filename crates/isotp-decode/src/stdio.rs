use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use eyre::WrapErr;

/// The file to use, or `None` for stdin/stdout
///
/// Both a missing path and `-` mean stdin/stdout.
fn file_path(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| p.as_os_str() != "-")
}

/// Open the transcript at the given path for line-by-line reading
///
/// If `-` or if `None`, read stdin.
pub fn open_transcript(input: &Option<PathBuf>) -> eyre::Result<Box<dyn BufRead>> {
    let Some(path) = file_path(input) else {
        return Ok(Box::new(std::io::stdin().lock()));
    };
    let file = File::open(path).wrap_err(format!("Failed to open transcript: {path:?}"))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Get a writer for the decoded messages
///
/// If `-` or if `None`, use stdout, otherwise create (or truncate) the given file. The writer is
/// _not_ buffered; the caller decides whether to buffer, and when to flush.
pub fn open_output(output: &Option<PathBuf>) -> eyre::Result<Box<dyn Write>> {
    let Some(path) = file_path(output) else {
        return Ok(Box::new(std::io::stdout().lock()));
    };
    let file = File::create(path).wrap_err(format!("Failed to create output file: {path:?}"))?;
    Ok(Box::new(file))
}
