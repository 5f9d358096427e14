//! `tikzsvg extract`: print the source carried by an image.

use anyhow::{Context, Result, bail};
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::artifact::extract;

pub fn extract_source(file: &Path) -> Result<()> {
    let bytes = fs::read(file).with_context(|| format!("Failed to read `{}`", file.display()))?;
    let Some(source) = extract(&bytes) else {
        bail!("no embedded TikZ source in `{}`", file.display());
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(source.as_bytes())?;
    if !source.is_empty() && !source.ends_with('\n') {
        stdout.write_all(b"\n")?;
    }
    stdout.flush()?;
    Ok(())
}
