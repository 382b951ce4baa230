use std::io::Write;

use anyhow::{Context, Result};
use dcosfs::DcosFilesystem;

/// Bytes requested per read.
const CHUNK_SIZE: u64 = 64 * 1024;

/// Copies the file at `path` to `output`, returning the number of bytes
/// written.
///
/// Reads until the remote returns a short chunk rather than trusting the
/// stat size, which may lag behind a growing log.
pub fn cat_command<W: Write>(fs: &DcosFilesystem, path: &str, output: &mut W) -> Result<u64> {
    let handle = fs.open(path, 0).with_context(|| format!("Cannot open {path}"))?;

    let mut offset = 0u64;
    loop {
        let chunk = fs
            .read(path, CHUNK_SIZE, offset, handle)
            .with_context(|| format!("Failed to read {path} at offset {offset}"))?;
        if chunk.is_empty() {
            break;
        }
        output.write_all(&chunk).context("Failed to write output")?;
        offset += chunk.len() as u64;
        if (chunk.len() as u64) < CHUNK_SIZE {
            break;
        }
    }
    output.flush().context("Failed to write output")?;

    diagnostics::debug!("Read {offset} bytes from {path}", offset: offset, path: path);
    Ok(offset)
}
