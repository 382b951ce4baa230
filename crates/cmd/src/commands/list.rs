use anyhow::{Context, Result};
use dcosfs::{DcosFilesystem, EntryType, StatSnapshot};

fn type_char(kind: Option<EntryType>) -> char {
    match kind {
        Some(EntryType::Directory) => 'd',
        Some(EntryType::Symlink) => 'l',
        _ => '-',
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

fn format_entry(fs: &DcosFilesystem, path: &str, name: &str, stat: &StatSnapshot, long: bool) -> String {
    if !long {
        return match stat.entry_type() {
            Some(EntryType::Directory) => format!("{name}/"),
            _ => name.to_string(),
        };
    }
    let mut line = format!(
        "{}{:o} {:>10} {}",
        type_char(stat.entry_type()),
        stat.permissions(),
        stat.size_bytes(),
        name
    );
    if stat.entry_type() == Some(EntryType::Symlink) {
        if let Ok(target) = fs.readlink(path) {
            line.push_str(" -> ");
            line.push_str(&target);
        }
    }
    line
}

/// Lists `path` the way `ls` would, one line per entry, through `handler`.
///
/// A directory lists its entries; anything else lists itself.
pub fn list_command<F>(fs: &DcosFilesystem, path: &str, long: bool, mut handler: F) -> Result<()>
where
    F: FnMut(String),
{
    diagnostics::debug!("Listing {path}", path: path);
    let stat = fs
        .getattr(path)
        .with_context(|| format!("Cannot access {path}"))?;

    if stat.entry_type() != Some(EntryType::Directory) {
        handler(format_entry(fs, path, path, &stat, long));
        return Ok(());
    }

    let entries = fs
        .list_entries(path)
        .with_context(|| format!("Cannot list {path}"))?;
    for (name, _) in entries {
        let child = join(path, &name);
        let stat = fs
            .getattr(&child)
            .with_context(|| format!("Cannot access {child}"))?;
        handler(format_entry(fs, &child, &name, &stat, long));
    }
    Ok(())
}
