use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Copy every file under `from` into `to`, keeping relative paths and
/// overwriting same-named files. Returns the number of files copied; a
/// missing `from` copies nothing.
pub fn copy_tree(from: &Path, to: &Path) -> io::Result<usize> {
    if !from.exists() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(io::Error::other)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(from).map_err(io::Error::other)?;
        let dest = to.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &dest)?;
        copied += 1;
    }

    Ok(copied)
}
