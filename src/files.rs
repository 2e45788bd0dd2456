//! In-place rewrite plumbing for the command line tool. The formatted text
//! goes to a dot-prefixed temporary sibling first, the original is kept as a
//! `.untidy` backup, and the temporary is renamed into place, so a failure
//! never leaves the target half-written.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::io::Write;
use std::path::{Path, PathBuf};

// Temporary output name for `dir/name.bib`: `dir/.name.bib.tidy`.
fn tmp_path(file: &Path) -> PathBuf {
    let name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = format!(".{}.tidy", name.trim_start_matches('.'));
    match file.parent() {
        Some(parent) => parent.join(tmp),
        None => PathBuf::from(tmp),
    }
}

// Backup name for `dir/name.bib`: `dir/name.bib.untidy`.
fn backup_path(file: &Path) -> PathBuf {
    let mut backup = OsString::from(file.as_os_str());
    backup.push(".untidy");
    PathBuf::from(backup)
}

/// Replace `file` with `contents`, keeping the previous version as a
/// `.untidy` backup and preserving the file permissions. If the final
/// rename fails, the original file is restored.
pub fn replace<P: AsRef<Path>>(file: P, contents: &str) -> Result<(), io::Error> {
    let file = file.as_ref();
    let tmp = tmp_path(file);
    let backup = backup_path(file);

    {
        let mut out = fs::File::create(&tmp)?;
        out.write_all(contents.as_bytes())?;
    }
    if let Ok(meta) = fs::metadata(file) {
        let _ = fs::set_permissions(&tmp, meta.permissions());
    }

    let _ = fs::remove_file(&backup);
    fs::rename(file, &backup)?;
    if let Err(err) = fs::rename(&tmp, file) {
        let _ = fs::rename(&backup, file);
        return Err(err);
    }
    Ok(())
}
