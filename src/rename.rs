//! Renames a book in place, refusing to clobber anything.
//!
//! The existence check and the rename are two separate syscalls,
//! so something created at the destination in between will be overwritten
//! on platforms where `rename` replaces its target. That's an acceptable
//! window for a tool run by hand on one's own library.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::*;

use crate::result::*;

/// Where `old` ends up when renamed to `new_name`: the same directory.
pub fn destination(old: &Path, new_name: &str) -> PathBuf {
    match old.parent() {
        Some(dir) => dir.join(new_name),
        None => PathBuf::from(new_name),
    }
}

/// True if anything (a file, a directory, even a dangling symlink)
/// lives at `path`.
///
/// Errors other than "not found" (a name that's too long,
/// a directory we can't search) are passed along.
pub fn occupied(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Renames `old` to `new_name` within its directory, returning the new path.
///
/// Fails with [`Error::Collision`] if the destination is taken,
/// leaving both files alone, and with [`Error::Rename`] if the OS says no
/// (including when it can't say whether the destination is taken).
pub fn rename(old: &Path, new_name: &str) -> Result<PathBuf> {
    let to = destination(old, new_name);
    let os_error = |source| Error::Rename {
        from: old.to_owned(),
        to: to.clone(),
        source,
    };

    if occupied(&to).map_err(os_error)? {
        return Err(Error::Collision(to));
    }

    debug!("Renaming {} to {}", old.display(), to.display());
    fs::rename(old, &to).map_err(os_error)?;
    Ok(to)
}
