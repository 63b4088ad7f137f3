//! Runs the whole pipeline over one book, or many, one at a time.

use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use log::*;

use crate::archive::{ArchiveFile, ZipArchive};
use crate::container::{self, CONTAINER_PATH};
use crate::filename;
use crate::metadata::{self, PackageMetadata};
use crate::rename;
use crate::result::*;

/// What happened to a book that didn't fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The book now lives at this path.
    Renamed(PathBuf),
    /// Dry run: the book would have been moved here.
    WouldRename(PathBuf),
}

/// The result of processing one input path
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub result: Result<Outcome>,
}

impl FileReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// Opens the book at `path` and reads its title and author.
///
/// The archive is unmapped before this returns, whether or not it succeeds.
pub fn read_metadata(path: &Path) -> Result<PackageMetadata> {
    let open_error = |source| Error::ArchiveOpen {
        path: path.to_owned(),
        source,
    };
    let file = ArchiveFile::open(path).map_err(open_error)?;
    let archive = file.archive().map_err(open_error)?;

    let container = read_named(&archive, CONTAINER_PATH)?;
    let package_path = container::root_file_path(&container)?;
    debug!("Package document is at {}", package_path);
    let package = read_named(&archive, &package_path)?;

    Ok(metadata::extract(&package))
}

/// Looks up the entry named exactly `name` and reads it all.
fn read_named(archive: &ZipArchive, name: &str) -> Result<Vec<u8>> {
    let entry = archive
        .find_entry(name)
        .ok_or_else(|| Error::EntryNotFound(Utf8PathBuf::from(name)))?;
    archive.read_entry(entry).map_err(|source| Error::EntryRead {
        name: Utf8PathBuf::from(name),
        source,
    })
}

/// Renames one book (or, if `dry_run`, works out what it would be renamed to).
pub fn process_file(path: &Path, dry_run: bool) -> Result<Outcome> {
    info!("Processing {}", path.display());
    if !path.exists() {
        return Err(Error::InputNotFound(path.to_owned()));
    }

    let metadata = read_metadata(path)?;
    let new_name = filename::generate(&metadata.title, &metadata.creator);

    if dry_run {
        let to = rename::destination(path, &new_name);
        match rename::occupied(&to) {
            Ok(true) => warn!("{} already exists; a real run would fail", to.display()),
            Ok(false) => {}
            Err(e) => warn!("Can't check {}: {}; a real run would fail", to.display(), e),
        }
        return Ok(Outcome::WouldRename(to));
    }

    rename::rename(path, &new_name).map(Outcome::Renamed)
}

/// Processes each path in turn.
///
/// A failure is recorded in that path's report and doesn't stop the rest.
/// Reports come back in the same order as `paths`.
pub fn process_all<I, P>(paths: I, dry_run: bool) -> Vec<FileReport>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    paths
        .into_iter()
        .map(|path| {
            let path = path.as_ref();
            let result = process_file(path, dry_run);
            if let Err(e) = &result {
                debug!("{} failed: {:?}", path.display(), e);
            }
            FileReport {
                path: path.to_owned(),
                result,
            }
        })
        .collect()
}
