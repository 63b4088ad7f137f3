//! epub-renamer gives EPUB files sensible names, `Title - Author.epub`,
//! using the metadata stored inside each book:
//!
//! ```no_run
//! # use std::path::Path;
//! # use epub_renamer::*;
//! let metadata = batch::read_metadata(Path::new("a1b2c3.epub"))?;
//! let new_name = generate(&metadata.title, &metadata.creator);
//! rename::rename(Path::new("a1b2c3.epub"), &new_name)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! An EPUB is a ZIP archive. Its `META-INF/container.xml` names a package
//! document (usually something like `OEBPS/content.opf`), which in turn
//! holds Dublin Core `<dc:title>` and `<dc:creator>` elements.
//! Getting from the path to the new name goes:
//!
//! 1. [`archive`]: memory-map the file and look entries up by exact name.
//! 2. [`container`]: find the package document's path.
//! 3. [`metadata`]: scan the package document for title and creator.
//!    Missing fields are empty, not errors.
//! 4. [`sanitize`] and [`filename`]: make both safe for a filesystem
//!    and glue them together, with defaults for whatever's missing.
//! 5. [`rename`]: move the file within its directory,
//!    unless something's already there.
//!
//! [`batch`] strings these together for a list of files,
//! carrying on past any that fail.

pub mod archive;
pub mod batch;
pub mod container;
pub mod filename;
pub mod metadata;
pub mod rename;
pub mod result;
pub mod sanitize;

pub use archive::{ArchiveFile, ZipArchive};
pub use filename::{generate, FilenameCandidate};
pub use metadata::PackageMetadata;
pub use sanitize::sanitize;

mod crc_reader;
mod records;
