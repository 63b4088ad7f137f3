use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

use epub_renamer::batch::{self, Outcome};
use epub_renamer::result::Error;

const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn package(metadata: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="id">urn:uuid:7a0b3c2e-1f5d-4e8a-9c6b-2d4f8e1a3b5c</dc:identifier>
    {metadata}
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="ch1" href="ch1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine><itemref idref="ch1"/></spine>
</package>"#
    )
}

/// Writes a ZIP with the given entries the way EPUB tools do:
/// `mimetype` stored first, everything else deflated.
fn write_zip(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
    let mut zip = ZipWriter::new(File::create(path)?);
    let stored: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated: FileOptions<'_, ()> =
        FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored)?;
    zip.write_all(b"application/epub+zip")?;
    for (name, contents) in entries {
        zip.start_file(*name, deflated)?;
        zip.write_all(contents.as_bytes())?;
    }
    zip.finish()?;
    Ok(())
}

fn write_epub(dir: &Path, file_name: &str, metadata: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);
    let opf = package(metadata);
    write_zip(
        &path,
        &[
            ("META-INF/container.xml", CONTAINER),
            ("OEBPS/content.opf", opf.as_str()),
            ("OEBPS/ch1.xhtml", "<html><body><p>A beginning is the time...</p></body></html>"),
        ],
    )?;
    Ok(path)
}

#[test]
fn smoke() -> Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let book = write_epub(
        dir.path(),
        "a1b2c3.epub",
        "<dc:title>Dune</dc:title><dc:creator>Frank Herbert</dc:creator>",
    )?;

    let metadata = batch::read_metadata(&book)?;
    assert_eq!(metadata.title, "Dune");
    assert_eq!(metadata.creator, "Frank Herbert");

    let renamed = dir.path().join("Dune - Frank Herbert.epub");
    assert_eq!(
        batch::process_file(&book, false)?,
        Outcome::Renamed(renamed.clone())
    );
    assert!(!book.exists());
    assert!(renamed.exists());

    // The renamed book is still a perfectly good book.
    assert_eq!(batch::read_metadata(&renamed)?.title, "Dune");
    Ok(())
}

#[test]
fn missing_metadata_gets_defaults() -> Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let book = write_epub(dir.path(), "untitled.epub", "")?;

    assert_eq!(
        batch::process_file(&book, false)?,
        Outcome::Renamed(dir.path().join("Unknown Title - Unknown Author.epub"))
    );
    Ok(())
}

#[test]
fn long_non_ascii_titles_still_fit() -> Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let title = "日".repeat(90);
    let book = write_epub(
        dir.path(),
        "a1b2c3.epub",
        &format!("<dc:title>{title}</dc:title><dc:creator>著者</dc:creator>"),
    )?;

    let expected = format!("{} - 著者.epub", "日".repeat(33));
    assert!(expected.len() <= 255);
    assert_eq!(
        batch::process_file(&book, false)?,
        Outcome::Renamed(dir.path().join(&expected))
    );
    assert!(dir.path().join(&expected).exists());
    Ok(())
}

#[test]
fn dry_run_touches_nothing() -> Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let book = write_epub(
        dir.path(),
        "a1b2c3.epub",
        "<dc:title>My Book: Part 1</dc:title><dc:creator>Jane Doe</dc:creator>",
    )?;

    assert_eq!(
        batch::process_file(&book, true)?,
        Outcome::WouldRename(dir.path().join("My Book_ Part 1 - Jane Doe.epub"))
    );
    assert!(book.exists());
    assert_eq!(fs::read_dir(dir.path())?.count(), 1);
    Ok(())
}

#[test]
fn collision_leaves_both_files() -> Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let metadata = "<dc:title>Dune</dc:title><dc:creator>Frank Herbert</dc:creator>";
    let first = write_epub(dir.path(), "first.epub", metadata)?;
    let second = write_epub(dir.path(), "second.epub", metadata)?;

    batch::process_file(&first, false)?;
    let taken = dir.path().join("Dune - Frank Herbert.epub");
    let before = fs::read(&taken)?;

    match batch::process_file(&second, false) {
        Err(Error::Collision(p)) => assert_eq!(p, taken),
        other => panic!("Expected a collision, got {:?}", other),
    }
    assert!(second.exists());
    assert_eq!(fs::read(&taken)?, before);
    Ok(())
}

#[test]
fn pipeline_errors() -> Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;

    let not_a_zip = dir.path().join("not-a-zip.epub");
    fs::write(&not_a_zip, "I am a text file")?;
    assert!(matches!(
        batch::process_file(&not_a_zip, false),
        Err(Error::ArchiveOpen { .. })
    ));

    let no_container = dir.path().join("no-container.epub");
    write_zip(&no_container, &[("OEBPS/content.opf", package("").as_str())])?;
    match batch::process_file(&no_container, false) {
        Err(Error::EntryNotFound(name)) => assert_eq!(name.as_str(), "META-INF/container.xml"),
        other => panic!("Expected a missing container, got {:?}", other),
    }

    let no_package = dir.path().join("no-package.epub");
    write_zip(&no_package, &[("META-INF/container.xml", CONTAINER)])?;
    match batch::process_file(&no_package, false) {
        Err(Error::EntryNotFound(name)) => assert_eq!(name.as_str(), "OEBPS/content.opf"),
        other => panic!("Expected a missing package document, got {:?}", other),
    }

    let bad_container = dir.path().join("bad-container.epub");
    write_zip(
        &bad_container,
        &[("META-INF/container.xml", "<container><rootfiles></container>")],
    )?;
    assert!(matches!(
        batch::process_file(&bad_container, false),
        Err(Error::Parse(_))
    ));

    let no_rootfile = dir.path().join("no-rootfile.epub");
    write_zip(
        &no_rootfile,
        &[(
            "META-INF/container.xml",
            "<container><rootfiles><rootfile/></rootfiles></container>",
        )],
    )?;
    assert!(matches!(
        batch::process_file(&no_rootfile, false),
        Err(Error::MissingRootfile)
    ));

    assert!(matches!(
        batch::process_file(&dir.path().join("nowhere.epub"), false),
        Err(Error::InputNotFound(_))
    ));

    // Nothing got renamed along the way.
    for path in [&not_a_zip, &no_container, &no_package, &bad_container, &no_rootfile] {
        assert!(path.exists(), "{} went missing", path.display());
    }
    Ok(())
}

#[test]
fn batch_carries_on_after_failures() -> Result<()> {
    init_logging();
    let dir = tempfile::tempdir()?;
    let dune = write_epub(
        dir.path(),
        "1.epub",
        "<dc:title>Dune</dc:title><dc:creator>Frank Herbert</dc:creator>",
    )?;
    let broken = dir.path().join("2.epub");
    fs::write(&broken, "not a zip")?;
    let missing = dir.path().join("3.epub");
    let hyperion = write_epub(
        dir.path(),
        "4.epub",
        "<dc:creator>Dan Simmons</dc:creator><dc:title>Hyperion</dc:title>",
    )?;

    let reports = batch::process_all([&dune, &broken, &missing, &hyperion], false);
    let paths: Vec<&Path> = reports.iter().map(|r| r.path.as_path()).collect();
    assert_eq!(paths, [&dune, &broken, &missing, &hyperion]);

    let outcomes: Vec<bool> = reports.iter().map(|r| r.succeeded()).collect();
    assert_eq!(outcomes, [true, false, false, true]);

    assert!(dir.path().join("Dune - Frank Herbert.epub").exists());
    assert!(dir.path().join("Hyperion - Dan Simmons.epub").exists());
    assert!(broken.exists());
    Ok(())
}
