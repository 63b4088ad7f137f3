//! Finds the package document through `META-INF/container.xml`.
//!
//! ```xml
//! <container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
//!   <rootfiles>
//!     <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
//!   </rootfiles>
//! </container>
//! ```
//!
//! Books may list several renditions; only the first `rootfile` counts.

use log::*;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::result::*;

/// Where every EPUB keeps its container document
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Returns the `full-path` of the first `rootfile` in the container document.
///
/// Elements are matched by local name, so namespace prefixes don't matter.
/// The whole document is read, so malformed markup after the first
/// `rootfile` is still reported as [`Error::Parse`].
pub fn root_file_path(container: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(container);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut saw_element = false;
    let mut depth = 0usize;
    // Some(..) once we've met the first rootfile, holding its full-path if it had one.
    let mut first_rootfile: Option<Option<String>> = None;

    loop {
        let event = reader.read_event_into(&mut buf);
        match event {
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            _ => {}
        }
        match event {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                saw_element = true;
                if e.local_name().as_ref() == b"rootfile" {
                    let full_path = full_path(&e)?;
                    if first_rootfile.is_none() {
                        trace!("First rootfile has full-path {:?}", full_path);
                        first_rootfile = Some(full_path);
                    } else {
                        debug!("Ignoring additional rootfile {:?}", full_path);
                    }
                }
            }
            Ok(Event::Eof) if depth > 0 => {
                return Err(Error::Parse(format!(
                    "unexpected end of document with {} element(s) still open",
                    depth
                )))
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Parse(format!(
                    "{} at byte {}",
                    e,
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !saw_element {
        return Err(Error::Parse(String::from("no elements in document")));
    }
    match first_rootfile.flatten() {
        Some(path) if !path.trim().is_empty() => Ok(path),
        _ => Err(Error::MissingRootfile),
    }
}

/// Pulls the (unescaped) `full-path` attribute off a `rootfile` element.
fn full_path(rootfile: &BytesStart) -> Result<Option<String>> {
    for attr in rootfile.attributes() {
        let attr = attr.map_err(|e| Error::Parse(e.to_string()))?;
        if attr.key.local_name().as_ref() == b"full-path" {
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
