//! Manifest strategy: container.xml → package document → declared cover item.

use std::io::{Read, Seek};

use percent_encoding::percent_decode_str;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;

use crate::archive::CoverArchive;
use crate::error::{EntryError, ResolveError, SecurityError};
use crate::resolve::has_image_extension;

pub const CONTAINER_PATH: &str = "META-INF/container.xml";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ManifestItem {
    id: String,
    href: String,
}

/// What the package document says about its cover.
#[derive(Debug, Default)]
struct PackageCover {
    cover_id: Option<String>,
    /// `None` when the document has no `manifest` element at all.
    items: Option<Vec<ManifestItem>>,
}

pub fn cover_from_manifest<R: Read + Seek>(
    archive: &mut CoverArchive<R>,
) -> Result<Option<String>, ResolveError> {
    let container = archive.read_entry(CONTAINER_PATH).map_err(|e| match e {
        EntryError::Missing(_) => ResolveError::MalformedContainer {
            path: CONTAINER_PATH.into(),
            detail: "entry is missing".into(),
        },
        other => other.into(),
    })?;
    let container = decode_document(CONTAINER_PATH, container)?;
    let rootfile_path = find_rootfile(&container)?;
    tracing::debug!("Rootfile: {}", rootfile_path);

    let package = archive.read_entry(&rootfile_path)?;
    let package = decode_document(&rootfile_path, package)?;
    let cover = parse_package(&package, &rootfile_path)?;

    let Some(items) = cover.items else {
        tracing::debug!("{} has no manifest element", rootfile_path);
        return Ok(None);
    };

    let cover_id = cover.cover_id.as_deref();
    match items.iter().find(|item| item_matches(item, cover_id)) {
        Some(item) => resolve_href(&rootfile_path, &item.href).map(Some),
        None => Ok(None),
    }
}

/// An item is the cover when its id is the declared cover id, or when its id
/// mentions "cover" and it points at an image.
fn item_matches(item: &ManifestItem, cover_id: Option<&str>) -> bool {
    cover_id.is_some_and(|id| item.id == id)
        || (item.id.contains("cover") && has_image_extension(&item.href))
}

/// Decode an XML entry to text. UTF-16 is recognized by its byte order mark;
/// everything else must be UTF-8.
fn decode_document(path: &str, bytes: Vec<u8>) -> Result<String, ResolveError> {
    let malformed = |detail: String| ResolveError::MalformedContainer {
        path: path.to_string(),
        detail,
    };

    let endian: fn([u8; 2]) -> u16 = if bytes.starts_with(b"\xFF\xFE") {
        u16::from_le_bytes
    } else if bytes.starts_with(b"\xFE\xFF") {
        u16::from_be_bytes
    } else {
        let mut text = String::from_utf8(bytes).map_err(|e| malformed(format!("invalid UTF-8: {e}")))?;
        if text.starts_with('\u{feff}') {
            text.remove(0);
        }
        return Ok(text);
    };

    let body = &bytes[2..];
    if body.len() % 2 != 0 {
        return Err(malformed("UTF-16 data has an odd number of bytes".into()));
    }
    let units: Vec<u16> = body.chunks_exact(2).map(|c| endian([c[0], c[1]])).collect();
    String::from_utf16(&units).map_err(|e| malformed(format!("invalid UTF-16: {e}")))
}

fn unclosed(path: &str, depth: usize) -> ResolveError {
    ResolveError::MalformedContainer {
        path: path.to_string(),
        detail: format!("document ends with {depth} unclosed element(s)"),
    }
}

fn attr_value(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .map(|attr| match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        })
}

/// `full-path` of the first `rootfile` element. The whole document must parse.
fn find_rootfile(container: &str) -> Result<String, ResolveError> {
    let mut reader = XmlReader::from_str(container);
    let mut buf = Vec::new();
    let mut rootfile: Option<Option<String>> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                if rootfile.is_none() && e.local_name().as_ref() == b"rootfile" {
                    rootfile = Some(attr_value(e, b"full-path"));
                }
            }
            Ok(Event::Empty(ref e)) => {
                if rootfile.is_none() && e.local_name().as_ref() == b"rootfile" {
                    rootfile = Some(attr_value(e, b"full-path"));
                }
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) if depth > 0 => return Err(unclosed(CONTAINER_PATH, depth)),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ResolveError::MalformedContainer {
                    path: CONTAINER_PATH.into(),
                    detail: e.to_string(),
                });
            }
            _ => {}
        }
        buf.clear();
    }

    match rootfile.flatten() {
        Some(path) if !path.is_empty() => Ok(path),
        _ => Err(ResolveError::MissingRootfile),
    }
}

/// Streaming state while scanning a package document.
#[derive(Default)]
struct PackageScan {
    cover: PackageCover,
    cover_meta_seen: bool,
    in_manifest: bool,
}

impl PackageScan {
    fn open(&mut self, e: &BytesStart<'_>, self_closing: bool) {
        match e.local_name().as_ref() {
            b"meta" if !self.cover_meta_seen => {
                if attr_value(e, b"name").as_deref() == Some("cover") {
                    self.cover_meta_seen = true;
                    // A missing or empty `content` declares no id, so id-less
                    // manifest items never match it.
                    self.cover.cover_id = attr_value(e, b"content").filter(|id| !id.is_empty());
                }
            }
            b"manifest" if self.cover.items.is_none() => {
                self.cover.items = Some(Vec::new());
                self.in_manifest = !self_closing;
            }
            b"item" if self.in_manifest => {
                if let Some(items) = self.cover.items.as_mut() {
                    items.push(ManifestItem {
                        id: attr_value(e, b"id").unwrap_or_default(),
                        href: attr_value(e, b"href").unwrap_or_default(),
                    });
                }
            }
            _ => {}
        }
    }
}

fn parse_package(content: &str, path: &str) -> Result<PackageCover, ResolveError> {
    let mut reader = XmlReader::from_str(content);
    let mut buf = Vec::new();
    let mut scan = PackageScan::default();
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                scan.open(e, false);
            }
            Ok(Event::Empty(ref e)) => scan.open(e, true),
            Ok(Event::End(ref e)) => {
                depth = depth.saturating_sub(1);
                if e.local_name().as_ref() == b"manifest" {
                    scan.in_manifest = false;
                }
            }
            Ok(Event::Eof) if depth > 0 => return Err(unclosed(path, depth)),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ResolveError::MalformedContainer {
                    path: path.to_string(),
                    detail: e.to_string(),
                });
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(scan.cover)
}

/// Join a manifest href onto the directory holding the package document.
///
/// The href is percent-decoded and `.`/`..` segments are folded; an href that
/// climbs above the container root is rejected.
fn resolve_href(rootfile_path: &str, href: &str) -> Result<String, ResolveError> {
    let decoded = percent_decode_str(href)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| href.to_string());

    let mut segments: Vec<&str> = if decoded.starts_with('/') {
        Vec::new()
    } else {
        match rootfile_path.rfind('/') {
            Some(i) => rootfile_path[..i].split('/').filter(|s| !s.is_empty()).collect(),
            None => Vec::new(),
        }
    };

    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(SecurityError::PathTraversal {
                        path: format!("{rootfile_path} -> {href}"),
                    }
                    .into());
                }
            }
            s => segments.push(s),
        }
    }

    Ok(segments.join("/"))
}
