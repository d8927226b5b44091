//! Container handle: a ZIP archive opened once per invocation, with listing
//! and guarded entry reads.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::error::{EntryError, ThumbnailError};
use crate::security::{self, SecurityLimits};

/// One file entry of the container, as listed in the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
}

pub struct CoverArchive<R: Read + Seek> {
    zip: zip::ZipArchive<R>,
    limits: SecurityLimits,
}

impl CoverArchive<BufReader<File>> {
    /// Open a container from disk.
    pub fn open(path: &Path, limits: &SecurityLimits) -> Result<Self, ThumbnailError> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file), limits.clone())
    }
}

impl<R: Read + Seek> CoverArchive<R> {
    pub fn new(reader: R, limits: SecurityLimits) -> Result<Self, ThumbnailError> {
        let zip = zip::ZipArchive::new(reader)
            .map_err(|e| ThumbnailError::InvalidArchive(e.to_string()))?;
        security::check_file_count(zip.len() as u64, &limits)?;
        Ok(Self { zip, limits })
    }

    /// File entries in archive listing order. Directory entries are skipped.
    pub fn entries(&mut self) -> Vec<ArchiveEntry> {
        let mut entries = Vec::with_capacity(self.zip.len());
        for i in 0..self.zip.len() {
            match self.zip.by_index_raw(i) {
                Ok(file) if !file.is_dir() => entries.push(ArchiveEntry {
                    name: file.name().to_string(),
                    size: file.size(),
                }),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable archive entry #{}: {}", i, e),
            }
        }
        entries
    }

    /// Read the full contents of an entry.
    pub fn read_entry(&mut self, path: &str) -> Result<Vec<u8>, EntryError> {
        security::check_path_traversal(path)?;

        let mut file = self.zip.by_name(path).map_err(|e| match e {
            zip::result::ZipError::FileNotFound => EntryError::Missing(path.to_string()),
            other => EntryError::Read {
                path: path.to_string(),
                detail: other.to_string(),
            },
        })?;

        security::check_entry_size(path, file.size(), &self.limits)?;
        security::check_compression_ratio(file.compressed_size(), file.size(), &self.limits)?;

        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf).map_err(|e| EntryError::Read {
            path: path.to_string(),
            detail: e.to_string(),
        })?;
        Ok(buf)
    }
}

/// In-memory container builders shared by the unit tests.
#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};

    use super::CoverArchive;
    use crate::security::SecurityLimits;

    /// Build a container from `(name, bytes)` pairs, stored uncompressed so
    /// entry sizes are exactly the byte lengths given.
    pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let opts: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        for (name, data) in files {
            zip.start_file(*name, opts).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    pub fn archive(files: &[(&str, &[u8])]) -> CoverArchive<Cursor<Vec<u8>>> {
        CoverArchive::new(Cursor::new(zip_bytes(files)), SecurityLimits::default()).unwrap()
    }

    pub fn container_xml(rootfile: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="{rootfile}" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#
        )
    }

    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 90, 160]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Jpeg).unwrap();
        out.into_inner()
    }

    /// Four-component JPEG, as produced by print workflows.
    pub fn cmyk_jpeg_bytes(width: u16, height: u16) -> Vec<u8> {
        let pixels: Vec<u8> = (0..usize::from(width) * usize::from(height))
            .flat_map(|_| [20u8, 140, 200, 10])
            .collect();
        let mut out = Vec::new();
        jpeg_encoder::Encoder::new(&mut out, 90)
            .encode(&pixels, width, height, jpeg_encoder::ColorType::Cmyk)
            .unwrap();
        out
    }
}
