//! End-to-end thumbnail generation: open the container, walk the strategy
//! chain until a candidate renders, then write the PNG.

use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::archive::CoverArchive;
use crate::error::ThumbnailError;
use crate::extract::{extract_cover, ResizeFilter, Thumbnail};
use crate::resolve::{CoverCandidate, CoverStrategy, Resolution};
use crate::security::SecurityLimits;

pub const DEFAULT_SIZE: u32 = 200;

#[derive(Debug, Clone)]
pub struct ThumbnailOptions {
    /// Longest edge of the output, in pixels.
    pub size: u32,
    pub filter: ResizeFilter,
    pub security: SecurityLimits,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            filter: ResizeFilter::default(),
            security: SecurityLimits::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub strategy: CoverStrategy,
    pub cover_path: String,
    pub source_width: u32,
    pub source_height: u32,
    pub source_color: String,
    pub width: u32,
    pub height: u32,
}

/// Render the cover of `input` into a PNG at `output`.
///
/// Nothing is written unless a cover was found and rendered.
pub fn generate_thumbnail(
    input: &Path,
    output: &Path,
    opts: &ThumbnailOptions,
) -> Result<ThumbnailReport, ThumbnailError> {
    if opts.size == 0 {
        return Err(ThumbnailError::InvalidSize(opts.size));
    }

    let mut archive = CoverArchive::open(input, &opts.security)?;
    let (candidate, thumb) =
        render_cover(&mut archive, opts).ok_or_else(|| ThumbnailError::NoCoverFound {
            input: input.to_path_buf(),
        })?;

    write_atomically(output, &thumb.png)?;
    tracing::info!(
        "Wrote {}x{} thumbnail of {} ({} strategy) to {}",
        thumb.width,
        thumb.height,
        candidate.path,
        candidate.strategy,
        output.display()
    );

    Ok(ThumbnailReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        strategy: candidate.strategy,
        cover_path: candidate.path,
        source_width: thumb.source_width,
        source_height: thumb.source_height,
        source_color: format!("{:?}", thumb.source_color),
        width: thumb.width,
        height: thumb.height,
    })
}

/// Try each strategy in order; the first candidate that renders wins.
pub fn render_cover<R: Read + Seek>(
    archive: &mut CoverArchive<R>,
    opts: &ThumbnailOptions,
) -> Option<(CoverCandidate, Thumbnail)> {
    for strategy in CoverStrategy::ALL {
        match strategy.resolve(archive) {
            Resolution::Found(candidate) => {
                tracing::debug!("Strategy '{}' proposed {}", strategy, candidate.path);
                match extract_cover(archive, &candidate.path, opts.size, opts.filter) {
                    Ok(thumb) => return Some((candidate, thumb)),
                    Err(e) => tracing::warn!("Strategy '{}' candidate unusable: {}", strategy, e),
                }
            }
            Resolution::NotFound => {
                tracing::debug!("Strategy '{}' found no cover", strategy);
            }
            Resolution::Failed(e) => {
                tracing::warn!("Strategy '{}' failed: {}", strategy, e);
            }
        }
    }
    None
}

/// Write through a temp file in the destination directory, then rename over
/// the target.
fn write_atomically(output: &Path, data: &[u8]) -> Result<(), ThumbnailError> {
    let dir = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(output).map_err(|e| e.error)?;
    Ok(())
}
