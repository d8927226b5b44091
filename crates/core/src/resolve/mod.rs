//! Cover resolution: an ordered chain of strategies, each mapping a container
//! to an optional cover entry path.

pub mod filename;
pub mod manifest;

use std::io::{Read, Seek};

use serde::Serialize;

use crate::archive::CoverArchive;
use crate::error::ResolveError;

/// Image extensions a cover may carry (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

/// A way of locating the cover. Strategies run in the order of [`CoverStrategy::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CoverStrategy {
    /// Follow container.xml to the package document and its manifest.
    Manifest,
    /// Guess from entry names, then fall back to the largest image.
    Filename,
}

impl CoverStrategy {
    /// Publisher-declared metadata wins over guesses.
    pub const ALL: [CoverStrategy; 2] = [CoverStrategy::Manifest, CoverStrategy::Filename];

    pub fn name(&self) -> &'static str {
        match self {
            CoverStrategy::Manifest => "manifest",
            CoverStrategy::Filename => "filename",
        }
    }

    pub fn resolve<R: Read + Seek>(self, archive: &mut CoverArchive<R>) -> Resolution {
        let found = match self {
            CoverStrategy::Manifest => manifest::cover_from_manifest(archive),
            CoverStrategy::Filename => Ok(filename::cover_from_entries(&archive.entries())),
        };
        match found {
            Ok(Some(path)) => Resolution::Found(CoverCandidate {
                path,
                strategy: self,
            }),
            Ok(None) => Resolution::NotFound,
            Err(e) => Resolution::Failed(e),
        }
    }
}

impl std::fmt::Display for CoverStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An entry path hypothesized to be the cover, before extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverCandidate {
    pub path: String,
    pub strategy: CoverStrategy,
}

/// Outcome of running one strategy.
#[derive(Debug)]
pub enum Resolution {
    Found(CoverCandidate),
    NotFound,
    /// The strategy could not run to completion; the chain moves on.
    Failed(ResolveError),
}

/// First candidate produced by the chain.
///
/// No extraction is attempted, so an undecodable candidate is still returned
/// here. `thumbnail::render_cover` is the chain that falls through to the next
/// strategy when a candidate cannot be rendered.
pub fn resolve_cover<R: Read + Seek>(archive: &mut CoverArchive<R>) -> Option<CoverCandidate> {
    for strategy in CoverStrategy::ALL {
        match strategy.resolve(archive) {
            Resolution::Found(candidate) => return Some(candidate),
            Resolution::NotFound => {
                tracing::debug!("Strategy '{}' found no cover", strategy);
            }
            Resolution::Failed(e) => {
                tracing::debug!("Strategy '{}' failed: {}", strategy, e);
            }
        }
    }
    None
}

pub fn has_image_extension(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}
