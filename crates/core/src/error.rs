use std::path::PathBuf;

/// Top-level error type. Only these reach the caller of `generate_thumbnail`.
#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error("No cover image found in {}", input.display())]
    NoCoverFound { input: PathBuf },

    #[error("Not a readable ZIP container: {0}")]
    InvalidArchive(String),

    #[error("Thumbnail size must be a positive number of pixels, got {0}")]
    InvalidSize(u32),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a single resolution strategy. Never fatal on its own.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Malformed container metadata in {path}: {detail}")]
    MalformedContainer { path: String, detail: String },

    #[error("No rootfile declared in META-INF/container.xml")]
    MissingRootfile,

    #[error("Missing archive entry: {0}")]
    MissingEntry(String),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("Archive error: {0}")]
    Archive(String),
}

/// Failure to turn a resolved candidate into a thumbnail. Never fatal on its own.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Missing archive entry: {0}")]
    MissingEntry(String),

    #[error("Unsupported image {path}: {detail}")]
    UnsupportedImage { path: String, detail: String },

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("Archive error: {0}")]
    Archive(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("ZIP bomb detected: decompression ratio {ratio}:1 exceeds limit {limit}:1")]
    ZipBomb { ratio: u64, limit: u64 },

    #[error("Path traversal detected in archive entry: {path}")]
    PathTraversal { path: String },

    #[error("Archive contains {count} files, exceeding limit of {limit}")]
    TooManyFiles { count: u64, limit: u64 },

    #[error("Entry {name} is {size_mb}MB, exceeding limit of {limit_mb}MB")]
    OversizedEntry {
        name: String,
        size_mb: u64,
        limit_mb: u64,
    },
}

/// Errors raised while reading a single archive entry. Converted into the
/// strategy or extraction error of whoever asked for the entry.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("Missing archive entry: {0}")]
    Missing(String),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("Failed to read {path}: {detail}")]
    Read { path: String, detail: String },
}

impl From<EntryError> for ResolveError {
    fn from(e: EntryError) -> Self {
        match e {
            EntryError::Missing(path) => ResolveError::MissingEntry(path),
            EntryError::Security(s) => ResolveError::Security(s),
            EntryError::Read { path, detail } => {
                ResolveError::Archive(format!("{path}: {detail}"))
            }
        }
    }
}

impl From<EntryError> for ExtractError {
    fn from(e: EntryError) -> Self {
        match e {
            EntryError::Missing(path) => ExtractError::MissingEntry(path),
            EntryError::Security(s) => ExtractError::Security(s),
            EntryError::Read { path, detail } => {
                ExtractError::Archive(format!("{path}: {detail}"))
            }
        }
    }
}
