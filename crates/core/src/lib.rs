pub mod archive;
pub mod config;
pub mod error;
pub mod extract;
pub mod resolve;
pub mod security;
pub mod thumbnail;

pub mod prelude {
    pub use crate::error::*;
    pub use crate::resolve::{resolve_cover, CoverCandidate, CoverStrategy};
    pub use crate::thumbnail::{generate_thumbnail, ThumbnailOptions, ThumbnailReport};
}
