use async_trait::async_trait;

mod client;
mod map;
mod text;

pub use client::{
    AniListClient, CatalogConfig, CoverImage, Media, MediaTitle, ANILIST_ENDPOINT,
    DEFAULT_PER_PAGE,
};
pub use map::{choose_title, join_genres, NewAnime, SkipReason, UNKNOWN_TITLE};
pub use text::clean_description;

use crate::season::SeasonBucket;

/// Why a single catalog page could not be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("GraphQL error: {0}")]
    Query(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Decoded records of one page plus the elements that failed to decode.
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub media: Vec<Media>,
    pub malformed: usize,
}

impl CatalogPage {
    /// True only when the catalog returned no elements at all.
    pub fn is_empty(&self) -> bool {
        self.media.is_empty() && self.malformed == 0
    }
}

impl From<Vec<Media>> for CatalogPage {
    fn from(media: Vec<Media>) -> Self {
        Self {
            media,
            malformed: 0,
        }
    }
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch one 1-indexed page of a season bucket. An empty page means the
    /// result set is exhausted.
    async fn fetch_page(&self, bucket: SeasonBucket, page: u32) -> Result<CatalogPage, FetchError>;
}
