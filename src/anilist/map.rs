use super::client::{Media, MediaTitle};
use super::text::clean_description;

pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Column values for one `anime` row, minus the storage-managed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnime {
    pub anilist_id: i32,
    pub title: String,
    pub title_english: Option<String>,
    pub title_romaji: Option<String>,
    pub description: String,
    pub cover_image: Option<String>,
    pub banner_image: Option<String>,
    pub status: Option<String>,
    pub format: Option<String>,
    pub episodes: Option<i32>,
    pub duration: Option<i32>,
    pub season: Option<String>,
    pub season_year: Option<i32>,
    pub genres: Option<String>,
    pub score: Option<f64>,
    pub popularity: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("record has no AniList id")]
    MissingId,
    #[error("record has invalid AniList id {0}")]
    InvalidId(i32),
}

impl NewAnime {
    pub fn from_media(media: Media) -> Result<Self, SkipReason> {
        let anilist_id = match media.id {
            None => return Err(SkipReason::MissingId),
            Some(id) if id <= 0 => return Err(SkipReason::InvalidId(id)),
            Some(id) => id,
        };

        let title = media.title.unwrap_or_default();
        let resolved = choose_title(&title);

        Ok(Self {
            anilist_id,
            title: resolved,
            title_english: title.english,
            title_romaji: title.romaji,
            description: clean_description(media.description.as_deref()),
            cover_image: media.cover_image.and_then(|c| c.large),
            banner_image: media.banner_image,
            status: media.status,
            format: media.format,
            episodes: media.episodes,
            duration: media.duration,
            season: media.season,
            season_year: media.season_year,
            genres: join_genres(media.genres.as_deref()),
            score: media.average_score,
            popularity: media.popularity,
        })
    }
}

/// Romaji first, then English, then a fixed placeholder. Blank titles count
/// as absent.
pub fn choose_title(title: &MediaTitle) -> String {
    let pick = |t: &Option<String>| {
        t.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    pick(&title.romaji)
        .or_else(|| pick(&title.english))
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

pub fn join_genres(genres: Option<&[String]>) -> Option<String> {
    match genres {
        Some(list) if !list.is_empty() => Some(list.join(", ")),
        _ => None,
    }
}
