use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

use super::{CatalogApi, CatalogPage, FetchError};
use crate::season::SeasonBucket;

pub const ANILIST_ENDPOINT: &str = "https://graphql.anilist.co";
pub const DEFAULT_PER_PAGE: u32 = 50;

const SEASON_QUERY: &str = r#"
query ($page: Int, $perPage: Int, $season: MediaSeason, $seasonYear: Int) {
  Page(page: $page, perPage: $perPage) {
    media(type: ANIME, season: $season, seasonYear: $seasonYear, sort: POPULARITY_DESC, isAdult: false) {
      id
      title { romaji english }
      description
      coverImage { large }
      bannerImage
      status
      format
      episodes
      duration
      season
      seasonYear
      genres
      averageScore
      popularity
      isAdult
    }
  }
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub endpoint: String,
    pub per_page: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: ANILIST_ENDPOINT.to_string(),
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AniListClient {
    client: Client,
    config: CatalogConfig,
}

impl AniListClient {
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let user_agent = format!("seasonsync/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build AniList HTTP client")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub async fn fetch_season_page(
        &self,
        bucket: SeasonBucket,
        page: u32,
    ) -> Result<CatalogPage, FetchError> {
        #[derive(Deserialize)]
        struct GraphQlResponse<T> {
            data: Option<T>,
            errors: Option<Vec<GraphQlError>>,
        }

        #[derive(Deserialize)]
        struct GraphQlError {
            message: String,
            status: Option<i32>,
        }

        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "Page")]
            page: Option<SeasonPage>,
        }

        #[derive(Deserialize)]
        struct SeasonPage {
            media: Option<Vec<Value>>,
        }

        let body = json!({
            "query": SEASON_QUERY,
            "variables": {
                "page": page,
                "perPage": self.config.per_page,
                "season": bucket.season.as_graphql(),
                "seasonYear": bucket.year,
            }
        });
        debug!("AniList season query: {} page={}", bucket, page);

        let res = self
            .client
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("AniList request failed: {e}")))?;

        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(format!("Failed to read AniList body: {e}")))?;

        // AniList reports query validation failures as 400 with an `errors` body.
        let parsed: Result<GraphQlResponse<Data>, _> = serde_json::from_slice(&bytes);
        if let Ok(GraphQlResponse {
            errors: Some(errors),
            ..
        }) = &parsed
        {
            let msg = errors
                .iter()
                .map(|e| match e.status {
                    Some(s) => format!("{} (status {})", e.message, s),
                    None => e.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FetchError::Query(msg));
        }

        if !status.is_success() {
            return Err(FetchError::Transport(format!(
                "AniList HTTP error (status {}): {}",
                status,
                String::from_utf8_lossy(&bytes)
            )));
        }

        let parsed = parsed.map_err(|e| FetchError::Decode(e.to_string()))?;
        let raw = parsed
            .data
            .and_then(|d| d.page)
            .and_then(|p| p.media)
            .unwrap_or_default();
        Ok(decode_records(raw, bucket, page))
    }
}

#[async_trait]
impl CatalogApi for AniListClient {
    async fn fetch_page(&self, bucket: SeasonBucket, page: u32) -> Result<CatalogPage, FetchError> {
        self.fetch_season_page(bucket, page).await
    }
}

/// Records are decoded one at a time so a single malformed element only
/// costs itself.
fn decode_records(raw: Vec<Value>, bucket: SeasonBucket, page: u32) -> CatalogPage {
    let mut out = CatalogPage::default();
    for value in raw {
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<Media>(value) {
            Ok(media) => out.media.push(media),
            Err(e) => {
                warn!(
                    "Skipping malformed anime {} on page {} of {}: {}",
                    id, page, bucket, e
                );
                out.malformed += 1;
            }
        }
    }
    out
}

/// One `Page.media[]` element as returned by the season query.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Media {
    pub id: Option<i32>,
    pub title: Option<MediaTitle>,
    pub description: Option<String>,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<CoverImage>,
    #[serde(rename = "bannerImage")]
    pub banner_image: Option<String>,
    pub status: Option<String>,
    pub format: Option<String>,
    pub episodes: Option<i32>,
    pub duration: Option<i32>,
    pub season: Option<String>,
    #[serde(rename = "seasonYear")]
    pub season_year: Option<i32>,
    pub genres: Option<Vec<String>>,
    #[serde(rename = "averageScore")]
    pub average_score: Option<f64>,
    pub popularity: Option<i32>,
    #[serde(rename = "isAdult")]
    pub is_adult: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CoverImage {
    pub large: Option<String>,
}
