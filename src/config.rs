use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

use crate::anilist::{CatalogConfig, ANILIST_ENDPOINT, DEFAULT_PER_PAGE};

pub const DEFAULT_DB_PATH: &str = "./anime.db";
pub const DEFAULT_PAGE_LIMIT: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub catalog: CatalogConfig,
    pub page_limit: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Blank values are treated as unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = get("DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let endpoint = get("ANILIST_ENDPOINT").unwrap_or_else(|| ANILIST_ENDPOINT.to_string());
        let page_limit = match get("SYNC_PAGE_LIMIT") {
            Some(raw) => {
                let value: u32 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("SYNC_PAGE_LIMIT is not a number: {}", raw))?;
                if value == 0 {
                    bail!("SYNC_PAGE_LIMIT must be at least 1");
                }
                value
            }
            None => DEFAULT_PAGE_LIMIT,
        };

        Ok(Self {
            db_path,
            catalog: CatalogConfig {
                endpoint,
                per_page: DEFAULT_PER_PAGE,
            },
            page_limit,
        })
    }
}
