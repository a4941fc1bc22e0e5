//! SQLite persistence for synced anime, keyed by AniList id.

use anyhow::{Context, Result};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::anilist::NewAnime;

// Millisecond timestamps so back-to-back runs still order correctly.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS anime (
    id INTEGER PRIMARY KEY,
    anilist_id INTEGER UNIQUE,
    title TEXT NOT NULL,
    title_english TEXT,
    title_romaji TEXT,
    description TEXT,
    cover_image TEXT,
    banner_image TEXT,
    status TEXT,
    format TEXT,
    episodes INTEGER,
    duration INTEGER,
    season TEXT,
    season_year INTEGER,
    genres TEXT,
    score REAL,
    popularity INTEGER,
    created_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')),
    updated_at DATETIME DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now'))
);
CREATE INDEX IF NOT EXISTS idx_anime_anilist_id ON anime(anilist_id);
CREATE INDEX IF NOT EXISTS idx_anime_popularity ON anime(popularity DESC);
CREATE INDEX IF NOT EXISTS idx_anime_score ON anime(score DESC);
";

const ROW_COLUMNS: &str = "id, anilist_id, title, title_english, title_romaji, description, \
     cover_image, banner_image, status, format, episodes, duration, season, season_year, \
     genres, score, popularity, created_at, updated_at";

const MAX_PAGE_SIZE: u32 = 50;
const DEFAULT_PAGE_SIZE: u32 = 20;

/// A persisted `anime` row.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimeRow {
    pub id: i64,
    pub anilist_id: i32,
    pub title: String,
    pub title_english: Option<String>,
    pub title_romaji: Option<String>,
    pub description: Option<String>,
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
    pub created_at: String,
    pub updated_at: String,
}

impl AnimeRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            anilist_id: row.get(1)?,
            title: row.get(2)?,
            title_english: row.get(3)?,
            title_romaji: row.get(4)?,
            description: row.get(5)?,
            cover_image: row.get(6)?,
            banner_image: row.get(7)?,
            status: row.get(8)?,
            format: row.get(9)?,
            episodes: row.get(10)?,
            duration: row.get(11)?,
            season: row.get(12)?,
            season_year: row.get(13)?,
            genres: row.get(14)?,
            score: row.get(15)?,
            popularity: row.get(16)?,
            created_at: row.get(17)?,
            updated_at: row.get(18)?,
        })
    }
}

/// Browse filter for stored anime. Empty fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct AnimeFilter {
    pub search: Option<String>,
    pub status: Option<String>,
    pub season: Option<String>,
    pub year: Option<i32>,
    pub page: u32,
    pub page_size: u32,
}

impl AnimeFilter {
    /// Page is clamped to at least 1; page size outside 1..=50 becomes 20.
    pub fn normalized(&self) -> (u32, u32) {
        let page = self.page.max(1);
        let page_size = if (1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            self.page_size
        } else {
            DEFAULT_PAGE_SIZE
        };
        (page, page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

pub struct AnimeStore {
    conn: Connection,
}

impl AnimeStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)
            .context("Failed to ensure anime schema")?;
        info!("Database schema ready");
        Ok(Self { conn })
    }

    /// Start a batch; nothing is visible to other connections until
    /// [`AnimeBatch::commit`].
    pub fn begin(&mut self) -> Result<AnimeBatch<'_>> {
        let tx = self
            .conn
            .transaction()
            .context("Failed to begin transaction")?;
        Ok(AnimeBatch { tx })
    }

    pub fn find_by_anilist_id(&self, anilist_id: i32) -> Result<Option<AnimeRow>> {
        let sql = format!("SELECT {ROW_COLUMNS} FROM anime WHERE anilist_id = ?1");
        self.conn
            .query_row(&sql, params![anilist_id], AnimeRow::from_row)
            .optional()
            .context("Failed to look up anime")
    }

    pub fn count(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM anime", [], |row| row.get(0))
            .context("Failed to count anime")
    }

    pub fn list(&self, filter: &AnimeFilter) -> Result<Vec<AnimeRow>> {
        let (page, page_size) = filter.normalized();
        let mut conditions: Vec<&str> = Vec::new();
        let mut args: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            conditions.push("(title LIKE ? OR title_english LIKE ?)");
            let term = format!("%{search}%");
            args.push(Box::new(term.clone()));
            args.push(Box::new(term));
        }
        if let Some(status) = filter.status.as_deref().filter(|s| !s.is_empty()) {
            conditions.push("status = ?");
            args.push(Box::new(status.to_string()));
        }
        if let Some(season) = filter.season.as_deref().filter(|s| !s.is_empty()) {
            conditions.push("season = ?");
            args.push(Box::new(season.to_string()));
        }
        if let Some(year) = filter.year.filter(|y| *y > 0) {
            conditions.push("season_year = ?");
            args.push(Box::new(year));
        }

        let mut sql = format!("SELECT {ROW_COLUMNS} FROM anime");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY popularity DESC, score DESC LIMIT ? OFFSET ?");
        let offset = (i64::from(page) - 1).saturating_mul(i64::from(page_size));
        args.push(Box::new(page_size));
        args.push(Box::new(offset));

        let bind: Vec<&dyn ToSql> = args.iter().map(|a| a.as_ref()).collect();
        let mut stmt = self.conn.prepare(&sql).context("Failed to prepare anime query")?;
        let rows = stmt
            .query_map(bind.as_slice(), AnimeRow::from_row)
            .context("Failed to query anime")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read anime row")?;
        Ok(rows)
    }
}

/// An open write transaction over the `anime` table.
pub struct AnimeBatch<'a> {
    tx: Transaction<'a>,
}

impl AnimeBatch<'_> {
    /// Insert a new row or overwrite every mutable column of the existing one.
    /// `id` and `created_at` of an existing row are left untouched.
    pub fn upsert(&self, anime: &NewAnime) -> rusqlite::Result<UpsertOutcome> {
        let existing: Option<i64> = self
            .tx
            .query_row(
                "SELECT id FROM anime WHERE anilist_id = ?1",
                params![anime.anilist_id],
                |row| row.get(0),
            )
            .optional()?;

        if existing.is_some() {
            self.tx.execute(
                "UPDATE anime SET
                    title = ?2, title_english = ?3, title_romaji = ?4, description = ?5,
                    cover_image = ?6, banner_image = ?7, status = ?8, format = ?9,
                    episodes = ?10, duration = ?11, season = ?12, season_year = ?13,
                    genres = ?14, score = ?15, popularity = ?16,
                    updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE anilist_id = ?1",
                params![
                    anime.anilist_id,
                    anime.title,
                    anime.title_english,
                    anime.title_romaji,
                    anime.description,
                    anime.cover_image,
                    anime.banner_image,
                    anime.status,
                    anime.format,
                    anime.episodes,
                    anime.duration,
                    anime.season,
                    anime.season_year,
                    anime.genres,
                    anime.score,
                    anime.popularity,
                ],
            )?;
            return Ok(UpsertOutcome::Updated);
        }

        self.tx.execute(
            "INSERT INTO anime (
                anilist_id, title, title_english, title_romaji, description,
                cover_image, banner_image, status, format, episodes, duration,
                season, season_year, genres, score, popularity
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                anime.anilist_id,
                anime.title,
                anime.title_english,
                anime.title_romaji,
                anime.description,
                anime.cover_image,
                anime.banner_image,
                anime.status,
                anime.format,
                anime.episodes,
                anime.duration,
                anime.season,
                anime.season_year,
                anime.genres,
                anime.score,
                anime.popularity,
            ],
        )?;
        Ok(UpsertOutcome::Inserted)
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().context("Failed to commit anime batch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    fn anime(anilist_id: i32, title: &str, popularity: i32) -> NewAnime {
        NewAnime {
            anilist_id,
            title: title.to_string(),
            title_english: None,
            title_romaji: Some(title.to_string()),
            description: "desc".to_string(),
            cover_image: Some("https://img/c.jpg".to_string()),
            banner_image: None,
            status: Some("RELEASING".to_string()),
            format: Some("TV".to_string()),
            episodes: Some(12),
            duration: Some(24),
            season: Some("SPRING".to_string()),
            season_year: Some(2025),
            genres: Some("Action, Comedy".to_string()),
            score: Some(75.0),
            popularity: Some(popularity),
        }
    }

    #[test]
    fn inserts_new_row_with_timestamps() {
        let mut store = AnimeStore::open_in_memory().expect("store");
        let batch = store.begin().expect("begin");
        assert_eq!(batch.upsert(&anime(1, "Alpha", 10)).expect("upsert"), UpsertOutcome::Inserted);
        batch.commit().expect("commit");

        assert_eq!(store.count().expect("count"), 1);
        let row = store.find_by_anilist_id(1).expect("find").expect("row");
        assert_eq!(row.title, "Alpha");
        assert_eq!(row.genres.as_deref(), Some("Action, Comedy"));
        assert_eq!(row.description.as_deref(), Some("desc"));
        assert!(!row.created_at.is_empty());
        assert_eq!(row.created_at, row.updated_at);
    }

    #[test]
    fn upsert_updates_in_place() {
        let mut store = AnimeStore::open_in_memory().expect("store");
        let batch = store.begin().expect("begin");
        batch.upsert(&anime(5, "Before", 10)).expect("insert");
        batch.commit().expect("commit");
        let before = store.find_by_anilist_id(5).expect("find").expect("row");

        sleep(Duration::from_millis(20));

        let mut changed = anime(5, "After", 99);
        changed.genres = None;
        let batch = store.begin().expect("begin");
        assert_eq!(batch.upsert(&changed).expect("update"), UpsertOutcome::Updated);
        batch.commit().expect("commit");

        let after = store.find_by_anilist_id(5).expect("find").expect("row");
        assert_eq!(store.count().expect("count"), 1);
        assert_eq!(after.id, before.id);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
        assert_eq!(after.title, "After");
        assert_eq!(after.popularity, Some(99));
        assert_eq!(after.genres, None);
    }

    #[test]
    fn uncommitted_batch_is_rolled_back() {
        let mut store = AnimeStore::open_in_memory().expect("store");
        {
            let batch = store.begin().expect("begin");
            batch.upsert(&anime(2, "Dropped", 1)).expect("insert");
        }
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn list_filters_and_orders_by_popularity() {
        let mut store = AnimeStore::open_in_memory().expect("store");
        let batch = store.begin().expect("begin");
        batch.upsert(&anime(1, "Low", 10)).expect("insert");
        batch.upsert(&anime(2, "High", 500)).expect("insert");
        let mut other = anime(3, "Winter Show", 300);
        other.season = Some("WINTER".to_string());
        batch.upsert(&other).expect("insert");
        batch.commit().expect("commit");

        let all = store.list(&AnimeFilter::default()).expect("list");
        let titles: Vec<_> = all.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["High", "Winter Show", "Low"]);

        let spring = store
            .list(&AnimeFilter {
                season: Some("SPRING".to_string()),
                ..AnimeFilter::default()
            })
            .expect("list");
        assert_eq!(spring.len(), 2);

        let search = store
            .list(&AnimeFilter {
                search: Some("wint".to_string()),
                ..AnimeFilter::default()
            })
            .expect("list");
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].anilist_id, 3);

        let second_page = store
            .list(&AnimeFilter {
                page: 2,
                page_size: 2,
                ..AnimeFilter::default()
            })
            .expect("list");
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].title, "Low");
    }

    #[test]
    fn far_page_is_empty_not_an_overflow() {
        let mut store = AnimeStore::open_in_memory().expect("store");
        let batch = store.begin().expect("begin");
        batch.upsert(&anime(1, "Only", 1)).expect("insert");
        batch.commit().expect("commit");

        let rows = store
            .list(&AnimeFilter {
                page: u32::MAX,
                page_size: 50,
                ..AnimeFilter::default()
            })
            .expect("list");
        assert!(rows.is_empty());
    }

    #[test]
    fn filter_normalizes_paging() {
        let filter = AnimeFilter {
            page: 0,
            page_size: 500,
            ..AnimeFilter::default()
        };
        assert_eq!(filter.normalized(), (1, 20));
        let filter = AnimeFilter {
            page: 3,
            page_size: 50,
            ..AnimeFilter::default()
        };
        assert_eq!(filter.normalized(), (3, 50));
    }

    #[test]
    fn open_creates_parent_directory_and_is_reopenable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("anime.db");
        {
            let mut store = AnimeStore::open(&path).expect("open");
            let batch = store.begin().expect("begin");
            batch.upsert(&anime(9, "Persisted", 1)).expect("insert");
            batch.commit().expect("commit");
        }
        let store = AnimeStore::open(&path).expect("reopen");
        assert_eq!(store.count().expect("count"), 1);
    }
}
