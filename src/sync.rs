use anyhow::Result;
use tracing::{info, warn};

use crate::anilist::{CatalogApi, FetchError, Media, NewAnime};
use crate::season::SeasonBucket;
use crate::store::{AnimeStore, UpsertOutcome};

/// Records gathered for one bucket, plus how many pages were usable.
#[derive(Debug, Default)]
pub struct BucketReport {
    pub records: Vec<Media>,
    pub pages_fetched: u32,
    pub pages_failed: u32,
    pub malformed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub buckets: usize,
    pub fetched: usize,
    pub pages_failed: u32,
    pub malformed: usize,
    pub reconcile: ReconcileReport,
}

/// Adult-content post-filter. The season query already asks for
/// `isAdult: false`, so nothing is dropped here.
pub fn is_filtered_out(_media: &Media) -> bool {
    false
}

/// Page through one bucket, 1-indexed, up to `page_limit` pages. Failed pages
/// are logged and skipped; an empty page ends the bucket.
pub async fn fetch_bucket(
    api: &dyn CatalogApi,
    bucket: SeasonBucket,
    page_limit: u32,
) -> BucketReport {
    let mut report = BucketReport::default();

    for page in 1..=page_limit {
        match api.fetch_page(bucket, page).await {
            Ok(fetched) if fetched.is_empty() => break,
            Ok(fetched) => {
                info!("Fetched {} anime from page {}", fetched.media.len(), page);
                report.pages_fetched += 1;
                report.malformed += fetched.malformed;
                report
                    .records
                    .extend(fetched.media.into_iter().filter(|m| !is_filtered_out(m)));
            }
            Err(e @ FetchError::Query(_)) => {
                warn!("GraphQL errors on page {} of {}: {}", page, bucket, e);
                report.pages_failed += 1;
            }
            Err(e) => {
                warn!("Error fetching page {} of {}: {}", page, bucket, e);
                report.pages_failed += 1;
            }
        }
    }

    report
}

/// Upsert every record inside a single transaction, committed once after all
/// records were attempted.
pub fn reconcile(store: &mut AnimeStore, records: Vec<Media>) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();
    let batch = store.begin()?;

    for media in records {
        let raw_id = media.id;
        let anime = match NewAnime::from_media(media) {
            Ok(anime) => anime,
            Err(reason) => {
                warn!("Skipping anime {:?}: {}", raw_id, reason);
                report.skipped += 1;
                continue;
            }
        };
        match batch.upsert(&anime) {
            Ok(UpsertOutcome::Inserted) => report.inserted += 1,
            Ok(UpsertOutcome::Updated) => report.updated += 1,
            Err(e) => {
                warn!("Error processing anime {}: {}", anime.anilist_id, e);
                report.skipped += 1;
            }
        }
    }

    batch.commit()?;
    info!(
        "Database update complete: {} new anime, {} updated, {} skipped",
        report.inserted, report.updated, report.skipped
    );
    Ok(report)
}

pub async fn run_sync(
    api: &dyn CatalogApi,
    store: &mut AnimeStore,
    buckets: &[SeasonBucket],
    page_limit: u32,
) -> Result<SyncSummary> {
    info!("Fetching {} seasons...", buckets.len());
    let mut all = Vec::new();
    let mut pages_failed = 0;
    let mut malformed = 0;

    for &bucket in buckets {
        info!("Fetching {}...", bucket);
        let report = fetch_bucket(api, bucket, page_limit).await;
        pages_failed += report.pages_failed;
        malformed += report.malformed;
        if report.records.is_empty() {
            info!("No anime found for {}", bucket);
        } else {
            info!("Found {} anime for {}", report.records.len(), bucket);
            all.extend(report.records);
        }
    }

    let fetched = all.len();
    info!(
        "Total anime fetched: {} ({} malformed records skipped)",
        fetched, malformed
    );
    info!("Storing data in database...");
    let reconcile = reconcile(store, all)?;

    Ok(SyncSummary {
        buckets: buckets.len(),
        fetched,
        pages_failed,
        malformed,
        reconcile,
    })
}
