use anyhow::Result;
use chrono::Local;
use dotenvy::dotenv;
use seasonsync::anilist::AniListClient;
use seasonsync::config::Settings;
use seasonsync::season::{current_bucket, plan_seasons};
use seasonsync::store::AnimeStore;
use seasonsync::sync::run_sync;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let dotenv_result = dotenv();
    init_tracing();
    match dotenv_result {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }

    let settings = Settings::from_env()?;
    info!("Starting anime data sync by season...");
    info!("Database path: {}", settings.db_path.display());

    let today = Local::now().date_naive();
    info!("Current season: {}", current_bucket(today));
    let buckets = plan_seasons(today);

    let client = AniListClient::new(settings.catalog.clone())?;
    info!("Catalog endpoint: {}", client.config().endpoint);
    let mut store = AnimeStore::open(&settings.db_path)?;

    let summary = run_sync(&client, &mut store, &buckets, settings.page_limit).await?;
    info!(
        "Anime data sync completed: {} buckets, {} fetched, {} pages failed, {} malformed, {} new, {} updated, {} skipped",
        summary.buckets,
        summary.fetched,
        summary.pages_failed,
        summary.malformed,
        summary.reconcile.inserted,
        summary.reconcile.updated,
        summary.reconcile.skipped
    );
    Ok(())
}
