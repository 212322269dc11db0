use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use switchbar::config;
use switchbar::favicon::HttpFaviconResolver;
use switchbar::sources::BrowserSnapshot;
use switchbar::Switcher;

/// Usage: switchbar <snapshot.json> [query...]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "switchbar=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let snapshot_path = args
        .next()
        .context("usage: switchbar <snapshot.json> [query...]")?;
    let term = args.collect::<Vec<_>>().join(" ");

    // Load configuration / 加载配置
    let app_config = config::init_config()?.read().clone();

    let content = std::fs::read_to_string(&snapshot_path)
        .with_context(|| format!("Failed to read snapshot {}", snapshot_path))?;
    let snapshot: BrowserSnapshot = serde_json::from_str(&content)?;
    tracing::info!(
        "Loaded snapshot: {} tabs, {} bookmarks, {} history entries",
        snapshot.tabs.len(),
        snapshot.bookmarks.len(),
        snapshot.history.len()
    );

    let favicons = HttpFaviconResolver::new(app_config.favicon.clone())?;
    let switcher = Switcher::new(Arc::new(snapshot), Arc::new(favicons), app_config);

    let options = switcher.get_switch_options(&term).await;
    println!("{}", serde_json::to_string_pretty(&options)?);
    Ok(())
}
