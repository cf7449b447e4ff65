use anyhow::{Context, Result, bail};
use chrono::{Duration, TimeZone, Utc};
use clap::Parser;
use deckstore::{DataConfig, DataSession, Deck, InMemoryBackend, PartitionKey, SessionContext};
use serde_json::json;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "deckstore-sim")]
#[command(about = "Runs refresh and load-more cycles against an in-memory deck store")]
struct Cli {
    /// Decks seeded before the warm start
    #[arg(long, default_value_t = 40)]
    items: usize,
    #[arg(long, default_value_t = 10)]
    page_size: usize,
    #[arg(long, default_value_t = 100)]
    capacity: usize,
    /// Decks written after the watermark, picked up by the top-up
    #[arg(long, default_value_t = 5)]
    fresh: usize,
    #[arg(long, default_value = "sim-user")]
    owner: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.page_size == 0 {
        bail!("--page-size must be at least 1");
    }

    let config = DataConfig::new()
        .page_size(cli.page_size)
        .deck_capacity(cli.capacity);
    config.validate().context("invalid simulation config")?;

    let backend = Arc::new(InMemoryBackend::new(cli.page_size));
    let base = Utc
        .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .context("base timestamp out of range")?;

    // old decks: updated one minute apart, all at or before the watermark
    let watermark = base + Duration::minutes(cli.items as i64);
    backend
        .decks
        .put_many((0..cli.items).map(|i| {
            Deck::new(&cli.owner, format!("Deck {i}"))
                .with_id(format!("old-{i:04}"))
                .touched_at(base + Duration::minutes(i as i64))
        }))
        .await;
    backend
        .decks
        .put_many((0..cli.fresh).map(|i| {
            Deck::new(&cli.owner, format!("Fresh {i}"))
                .with_id(format!("fresh-{i:04}"))
                .touched_at(watermark + Duration::minutes(i as i64 + 1))
        }))
        .await;

    let owner = PartitionKey::new(cli.owner.clone()).context("owner must not be blank")?;
    let session = DataSession::new(SessionContext::new(owner, backend.clone()), config)
        .context("failed to open session")?;
    let decks = session.decks();
    decks.set_watermark(Some(watermark)).await;

    let refreshed = decks.refresh().await.context("refresh failed")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "phase": "refresh",
            "cached": refreshed.len(),
            "first": refreshed.first().map(|d| d.id.clone()),
            "last": refreshed.last().map(|d| d.id.clone()),
            "watermark": decks.watermark().await,
        }))?
    );

    let mut round = 0;
    loop {
        let before = decks.snapshot().await.len();
        let after = decks.load_more().await.context("load more failed")?.len();
        round += 1;
        println!(
            "{}",
            serde_json::to_string(&json!({
                "phase": "load_more",
                "round": round,
                "appended": after.saturating_sub(before),
                "cached": after,
            }))?
        );
        if after == before {
            break;
        }
    }

    let log = backend.decks.request_log().await;
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "phase": "done",
            "queries": log.queries,
            "point_lookups": log.point_lookups,
            "largest_limit": log.largest_limit,
        }))?
    );
    Ok(())
}
