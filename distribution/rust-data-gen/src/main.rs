//! Demo database generator for NotiTiddy
//!
//! Seeds a SQLite database with the sample notifications through the real
//! NotificationStore, so previews and screenshots use the production schema.
//!
//! Build with: cargo build
//! Run with: cargo run -- --db-path Demo.sqlite --repeat 3 --read-ratio 0.4

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use demo_data::{DemoNotification, DEMO_NOTIFICATIONS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tiddy::{
    AppLabelResolver, IngestionListener, NotificationRecord, NotificationStore,
    NotificationStoreApi, PlatformEvent,
};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to save the SQLite database
    #[arg(short, long, default_value = "NotiTiddyDemo.sqlite")]
    db_path: String,

    /// Insert the sample set this many times, each copy one day older
    #[arg(short, long, default_value_t = 1)]
    repeat: u32,

    /// Fraction of inserted notifications to mark read (0.0 - 1.0)
    #[arg(long, default_value_t = 0.0)]
    read_ratio: f64,

    /// Seed for the read selection (random when absent)
    #[arg(long)]
    seed: Option<u64>,

    /// Mark every notification of these packages as removed
    #[arg(long, value_delimiter = ',')]
    remove: Vec<String>,

    /// Push the samples through the ingestion listener instead of writing
    /// them directly. Timestamps are then the time of ingestion.
    #[arg(long)]
    live: bool,

    /// Delete existing notifications first
    #[arg(long)]
    clear: bool,

    /// Print the JSON export when done
    #[arg(long)]
    export: bool,
}

/// Labels come straight from the sample set
struct DemoLabels;

impl AppLabelResolver for DemoLabels {
    fn resolve_label(&self, package_name: String) -> Option<String> {
        DEMO_NOTIFICATIONS
            .iter()
            .find(|n| n.package_name == package_name)
            .map(|n| n.app_name.clone())
    }
}

const MINUTE_MS: i64 = 60_000;
const DAY_MS: i64 = 24 * 60 * MINUTE_MS;

fn demo_record(demo: &DemoNotification, now_ms: i64, copy: u32) -> NotificationRecord {
    NotificationRecord::from_posted(
        demo.package_name.clone(),
        demo.app_name.clone(),
        Some(demo.title.clone()),
        Some(&demo.text),
        None,
        None,
        now_ms - demo.minutes_ago * MINUTE_MS - i64::from(copy) * DAY_MS,
    )
}

fn demo_event(demo: &DemoNotification) -> PlatformEvent {
    PlatformEvent::Posted {
        package_name: demo.package_name.clone(),
        title: Some(demo.title.clone()),
        text: Some(demo.text.clone()),
        big_text: None,
        text_lines: None,
    }
}

fn insert_direct(store: &NotificationStore, repeat: u32) -> Result<Vec<i64>> {
    let now_ms = Utc::now().timestamp_millis();
    let mut ids = Vec::new();
    for copy in 0..repeat {
        for demo in DEMO_NOTIFICATIONS.iter() {
            let id = store
                .insert(demo_record(demo, now_ms, copy))
                .with_context(|| format!("Failed to insert sample from {}", demo.package_name))?;
            ids.push(id);
        }
    }
    Ok(ids)
}

async fn insert_live(store: Arc<NotificationStore>, repeat: u32) -> Result<()> {
    let listener = IngestionListener::new(store, Arc::new(DemoLabels));
    for _ in 0..repeat {
        // Oldest first so the ingestion order matches the sample timeline
        for demo in DEMO_NOTIFICATIONS.iter().rev() {
            listener.submit(demo_event(demo));
        }
    }
    listener.flush().await.context("Ingestion listener stopped early")?;
    listener.stop();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiddy=info,tiddy_data_gen=info".into()),
        )
        .init();

    let args = Args::parse();
    if !(0.0..=1.0).contains(&args.read_ratio) {
        bail!("--read-ratio must be between 0.0 and 1.0, got {}", args.read_ratio);
    }

    let store = Arc::new(
        NotificationStore::new(args.db_path.clone())
            .with_context(|| format!("Failed to open database at {}", args.db_path))?,
    );

    if args.clear {
        let deleted = store.clear_all().context("Failed to clear database")?;
        info!(deleted, "Cleared existing notifications");
    }

    if args.live {
        insert_live(Arc::clone(&store), args.repeat).await?;
    } else {
        insert_direct(&store, args.repeat)?;
    }
    info!(total = store.count()?, "Samples inserted");

    if args.read_ratio > 0.0 {
        let mut rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut marked = 0u32;
        for record in store.fetch_all()?.iter().filter(|r| !r.is_read) {
            if rng.gen_bool(args.read_ratio) && store.mark_read(record.id)? {
                marked += 1;
            }
        }
        info!(marked, "Marked notifications read");
    }

    for package in &args.remove {
        let changed = store
            .mark_removed(package.clone())
            .with_context(|| format!("Failed to mark {} removed", package))?;
        debug!(package = %package, changed, "Marked package removed");
    }

    if args.export {
        println!("{}", store.export_json()?);
    }

    info!(path = %args.db_path, "Done");
    Ok(())
}
