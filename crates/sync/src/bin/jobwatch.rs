// crates/sync/src/bin/jobwatch.rs
//! Terminal watcher for the live job feed. Subscribes to the push-event
//! stream and prints the merged table whenever it changes. Useful for
//! checking a backend without the dashboard in front of it.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use transferdeck_core::JobStatus;
use transferdeck_sync::adapters::{status_label, JobsTableAdapter};
use transferdeck_sync::{ApiClient, StreamConfig, StreamRelay, StreamSignal, SyncConfig};

#[derive(Parser, Debug)]
#[command(name = "jobwatch", about = "Watch live job status from a transferdeck backend")]
struct Args {
    /// Base URL of the dashboard API. Defaults to TRANSFERDECK_API_URL.
    #[arg(long)]
    api_url: Option<String>,

    /// Only show jobs matching this search text.
    #[arg(long)]
    search: Option<String>,

    /// Print one snapshot and exit instead of following the stream.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = match args.api_url {
        Some(url) => SyncConfig::new(url),
        None => SyncConfig::default(),
    };
    info!(base_url = %config.base_url, "connecting");

    let mut table = JobsTableAdapter::new(ApiClient::new(&config));
    if let Some(search) = args.search {
        table.set_search(search).await;
    } else {
        table.refresh().await;
    }
    if let Some(notice) = table.notice() {
        anyhow::bail!("initial fetch failed: {notice}");
    }
    print_rows(&table);

    if args.once {
        return Ok(());
    }

    let relay = StreamRelay::new(StreamConfig::from_sync(&config));
    let mut sub = relay.subscribe();
    loop {
        let signal = sub
            .recv()
            .await
            .context("event stream subscription closed")?;
        let resync = table.apply(&signal);
        if resync {
            table.refresh().await;
        }
        // Connected frames with nothing new still reprint; the table is
        // small and an extra snapshot beats a stale one.
        if resync || matches!(signal, StreamSignal::Event(_)) {
            print_rows(&table);
        }
    }
}

fn print_rows(table: &JobsTableAdapter) {
    let rows = table.rows();
    println!("{:<5} {:<24} {:<10} {:<10} PROGRESS", "ID", "NAME", "OP", "STATUS");
    for row in rows {
        let progress = match &row.metrics {
            Some(m) if row.status == JobStatus::Running => match m.percent {
                Some(pct) => format!("{pct:.0}%"),
                None => "...".to_string(),
            },
            _ => row.error.clone().unwrap_or_default(),
        };
        println!(
            "{:<5} {:<24} {:<10} {:<10} {progress}",
            row.id,
            row.name,
            row.operation,
            status_label(row.status),
        );
    }
    println!();
}
