use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use disaster_common::{Config, FeedSnapshot};
use disaster_ingest::feed::fetch_snapshot;
use disaster_ingest::{build_store, DisasterStore, IngestionReport, Ingestor, SnapshotCache};
use p2pquake_client::P2pQuakeClient;

#[derive(Parser)]
#[command(name = "disaster-ingest", about = "Disaster feed ingestion")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a snapshot JSON file (`-` for stdin)
    Ingest { path: PathBuf },
    /// Pull recent earthquakes from P2PQuake and ingest them
    Fetch {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Poll P2PQuake on an interval until interrupted
    Watch {
        /// Seconds between polls (defaults to POLL_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Print active live events
    Live,
    /// Print recent history
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print the JSON Schema of the snapshot payload
    Schema,
    /// Run Postgres migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::from_default_env()
        .add_directive("disaster=info".parse()?)
        .add_directive("p2pquake_client=info".parse()?);
    if cli.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    if let Command::Schema = cli.command {
        let schema = schemars::schema_for!(FeedSnapshot);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let config = Config::from_env()?;
    config.log_redacted();

    if let Command::Migrate = cli.command {
        let Some(url) = config.database_url.as_deref() else {
            bail!("DATABASE_URL must be set to run migrations");
        };
        let store = disaster_store::PgDisasterStore::connect(url, config.ingest.match_rules).await?;
        disaster_store::migrate(store.pool()).await?;
        info!("Migrations complete");
        return Ok(());
    }

    let store = build_store(&config).await?;
    let ingestor = Ingestor::new(store.clone(), config.ingest.clone());
    let cache = SnapshotCache::new();

    match cli.command {
        Command::Ingest { path } => {
            let snapshot = read_snapshot(&path)?;
            let report = run_pass(&ingestor, &cache, snapshot).await;
            println!("{report}");
        }
        Command::Fetch { limit } => {
            let client = P2pQuakeClient::with_base_url(&config.p2pquake_base_url);
            let snapshot = fetch_snapshot(&client, limit).await?;
            let report = run_pass(&ingestor, &cache, snapshot).await;
            println!("{report}");
        }
        Command::Watch { interval, limit } => {
            let period = interval
                .map(std::time::Duration::from_secs)
                .unwrap_or(config.poll_interval);
            let client = P2pQuakeClient::with_base_url(&config.p2pquake_base_url);
            watch(&ingestor, &cache, &client, period, limit).await;
        }
        Command::Live => {
            let events = store.list_live_events().await?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        Command::History { limit } => {
            let events = store.list_history(limit).await?;
            println!("{}", serde_json::to_string_pretty(&events)?);
        }
        Command::Schema | Command::Migrate => {}
    }

    Ok(())
}

fn read_snapshot(path: &Path) -> Result<FeedSnapshot> {
    let raw = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read snapshot from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?
    };
    serde_json::from_str(&raw).context("Snapshot is not valid feed JSON")
}

async fn run_pass(ingestor: &Ingestor, cache: &SnapshotCache, snapshot: FeedSnapshot) -> IngestionReport {
    let report = ingestor.ingest(&snapshot).await;
    cache.replace(snapshot, report.started_at);
    report
}

async fn watch(
    ingestor: &Ingestor,
    cache: &SnapshotCache,
    client: &P2pQuakeClient,
    period: std::time::Duration,
    limit: u32,
) {
    info!(interval_secs = period.as_secs(), "Watching P2PQuake");
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                return;
            }
        }

        match fetch_snapshot(client, limit).await {
            Ok(snapshot) => {
                let report = run_pass(ingestor, cache, snapshot).await;
                info!("{report}");
            }
            Err(e) => warn!(error = %e, "P2PQuake fetch failed, retrying next tick"),
        }

        if let Some(latest) = cache.latest() {
            let age = Utc::now() - latest.received_at;
            info!(
                records = latest.snapshot.total_records(),
                age_secs = age.num_seconds(),
                "Latest snapshot cached"
            );
        }
    }
}
