use std::path::Path;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use recurra::config::Config;
use recurra::notify::ReservationNotice;
use recurra::{
    Asset, Coordinator, InMemoryCatalog, InMemoryStore, NotifyHub, Requester, ReservationRequest,
    Response,
};

/// One input line: who is asking, and what.
#[derive(Deserialize)]
struct Submission {
    requester: Requester,
    request: ReservationRequest,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries responses; logs go to stderr.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = Config::from_env();
    recurra::observability::init(config.metrics_port)?;

    let catalog = match &config.assets_file {
        Some(path) => load_assets(path)?,
        None => InMemoryCatalog::new(),
    };

    let store = match (&config.data_dir, config.wal_path()) {
        (Some(dir), Some(wal_path)) => {
            std::fs::create_dir_all(dir)?;
            InMemoryStore::open(&wal_path, config.wal_channel_capacity)?
        }
        _ => InMemoryStore::new(),
    };

    let hub = NotifyHub::new();
    for asset_id in catalog.ids() {
        tokio::spawn(log_notices(hub.subscribe(asset_id)));
    }

    info!("recurra ready");
    info!("  assets: {}", catalog.len());
    info!(
        "  wal: {}",
        config
            .wal_path()
            .map_or("disabled".to_string(), |p| p.display().to_string())
    );
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let coordinator = Coordinator::new(store, catalog, hub);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let response = match serde_json::from_str::<Submission>(&line) {
                    Ok(submission) => Response::from(
                        coordinator
                            .submit(&submission.requester, &submission.request)
                            .await,
                    ),
                    Err(e) => Response::malformed(e),
                };
                let mut out = serde_json::to_vec(&response)?;
                out.push(b'\n');
                stdout.write_all(&out).await?;
                stdout.flush().await?;
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    info!("recurra stopped");
    Ok(())
}

fn load_assets(path: &Path) -> Result<InMemoryCatalog, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let assets: Vec<Asset> = serde_json::from_str(&raw)?;
    Ok(assets.into_iter().collect())
}

async fn log_notices(mut rx: broadcast::Receiver<ReservationNotice>) {
    loop {
        match rx.recv().await {
            Ok(notice) => info!(
                reservation = %notice.reservation.id,
                asset = %notice.asset.name,
                slot = %notice.reservation.slot,
                "reservation created"
            ),
            Err(RecvError::Lagged(skipped)) => warn!("notice subscriber lagged, skipped {skipped}"),
            Err(RecvError::Closed) => break,
        }
    }
}
