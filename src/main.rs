use batcher::{
    Config, EventContext, EventFactory, PersistentBatchManager, SqliteStore, TelemetryEvent,
};
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

/// The main entry point for the batcher demo driver.
///
/// Reads event payloads from stdin (one per line), feeds them through a
/// persistent batch manager backed by SQLite, and prints every delivered
/// batch as a JSON line. A line that parses as JSON becomes the event payload
/// as-is; anything else is wrapped in a JSON string.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/default.toml".to_string());
    let config = Config::load_or_default(&path)?;
    info!("Batcher starting with config: {:?}", config);

    let store = SqliteStore::connect(&config.storage.url).await?;

    // Delivered batches go to stdout; a real deployment would hand them to an
    // HTTP uploader here instead.
    let manager = PersistentBatchManager::new(
        &config.batch,
        store,
        config.storage.key.clone(),
        |events: Vec<TelemetryEvent>| match serde_json::to_string(&events) {
            Ok(line) => println!("{line}"),
            Err(e) => error!("Failed to encode delivered batch: {}", e),
        },
    );
    manager.start().await;

    let factory = EventFactory::new(EventContext {
        title_id: "demo-title".to_string(),
        player_id: "local-player".to_string(),
        session_id: format!("session-{}", Utc::now().timestamp_millis()),
    });

    // Feed stdin lines into the engine until EOF
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let payload = serde_json::from_str(line)
            .unwrap_or_else(|_| serde_json::Value::String(line.to_string()));
        manager.add(factory.event("stdin_event", payload)).await;
    }

    // Drain whatever is still buffered, give the heartbeat one cycle to
    // persist the rotated state, then shut down.
    manager.flush().await;
    tokio::time::sleep(config.batch.heartbeat()).await;
    manager.stop().await;

    Ok(())
}
