//! Service wiring.

use anyhow::Context;
use content_publisher::{ContentPublisher, StaticSession};
use remote_api_client::HttpRemoteApi;
use std::sync::Arc;
use sync_config_and_utils::{Config, Paths};
use sync_database::Database;
use sync_queue_engine::{SyncQueue, SyncQueueConfig};
use tracing::info;

/// Everything a command needs, built from config and paths.
pub struct SyncApp {
    pub config: Config,
    pub db: Arc<Database>,
    pub queue: SyncQueue,
    pub publisher: ContentPublisher,
}

impl SyncApp {
    /// Open the database and build the queue stack.
    ///
    /// `drain_on_enqueue` should be off for one-shot commands that drain
    /// explicitly before exiting.
    pub fn open(config: Config, paths: &Paths, drain_on_enqueue: bool) -> anyhow::Result<Self> {
        let db_path = paths.database_file();
        let db = Arc::new(
            Database::open(&db_path)
                .with_context(|| format!("opening database at {}", db_path.display()))?,
        );

        let base_url = config.api_base_url()?;
        let remote = HttpRemoteApi::new(base_url.clone(), config.request_timeout())?
            .with_access_token(config.access_token.clone());
        let session = Arc::new(StaticSession::new(config.access_token.clone()));

        let queue = SyncQueue::new(
            db.clone(),
            db.clone(),
            Arc::new(remote),
            SyncQueueConfig {
                drain_on_enqueue,
                ..SyncQueueConfig::from(&config)
            },
        );
        let publisher = ContentPublisher::new(db.clone(), queue.clone(), session);

        info!(
            database = %db_path.display(),
            api = %base_url,
            signed_in = config.access_token.is_some(),
            "Sync stack ready"
        );

        Ok(Self {
            config,
            db,
            queue,
            publisher,
        })
    }
}
