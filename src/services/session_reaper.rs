use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{db::SessionStore, error::AppResult};

/// Deletes every session idle for longer than `ttl`
pub async fn purge_expired(sessions: &dyn SessionStore, ttl: chrono::Duration) -> AppResult<usize> {
    let cutoff = Utc::now() - ttl;
    let purged = sessions.purge_inactive(cutoff).await?;

    if purged > 0 {
        tracing::info!(purged, cutoff = %cutoff, "Expired swipe sessions purged");
    }
    Ok(purged)
}

/// Handle for stopping the reaper task
pub struct ReaperHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stops the reaper and waits for its current pass to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Session reaper task failed");
        }
    }
}

/// Spawns a task that purges idle sessions every `interval`
pub fn spawn(sessions: Arc<dyn SessionStore>, ttl: chrono::Duration, interval: Duration) -> ReaperHandle {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

    let task = tokio::spawn(async move {
        tracing::info!(ttl_secs = ttl.num_seconds(), interval_secs = interval.as_secs(), "Session reaper started");
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = purge_expired(sessions.as_ref(), ttl).await {
                        tracing::error!(error = %e, "Failed to purge expired sessions");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Session reaper stopped");
                    break;
                }
            }
        }
    });

    ReaperHandle { shutdown_tx, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemorySessionStore, MockSessionStore};
    use crate::error::AppError;

    #[tokio::test]
    async fn test_purge_expired_keeps_active_sessions() {
        let store = MemorySessionStore::new();
        let session = store.create().await.unwrap();

        let purged = purge_expired(&store, chrono::Duration::hours(1)).await.unwrap();
        assert_eq!(purged, 0);
        assert!(store.get(session.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_purge_expired_removes_idle_sessions() {
        let store = MemorySessionStore::new();
        let session = store.create().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let purged = purge_expired(&store, chrono::Duration::milliseconds(5)).await.unwrap();
        assert_eq!(purged, 1);
        assert!(matches!(
            store.get(session.id).await,
            Err(AppError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_reaper_runs_and_shuts_down() {
        let mut store = MockSessionStore::new();
        store.expect_purge_inactive().returning(|_| Ok(0));

        let handle = spawn(
            Arc::new(store),
            chrono::Duration::seconds(60),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_reaper_survives_store_errors() {
        let mut store = MockSessionStore::new();
        store
            .expect_purge_inactive()
            .returning(|_| Err(AppError::StoreUnavailable("down".to_string())));

        let handle = spawn(
            Arc::new(store),
            chrono::Duration::seconds(60),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;
    }
}
