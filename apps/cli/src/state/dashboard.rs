//! # Dashboard View State
//!
//! Today's summary, reloaded on any data change and on a slow tick so the
//! counters roll over at midnight without a write.

use std::sync::Arc;
use std::time::Duration;

use celumax_core::DashboardSnapshot;
use celumax_db::Database;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::CliResult;

/// How often the dashboard reloads with no data change.
pub const DASHBOARD_TICK: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct DashboardState {
    db: Database,
    snapshot: Arc<watch::Sender<DashboardSnapshot>>,
}

impl DashboardState {
    pub async fn load(db: Database) -> CliResult<Self> {
        let initial = db.dashboard().today().await?;
        let (tx, _) = watch::channel(initial);
        Ok(DashboardState {
            db,
            snapshot: Arc::new(tx),
        })
    }

    pub fn current(&self) -> DashboardSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot.subscribe()
    }

    /// Recomputes the snapshot. Receivers are only woken when it differs.
    pub async fn refresh(&self) -> CliResult<()> {
        let fresh = self.db.dashboard().today().await?;
        self.snapshot.send_if_modified(|current| {
            if *current == fresh {
                return false;
            }
            *current = fresh;
            true
        });
        Ok(())
    }

    /// Spawns the reload task: every data change, plus every `tick`.
    pub fn spawn_listener(&self, tick: Duration) -> JoinHandle<()> {
        let mut changes = self.db.subscribe();
        let state = self.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately and load() already ran
            interval.tick().await;

            loop {
                tokio::select! {
                    received = changes.recv() => match received {
                        Ok(change) => debug!(?change, "Refreshing dashboard"),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(skipped, "Dashboard listener lagged, reloading");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    _ = interval.tick() => {}
                }

                if let Err(e) = state.refresh().await {
                    warn!(error = %e, "Dashboard refresh failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use celumax_core::{NewReceipt, ReceiptState};
    use celumax_db::DbConfig;

    fn receipt(client: &str) -> NewReceipt {
        NewReceipt {
            client_name: client.to_string(),
            client_phone: "3205550000".to_string(),
            device_reference: "Moto G8".to_string(),
            procedure: "Cambio de pin de carga".to_string(),
            price_cents: 60_000,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_refresh_tracks_repairs() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = DashboardState::load(db.clone()).await.unwrap();
        assert_eq!(state.current(), DashboardSnapshot::default());

        let r = db.receipts().insert(&receipt("Laura")).await.unwrap();
        state.refresh().await.unwrap();
        assert_eq!(state.current().pending_repairs, 1);

        db.receipts().advance(&r.id, ReceiptState::Arreglado).await.unwrap();
        state.refresh().await.unwrap();
        let snapshot = state.current();
        assert_eq!(snapshot.pending_repairs, 0);
        assert_eq!(snapshot.ready_repairs, 1);
        assert_eq!(snapshot.repaired_today, 1);
    }

    #[tokio::test]
    async fn test_unchanged_refresh_does_not_notify() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = DashboardState::load(db).await.unwrap();
        let mut rx = state.subscribe();
        rx.borrow_and_update();

        state.refresh().await.unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_listener_follows_feed() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let state = DashboardState::load(db.clone()).await.unwrap();
        let mut rx = state.subscribe();
        let listener = state.spawn_listener(DASHBOARD_TICK);

        db.receipts().insert(&receipt("Andrés")).await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("dashboard never refreshed")
            .unwrap();
        assert_eq!(rx.borrow().pending_repairs, 1);
        listener.abort();
    }
}
