//! # Change Feed
//!
//! Notifies listeners after a write commits, so view-state holders can
//! reload what they show.
//!
//! ```text
//! ┌──────────────┐  commit  ┌──────────────┐  DataChange  ┌──────────────────┐
//! │  Repository  │ ───────► │  ChangeFeed  │ ───────────► │ InventoryView    │
//! │  (tx write)  │          │  broadcast   │ ───────────► │ DashboardView    │
//! └──────────────┘          └──────────────┘              └──────────────────┘
//! ```
//!
//! Events are coarse: they name the table that changed, not the row.
//! A lagging receiver loses old events but can simply reload everything.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// Events buffered per receiver before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Which kind of data changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataChange {
    Products,
    Movements,
    Invoices,
    Orders,
    PurchaseLines,
    Receipts,
}

/// Broadcast sender shared by every repository of one [`crate::Database`].
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<DataChange>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        ChangeFeed { tx }
    }

    /// Publishes `changes`. Having no subscribers is not an error.
    pub fn publish(&self, changes: &[DataChange]) {
        for change in changes {
            trace!(?change, "Publishing data change");
            let _ = self.tx.send(*change);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataChange> {
        self.tx.subscribe()
    }
}
