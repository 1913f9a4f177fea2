//! # Inventory View State
//!
//! Holds what the inventory screen shows (current search, matching
//! products, totals) and keeps it fresh when the data underneath changes.
//!
//! ```text
//! ┌──────────────┐ DataChange ┌───────────────────┐ send_replace ┌──────────────┐
//! │  ChangeFeed  │ ─────────► │  InventoryState   │ ───────────► │ watch::Recv  │
//! │  (broadcast) │            │  listener task    │              │ (renderers)  │
//! └──────────────┘            └───────────────────┘              └──────────────┘
//!                                      ▲
//!                         set_query()  │  refresh()
//! ```
//!
//! Products, Movements, Invoices and Orders all move stock, so any of them
//! triggers a reload. A lagged receiver also reloads.

use std::sync::Arc;

use celumax_core::{InventoryMetrics, Product, DEFAULT_PAGE_SIZE};
use celumax_db::{DataChange, Database};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::CliResult;

/// Rows the inventory list shows for a non-empty search.
pub const INVENTORY_SEARCH_LIMIT: u32 = DEFAULT_PAGE_SIZE * 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryView {
    pub query: String,
    pub products: Vec<Product>,
    pub metrics: InventoryMetrics,
}

#[derive(Debug, Clone)]
pub struct InventoryState {
    db: Database,
    view: Arc<watch::Sender<InventoryView>>,
}

impl InventoryState {
    /// Loads the initial view for `query`.
    pub async fn load(db: Database, query: &str) -> CliResult<Self> {
        let initial = fetch_view(&db, query).await?;
        let (tx, _) = watch::channel(initial);
        Ok(InventoryState {
            db,
            view: Arc::new(tx),
        })
    }

    pub fn current(&self) -> InventoryView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<InventoryView> {
        self.view.subscribe()
    }

    /// Replaces the search and reloads.
    pub async fn set_query(&self, query: &str) -> CliResult<()> {
        let view = fetch_view(&self.db, query).await?;
        self.view.send_replace(view);
        Ok(())
    }

    /// Reloads with the current search.
    pub async fn refresh(&self) -> CliResult<()> {
        let query = self.view.borrow().query.clone();
        self.set_query(&query).await
    }

    /// Spawns the task that reloads on relevant data changes.
    ///
    /// The feed subscription is taken before returning, so writes made
    /// after this call are never missed.
    pub fn spawn_listener(&self) -> JoinHandle<()> {
        let mut changes = self.db.subscribe();
        let state = self.clone();

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) if affects_inventory(change) => {
                        debug!(?change, "Refreshing inventory view");
                        if let Err(e) = state.refresh().await {
                            warn!(error = %e, "Inventory refresh failed");
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Inventory listener lagged, reloading");
                        if let Err(e) = state.refresh().await {
                            warn!(error = %e, "Inventory refresh failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

fn affects_inventory(change: DataChange) -> bool {
    matches!(
        change,
        DataChange::Products | DataChange::Movements | DataChange::Invoices | DataChange::Orders
    )
}

async fn fetch_view(db: &Database, query: &str) -> CliResult<InventoryView> {
    let query = query.trim();
    let products = if query.is_empty() {
        db.products().list_all().await?
    } else {
        db.products().search(query, INVENTORY_SEARCH_LIMIT, 0).await?
    };
    let metrics = db.products().metrics().await?;

    Ok(InventoryView {
        query: query.to_string(),
        products,
        metrics,
    })
}
