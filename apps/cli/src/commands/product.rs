//! # Product Commands
//!
//! Inventory screen: search, suggestions, CRUD and totals.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  $ celumax product search pantalla                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_search_query() ── trims, caps length                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  name LIKE '%pantalla%' ESCAPE '\'   ORDER BY name COLLATE NOCASE       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Vec<ProductDto> (prices in cents plus formatted)                       │
//! │                                                                         │
//! │  `product list` goes through InventoryState instead, so the totals      │
//! │  come with the rows.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Instant;

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use celumax_core::{InventoryMetrics, Money, NewProduct, Product, DEFAULT_PAGE_SIZE};
use serde::Serialize;
use tracing::{debug, info};

use super::{parse_money, Output};
use crate::error::{CliError, CliResult};
use crate::state::{AppState, InventoryState, InventoryView};

#[derive(Debug, Clone, Subcommand)]
pub enum ProductCommand {
    /// Search products by name
    Search {
        #[arg(default_value = "")]
        query: String,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Up to five name suggestions while typing
    Suggest { query: String },
    /// Inventory screen: matching products plus stock totals
    List {
        #[arg(long, default_value = "")]
        query: String,
    },
    Show { id: String },
    Add(AddProductArgs),
    /// Change descriptive fields or prices. Stock changes go through `stock`.
    Update(UpdateProductArgs),
    Delete { id: String },
    /// Total units and inventory value at purchase price
    Metrics,
    OutOfStock,
}

#[derive(Debug, Clone, Args)]
pub struct AddProductArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, value_parser = parse_money)]
    pub purchase_price: i64,
    #[arg(long, value_parser = parse_money)]
    pub sale_price: i64,
    /// Opening stock, recorded as an ENTRADA movement
    #[arg(long, default_value_t = 0)]
    pub stock: i64,
    #[arg(long, default_value = "")]
    pub location: String,
}

#[derive(Debug, Clone, Args)]
pub struct UpdateProductArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_parser = parse_money)]
    pub purchase_price: Option<i64>,
    #[arg(long, value_parser = parse_money)]
    pub sale_price: Option<i64>,
    #[arg(long)]
    pub location: Option<String>,
}

/// Product as printed by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    pub purchase_price: String,
    pub sale_price: String,
    pub stock: i64,
    /// Stock valued at purchase price
    pub stock_value: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

impl From<Product> for ProductDto {
    fn from(p: Product) -> Self {
        ProductDto {
            stock_value: p.stock_value().to_string(),
            purchase_price: p.purchase_price().to_string(),
            sale_price: p.sale_price().to_string(),
            id: p.id,
            name: p.name,
            description: p.description,
            purchase_price_cents: p.purchase_price_cents,
            sale_price_cents: p.sale_price_cents,
            stock: p.stock,
            location: p.location,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsDto {
    pub total_stock: i64,
    pub inventory_value_cents: i64,
    pub inventory_value: String,
}

impl From<InventoryMetrics> for MetricsDto {
    fn from(m: InventoryMetrics) -> Self {
        MetricsDto {
            total_stock: m.total_stock,
            inventory_value_cents: m.inventory_value_cents,
            inventory_value: Money::from_cents(m.inventory_value_cents).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryDto {
    pub query: String,
    pub products: Vec<ProductDto>,
    pub metrics: MetricsDto,
}

impl From<InventoryView> for InventoryDto {
    fn from(view: InventoryView) -> Self {
        InventoryDto {
            query: view.query,
            products: view.products.into_iter().map(ProductDto::from).collect(),
            metrics: view.metrics.into(),
        }
    }
}

fn dtos(products: Vec<Product>) -> Vec<ProductDto> {
    products.into_iter().map(ProductDto::from).collect()
}

pub(crate) async fn require_product(state: &AppState, id: &str) -> CliResult<Product> {
    state
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| CliError::not_found("Product", id))
}

pub async fn run(state: &AppState, cmd: ProductCommand) -> CliResult<Output> {
    let products = state.db.products();

    match cmd {
        ProductCommand::Search {
            query,
            limit,
            offset,
        } => {
            let start = Instant::now();
            let found = products.search(&query, limit, offset).await?;
            info!(
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                count = found.len(),
                query = %query.trim(),
                "product search complete"
            );
            Output::json(dtos(found))
        }

        ProductCommand::Suggest { query } => Output::json(dtos(products.suggestions(&query).await?)),

        ProductCommand::List { query } => {
            let inventory = InventoryState::load(state.db.clone(), &query).await?;
            Output::json(InventoryDto::from(inventory.current()))
        }

        ProductCommand::Show { id } => Output::json(ProductDto::from(require_product(state, &id).await?)),

        ProductCommand::Add(args) => {
            debug!(name = %args.name, "product add command");
            let created = products
                .insert(&NewProduct {
                    name: args.name,
                    description: args.description,
                    purchase_price_cents: args.purchase_price,
                    sale_price_cents: args.sale_price,
                    stock: args.stock,
                    location: args.location,
                })
                .await?;
            Output::json(ProductDto::from(created))
        }

        ProductCommand::Update(args) => {
            let mut product = require_product(state, &args.id).await?;
            if let Some(name) = args.name {
                product.name = name;
            }
            if let Some(description) = args.description {
                product.description = description;
            }
            if let Some(cents) = args.purchase_price {
                product.purchase_price_cents = cents;
            }
            if let Some(cents) = args.sale_price {
                product.sale_price_cents = cents;
            }
            if let Some(location) = args.location {
                product.location = location;
            }
            products.update(&product).await?;
            Output::json(ProductDto::from(require_product(state, &args.id).await?))
        }

        ProductCommand::Delete { id } => {
            products.delete(&id).await?;
            Output::json(serde_json::json!({ "deleted": id }))
        }

        ProductCommand::Metrics => Output::json(MetricsDto::from(products.metrics().await?)),

        ProductCommand::OutOfStock => Output::json(dtos(products.out_of_stock().await?)),
    }
}
