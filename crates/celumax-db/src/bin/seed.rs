//! # Seed Data Generator
//!
//! Populates the database with a demo repair shop for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./celumax_dev.db
//! cargo run -p celumax-db --bin seed
//!
//! # Limit the catalog size
//! cargo run -p celumax-db --bin seed -- --count 40
//!
//! # Specify database path
//! cargo run -p celumax-db --bin seed -- --db ./data/celumax.db
//! ```
//!
//! ## Generated Data
//! - Spare parts and accessories for common phone models
//! - A few repair tickets at every lifecycle stage
//! - One counter invoice
//! - A purchase checklist with pending lines

use std::env;

use celumax_core::{
    InvoiceDraft, InvoiceLineDraft, Money, NewProduct, NewPurchaseOrderLine, ReceiptDetails,
    ReceiptState,
};
use celumax_db::{Database, DbConfig};

/// Part families with their base sale price in pesos.
const PARTS: &[(&str, i64, &str)] = &[
    ("Pantalla", 180_000, "Vitrina"),
    ("Batería", 70_000, "Cajón 1"),
    ("Pin de carga", 25_000, "Cajón 2"),
    ("Tapa trasera", 40_000, "Cajón 3"),
    ("Vidrio templado", 15_000, "Mostrador"),
    ("Forro", 20_000, "Mostrador"),
];

/// Models, with a price multiplier in percent.
const MODELS: &[(&str, i64)] = &[
    ("Samsung A10", 80),
    ("Samsung A32", 110),
    ("Moto G20", 90),
    ("Moto E7", 75),
    ("Xiaomi Redmi 9", 85),
    ("Xiaomi Note 11", 120),
    ("iPhone 8", 140),
    ("iPhone 11", 200),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = PARTS.len() * MODELS.len();
    let mut db_path = String::from("./celumax_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(count);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Celumax Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: all)");
                println!("  -d, --db <PATH>    Database file path (default: ./celumax_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Celumax Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    let mut products = Vec::new();
    'outer: for (part_idx, (part, base, location)) in PARTS.iter().enumerate() {
        for (model_idx, (model, factor)) in MODELS.iter().enumerate() {
            if products.len() >= count {
                break 'outer;
            }
            let seed = part_idx * MODELS.len() + model_idx;
            let sale_price_cents = base * factor; // pesos × % = cents
            let new = NewProduct {
                name: format!("{} {}", part, model),
                description: String::new(),
                purchase_price_cents: sale_price_cents * 55 / 100,
                sale_price_cents,
                stock: (seed % 6) as i64,
                location: location.to_string(),
            };
            match db.products().insert(&new).await {
                Ok(product) => products.push(product),
                Err(e) => eprintln!("Failed to insert {}: {}", new.name, e),
            }
        }
    }
    println!("✓ {} products", products.len());

    // Counter sale
    if let Some(product) = products.iter().find(|p| p.stock > 0) {
        let invoice = db
            .invoices()
            .create(&InvoiceDraft {
                client_name: "Cliente mostrador".to_string(),
                client_id: String::new(),
                lines: vec![InvoiceLineDraft {
                    product_id: product.id.clone(),
                    quantity: 1,
                }],
            })
            .await?;
        println!("✓ Invoice {} ({})", invoice.invoice.id, product.name);
    }

    // Repair tickets
    let tickets = [
        ("Laura Gómez", "Samsung A32", "Cambio de pantalla", 250_000, ReceiptState::SinArreglar),
        ("Jorge Ríos", "iPhone 8", "Cambio de batería", 120_000, ReceiptState::Arreglado),
        ("Diana Cruz", "Moto G20", "Pin de carga", 60_000, ReceiptState::Entregado),
    ];
    for (client, device, procedure, pesos, state) in tickets {
        let receipt = db
            .receipts()
            .insert(&ReceiptDetails {
                client_name: client.to_string(),
                client_phone: "3000000000".to_string(),
                device_reference: device.to_string(),
                procedure: procedure.to_string(),
                price_cents: pesos * 100,
                deposit_cents: pesos * 50,
                ..Default::default()
            })
            .await?;
        let mut current = receipt.state;
        while current < state {
            match current.next() {
                Some(next) => {
                    db.receipts().advance(&receipt.id, next).await?;
                    current = next;
                }
                None => break,
            }
        }
    }
    println!("✓ {} repair tickets", tickets.len());

    // Purchase checklist
    for product in products.iter().filter(|p| p.stock == 0).take(3) {
        db.orders()
            .add_line(&NewPurchaseOrderLine {
                name: product.name.clone(),
                quantity_ordered: 2,
                unit_price_cents: product.purchase_price_cents,
                product_id: Some(product.id.clone()),
            })
            .await?;
    }
    db.orders()
        .add_line(&NewPurchaseOrderLine {
            name: "Cargador tipo C 20W".to_string(),
            quantity_ordered: 5,
            unit_price_cents: 1_800_000,
            product_id: None,
        })
        .await?;
    println!("✓ Purchase checklist");

    let metrics = db.products().metrics().await?;
    println!();
    println!(
        "Inventory: {} units, value {}",
        metrics.total_stock,
        Money::from_cents(metrics.inventory_value_cents)
    );
    println!("✓ Seed complete!");

    Ok(())
}
