//! # Seed Data Generator
//!
//! Populates the catalog read model with a restaurant menu for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default tenant
//! cargo run -p mesa-db --bin seed
//!
//! # Specify tenant and database path
//! cargo run -p mesa-db --bin seed -- --tenant demo --db ./data/mesa.db
//! ```
//!
//! Product ids are `{CATEGORY}-{INDEX}` (e.g. `TAC-003`), stable across runs
//! so front-end fixtures can reference them.

use std::env;

use mesa_core::{CatalogProduct, Money};
use mesa_db::{Database, DbConfig};

/// Menu sections: (id prefix, category, [(name, price in cents)]).
const MENU: &[(&str, &str, &[(&str, i64)])] = &[
    (
        "ENT",
        "entradas",
        &[
            ("Guacamole", 9500),
            ("Queso fundido", 11000),
            ("Sopa de tortilla", 8500),
            ("Ceviche", 14500),
        ],
    ),
    (
        "TAC",
        "tacos",
        &[
            ("Tacos al pastor (3)", 7500),
            ("Tacos de suadero (3)", 8000),
            ("Tacos de pescado (3)", 9500),
            ("Tacos de canasta (4)", 6000),
        ],
    ),
    (
        "PLA",
        "platos fuertes",
        &[
            ("Enchiladas suizas", 13500),
            ("Mole poblano", 16500),
            ("Chiles en nogada", 21000),
            ("Arrachera", 24500),
            ("Pozole rojo", 12500),
        ],
    ),
    (
        "BEB",
        "bebidas",
        &[
            ("Agua de horchata", 4000),
            ("Agua de jamaica", 4000),
            ("Refresco", 3500),
            ("Cerveza", 5500),
            ("Margarita", 9000),
            ("Café de olla", 3500),
        ],
    ),
    (
        "POS",
        "postres",
        &[("Flan", 5500), ("Churros", 6000), ("Pastel tres leches", 6500)],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut tenant = String::from("default");
    let mut db_path = String::from("./mesa_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tenant" | "-t" => {
                if i + 1 < args.len() {
                    tenant = args[i + 1].clone();
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
                println!("Mesa POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -t, --tenant <ID>  Tenant to seed (default: default)");
                println!("  -d, --db <PATH>    Database file path (default: ./mesa_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Mesa POS Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Tenant:   {}", tenant);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().count(&tenant).await?;
    if existing > 0 {
        println!("⚠ Tenant already has {} products; prices will be refreshed", existing);
    }

    let mut seeded = 0;
    for (prefix, category, dishes) in MENU {
        for (index, (name, cents)) in dishes.iter().enumerate() {
            let product = CatalogProduct {
                id: format!("{}-{:03}", prefix, index + 1),
                name: name.to_string(),
                category: Some(category.to_string()),
                price: Money::from_cents(*cents),
            };

            if let Err(e) = db.catalog().upsert(&tenant, &product).await {
                eprintln!("Failed to upsert {}: {}", product.id, e);
                continue;
            }
            seeded += 1;
        }
    }

    println!();
    println!("✓ Seeded {} products", seeded);
    db.close().await;

    Ok(())
}
