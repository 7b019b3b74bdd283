//! # Seed Data Generator
//!
//! Populates the database with demo users and shops for development.
//!
//! ## Usage
//! ```bash
//! cargo run -p tagger-db --bin seed
//!
//! # Specify database path
//! cargo run -p tagger-db --bin seed -- --db ./data/tagger.db
//! ```

use std::env;
use tagger_db::{Database, DbConfig};

/// (name, RFID tag)
const USERS: &[(&str, &str)] = &[
    ("Alex", "04A1B2C3"),
    ("Sam", "04D4E5F6"),
    ("Robin", "0490AB12"),
];

/// (code, name, web url)
const SHOPS: &[(&str, &str, Option<&str>)] = &[
    ("ALDI", "Aldi Süd", Some("https://www.aldi-sued.de")),
    ("DM", "dm-drogerie markt", Some("https://www.dm.de")),
    ("EDEKA", "Edeka", None),
    ("REWE", "Rewe", Some("https://www.rewe.de")),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./tagger_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tagger Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./tagger_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Tagger Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.users().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} users", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    for (name, tag) in USERS {
        let user = db.users().insert(name, tag).await?;
        println!("  User #{:<3} {:<8} tag {}", user.id, user.name, user.rfid_uid);
    }

    for (code, name, url) in SHOPS {
        if let Err(e) = db.shops().insert(code, name, *url).await {
            eprintln!("Failed to insert shop {}: {}", code, e);
        }
    }

    println!();
    println!("✓ Seeded {} users and {} shops", USERS.len(), db.shops().list().await.len());

    db.close().await;
    Ok(())
}
