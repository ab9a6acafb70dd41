//! # Seed Data Generator
//!
//! Fills a database with a few days of trading for development.
//!
//! ## Usage
//! ```bash
//! # 7 days x 25 invoices ending yesterday (default)
//! cargo run -p till-db --bin seed
//!
//! # Custom shape
//! cargo run -p till-db --bin seed -- --days 30 --per-day 80
//!
//! # Specify database path
//! cargo run -p till-db --bin seed -- --db ./data/till.db
//! ```
//!
//! Invoices go through the real ledger (allocator, aggregates, print
//! counter) with a fixed clock stepped across the business day, so the
//! seeded numbers and summaries look exactly like production ones. Every
//! day except the most recent is closed.

use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use std::env;
use std::sync::Arc;
use till_core::{InvoiceItem, NewInvoice};
use till_db::{Database, DbConfig};
use till_ledger::{FixedClock, LedgerConfig, LedgerStore, Till};

/// Catalog the seeded invoices draw from: (title, platform, price in cents).
const CATALOG: &[(&str, &str, i64)] = &[
    ("Elden Ring", "PS5", 12_999),
    ("Tekken 8", "PS5", 14_999),
    ("Zelda: Tears of the Kingdom", "Switch", 13_499),
    ("Forza Horizon 5", "Xbox Series X", 9_999),
    ("Hades II", "PC", 2_999),
    ("Mario Kart 8 Deluxe", "Switch", 10_999),
    ("EA FC 25", "PS5", 11_499),
    ("Starfield", "Xbox Series X", 8_999),
    ("DualSense Controller", "PS5", 17_999),
    ("Pro Controller", "Switch", 16_499),
];

const CUSTOMERS: &[(&str, &str)] = &[
    ("Ali Raza", "+92 300 1112233"),
    ("Sana Khan", "+92 321 4445566"),
    ("Bilal Ahmed", "+92 333 7778899"),
    ("Ayesha Malik", "+92 345 1212121"),
    ("Usman Tariq", "+92 301 9090909"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 7;
    let mut per_day: usize = 25;
    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(7);
                    i += 1;
                }
            }
            "--per-day" | "-p" => {
                if i + 1 < args.len() {
                    per_day = args[i + 1].parse().unwrap_or(25);
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
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>       Number of trading days (default: 7)");
                println!("  -p, --per-day <N>    Invoices per day (default: 25)");
                println!("  -d, --db <PATH>      Database file path (default: ./till_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let days = days.max(1);
    let last_day = Utc::now().date_naive() - Duration::days(1);
    let first_day = last_day - Duration::days(days - 1);

    println!("🌱 Till Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!("Days:     {} .. {}", first_day, last_day);
    println!("Per day:  {}", per_day);
    println!();

    let db = Arc::new(Database::new(DbConfig::new(&db_path)).await?);
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.summary(first_day).await?.is_some() {
        println!("⚠ Database already has a summary for {}", first_day);
        println!("  Skipping seed to avoid mixing runs.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let clock = Arc::new(FixedClock::new(opening_time(first_day)));
    let till = Till::with_clock(db.clone(), LedgerConfig::default(), clock.clone());

    println!();
    println!("Recording invoices...");
    let start = std::time::Instant::now();
    let mut generated = 0usize;

    for offset in 0..days {
        let date = first_day + Duration::days(offset);
        clock.set(opening_time(date));

        for n in 0..per_day {
            let seed = offset as usize * 1_000 + n;
            let invoice = till.ledger().append(generate_order(seed)).await?;
            if seed % 3 != 0 {
                till.ledger().record_print(&invoice.id).await?;
            }
            generated += 1;
            clock.advance(Duration::minutes(17));
        }

        let summary = if date < last_day {
            till.day_close().close(date, Some("Seeded day")).await?
        } else {
            till.reporter().get_summary(date).await?
        };
        println!(
            "  {}: {} invoices, net {}.{:02}{}",
            date,
            summary.total_invoices,
            summary.net_revenue_cents / 100,
            summary.net_revenue_cents % 100,
            if summary.is_closed { " (closed)" } else { "" }
        );
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Recorded {} invoices in {:?}", generated, elapsed);

    let report = till.reporter().get_range(first_day, last_day).await?;
    println!(
        "  Range net: {}.{:02} across {} closed days",
        report.totals.net_revenue_cents / 100,
        report.totals.net_revenue_cents % 100,
        report.totals.closed_days
    );

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// 10:00 UTC on `date`.
fn opening_time(date: NaiveDate) -> chrono::DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default()))
}

/// Builds one order from the catalog, deterministic in `seed`.
fn generate_order(seed: usize) -> NewInvoice {
    let (name, phone) = CUSTOMERS[seed % CUSTOMERS.len()];
    let lines = 1 + seed % 3;

    let items: Vec<InvoiceItem> = (0..lines)
        .map(|line| {
            let (title, platform, price) = CATALOG[(seed * 7 + line * 3) % CATALOG.len()];
            InvoiceItem {
                game_id: Some(format!("game-{}", (seed * 7 + line * 3) % CATALOG.len())),
                title: title.to_string(),
                platform: Some(platform.to_string()),
                quantity: 1 + ((seed + line) % 2) as i64,
                unit_price_cents: price,
            }
        })
        .collect();

    // Every fifth customer gets a round 5% off.
    let subtotal: i64 = items
        .iter()
        .map(|item| item.unit_price_cents * item.quantity)
        .sum();
    let discount_cents = if seed % 5 == 0 { subtotal / 20 } else { 0 };

    NewInvoice {
        customer_name: name.to_string(),
        customer_phone: phone.to_string(),
        items,
        discount_cents,
        ..Default::default()
    }
}
