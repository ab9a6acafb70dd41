//! # till-admin
//!
//! Back-office CLI over the shop's ledger database.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  argv ──► Cli::parse (clap) ──► Command                                 │
//! │                                │                                        │
//! │  env ──► AdminConfig ──► Database::new ──► Till<Database>               │
//! │                                │                                        │
//! │                                ▼                                        │
//! │                    run(command, &till)                                  │
//! │                                │                                        │
//! │              ┌─────────────────┼─────────────────┐                      │
//! │              ▼                 ▼                 ▼                      │
//! │         JSON (stdout)     CSV (stdout/file)   error body (stderr)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod command;
mod config;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::json;
use till_core::{DateRange, Page};
use till_db::{Database, DbConfig};
use till_ledger::{LedgerError, Till};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::command::{Cli, Command};
use crate::config::AdminConfig;

#[tokio::main]
async fn main() -> ExitCode {
    // Usage errors exit with 2, --help with 0
    let command = Cli::parse().command;

    let config = match AdminConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    // Logs go to stderr so stdout stays clean JSON / CSV
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match execute(command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(ledger_err) = e.downcast_ref::<LedgerError>() {
                let body = serde_json::to_string(&ledger_err.to_body())
                    .unwrap_or_else(|_| ledger_err.to_string());
                eprintln!("{body}");
            } else {
                error!(error = %format!("{e:#}"), "Command failed");
            }
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Command, config: AdminConfig) -> anyhow::Result<()> {
    let db = Database::new(DbConfig::new(&config.database_path))
        .await
        .with_context(|| format!("opening {}", config.database_path.display()))?;
    info!(path = %config.database_path.display(), "Ledger database ready");

    let db = Arc::new(db);
    let till = Till::new(db.clone(), config.ledger);
    let mut stdout = std::io::stdout().lock();

    let result = run(command, &till, &mut stdout).await;
    db.close().await;
    result
}

/// Runs one command and writes its output to `out`.
async fn run<W: Write>(command: Command, till: &Till<Database>, out: &mut W) -> anyhow::Result<()> {
    match command {
        Command::Summary { date } => {
            let summary = till.reporter().get_summary(date).await?;
            let state = till.day_close().state(date).await?;
            print_json(out, &json!({ "summary": summary, "state": state }))?;
        }
        Command::Range { start, end } => {
            let report = till.reporter().get_range(start, end).await?;
            print_json(out, &report)?;
        }
        Command::List { start, end, page, size } => {
            let page = till
                .ledger()
                .list_by_range(start, end, Page::new(page, size))
                .await?;
            print_json(out, &page)?;
        }
        Command::Close { date, notes } => {
            let summary = till.day_close().close(date, notes.as_deref()).await?;
            print_json(out, &summary)?;
        }
        Command::Recompute { start, end } => {
            let range = DateRange::new(start, end.unwrap_or(start)).map_err(LedgerError::from)?;
            let summaries = till.reconciler().recompute_range(range).await?;
            print_json(out, &summaries)?;
        }
        Command::Export { start, end, out: path } => {
            let csv = till.reporter().export_csv(start, end).await?;
            match path {
                Some(path) => {
                    std::fs::write(&path, &csv)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(path = %path.display(), bytes = csv.len(), "CSV written");
                }
                None => out.write_all(&csv)?,
            }
        }
        Command::Purge { yes } => {
            anyhow::ensure!(yes, "purge deletes the whole ledger; pass --yes to confirm");
            let report = till.ledger().purge().await?;
            print_json(out, &report)?;
        }
        Command::Health => {
            let healthy = till.store().health_check().await;
            print_json(out, &json!({ "healthy": healthy }))?;
            if !healthy {
                anyhow::bail!("database did not answer");
            }
        }
    }
    Ok(())
}

fn print_json<W: Write, T: serde::Serialize + ?Sized>(out: &mut W, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use till_core::{InvoiceItem, NewInvoice};
    use till_ledger::{FixedClock, LedgerConfig};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    async fn till_with_sales() -> Till<Database> {
        let db = Arc::new(Database::new(DbConfig::in_memory()).await.unwrap());
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2025, 6, 14, 10, 0, 0).unwrap(),
        ));
        let till = Till::with_clock(db, LedgerConfig::default(), clock);
        for (total, discount) in [(10_000, 0), (5_000, 1_000)] {
            till.ledger()
                .append(NewInvoice {
                    customer_name: "Ana".to_string(),
                    customer_phone: "0300".to_string(),
                    items: vec![InvoiceItem {
                        game_id: None,
                        title: "Hades II".to_string(),
                        platform: Some("PC".to_string()),
                        quantity: 1,
                        unit_price_cents: total,
                    }],
                    discount_cents: discount,
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        till
    }

    async fn output(command: Command, till: &Till<Database>) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        run(command, till, &mut buf).await?;
        Ok(String::from_utf8(buf).unwrap())
    }

    #[tokio::test]
    async fn test_summary_prints_json() {
        let till = till_with_sales().await;
        let text = output(Command::Summary { date: day(14) }, &till).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["summary"]["total_invoices"], 2);
        assert_eq!(value["summary"]["net_revenue_cents"], 14_000);
    }

    #[tokio::test]
    async fn test_export_to_stdout() {
        let till = till_with_sales().await;
        let text = output(
            Command::Export {
                start: day(13),
                end: day(15),
                out: None,
            },
            &till,
        )
        .await
        .unwrap();
        assert_eq!(text.trim_end().split("\r\n").count(), 4);
    }

    #[tokio::test]
    async fn test_purge_refuses_without_confirmation() {
        let till = till_with_sales().await;
        assert!(output(Command::Purge { yes: false }, &till).await.is_err());
        assert_eq!(till.reporter().get_summary(day(14)).await.unwrap().total_invoices, 2);

        let text = output(Command::Purge { yes: true }, &till).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["invoices_deleted"], 2);
    }

    #[tokio::test]
    async fn test_close_twice_surfaces_ledger_error() {
        let till = till_with_sales().await;
        output(Command::Close { date: day(14), notes: None }, &till)
            .await
            .unwrap();

        let err = output(Command::Close { date: day(14), notes: None }, &till)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<LedgerError>(),
            Some(&LedgerError::AlreadyClosed { date: day(14) })
        );
    }
}
