//! Command line definition.
//!
//! ```text
//! till-admin summary   <date>
//! till-admin range     <start> <end>
//! till-admin list      <start> <end> [--page N] [--size N]
//! till-admin close     <date> [--notes TEXT]
//! till-admin recompute <date> [<end>]
//! till-admin export    <start> <end> [--out PATH]
//! till-admin purge     --yes
//! till-admin health
//! ```
//!
//! Dates are `YYYY-MM-DD`.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use till_core::Page;

const ENVIRONMENT: &str = "\
Environment:
  TILL_DATABASE_PATH        SQLite file (default: ./till.db)
  TILL_UTC_OFFSET_MINUTES   Shop's offset from UTC (default: 0)
  TILL_LOG                  Log filter (default: info,sqlx=warn)
  RUST_LOG                  Log filter, takes precedence over TILL_LOG";

/// Till ledger administration
#[derive(Parser, Debug)]
#[command(name = "till-admin")]
#[command(about = "Back-office tools for the Till invoice ledger")]
#[command(after_help = ENVIRONMENT)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// A parsed admin command.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Daily summary as JSON
    Summary {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },

    /// Per-day summaries and totals as JSON
    Range {
        #[arg(value_parser = parse_date)]
        start: NaiveDate,
        #[arg(value_parser = parse_date)]
        end: NaiveDate,
    },

    /// Invoices in the range as JSON
    List {
        #[arg(value_parser = parse_date)]
        start: NaiveDate,
        #[arg(value_parser = parse_date)]
        end: NaiveDate,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Invoices per page
        #[arg(long, default_value_t = Page::default().size)]
        size: u32,
    },

    /// Close a day
    Close {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,

        /// Appended to the day's notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Rebuild cached totals from the ledger
    Recompute {
        #[arg(value_parser = parse_date)]
        start: NaiveDate,

        /// Last day to rebuild (default: same as start)
        #[arg(value_parser = parse_date)]
        end: Option<NaiveDate>,
    },

    /// Daily summaries as CSV
    Export {
        #[arg(value_parser = parse_date)]
        start: NaiveDate,
        #[arg(value_parser = parse_date)]
        end: NaiveDate,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Delete every invoice and summary
    #[command(arg_required_else_help = true)]
    Purge {
        /// Confirms the whole ledger should go
        #[arg(long)]
        yes: bool,
    },

    /// Check the database answers
    Health,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| format!("expected YYYY-MM-DD, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("till-admin").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    fn kind(args: &[&str]) -> ErrorKind {
        parse(args).unwrap_err().kind()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_summary_and_range() {
        assert_eq!(
            parse(&["summary", "2025-06-14"]).unwrap(),
            Command::Summary { date: day(14) }
        );
        assert_eq!(
            parse(&["range", "2025-06-01", "2025-06-30"]).unwrap(),
            Command::Range {
                start: day(1),
                end: day(30)
            }
        );
    }

    #[test]
    fn test_close_with_notes() {
        assert_eq!(
            parse(&["close", "2025-06-14", "--notes", "cash counted"]).unwrap(),
            Command::Close {
                date: day(14),
                notes: Some("cash counted".to_string())
            }
        );
        assert_eq!(
            parse(&["close", "2025-06-14"]).unwrap(),
            Command::Close {
                date: day(14),
                notes: None
            }
        );
    }

    #[test]
    fn test_recompute_end_is_optional() {
        assert_eq!(
            parse(&["recompute", "2025-06-14"]).unwrap(),
            Command::Recompute {
                start: day(14),
                end: None
            }
        );
        assert_eq!(
            parse(&["recompute", "2025-06-14", "2025-06-16"]).unwrap(),
            Command::Recompute {
                start: day(14),
                end: Some(day(16))
            }
        );
    }

    #[test]
    fn test_list_paging_flags() {
        assert_eq!(
            parse(&["list", "2025-06-14", "2025-06-15", "--page", "3", "--size", "20"]).unwrap(),
            Command::List {
                start: day(14),
                end: day(15),
                page: 3,
                size: 20
            }
        );
        assert_eq!(
            parse(&["list", "2025-06-14", "2025-06-15"]).unwrap(),
            Command::List {
                start: day(14),
                end: day(15),
                page: 1,
                size: Page::default().size
            }
        );
        assert_eq!(
            kind(&["list", "2025-06-14", "2025-06-15", "--page", "x"]),
            ErrorKind::ValueValidation
        );
    }

    #[test]
    fn test_export_out_path() {
        assert_eq!(
            parse(&["export", "2025-06-01", "2025-06-03", "--out", "june.csv"]).unwrap(),
            Command::Export {
                start: day(1),
                end: day(3),
                out: Some(PathBuf::from("june.csv"))
            }
        );
        assert_eq!(
            parse(&["export", "2025-06-01", "2025-06-03", "-o", "june.csv"]).unwrap(),
            parse(&["export", "2025-06-01", "2025-06-03", "--out", "june.csv"]).unwrap()
        );
    }

    #[test]
    fn test_purge_needs_confirmation() {
        assert_eq!(kind(&["purge"]), ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand);
        assert_eq!(parse(&["purge", "--yes"]).unwrap(), Command::Purge { yes: true });
    }

    #[test]
    fn test_errors() {
        assert!(parse(&[]).is_err());
        assert_eq!(kind(&["summary", "14/06/2025"]), ErrorKind::ValueValidation);
        assert_eq!(kind(&["range", "2025-06-01"]), ErrorKind::MissingRequiredArgument);
        assert_eq!(kind(&["health", "now"]), ErrorKind::UnknownArgument);
        assert_eq!(kind(&["frobnicate"]), ErrorKind::InvalidSubcommand);
        assert_eq!(kind(&["--help"]), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_help_lists_both_log_variables() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("TILL_LOG"));
        assert!(help.contains("RUST_LOG"));
    }
}
