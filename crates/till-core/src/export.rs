//! # Daily Summary Export
//!
//! Renders daily summaries as a spreadsheet-friendly CSV document.
//!
//! ## Output
//! ```text
//! ﻿date,total_invoices,total_revenue,total_discount,net_revenue,is_closed,closed_at,notes\r\n
//! 2025-06-14,2,150.00,10.00,140.00,true,2025-06-14T22:00:00+00:00,"said ""ok"""\r\n
//! ^
//! └── UTF-8 byte-order mark so spreadsheet apps pick the right encoding
//! ```
//!
//! Quoting follows RFC 4180: fields containing commas, quotes or line
//! breaks are wrapped in quotes and embedded quotes are doubled.

use chrono::SecondsFormat;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::DailySummary;

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Column order of the export.
pub const CSV_HEADER: [&str; 8] = [
    "date",
    "total_invoices",
    "total_revenue",
    "total_discount",
    "net_revenue",
    "is_closed",
    "closed_at",
    "notes",
];

/// Renders one CSV row per summary, in the order given.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use till_core::export::summaries_to_csv;
/// use till_core::DailySummary;
///
/// let day = DailySummary::empty(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
/// let bytes = summaries_to_csv(&[day]).unwrap();
/// let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
/// assert_eq!(text.lines().count(), 2);
/// ```
pub fn summaries_to_csv(days: &[DailySummary]) -> CoreResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(UTF8_BOM.to_vec());

    writer.write_record(CSV_HEADER)?;

    for day in days {
        writer.write_record(&[
            day.date.format("%Y-%m-%d").to_string(),
            day.total_invoices.to_string(),
            Money::from_cents(day.total_revenue_cents).to_decimal_string(),
            Money::from_cents(day.total_discount_cents).to_decimal_string(),
            Money::from_cents(day.net_revenue_cents).to_decimal_string(),
            day.is_closed.to_string(),
            day.closed_at
                .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, false))
                .unwrap_or_default(),
            day.notes.clone().unwrap_or_default(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| crate::error::CoreError::Export(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn day(d: u32) -> DailySummary {
        DailySummary::empty(NaiveDate::from_ymd_opt(2025, 6, d).unwrap())
    }

    fn body(bytes: &[u8]) -> String {
        assert!(bytes.starts_with(UTF8_BOM));
        String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap()
    }

    #[test]
    fn test_header_and_rows() {
        let mut closed = day(14);
        closed.total_invoices = 2;
        closed.total_revenue_cents = 15000;
        closed.total_discount_cents = 1000;
        closed.net_revenue_cents = 14000;
        closed.is_closed = true;
        closed.closed_at = Some(Utc.with_ymd_and_hms(2025, 6, 14, 22, 0, 0).unwrap());

        let text = body(&summaries_to_csv(&[closed, day(15)]).unwrap());
        let lines: Vec<&str> = text.split("\r\n").collect();

        assert_eq!(
            lines[0],
            "date,total_invoices,total_revenue,total_discount,net_revenue,is_closed,closed_at,notes"
        );
        assert_eq!(
            lines[1],
            "2025-06-14,2,150.00,10.00,140.00,true,2025-06-14T22:00:00+00:00,"
        );
        assert_eq!(lines[2], "2025-06-15,0,0.00,0.00,0.00,false,,");
        assert_eq!(lines[3], "");
    }

    #[test]
    fn test_notes_are_quoted() {
        let mut noted = day(14);
        noted.notes = Some("drawer short, manager said \"ok\"\nsecond line".to_string());

        let text = body(&summaries_to_csv(&[noted]).unwrap());
        assert!(text.contains("\"drawer short, manager said \"\"ok\"\"\nsecond line\""));
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let text = body(&summaries_to_csv(&[]).unwrap());
        assert_eq!(text.lines().count(), 1);
    }
}
