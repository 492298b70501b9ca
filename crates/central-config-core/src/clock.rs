// crates/central-config-core/src/clock.rs
// ============================================================================
// Module: Central Config Clock
// Description: Clock abstraction and download-date parser.
// Purpose: Keep refresh timing deterministic under test.
// Dependencies: time
// ============================================================================

//! ## Overview
//! Refresh decisions compare "now" against persisted timestamps. The client
//! never reads wall-clock time directly; it asks a [`Clock`], so tests can
//! substitute a controllable one. Packaged properties carry their download
//! date as `dd-MM-yyyy HH:mm:ss` in UTC.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::OffsetDateTime;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current UTC time.
    fn now(&self) -> OffsetDateTime;
}

/// Wall-clock [`Clock`] backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

// ============================================================================
// SECTION: Download Date
// ============================================================================

/// Format of `configuration.download-date`.
const DOWNLOAD_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[day]-[month]-[year] [hour]:[minute]:[second]");

/// Parses a `dd-MM-yyyy HH:mm:ss` timestamp as UTC.
///
/// # Errors
///
/// Returns [`time::error::Parse`] when the text does not match the format.
pub fn parse_download_date(text: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(text.trim(), DOWNLOAD_DATE_FORMAT).map(PrimitiveDateTime::assume_utc)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions use unwrap for clarity.")]

    use time::macros::datetime;

    use super::parse_download_date;

    #[test]
    fn download_date_parses_as_utc() {
        let parsed = parse_download_date("07-03-2024 09:15:30").unwrap();
        assert_eq!(parsed, datetime!(2024-03-07 09:15:30 UTC));
    }

    #[test]
    fn download_date_rejects_iso_format() {
        assert!(parse_download_date("2024-03-07T09:15:30Z").is_err());
    }
}
