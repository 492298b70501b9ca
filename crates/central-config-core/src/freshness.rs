// crates/central-config-core/src/freshness.rs
// ============================================================================
// Module: Configuration Freshness Rules
// Description: Anti-rollback serial gate and refresh-due check.
// Purpose: Decide when a document may replace the current one.
// Dependencies: time
// ============================================================================

//! ## Overview
//! [`is_newer`] is the only gate that lets a fetched, cached, or packaged
//! document become current. [`is_check_due`] decides whether a non-forced
//! refresh should contact the configuration service at all.

// ============================================================================
// SECTION: Imports
// ============================================================================

use time::Duration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Returns true when `new_serial` may replace the accepted serial.
///
/// With no prior acceptance every serial is newer; otherwise the new serial
/// must be strictly greater.
#[must_use]
pub const fn is_newer(accepted_serial: Option<i64>, new_serial: i64) -> bool {
    match accepted_serial {
        None => true,
        Some(accepted) => new_serial > accepted,
    }
}

/// Returns true when at least `interval_hours` have passed since the last
/// check, or when no check has happened yet.
///
/// A last check in the future (clock moved backwards) counts as due so a
/// skewed clock cannot suppress refreshes indefinitely.
#[must_use]
pub fn is_check_due(
    last_checked_at: Option<OffsetDateTime>,
    now: OffsetDateTime,
    interval_hours: u32,
) -> bool {
    let Some(last) = last_checked_at else {
        return true;
    };
    if last > now {
        return true;
    }
    now - last >= Duration::hours(i64::from(interval_hours))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use time::Duration;
    use time::macros::datetime;

    use super::is_check_due;
    use super::is_newer;

    proptest! {
        #[test]
        fn no_prior_acceptance_is_always_newer(serial in any::<i64>()) {
            prop_assert!(is_newer(None, serial));
        }

        #[test]
        fn newer_means_strictly_greater(accepted in any::<i64>(), serial in any::<i64>()) {
            prop_assert_eq!(is_newer(Some(accepted), serial), serial > accepted);
        }
    }

    #[test]
    fn equal_serial_is_not_newer() {
        assert!(!is_newer(Some(7), 7));
        assert!(!is_newer(Some(7), 5));
        assert!(is_newer(Some(5), 7));
    }

    #[test]
    fn check_due_respects_interval() {
        let now = datetime!(2025-01-10 12:00 UTC);
        assert!(is_check_due(None, now, 4));
        assert!(!is_check_due(Some(now - Duration::hours(3)), now, 4));
        assert!(is_check_due(Some(now - Duration::hours(4)), now, 4));
        assert!(is_check_due(Some(now + Duration::hours(1)), now, 4));
    }
}
