//! Settlement reporting.
//!
//! Turns a [`SettlementSummary`] into a short human-readable block for the logs.

use crate::core::settlement::SettlementSummary;
use std::fmt::Write;

/// Formats a settlement summary into a human-readable string.
///
/// # Arguments
/// * `summary` - The summary returned by a settlement pass
///
/// # Returns
/// * A multi-line summary of what the pass did
#[must_use]
pub fn format_settlement_summary(summary: &SettlementSummary) -> String {
    let mut out = format!(
        "Settlement pass - {} - Examined {} pending commissions\n",
        summary.run_at.format("%Y-%m-%d %H:%M:%S UTC"),
        summary.examined
    );

    // Writing to a String cannot fail
    let _ = writeln!(
        out,
        "  Released: {} (₹{:.2}) | Not matured: {} | Already released: {}",
        summary.released,
        summary.total_released_amount,
        summary.not_matured,
        summary.already_released
    );
    let _ = writeln!(
        out,
        "  Skipped: {} malformed, {} without seller | Failed: {}",
        summary.skipped_malformed, summary.skipped_no_seller, summary.failed
    );

    if summary.release_cap_reached {
        out.push_str("  Release limit reached; remaining backlog continues next pass\n");
    }
    if summary.interrupted {
        out.push_str("  Pass ended early after a storage error\n");
    }

    out
}
