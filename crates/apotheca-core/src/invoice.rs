//! # Invoice Identifiers
//!
//! Pure formatting for the `INV-YYMMDD-NNN` invoice scheme.
//!
//! The sequence number counts *distinct* invoice identifiers already
//! recorded for the calendar day, plus one. Counting lives in the sale
//! repository (it needs the ledger); the formatting rules live here so they
//! are testable without a database.
//!
//! The generated identifier is advisory: the caller reads a suggestion,
//! may override it, and whatever string is finally passed to `record_sale`
//! becomes the grouping key. Uniqueness is not reserved.

use chrono::NaiveDate;

/// Prefix shared by every invoice of one calendar day: `INV-YYMMDD-`.
///
/// Used as the `LIKE` pattern stem when counting the day's invoices.
pub fn day_prefix(day: NaiveDate) -> String {
    format!("INV-{}-", day.format("%y%m%d"))
}

/// Formats the n-th invoice of a day: `INV-YYMMDD-NNN`, 1-based,
/// zero-padded to three digits.
pub fn format_invoice(day: NaiveDate, seq: i64) -> String {
    format!("{}{:03}", day_prefix(day), seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_prefix() {
        assert_eq!(day_prefix(day(2025, 1, 9)), "INV-250109-");
        assert_eq!(day_prefix(day(2026, 12, 31)), "INV-261231-");
    }

    #[test]
    fn test_format_invoice_zero_padded() {
        assert_eq!(format_invoice(day(2025, 1, 9), 1), "INV-250109-001");
        assert_eq!(format_invoice(day(2025, 1, 9), 42), "INV-250109-042");
        assert_eq!(format_invoice(day(2025, 1, 9), 1000), "INV-250109-1000");
    }
}
