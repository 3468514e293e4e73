//! Calendar date helpers shared by every layer.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Month};

/// `YYYY-MM-DD`, the only date shape accepted at the edges.
pub const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` string.
///
/// # Errors
/// Returns an error if the input is not a valid calendar date.
pub fn parse_date(input: &str) -> Result<Date, time::error::Parse> {
    Date::parse(input.trim(), ISO_DATE)
}

/// Render a date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(ISO_DATE)
        .unwrap_or_else(|_| format!("{}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day()))
}

/// Whole days from `today` until `due`; negative when `due` lies in the past.
#[must_use]
pub fn days_until(due: Date, today: Date) -> i64 {
    (due - today).whole_days()
}

/// Move `anchor` forward by `months` calendar months, clamping to the month end.
///
/// Returns `None` when the result leaves the supported date range.
#[must_use]
pub fn add_months(anchor: Date, months: u32) -> Option<Date> {
    let zero_based = i64::from(u8::from(anchor.month())) - 1 + i64::from(months);
    let year = i32::try_from(i64::from(anchor.year()) + zero_based.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(zero_based.rem_euclid(12) + 1).ok()?).ok()?;
    let day = anchor.day().min(last_day_of_month(year, month)?);
    Date::from_calendar_date(year, month, day).ok()
}

fn last_day_of_month(year: i32, month: Month) -> Option<u8> {
    let (next_year, next_month) = match month {
        Month::December => (year.checked_add(1)?, Month::January),
        other => (year, other.next()),
    };
    Date::from_calendar_date(next_year, next_month, 1)
        .ok()?
        .previous_day()
        .map(Date::day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parse_and_format_iso_dates() {
        let parsed = parse_date(" 2024-03-01 ").unwrap_or_else(|err| panic!("must parse: {err}"));
        assert_eq!(parsed, date!(2024 - 03 - 01));
        assert_eq!(format_date(parsed), "2024-03-01");
        assert!(parse_date("03/01/2024").is_err());
        assert!(parse_date("2024-02-30").is_err());
    }

    #[test]
    fn days_until_is_signed() {
        let today = date!(2024 - 03 - 10);
        assert_eq!(days_until(date!(2024 - 03 - 17), today), 7);
        assert_eq!(days_until(today, today), 0);
        assert_eq!(days_until(date!(2024 - 03 - 09), today), -1);
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        let anchor = date!(2024 - 01 - 31);
        assert_eq!(add_months(anchor, 1), Some(date!(2024 - 02 - 29)));
        assert_eq!(add_months(anchor, 2), Some(date!(2024 - 03 - 31)));
        assert_eq!(add_months(anchor, 13), Some(date!(2025 - 02 - 28)));
        assert_eq!(add_months(date!(2024 - 11 - 15), 2), Some(date!(2025 - 01 - 15)));
    }
}
