// 📅 Period Arithmetic - quarterly survey calendar
// Every adjacency check in validation and reconciliation goes through
// these functions; a drift here silently breaks lineage stitching.

use chrono::{Datelike, NaiveDate};

/// Last day of the given month. `month` must be in 1..=12.
pub fn end_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("first of month is always a valid date")
        .pred_opt()
        .expect("first of month always has a predecessor")
}

/// End instant of the quarter immediately preceding `period_end`:
/// three months back, clamped to the last day of that month.
///
/// Exact across year boundaries: the previous quarter end of 2009-03-31
/// is 2008-12-31.
pub fn previous_quarter_end(period_end: NaiveDate) -> NaiveDate {
    let (year, month) = if period_end.month() <= 3 {
        (period_end.year() - 1, period_end.month() + 9)
    } else {
        (period_end.year(), period_end.month() - 3)
    };

    end_of_month(year, month)
}

/// End instant of the quarter immediately following `period_end`.
/// Inverse of [`previous_quarter_end`] for any month-end date.
pub fn next_quarter_end(period_end: NaiveDate) -> NaiveDate {
    let (year, month) = if period_end.month() > 9 {
        (period_end.year() + 1, period_end.month() - 9)
    } else {
        (period_end.year(), period_end.month() + 3)
    };

    end_of_month(year, month)
}

/// Parse a `YYYYMM` token (as embedded in input filenames) into the last
/// day of that month. Returns `None` for anything that is not six digits
/// naming a real month.
pub fn period_end_from_yyyymm(token: &str) -> Option<NaiveDate> {
    if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let year: i32 = token[..4].parse().ok()?;
    let month: u32 = token[4..].parse().ok()?;
    if !(1..=12).contains(&month) {
        return None;
    }

    Some(end_of_month(year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_previous_quarter_end_across_year_boundary() {
        assert_eq!(
            previous_quarter_end(date(2009, 3, 31)),
            date(2008, 12, 31)
        );
        assert_eq!(
            previous_quarter_end(date(2020, 1, 31)),
            date(2019, 10, 31)
        );
    }

    #[test]
    fn test_previous_quarter_end_within_year() {
        assert_eq!(previous_quarter_end(date(2009, 6, 30)), date(2009, 3, 31));
        assert_eq!(previous_quarter_end(date(2009, 9, 30)), date(2009, 6, 30));
        assert_eq!(previous_quarter_end(date(2009, 12, 31)), date(2009, 9, 30));
    }

    #[test]
    fn test_previous_quarter_end_clamps_to_month_length() {
        // May has 31 days, February doesn't.
        assert_eq!(previous_quarter_end(date(2021, 5, 31)), date(2021, 2, 28));
        // Leap year February.
        assert_eq!(previous_quarter_end(date(2024, 5, 31)), date(2024, 2, 29));
    }

    #[test]
    fn test_quarter_adjacency_round_trip() {
        // previous(next(p)) == p for every month end over several years.
        for year in 2007..=2012 {
            for month in 1..=12 {
                let p = end_of_month(year, month);
                assert_eq!(previous_quarter_end(next_quarter_end(p)), p);
                assert_eq!(next_quarter_end(previous_quarter_end(p)), p);
            }
        }
    }

    #[test]
    fn test_end_of_month() {
        assert_eq!(end_of_month(2024, 2), date(2024, 2, 29));
        assert_eq!(end_of_month(2023, 2), date(2023, 2, 28));
        assert_eq!(end_of_month(2023, 12), date(2023, 12, 31));
        assert_eq!(end_of_month(2023, 4), date(2023, 4, 30));
    }

    #[test]
    fn test_period_end_from_yyyymm() {
        assert_eq!(period_end_from_yyyymm("200903"), Some(date(2009, 3, 31)));
        assert_eq!(period_end_from_yyyymm("200812"), Some(date(2008, 12, 31)));
        assert_eq!(period_end_from_yyyymm("202402"), Some(date(2024, 2, 29)));

        assert_eq!(period_end_from_yyyymm("200913"), None);
        assert_eq!(period_end_from_yyyymm("200900"), None);
        assert_eq!(period_end_from_yyyymm("2009"), None);
        assert_eq!(period_end_from_yyyymm("20090x"), None);
    }
}
