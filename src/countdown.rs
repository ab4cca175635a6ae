use chrono::{Datelike, Local, NaiveDate};

/// The anniversary of `birthday` in `year`. February 29 falls back to
/// February 28 in years without one.
pub fn anniversary_in(birthday: NaiveDate, year: i32) -> NaiveDate {
    birthday
        .with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, birthday.month(), 28))
        .unwrap_or(birthday)
}

/// Days from `today` until the next anniversary of `birthday`; 0 when the
/// anniversary is today.
pub fn days_until_next(birthday: NaiveDate, today: NaiveDate) -> i64 {
    let this_year = anniversary_in(birthday, today.year());
    let next = if this_year < today {
        anniversary_in(birthday, today.year() + 1)
    } else {
        this_year
    };
    (next - today).num_days()
}

pub fn days_until_next_from_today(birthday: NaiveDate) -> i64 {
    days_until_next(birthday, Local::now().date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn anniversary_today_is_zero() {
        assert_eq!(days_until_next(date(1990, 10, 17), date(2026, 10, 17)), 0);
    }

    #[test]
    fn upcoming_this_year() {
        assert_eq!(days_until_next(date(1990, 10, 20), date(2026, 10, 17)), 3);
    }

    #[test]
    fn passed_wraps_to_next_year() {
        assert_eq!(days_until_next(date(1990, 10, 16), date(2026, 10, 17)), 364);
        // 2028 is a leap year, so the wrap spans February 29.
        assert_eq!(days_until_next(date(1990, 3, 1), date(2027, 3, 2)), 365);
    }

    #[test]
    fn leap_day_birthday() {
        assert_eq!(anniversary_in(date(2000, 2, 29), 2027), date(2027, 2, 28));
        assert_eq!(anniversary_in(date(2000, 2, 29), 2028), date(2028, 2, 29));
        assert_eq!(days_until_next(date(2000, 2, 29), date(2027, 2, 28)), 0);
        assert_eq!(days_until_next(date(2000, 2, 29), date(2028, 2, 28)), 1);
        assert_eq!(days_until_next(date(2000, 2, 29), date(2027, 3, 1)), 365);
    }

    #[test]
    fn result_stays_in_range_for_a_whole_leap_year() {
        let birthdays = [date(1990, 1, 1), date(1985, 12, 31), date(2000, 2, 29), date(1970, 7, 4)];
        let mut today = date(2028, 1, 1);
        while today.year() == 2028 {
            for birthday in birthdays {
                let days = days_until_next(birthday, today);
                assert!((0..=365).contains(&days), "{birthday} from {today}: {days}");
                let same_day = birthday.month() == today.month() && birthday.day() == today.day();
                assert_eq!(days == 0, same_day, "{birthday} from {today}");
            }
            today = today.succ_opt().unwrap();
        }
    }
}
