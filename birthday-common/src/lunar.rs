///! Chinese lunar calendar conversion
///!
///! Table driven conversion between Gregorian dates and the traditional
///! Chinese lunisolar calendar for lunar years 1900–2100.

use chrono::{Days, NaiveDate};
use thiserror::Error;

pub const MIN_LUNAR_YEAR: i32 = 1900;
pub const MAX_LUNAR_YEAR: i32 = 2100;

/// Per-year lunar data, 1900..=2100.
///
/// Bits 0-3: leap month (0 = none). Bits 4-15: months 12..1, set = 30 days.
/// Bit 16: leap month has 30 days.
const LUNAR_INFO: [u32; 201] = [
    0x04bd8, 0x04ae0, 0x0a570, 0x054d5, 0x0d260, 0x0d950, 0x16554, 0x056a0, 0x09ad0, 0x055d2, // 1900
    0x04ae0, 0x0a5b6, 0x0a4d0, 0x0d250, 0x1d255, 0x0b540, 0x0d6a0, 0x0ada2, 0x095b0, 0x14977, // 1910
    0x04970, 0x0a4b0, 0x0b4b5, 0x06a50, 0x06d40, 0x1ab54, 0x02b60, 0x09570, 0x052f2, 0x04970, // 1920
    0x06566, 0x0d4a0, 0x0ea50, 0x16a95, 0x05ad0, 0x02b60, 0x186e3, 0x092e0, 0x1c8d7, 0x0c950, // 1930
    0x0d4a0, 0x1d8a6, 0x0b550, 0x056a0, 0x1a5b4, 0x025d0, 0x092d0, 0x0d2b2, 0x0a950, 0x0b557, // 1940
    0x06ca0, 0x0b550, 0x15355, 0x04da0, 0x0a5b0, 0x14573, 0x052b0, 0x0a9a8, 0x0e950, 0x06aa0, // 1950
    0x0aea6, 0x0ab50, 0x04b60, 0x0aae4, 0x0a570, 0x05260, 0x0f263, 0x0d950, 0x05b57, 0x056a0, // 1960
    0x096d0, 0x04dd5, 0x04ad0, 0x0a4d0, 0x0d4d4, 0x0d250, 0x0d558, 0x0b540, 0x0b6a0, 0x195a6, // 1970
    0x095b0, 0x049b0, 0x0a974, 0x0a4b0, 0x0b27a, 0x06a50, 0x06d40, 0x0af46, 0x0ab60, 0x09570, // 1980
    0x04af5, 0x04970, 0x064b0, 0x074a3, 0x0ea50, 0x06b58, 0x05ac0, 0x0ab60, 0x096d5, 0x092e0, // 1990
    0x0c960, 0x0d954, 0x0d4a0, 0x0da50, 0x07552, 0x056a0, 0x0abb7, 0x025d0, 0x092d0, 0x0cab5, // 2000
    0x0a950, 0x0b4a0, 0x0baa4, 0x0ad50, 0x055d9, 0x04ba0, 0x0a5b0, 0x15176, 0x052b0, 0x0a930, // 2010
    0x07954, 0x06aa0, 0x0ad50, 0x05b52, 0x04b60, 0x0a6e6, 0x0a4e0, 0x0d260, 0x0ea65, 0x0d530, // 2020
    0x05aa0, 0x076a3, 0x096d0, 0x04afb, 0x04ad0, 0x0a4d0, 0x1d0b6, 0x0d250, 0x0d520, 0x0dd45, // 2030
    0x0b5a0, 0x056d0, 0x055b2, 0x049b0, 0x0a577, 0x0a4b0, 0x0aa50, 0x1b255, 0x06d20, 0x0ada0, // 2040
    0x14b63, 0x09370, 0x049f8, 0x04970, 0x064b0, 0x168a6, 0x0ea50, 0x06b20, 0x1a6c4, 0x0aae0, // 2050
    0x092e0, 0x0d2e3, 0x0c960, 0x0d557, 0x0d4a0, 0x0da50, 0x05d55, 0x056a0, 0x0a6d0, 0x055d4, // 2060
    0x052d0, 0x0a9b8, 0x0a950, 0x0b4a0, 0x0b6a6, 0x0ad50, 0x055a0, 0x0aba4, 0x0a5b0, 0x052b0, // 2070
    0x0b273, 0x06930, 0x07337, 0x06aa0, 0x0ad50, 0x14b55, 0x04b60, 0x0a570, 0x054e4, 0x0d160, // 2080
    0x0e968, 0x0d520, 0x0daa0, 0x16aa6, 0x056d0, 0x04ae0, 0x0a9d4, 0x0a2d0, 0x0d150, 0x0f252, // 2090
    0x0d520, // 2100
];

/// Errors raised by calendar conversion
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("lunar year {0} is outside the supported range 1900-2100")]
    YearOutOfRange(i32),

    #[error("invalid lunar month {0}")]
    InvalidMonth(u32),

    #[error("lunar {year}-{month} has no day {day} (month length {days})")]
    InvalidDay { year: i32, month: u32, day: u32, days: u32 },

    #[error("lunar year {year} has no leap month {month}")]
    NoSuchLeapMonth { year: i32, month: u32 },

    #[error("solar date {0} is outside the supported lunar range")]
    DateOutOfRange(NaiveDate),
}

/// A date in the Chinese lunar calendar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LunarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Whether `month` is the intercalary (闰) month of the year
    pub is_leap_month: bool,
}

impl LunarDate {
    pub fn new(year: i32, month: u32, day: u32, is_leap_month: bool) -> Self {
        Self { year, month, day, is_leap_month }
    }
}

impl std::fmt::Display for LunarDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let leap = if self.is_leap_month { "闰" } else { "" };
        write!(f, "{}年{}{}月{}日", self.year, leap, self.month, self.day)
    }
}

/// Solar date of lunar 1900-01-01
fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 31).expect("valid epoch date")
}

fn info(year: i32) -> u32 {
    LUNAR_INFO[(year - MIN_LUNAR_YEAR) as usize]
}

/// Leap month of `year`, 0 when the year has none
fn leap_month(year: i32) -> u32 {
    info(year) & 0xf
}

fn leap_month_days(year: i32) -> u32 {
    if leap_month(year) == 0 {
        0
    } else if info(year) & 0x10000 != 0 {
        30
    } else {
        29
    }
}

fn month_days(year: i32, month: u32) -> u32 {
    if info(year) & (0x10000 >> month) != 0 { 30 } else { 29 }
}

fn year_days(year: i32) -> u32 {
    (1..=12).map(|m| month_days(year, m)).sum::<u32>() + leap_month_days(year)
}

fn check_year(year: i32) -> Result<(), CalendarError> {
    if (MIN_LUNAR_YEAR..=MAX_LUNAR_YEAR).contains(&year) {
        Ok(())
    } else {
        Err(CalendarError::YearOutOfRange(year))
    }
}

/// Number of days in a lunar month.
pub fn days_in_month(year: i32, month: u32, is_leap_month: bool) -> Result<u32, CalendarError> {
    check_year(year)?;
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth(month));
    }
    if is_leap_month {
        if leap_month(year) != month {
            return Err(CalendarError::NoSuchLeapMonth { year, month });
        }
        Ok(leap_month_days(year))
    } else {
        Ok(month_days(year, month))
    }
}

/// Convert a Gregorian date to the lunar calendar.
pub fn solar_to_lunar(date: NaiveDate) -> Result<LunarDate, CalendarError> {
    let mut offset = date.signed_duration_since(epoch()).num_days();
    if offset < 0 {
        return Err(CalendarError::DateOutOfRange(date));
    }

    let mut year = MIN_LUNAR_YEAR;
    loop {
        if year > MAX_LUNAR_YEAR {
            return Err(CalendarError::DateOutOfRange(date));
        }
        let days = i64::from(year_days(year));
        if offset < days {
            break;
        }
        offset -= days;
        year += 1;
    }

    let leap = leap_month(year);
    for month in 1..=12 {
        let days = i64::from(month_days(year, month));
        if offset < days {
            return Ok(LunarDate::new(year, month, offset as u32 + 1, false));
        }
        offset -= days;

        if month == leap {
            let days = i64::from(leap_month_days(year));
            if offset < days {
                return Ok(LunarDate::new(year, month, offset as u32 + 1, true));
            }
            offset -= days;
        }
    }

    // year_days() covers every month above, so the loop always returns
    Err(CalendarError::DateOutOfRange(date))
}

/// Convert a lunar date to the Gregorian calendar.
pub fn lunar_to_solar(
    year: i32,
    month: u32,
    day: u32,
    is_leap_month: bool,
) -> Result<NaiveDate, CalendarError> {
    let days = days_in_month(year, month, is_leap_month)?;
    if day == 0 || day > days {
        return Err(CalendarError::InvalidDay { year, month, day, days });
    }

    let mut offset: u64 = (MIN_LUNAR_YEAR..year).map(|y| u64::from(year_days(y))).sum();

    let leap = leap_month(year);
    for m in 1..month {
        offset += u64::from(month_days(year, m));
        if m == leap {
            offset += u64::from(leap_month_days(year));
        }
    }
    if is_leap_month {
        offset += u64::from(month_days(year, month));
    }
    offset += u64::from(day - 1);

    epoch()
        .checked_add_days(Days::new(offset))
        .ok_or(CalendarError::YearOutOfRange(year))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_spring_festival_dates() {
        let festivals = [
            (1985, ymd(1985, 2, 20)),
            (1990, ymd(1990, 1, 27)),
            (2000, ymd(2000, 2, 5)),
            (2020, ymd(2020, 1, 25)),
            (2023, ymd(2023, 1, 22)),
            (2024, ymd(2024, 2, 10)),
            (2025, ymd(2025, 1, 29)),
            (2026, ymd(2026, 2, 17)),
        ];
        for (year, solar) in festivals {
            assert_eq!(solar_to_lunar(solar).unwrap(), LunarDate::new(year, 1, 1, false));
            assert_eq!(lunar_to_solar(year, 1, 1, false).unwrap(), solar);
        }
    }

    #[test]
    fn test_eve_belongs_to_previous_year() {
        assert_eq!(solar_to_lunar(ymd(2024, 2, 9)).unwrap(), LunarDate::new(2023, 12, 30, false));
    }

    #[test]
    fn test_mid_autumn() {
        assert_eq!(solar_to_lunar(ymd(2024, 9, 17)).unwrap(), LunarDate::new(2024, 8, 15, false));
        assert_eq!(lunar_to_solar(1990, 8, 15, false).unwrap(), ymd(1990, 10, 3));
    }

    #[test]
    fn test_leap_months() {
        // 2023 has a leap 2nd month, 2025 a leap 6th month
        assert_eq!(leap_month(2023), 2);
        assert_eq!(leap_month(2025), 6);
        assert_eq!(leap_month(2024), 0);

        assert_eq!(solar_to_lunar(ymd(2023, 3, 22)).unwrap(), LunarDate::new(2023, 2, 1, true));
        assert_eq!(solar_to_lunar(ymd(2023, 4, 20)).unwrap(), LunarDate::new(2023, 3, 1, false));
        assert_eq!(solar_to_lunar(ymd(2025, 7, 25)).unwrap(), LunarDate::new(2025, 6, 1, true));
        assert_eq!(lunar_to_solar(2023, 2, 1, true).unwrap(), ymd(2023, 3, 22));
    }

    #[test]
    fn test_round_trip_through_a_year() {
        let mut date = ymd(2023, 1, 1);
        while date < ymd(2024, 1, 1) {
            let lunar = solar_to_lunar(date).unwrap();
            let back = lunar_to_solar(lunar.year, lunar.month, lunar.day, lunar.is_leap_month);
            assert_eq!(back.unwrap(), date, "round trip of {}", date);
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_invalid_lunar_dates() {
        // 2024 lunar 12th month has 29 days
        assert_eq!(
            lunar_to_solar(2024, 12, 30, false),
            Err(CalendarError::InvalidDay { year: 2024, month: 12, day: 30, days: 29 })
        );
        assert!(matches!(lunar_to_solar(2024, 1, 31, false), Err(CalendarError::InvalidDay { .. })));
        assert!(matches!(lunar_to_solar(2024, 1, 0, false), Err(CalendarError::InvalidDay { .. })));
        assert_eq!(lunar_to_solar(2024, 13, 1, false), Err(CalendarError::InvalidMonth(13)));
        assert_eq!(
            lunar_to_solar(2024, 2, 1, true),
            Err(CalendarError::NoSuchLeapMonth { year: 2024, month: 2 })
        );
        assert_eq!(lunar_to_solar(1899, 1, 1, false), Err(CalendarError::YearOutOfRange(1899)));
        assert_eq!(lunar_to_solar(2101, 1, 1, false), Err(CalendarError::YearOutOfRange(2101)));
    }

    #[test]
    fn test_solar_out_of_range() {
        assert!(matches!(solar_to_lunar(ymd(1900, 1, 30)), Err(CalendarError::DateOutOfRange(_))));
        assert!(matches!(solar_to_lunar(ymd(2150, 1, 1)), Err(CalendarError::DateOutOfRange(_))));
        assert_eq!(solar_to_lunar(ymd(1900, 1, 31)).unwrap(), LunarDate::new(1900, 1, 1, false));
    }

    #[test]
    fn test_display() {
        assert_eq!(LunarDate::new(2023, 2, 1, true).to_string(), "2023年闰2月1日");
        assert_eq!(LunarDate::new(2024, 8, 15, false).to_string(), "2024年8月15日");
    }
}
