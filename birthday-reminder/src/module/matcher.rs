///! Birthday matcher
///!
///! Decides whether a record's anniversary falls on the reference date.

use birthday_common::{BirthdayRecord, CalendarError, CalendarType, LunarDate, solar_to_lunar};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::Asia::Shanghai;
use chrono_tz::Tz;

/// Date snapshot every check in one run is made against.
///
/// Captured once in Asia/Shanghai time; the lunar equivalent is converted
/// once as well.
#[derive(Debug, Clone)]
pub struct ReferenceDate {
    now: DateTime<Tz>,
    lunar: Result<LunarDate, CalendarError>,
}

impl ReferenceDate {
    /// Current Beijing time
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    /// The Asia/Shanghai calendar day containing `instant`.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self::in_shanghai(instant.with_timezone(&Shanghai))
    }

    fn in_shanghai(now: DateTime<Tz>) -> Self {
        let lunar = solar_to_lunar(now.date_naive());
        match &lunar {
            Ok(date) => tracing::debug!("{} is lunar {}", now.date_naive(), date),
            Err(e) => tracing::warn!("Cannot convert {} to the lunar calendar: {}", now.date_naive(), e),
        }
        Self { now, lunar }
    }

    /// Noon of the given day in Asia/Shanghai, mostly for tests.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(12, 0, 0)?;
        let now = Shanghai.from_local_datetime(&naive).single()?;
        Some(Self::in_shanghai(now))
    }

    pub fn solar(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn lunar(&self) -> Result<&LunarDate, &CalendarError> {
        self.lunar.as_ref()
    }

    /// Timestamp shown in notifications, e.g. `2024-03-15 12:00:00 CST`
    pub fn formatted(&self) -> String {
        self.now.format("%Y-%m-%d %H:%M:%S %Z").to_string()
    }
}

/// Whether today is the record's birthday.
///
/// Lunar records compare against today's lunar month/day. The leap flag is
/// ignored, so a birthday in month N also matches day-for-day during a leap
/// month N.
pub fn is_birthday_today(record: &BirthdayRecord, reference: &ReferenceDate) -> bool {
    match record.calendar {
        CalendarType::Solar => {
            let today = reference.solar();
            today.month() == record.month && today.day() == record.day
        }
        CalendarType::Lunar => match reference.lunar() {
            Ok(lunar) => lunar.month == record.month && lunar.day == record.day,
            Err(_) => false,
        },
    }
}

/// Records matching the reference date, in roster order
pub fn todays_birthdays<'a>(
    records: &'a [BirthdayRecord],
    reference: &ReferenceDate,
) -> Vec<&'a BirthdayRecord> {
    records
        .iter()
        .filter(|r| is_birthday_today(r, reference))
        .collect()
}
