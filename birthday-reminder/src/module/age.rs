///! Age calculation
///!
///! Lunar birthdays are converted to their solar date in the birth year first,
///! then both calendars use the same year-difference rule.

use birthday_common::{BirthdayRecord, CalendarError, CalendarType, lunar_to_solar};
use chrono::Datelike;

use super::matcher::ReferenceDate;

/// Age on the reference date.
///
/// `Ok(None)` when the roster entry has no birth year. `Err` only when a
/// lunar birth date cannot be converted.
pub fn age_on(record: &BirthdayRecord, reference: &ReferenceDate) -> Result<Option<i32>, CalendarError> {
    let Some(birth_year) = record.birth_year else {
        return Ok(None);
    };

    let (year, month, day) = match record.calendar {
        CalendarType::Solar => (birth_year, record.month, record.day),
        CalendarType::Lunar => {
            let solar = lunar_to_solar(birth_year, record.month, record.day, false)?;
            (solar.year(), solar.month(), solar.day())
        }
    };

    let today = reference.solar();
    let mut age = today.year() - year;
    // 今年生日还没到
    if (today.month(), today.day()) < (month, day) {
        age -= 1;
    }
    Ok(Some(age))
}

/// Like [`age_on`], but a failed conversion is logged and treated as unknown.
pub fn age_or_unknown(record: &BirthdayRecord, reference: &ReferenceDate) -> Option<i32> {
    match age_on(record, reference) {
        Ok(age) => age,
        Err(e) => {
            tracing::warn!("农历年龄计算错误 ({}): {}", record.name, e);
            None
        }
    }
}
