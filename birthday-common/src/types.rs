/// Calendar a birthday is kept in.
///
/// Roster files encode it as a single letter: `a` for the solar (Gregorian)
/// calendar, `b` for the Chinese lunar calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarType {
    Solar,
    Lunar,
}

impl CalendarType {
    /// Map a roster type code to a calendar.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "a" => Some(CalendarType::Solar),
            "b" => Some(CalendarType::Lunar),
            _ => None,
        }
    }

    /// Tag shown next to a name in notifications.
    pub fn label(&self) -> &'static str {
        match self {
            CalendarType::Solar => "(公历)",
            CalendarType::Lunar => "(农历)",
        }
    }
}

/// One parsed roster entry.
///
/// Month and day are stored as written; no calendar validity check is done
/// at parse time. A lunar record's month/day always refer to the lunar
/// calendar, for both matching and age computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BirthdayRecord {
    /// Display name (may contain hyphens)
    pub name: String,
    /// Four digit birth year, when known
    pub birth_year: Option<i32>,
    pub month: u32,
    pub day: u32,
    pub calendar: CalendarType,
    /// Department, shown as a `(dept)` prefix
    pub department: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_codes() {
        assert_eq!(CalendarType::from_code("a"), Some(CalendarType::Solar));
        assert_eq!(CalendarType::from_code("b"), Some(CalendarType::Lunar));
        assert_eq!(CalendarType::from_code("c"), None);
        assert_eq!(CalendarType::from_code("A"), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(CalendarType::Solar.label(), "(公历)");
        assert_eq!(CalendarType::Lunar.label(), "(农历)");
    }
}
