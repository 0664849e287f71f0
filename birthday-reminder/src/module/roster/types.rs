///! Roster data types

use birthday_common::BirthdayRecord;

/// Accepted line layouts, most specific first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShape {
    /// `name-year-month-day-type-department`
    YearDepartment,
    /// `name-month-day-type-department`
    Department,
    /// `name-year-month-day-type`
    Year,
    /// `name-month-day-type`
    Bare,
}

impl LineShape {
    /// Order in which shapes are tried
    pub const PRIORITY: [LineShape; 4] = [
        LineShape::YearDepartment,
        LineShape::Department,
        LineShape::Year,
        LineShape::Bare,
    ];

    /// Line regex; numeric fields accept ASCII digits only.
    pub fn pattern(&self) -> &'static str {
        match self {
            LineShape::YearDepartment => r"^(.+)-([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})-(a|b)-(.+)$",
            LineShape::Department => r"^(.+)-([0-9]{1,2})-([0-9]{1,2})-(a|b)-(.+)$",
            LineShape::Year => r"^(.+)-([0-9]{4})-([0-9]{1,2})-([0-9]{1,2})-(a|b)$",
            LineShape::Bare => r"^(.+)-([0-9]{1,2})-([0-9]{1,2})-(a|b)$",
        }
    }

    pub fn has_year(&self) -> bool {
        matches!(self, LineShape::YearDepartment | LineShape::Year)
    }

    pub fn has_department(&self) -> bool {
        matches!(self, LineShape::YearDepartment | LineShape::Department)
    }
}

/// Why a roster line was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Matches none of the accepted shapes
    Malformed,
    /// Same text as an accepted line earlier in the file
    Duplicate { first_line: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the source
    pub line_no: usize,
    pub content: String,
    pub reason: SkipReason,
}

/// Result of reading one roster
#[derive(Debug, Clone, Default)]
pub struct Roster {
    /// Accepted records in file order
    pub records: Vec<BirthdayRecord>,
    pub skipped: Vec<SkippedLine>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| matches!(s.reason, SkipReason::Duplicate { .. }))
            .count()
    }
}
