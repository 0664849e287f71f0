///! Roster line parser
///!
///! Lines look like `张三-2005-4-16-a-技术部`. Year and department are
///! optional, the type letter is `a` (solar) or `b` (lunar). Names may
///! themselves contain hyphens. Full-width digits (`２００５`) are read as
///! ASCII; a field written in any other non-ASCII digits makes the line
///! malformed.

use anyhow::{Context, Result};
use birthday_common::{BirthdayRecord, CalendarType};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use super::types::{LineShape, Roster, SkipReason, SkippedLine};

/// Outcome of parsing a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Blank,
    Record(LineShape, BirthdayRecord),
    Malformed,
}

/// A hyphen-delimited field made only of non-ASCII decimal digits
const FOREIGN_DIGIT_FIELD: &str = r"(^|-)[\p{Nd}&&[^0-9]]+(-|$)";

/// Roster parser with its line patterns compiled once
pub struct RosterParser {
    matchers: Vec<(LineShape, Regex)>,
    foreign_digits: Regex,
}

impl RosterParser {
    pub fn new() -> Result<Self> {
        let matchers = LineShape::PRIORITY
            .iter()
            .map(|shape| {
                Regex::new(shape.pattern())
                    .map(|re| (*shape, re))
                    .with_context(|| format!("Failed to compile {:?} line regex", shape))
            })
            .collect::<Result<Vec<_>>>()?;
        let foreign_digits =
            Regex::new(FOREIGN_DIGIT_FIELD).context("Failed to compile digit field regex")?;

        Ok(Self {
            matchers,
            foreign_digits,
        })
    }

    /// Read and parse a roster file.
    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Roster> {
        let content = fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read roster file: {:?}", path.as_ref()))?;

        Ok(self.parse_str(&content))
    }

    /// Parse roster text, dropping exact duplicate lines.
    ///
    /// Lines are compared after trimming and digit normalization, so
    /// `张三-２００５-4-16-a` repeats `张三-2005-4-16-a`.
    pub fn parse_str(&self, content: &str) -> Roster {
        let mut roster = Roster::default();
        // normalized line text -> first line number
        let mut seen: HashMap<Cow<'_, str>, usize> = HashMap::new();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            let key = normalize_digits(line);

            if let Some(&first_line) = seen.get(&key) {
                warn!("发现重复行，已跳过 (line {}, first seen at line {}): {}", line_no, first_line, line);
                roster.skipped.push(SkippedLine {
                    line_no,
                    content: line.to_string(),
                    reason: SkipReason::Duplicate { first_line },
                });
                continue;
            }

            match self.parse_line(&key) {
                LineOutcome::Blank => {}
                LineOutcome::Record(shape, record) => {
                    debug!("Line {} parsed as {:?}: {:?}", line_no, shape, record);
                    seen.insert(key, line_no);
                    roster.records.push(record);
                }
                LineOutcome::Malformed => {
                    warn!("跳过格式不正确的行 (line {}): {}", line_no, line);
                    roster.skipped.push(SkippedLine {
                        line_no,
                        content: line.to_string(),
                        reason: SkipReason::Malformed,
                    });
                }
            }
        }

        info!(
            "Parsed {} birthday records ({} skipped, {} duplicates)",
            roster.records.len(),
            roster.skipped.len(),
            roster.duplicates()
        );

        roster
    }

    /// Try each shape in priority order. The first shape whose pattern
    /// matches decides the outcome; later shapes are not tried.
    pub fn parse_line(&self, line: &str) -> LineOutcome {
        let line = normalize_digits(line.trim());
        if line.is_empty() {
            return LineOutcome::Blank;
        }
        if self.foreign_digits.is_match(&line) {
            return LineOutcome::Malformed;
        }

        self.matchers
            .iter()
            .find_map(|(shape, re)| re.captures(&line).map(|caps| (*shape, caps)))
            .and_then(|(shape, caps)| {
                Self::build_record(shape, &caps).map(|record| LineOutcome::Record(shape, record))
            })
            .unwrap_or(LineOutcome::Malformed)
    }

    fn build_record(shape: LineShape, caps: &Captures<'_>) -> Option<BirthdayRecord> {
        let field = |i: usize| caps.get(i).map(|m| m.as_str());

        let name = field(1)?.to_string();

        // captures after the name shift by one when a year is present
        let (birth_year, first) = if shape.has_year() {
            (Some(field(2)?.parse::<i32>().ok()?), 3)
        } else {
            (None, 2)
        };

        let month = field(first)?.parse::<u32>().ok()?;
        let day = field(first + 1)?.parse::<u32>().ok()?;
        let calendar = CalendarType::from_code(field(first + 2)?)?;
        let department = if shape.has_department() {
            Some(field(first + 3)?.to_string())
        } else {
            None
        };

        Some(BirthdayRecord {
            name,
            birth_year,
            month,
            day,
            calendar,
            department,
        })
    }
}

/// Map full-width digits `０`..`９` to ASCII.
fn normalize_digits(line: &str) -> Cow<'_, str> {
    let is_fullwidth = |c: char| ('０'..='９').contains(&c);
    if !line.chars().any(is_fullwidth) {
        return Cow::Borrowed(line);
    }

    line.chars()
        .map(|c| {
            if is_fullwidth(c) {
                char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c)
            } else {
                c
            }
        })
        .collect::<String>()
        .into()
}
