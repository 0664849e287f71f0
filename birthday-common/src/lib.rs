///! Shared types for the birthday reminder
///!
///! - `types`: roster records and calendar kinds
///! - `lunar`: solar ⇄ Chinese lunar calendar conversion

pub mod lunar;
pub mod types;

pub use lunar::{CalendarError, LunarDate, lunar_to_solar, solar_to_lunar};
pub use types::{BirthdayRecord, CalendarType};
