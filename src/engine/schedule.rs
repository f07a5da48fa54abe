//! Weekly group patterns and session start times.

use chrono::Weekday;
use derive_more::Display;
use strum_macros::{AsRefStr, EnumIter, EnumString};

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ScheduleError {
    #[display(fmt = "unknown group pattern '{}'", _0)]
    UnknownPattern(String),

    #[display(fmt = "malformed session time '{}', expected HH:MM AM|PM", _0)]
    MalformedTime(String),
}

impl std::error::Error for ScheduleError {}

/// The closed set of recurring weekly groups a student can be enrolled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter)]
pub enum GroupPattern {
    #[strum(serialize = "Saturday+Tuesday")]
    SatTue,
    #[strum(serialize = "Sunday+Wednesday")]
    SunWed,
    #[strum(serialize = "Monday+Thursday")]
    MonThu,
    #[strum(serialize = "Saturday+Tuesday+Thursday")]
    SatTueThu,
}

impl GroupPattern {
    pub fn parse(raw: &str) -> Result<Self, ScheduleError> {
        raw.trim()
            .parse()
            .map_err(|_| ScheduleError::UnknownPattern(raw.to_string()))
    }

    pub fn weekdays(&self) -> &'static [Weekday] {
        match self {
            GroupPattern::SatTue => &[Weekday::Sat, Weekday::Tue],
            GroupPattern::SunWed => &[Weekday::Sun, Weekday::Wed],
            GroupPattern::MonThu => &[Weekday::Mon, Weekday::Thu],
            GroupPattern::SatTueThu => &[Weekday::Sat, Weekday::Tue, Weekday::Thu],
        }
    }

    /// Session days as 0 = Sunday .. 6 = Saturday, ascending.
    pub fn weekday_indices(&self) -> Vec<u32> {
        let mut days: Vec<u32> = self
            .weekdays()
            .iter()
            .map(|d| d.num_days_from_sunday())
            .collect();
        days.sort_unstable();
        days
    }

    pub fn includes(&self, day: Weekday) -> bool {
        self.weekdays().contains(&day)
    }
}

/// Parses a strict 12-hour "HH:MM AM|PM" string into minutes since midnight.
pub fn parse_session_minutes(raw: &str) -> Result<u32, ScheduleError> {
    let malformed = || ScheduleError::MalformedTime(raw.to_string());

    let (clock, marker) = raw.trim().split_once(' ').ok_or_else(malformed)?;
    let (hours, minutes) = clock.split_once(':').ok_or_else(malformed)?;

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(hours) || hours.len() > 2 || !all_digits(minutes) || minutes.len() != 2 {
        return Err(malformed());
    }

    let hours: u32 = hours.parse().map_err(|_| malformed())?;
    let minutes: u32 = minutes.parse().map_err(|_| malformed())?;
    if !(1..=12).contains(&hours) || minutes > 59 {
        return Err(malformed());
    }

    let hours = match marker.to_ascii_uppercase().as_str() {
        "AM" => hours % 12,
        "PM" => hours % 12 + 12,
        _ => return Err(malformed()),
    };

    Ok(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn patterns_map_to_sunday_based_indices() {
        assert_eq!(GroupPattern::SatTue.weekday_indices(), vec![2, 6]);
        assert_eq!(GroupPattern::SunWed.weekday_indices(), vec![0, 3]);
        assert_eq!(GroupPattern::MonThu.weekday_indices(), vec![1, 4]);
        assert_eq!(GroupPattern::SatTueThu.weekday_indices(), vec![2, 4, 6]);
    }

    #[test]
    fn patterns_parse_from_their_stored_names() {
        for pattern in GroupPattern::iter() {
            assert_eq!(GroupPattern::parse(pattern.as_ref()), Ok(pattern));
        }
        assert_eq!(
            GroupPattern::parse("Friday+Monday"),
            Err(ScheduleError::UnknownPattern("Friday+Monday".into()))
        );
    }

    #[test]
    fn includes_checks_the_weekday() {
        assert!(GroupPattern::SatTue.includes(Weekday::Sat));
        assert!(!GroupPattern::SatTue.includes(Weekday::Thu));
        assert!(GroupPattern::SatTueThu.includes(Weekday::Thu));
    }

    #[test]
    fn session_times_convert_to_minutes() {
        assert_eq!(parse_session_minutes("02:00 PM"), Ok(14 * 60));
        assert_eq!(parse_session_minutes("9:30 am"), Ok(9 * 60 + 30));
        assert_eq!(parse_session_minutes("12:00 AM"), Ok(0));
        assert_eq!(parse_session_minutes("12:45 PM"), Ok(12 * 60 + 45));
        assert_eq!(parse_session_minutes("11:59 PM"), Ok(23 * 60 + 59));
    }

    #[test]
    fn malformed_times_are_rejected() {
        for raw in ["14:00", "2:00PM", "13:00 PM", "00:30 AM", "02:60 PM", "02:5 PM", "aa:bb PM", "", "02:00 XM"] {
            assert_eq!(
                parse_session_minutes(raw),
                Err(ScheduleError::MalformedTime(raw.to_string())),
                "{raw:?} should be rejected"
            );
        }
    }
}
