use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, TutordeskError};

/// Weekday names in grid order (index 0 = Monday).
pub const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// A wall-clock minute, always written as zero-padded `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn hour(&self) -> u32 {
        self.0.hour()
    }

    pub fn minute(&self) -> u32 {
        self.0.minute()
    }

    /// Minutes since midnight.
    pub fn minutes(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        // Drop seconds so equal minutes compare equal.
        Self(NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time))
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.0.hour(), self.0.minute())
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = TutordeskError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[2] == b':'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 2 || b.is_ascii_digit());
        if !well_formed {
            return Err(TutordeskError::InvalidInput(format!(
                "time must be zero-padded HH:MM, got '{s}'"
            )));
        }
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(Self)
            .map_err(|_| TutordeskError::InvalidInput(format!("invalid time of day: '{s}'")))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Which day a slot applies to: every week on a weekday, or one calendar date.
///
/// Serialized as the weekday name (`"Monday"`) or the ISO date
/// (`"2023-10-10"`); the two are told apart once, when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayKey {
    Recurring(Weekday),
    OneTime(NaiveDate),
}

impl DayKey {
    /// Whether this key applies to the given calendar date.
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            Self::Recurring(day) => date.weekday() == *day,
            Self::OneTime(d) => *d == date,
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, Self::Recurring(_))
    }

    /// Human label: weekday name, or `Oct 10, 2023` for one-time dates.
    pub fn label(&self) -> String {
        match self {
            Self::Recurring(day) => weekday_name(*day).to_string(),
            Self::OneTime(date) => date.format("%b %d, %Y").to_string(),
        }
    }
}

impl std::fmt::Display for DayKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Recurring(day) => write!(f, "{}", weekday_name(*day)),
            Self::OneTime(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl std::str::FromStr for DayKey {
    type Err = TutordeskError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.contains('-') {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Self::OneTime)
                .map_err(|_| TutordeskError::InvalidInput(format!("invalid date: '{s}'")))
        } else {
            s.parse::<Weekday>()
                .map(Self::Recurring)
                .map_err(|_| TutordeskError::InvalidInput(format!("unknown weekday: '{s}'")))
        }
    }
}

impl Serialize for DayKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A contiguous interval `[start, end)` on a day during which the tutor is available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub day: DayKey,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl AvailabilitySlot {
    pub fn new(day: DayKey, start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { day, start, end }
    }

    /// Build a slot from the create-schedule editor: a picked calendar date plus
    /// a one-time/recurring toggle.
    pub fn from_draft(date: NaiveDate, recurring: bool, start: TimeOfDay, end: TimeOfDay) -> Self {
        let day = if recurring {
            DayKey::Recurring(date.weekday())
        } else {
            DayKey::OneTime(date)
        };
        Self { day, start, end }
    }

    pub fn validate_range(&self) -> Result<()> {
        if self.start >= self.end {
            return Err(TutordeskError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Two slots conflict when they share a day key and their half-open
    /// ranges intersect. A slot ending at T and one starting at T do not.
    pub fn overlaps(&self, other: &AvailabilitySlot) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }

    /// `time ∈ [start, end)`.
    pub fn covers(&self, time: TimeOfDay) -> bool {
        self.start <= time && time < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        s.parse().unwrap()
    }

    #[test]
    fn test_time_parse_requires_zero_padding() {
        assert_eq!(t("09:00").to_string(), "09:00");
        assert!("9:00".parse::<TimeOfDay>().is_err());
        assert!("09:0".parse::<TimeOfDay>().is_err());
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("ab:cd".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn test_time_order_matches_string_order() {
        let times = ["00:00", "09:05", "09:30", "10:00", "23:59"];
        for pair in times.windows(2) {
            assert!(t(pair[0]) < t(pair[1]));
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_day_key_parse() {
        assert_eq!(
            "Monday".parse::<DayKey>().unwrap(),
            DayKey::Recurring(Weekday::Mon)
        );
        assert_eq!(
            "2023-10-10".parse::<DayKey>().unwrap(),
            DayKey::OneTime(NaiveDate::from_ymd_opt(2023, 10, 10).unwrap())
        );
        assert!("Funday".parse::<DayKey>().is_err());
        assert!("2023-13-40".parse::<DayKey>().is_err());
    }

    #[test]
    fn test_slot_json_shape() {
        let slot = AvailabilitySlot::new("Monday".parse().unwrap(), t("09:00"), t("10:00"));
        let json = serde_json::to_string(&slot).unwrap();
        assert_eq!(json, r#"{"day":"Monday","start":"09:00","end":"10:00"}"#);

        let parsed: AvailabilitySlot =
            serde_json::from_str(r#"{"day":"2023-10-10","start":"14:00","end":"15:30"}"#).unwrap();
        assert!(!parsed.day.is_recurring());
        assert_eq!(parsed.end, t("15:30"));
    }

    #[test]
    fn test_overlap_half_open() {
        let monday: DayKey = "Monday".parse().unwrap();
        let a = AvailabilitySlot::new(monday, t("09:00"), t("10:00"));
        let adjacent = AvailabilitySlot::new(monday, t("10:00"), t("11:00"));
        let inside = AvailabilitySlot::new(monday, t("09:30"), t("09:45"));
        let containing = AvailabilitySlot::new(monday, t("08:00"), t("12:00"));
        let other_day = AvailabilitySlot::new("Tuesday".parse().unwrap(), t("09:00"), t("10:00"));

        assert!(!a.overlaps(&adjacent));
        assert!(!adjacent.overlaps(&a));
        assert!(a.overlaps(&inside));
        assert!(a.overlaps(&containing));
        assert!(!a.overlaps(&other_day));
    }

    #[test]
    fn test_from_draft() {
        let date = NaiveDate::from_ymd_opt(2023, 10, 11).unwrap(); // Wednesday
        let recurring = AvailabilitySlot::from_draft(date, true, t("09:00"), t("10:00"));
        assert_eq!(recurring.day, DayKey::Recurring(Weekday::Wed));
        let once = AvailabilitySlot::from_draft(date, false, t("09:00"), t("10:00"));
        assert_eq!(once.day.to_string(), "2023-10-11");
    }
}
