use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// A session the student picked, expressed in the student's own zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedSession {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub time: NaiveTime,
    #[serde(rename = "startsAtUTC", default, skip_serializing_if = "Option::is_none")]
    pub starts_at_utc: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SelectedSession {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            date,
            time,
            starts_at_utc: None,
            notes: None,
        }
    }

    pub fn at(mut self, starts_at_utc: DateTime<Utc>) -> Self {
        self.starts_at_utc = Some(starts_at_utc);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A slot another student already holds, as reported by the server.
///
/// Needs either the UTC instant or both `date` and `time`. A full ISO
/// datetime in `date` is cut to its calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBookedSlot")]
pub struct BookedSlot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(
        serialize_with = "hhmm::option::serialize",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<NaiveTime>,
    #[serde(rename = "startsAtUTC", skip_serializing_if = "Option::is_none")]
    pub starts_at_utc: Option<DateTime<Utc>>,
}

impl BookedSlot {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        Self {
            date: Some(date),
            time: Some(time),
            starts_at_utc: None,
        }
    }

    pub fn at_instant(starts_at_utc: DateTime<Utc>) -> Self {
        Self {
            date: None,
            time: None,
            starts_at_utc: Some(starts_at_utc),
        }
    }

    pub fn at(mut self, starts_at_utc: DateTime<Utc>) -> Self {
        self.starts_at_utc = Some(starts_at_utc);
        self
    }
}

#[derive(Deserialize)]
struct RawBookedSlot {
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    time: Option<String>,
    #[serde(rename = "startsAtUTC", default)]
    starts_at_utc: Option<DateTime<Utc>>,
}

impl TryFrom<RawBookedSlot> for BookedSlot {
    type Error = String;

    fn try_from(raw: RawBookedSlot) -> Result<Self, Self::Error> {
        let date = raw.date.as_deref().map(parse_day).transpose()?;
        let time = raw
            .time
            .as_deref()
            .map(|t| hhmm::parse(t).ok_or_else(|| format!("invalid time of day: {t}")))
            .transpose()?;

        if raw.starts_at_utc.is_none() && (date.is_none() || time.is_none()) {
            return Err("booked slot needs startsAtUTC or both date and time".to_string());
        }

        Ok(Self {
            date,
            time,
            starts_at_utc: raw.starts_at_utc,
        })
    }
}

/// `YYYY-MM-DD`, optionally followed by a time part.
fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    let day = raw.trim().split(['T', ' ']).next().unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|_| format!("invalid date: {raw}"))
}

/// `HH:MM` wall-clock times; `HH:MM:SS` is accepted on input.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid time of day: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
            .ok()
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(time) => super::serialize(time, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}
