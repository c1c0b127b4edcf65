//! Event schedule parsing
//!
//! Events carry free-form `date` and `time` strings in the club's local
//! wall-clock time. Dates come as `YYYY-MM-DD` or `DD/MM/YYYY`; times as
//! `HH:MM` or `HH:MM - HH:MM`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::Regex;
use crate::config::LifecycleConfig;
use crate::models::Event;
use crate::utils::errors::{PadelTowerError, Result};

/// Start and end instants of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl EventWindow {
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now >= self.end
    }

    pub fn until_start(&self, now: DateTime<Utc>) -> Duration {
        self.start - now
    }
}

/// Turns schedule strings into [`EventWindow`]s
#[derive(Debug, Clone)]
pub struct ScheduleParser {
    offset: FixedOffset,
    default_duration: Duration,
    iso_date: Regex,
    dmy_date: Regex,
    time_range: Regex,
}

impl ScheduleParser {
    pub fn new(offset: FixedOffset, default_duration: Duration) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| PadelTowerError::Config(format!("Invalid schedule pattern {}: {}", pattern, e)))
        };

        Ok(Self {
            offset,
            default_duration,
            iso_date: compile(r"^(\d{4})-(\d{1,2})-(\d{1,2})$")?,
            dmy_date: compile(r"^(\d{1,2})/(\d{1,2})/(\d{4})$")?,
            time_range: compile(r"^(\d{1,2}):(\d{2})(?:\s*-\s*(\d{1,2}):(\d{2}))?$")?,
        })
    }

    pub fn from_config(config: &LifecycleConfig) -> Result<Self> {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60).ok_or_else(|| {
            PadelTowerError::Config(format!("UTC offset out of range: {} minutes", config.utc_offset_minutes))
        })?;
        Self::new(offset, config.default_duration())
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Parse either date format into a calendar date
    pub fn normalize_date(&self, raw: &str) -> Result<NaiveDate> {
        let raw = raw.trim();
        let invalid = || PadelTowerError::InvalidSchedule(format!("Unrecognized date: {}", raw));

        let parts = match self.iso_date.captures(raw) {
            Some(caps) => Some((caps[1].to_string(), caps[2].to_string(), caps[3].to_string())),
            None => self
                .dmy_date
                .captures(raw)
                .map(|caps| (caps[3].to_string(), caps[2].to_string(), caps[1].to_string())),
        };
        let (year, month, day) = parts.ok_or_else(invalid)?;

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        let day: u32 = day.parse().map_err(|_| invalid())?;

        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| PadelTowerError::InvalidSchedule(format!("Date does not exist: {}", raw)))
    }

    /// Canonical `YYYY-MM-DD` form of a date string
    pub fn normalize_date_string(&self, raw: &str) -> Result<String> {
        Ok(self.normalize_date(raw)?.format("%Y-%m-%d").to_string())
    }

    /// Parse `HH:MM` or `HH:MM - HH:MM`
    pub fn parse_time_range(&self, raw: &str) -> Result<(NaiveTime, Option<NaiveTime>)> {
        let raw = raw.trim();
        let caps = self
            .time_range
            .captures(raw)
            .ok_or_else(|| PadelTowerError::InvalidSchedule(format!("Unrecognized time: {}", raw)))?;

        let to_time = |h: &str, m: &str| {
            let hour = h.parse::<u32>().ok();
            let minute = m.parse::<u32>().ok();
            hour.zip(minute)
                .and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
                .ok_or_else(|| PadelTowerError::InvalidSchedule(format!("Time out of range: {}", raw)))
        };

        let start = to_time(&caps[1], &caps[2])?;
        let end = match (caps.get(3), caps.get(4)) {
            (Some(h), Some(m)) => Some(to_time(h.as_str(), m.as_str())?),
            _ => None,
        };
        Ok((start, end))
    }

    fn to_utc(&self, local: NaiveDateTime) -> Result<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&local)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| PadelTowerError::InvalidSchedule(format!("Ambiguous local time: {}", local)))
    }

    /// Compute the window of an event. The end comes from a time range,
    /// then `time_end`, then the default duration. An end at or before the
    /// start is read as past midnight.
    pub fn window(&self, event: &Event) -> Result<EventWindow> {
        let date = self.normalize_date(&event.date)?;
        let (start_time, range_end) = self.parse_time_range(&event.time)?;

        let end_time = match range_end {
            Some(end) => Some(end),
            None => match event.time_end.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                Some(raw) => Some(self.parse_time_range(raw)?.0),
                None => None,
            },
        };

        let start = self.to_utc(date.and_time(start_time))?;
        let end = match end_time {
            Some(end_time) => {
                let mut end = self.to_utc(date.and_time(end_time))?;
                if end <= start {
                    end += Duration::days(1);
                }
                end
            }
            None => start + self.default_duration,
        };

        Ok(EventWindow { start, end })
    }
}
