//! # Time Axis Decoding
//!
//! Decodes numeric time coordinates encoded as `"<unit> since <reference>"`
//! into calendar dates, honouring the calendar declared by the dataset.
//!
//! Supported calendars:
//! - `standard` / `gregorian` (treated as proleptic Gregorian)
//! - `proleptic_gregorian`
//! - `noleap` / `365_day`
//! - `all_leap` / `366_day`
//! - `360_day`
//!
//! Decoded values are truncated to whole days: rows in the tabular artifact are
//! labelled per day, so every comparison in this crate happens at that
//! granularity.

use crate::error::{Error, Result};
use chrono::{Datelike, NaiveDate, TimeDelta};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

const MILLIS_PER_DAY: i64 = 86_400_000;
// Well inside i64, far beyond any calendar year chrono can represent.
const MAX_OFFSET_MILLIS: f64 = 9.0e18;

/// A day in an arbitrary calendar.
///
/// Field order matters: the derived ordering compares year, then month, then
/// day, which is chronological in every supported calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl CalendarDate {
    pub fn new(year: i32, month: u32, day: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(Error::InvalidDate(format!("{year:04}-{month:02}-{day:02}")));
        }
        Ok(CalendarDate { year, month, day })
    }

    /// Parses `YYYY-MM-DD`. Day validity against a specific calendar is not
    /// checked here, so `2000-02-30` is accepted for `360_day` datasets.
    pub fn parse_iso(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidDate(s.to_string());
        let parts: Vec<&str> = s.trim().split('-').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(invalid());
        }
        let year = parts[0].parse::<i32>().map_err(|_| invalid())?;
        let month = parts[1].parse::<u32>().map_err(|_| invalid())?;
        let day = parts[2].parse::<u32>().map_err(|_| invalid())?;
        CalendarDate::new(year, month, day).map_err(|_| invalid())
    }
}

impl FromStr for CalendarDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CalendarDate::parse_iso(s)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Calendar identifiers understood by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    Standard,
    ProlepticGregorian,
    NoLeap,
    AllLeap,
    Day360,
}

impl Calendar {
    pub fn name(&self) -> &'static str {
        match self {
            Calendar::Standard => "standard",
            Calendar::ProlepticGregorian => "proleptic_gregorian",
            Calendar::NoLeap => "noleap",
            Calendar::AllLeap => "all_leap",
            Calendar::Day360 => "360_day",
        }
    }

    fn month_lengths(&self, year: i32) -> [u32; 12] {
        match self {
            Calendar::Standard | Calendar::ProlepticGregorian => {
                let feb = if is_gregorian_leap(year) { 29 } else { 28 };
                [31, feb, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
            }
            Calendar::NoLeap => [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
            Calendar::AllLeap => [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31],
            Calendar::Day360 => [30; 12],
        }
    }

    pub fn days_in_month(&self, year: i32, month: u32) -> u32 {
        self.month_lengths(year)[(month as usize).saturating_sub(1).min(11)]
    }

    /// Shifts `date` by a signed number of days.
    pub fn add_days(&self, date: CalendarDate, days: i64) -> Result<CalendarDate> {
        if !(1..=12).contains(&date.month)
            || date.day == 0
            || date.day > self.days_in_month(date.year, date.month)
        {
            return Err(Error::InvalidDate(format!("{date} (calendar {})", self.name())));
        }
        match self {
            Calendar::Standard | Calendar::ProlepticGregorian => {
                let overflow = || Error::InvalidDate(format!("{date} shifted by {days} days"));
                let base = NaiveDate::from_ymd_opt(date.year, date.month, date.day)
                    .ok_or_else(|| Error::InvalidDate(date.to_string()))?;
                let delta = TimeDelta::try_days(days).ok_or_else(overflow)?;
                let shifted = base.checked_add_signed(delta).ok_or_else(overflow)?;
                Ok(CalendarDate {
                    year: shifted.year(),
                    month: shifted.month(),
                    day: shifted.day(),
                })
            }
            _ => {
                let lengths = self.month_lengths(date.year);
                let year_len = lengths.iter().sum::<u32>() as i64;
                let before: u32 = lengths[..(date.month - 1) as usize].iter().sum();
                let ordinal =
                    date.year as i64 * year_len + before as i64 + (date.day - 1) as i64 + days;

                let year = ordinal.div_euclid(year_len);
                let mut rem = ordinal.rem_euclid(year_len) as u32;
                let year = i32::try_from(year)
                    .map_err(|_| Error::InvalidDate(format!("{date} shifted by {days} days")))?;
                let mut month = 1;
                for len in lengths {
                    if rem < len {
                        break;
                    }
                    rem -= len;
                    month += 1;
                }
                Ok(CalendarDate {
                    year,
                    month,
                    day: rem + 1,
                })
            }
        }
    }
}

impl FromStr for Calendar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "gregorian" => Ok(Calendar::Standard),
            "proleptic_gregorian" => Ok(Calendar::ProlepticGregorian),
            "noleap" | "365_day" => Ok(Calendar::NoLeap),
            "all_leap" | "366_day" => Ok(Calendar::AllLeap),
            "360_day" => Ok(Calendar::Day360),
            _ => Err(Error::UnsupportedCalendar(s.to_string())),
        }
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn is_gregorian_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    fn millis(&self) -> f64 {
        match self {
            TimeUnit::Days => 86_400_000.0,
            TimeUnit::Hours => 3_600_000.0,
            TimeUnit::Minutes => 60_000.0,
            TimeUnit::Seconds => 1_000.0,
            TimeUnit::Milliseconds => 1.0,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => Ok(TimeUnit::Days),
            "hours" | "hour" | "hrs" | "hr" | "h" => Ok(TimeUnit::Hours),
            "minutes" | "minute" | "mins" | "min" => Ok(TimeUnit::Minutes),
            "seconds" | "second" | "secs" | "sec" | "s" => Ok(TimeUnit::Seconds),
            "milliseconds" | "millisecond" | "msecs" | "msec" | "ms" => {
                Ok(TimeUnit::Milliseconds)
            }
            _ => Err(Error::InvalidTimeUnits(s.to_string())),
        }
    }
}

/// Parsed `"<unit> since <reference>"` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: CalendarDate,
    epoch_millis_of_day: i64,
}

impl TimeUnits {
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidTimeUnits(s.to_string());
        let lower = s.trim().to_ascii_lowercase();
        let (unit_part, reference) = lower.split_once(" since ").ok_or_else(invalid)?;
        let unit = unit_part.parse::<TimeUnit>().map_err(|_| invalid())?;

        let reference = reference.trim();
        let (date_part, rest) = match reference.find([' ', 't']) {
            Some(i) => (&reference[..i], reference[i + 1..].trim()),
            None => (reference, ""),
        };
        let epoch = CalendarDate::parse_iso(date_part).map_err(|_| invalid())?;

        let (time_token, offset_millis) = split_utc_offset(rest).ok_or_else(invalid)?;
        let time_of_day = if time_token.is_empty() {
            0
        } else {
            parse_time_of_day(time_token).ok_or_else(invalid)?
        };
        // Shift a local reference time back to UTC.
        let epoch_millis_of_day = time_of_day - offset_millis;

        Ok(TimeUnits {
            unit,
            epoch,
            epoch_millis_of_day,
        })
    }

    /// Decodes one raw time value to the calendar day containing it.
    pub fn decode(&self, value: f64, calendar: Calendar) -> Result<CalendarDate> {
        if !value.is_finite() {
            return Err(Error::InvalidDate(format!("non-finite time value {value}")));
        }
        let out_of_range = || Error::InvalidDate(format!("time value {value} out of range"));
        let scaled = (value * self.unit.millis()).round();
        if scaled.abs() >= MAX_OFFSET_MILLIS {
            return Err(out_of_range());
        }
        let millis = (scaled as i64)
            .checked_add(self.epoch_millis_of_day)
            .ok_or_else(out_of_range)?;
        calendar.add_days(self.epoch, millis.div_euclid(MILLIS_PER_DAY))
    }
}

/// Splits `"06:00:00-05:00"`, `"00:00 +0530"` or `"12:00:00z"` into the time of
/// day and the UTC offset in milliseconds. `z` and `utc` mean offset zero.
fn split_utc_offset(rest: &str) -> Option<(&str, i64)> {
    let rest = rest.trim();
    let rest = rest.strip_suffix("utc").unwrap_or(rest).trim_end();
    let rest = rest.strip_suffix('z').unwrap_or(rest).trim_end();
    let Some(i) = rest.find(['+', '-']) else {
        return Some((rest, 0));
    };
    let (time, offset) = (rest[..i].trim_end(), &rest[i..]);
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits = offset[1..].trim();
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };
    let hours = hours.parse::<i64>().ok()?;
    let minutes = minutes.parse::<i64>().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some((time, sign * (hours * 3_600_000 + minutes * 60_000)))
}

fn parse_time_of_day(token: &str) -> Option<i64> {
    let mut parts = token.split(':');
    let hours = parts.next()?.parse::<i64>().ok()?;
    let minutes = match parts.next() {
        Some(m) => m.parse::<i64>().ok()?,
        None => 0,
    };
    let seconds = match parts.next() {
        Some(sec) => sec.parse::<f64>().ok()?,
        None => 0.0,
    };
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3_600_000 + minutes * 60_000 + (seconds * 1000.0).round() as i64)
}

/// The time coordinate of a grid: raw values plus their decoding metadata.
#[derive(Debug, Clone)]
pub struct TimeAxis {
    values: Vec<f64>,
    units_label: String,
    units: TimeUnits,
    calendar: Calendar,
}

impl TimeAxis {
    /// Builds a time axis, defaulting to the `standard` calendar when the
    /// dataset declares none.
    pub fn new(values: Vec<f64>, units: &str, calendar: Option<&str>) -> Result<Self> {
        let calendar = match calendar {
            Some(name) => name.parse::<Calendar>()?,
            None => Calendar::Standard,
        };
        Ok(TimeAxis {
            values,
            units_label: units.to_string(),
            units: TimeUnits::parse(units)?,
            calendar,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn units_label(&self) -> &str {
        &self.units_label
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    pub fn decode_all(&self) -> Result<Vec<CalendarDate>> {
        self.decode_range(0..self.values.len())
    }

    pub fn decode_range(&self, range: Range<usize>) -> Result<Vec<CalendarDate>> {
        self.values[range]
            .iter()
            .map(|&v| self.units.decode(v, self.calendar))
            .collect()
    }
}
