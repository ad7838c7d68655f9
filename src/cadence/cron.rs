//! # 5-field cron expressions.
//!
//! Supports the classic `MIN HOUR DOM MON DOW` form, minute resolution, UTC:
//! - `*` — any value;
//! - `N` — a single value;
//! - `A-B` — an inclusive range;
//! - `*/S`, `A-B/S` — steps;
//! - comma-separated lists of the above.
//!
//! Day-of-month and day-of-week follow the usual cron rule: when both are
//! restricted, a day matching **either** field fires (OR semantics).

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use super::cadence::Cadence;

/// Field bounds: (label, min, max).
const FIELDS: [(&str, u32, u32); 5] = [
    ("minute", 0, 59),
    ("hour", 0, 23),
    ("day-of-month", 1, 31),
    ("month", 1, 12),
    ("day-of-week", 0, 6),
];

/// A parsed cron cadence.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use stagehand::{Cadence, CronCadence};
///
/// let nightly = CronCadence::parse("0 2 * * *").unwrap();
/// let t0 = Utc.with_ymd_and_hms(2026, 3, 14, 23, 30, 0).unwrap();
/// let next = nightly.next_after(t0).unwrap();
/// assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 15, 2, 0, 0).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct CronCadence {
    minutes: BTreeSet<u32>,
    hours: BTreeSet<u32>,
    days_of_month: BTreeSet<u32>,
    months: BTreeSet<u32>,
    days_of_week: BTreeSet<u32>,
    /// Wildcard flags for the dom/dow OR rule.
    dom_is_wildcard: bool,
    dow_is_wildcard: bool,
}

impl CronCadence {
    /// Parses a 5-field cron expression.
    ///
    /// # Errors
    /// Returns a diagnostic string naming the offending field or token.
    /// Callers route this through
    /// [`parse_cadence`](crate::parse_cadence), which wraps it in
    /// [`SchedulerError::InvalidCadence`](crate::SchedulerError::InvalidCadence).
    pub fn parse(expression: &str) -> Result<Self, String> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(format!(
                "expected 5 fields (MIN HOUR DOM MON DOW), got {}",
                parts.len()
            ));
        }

        let mut sets = Vec::with_capacity(5);
        for (part, (label, min, max)) in parts.iter().copied().zip(FIELDS) {
            let set = parse_field(part, min, max)
                .map_err(|reason| format!("{label} field {part:?}: {reason}"))?;
            sets.push(set);
        }

        let days_of_week = sets.pop().unwrap_or_default();
        let months = sets.pop().unwrap_or_default();
        let days_of_month = sets.pop().unwrap_or_default();
        let hours = sets.pop().unwrap_or_default();
        let minutes = sets.pop().unwrap_or_default();

        Ok(Self {
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_is_wildcard: parts[2] == "*",
            dow_is_wildcard: parts[4] == "*",
        })
    }

    /// True if the date part (dom/mon/dow) of the expression matches `date`.
    fn day_matches(&self, date: NaiveDate) -> bool {
        if !self.months.contains(&date.month()) {
            return false;
        }
        let dom_hit = self.days_of_month.contains(&date.day());
        let dow_hit = self
            .days_of_week
            .contains(&date.weekday().num_days_from_sunday());

        match (self.dom_is_wildcard, self.dow_is_wildcard) {
            (true, true) => true,
            (true, false) => dow_hit,
            (false, true) => dom_hit,
            // Both restricted: classic cron fires on either.
            (false, false) => dom_hit || dow_hit,
        }
    }
}

impl Cadence for CronCadence {
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        // Earliest candidate: the next whole minute.
        let floor = after
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(after);
        let start = floor + chrono::Duration::minutes(1);

        // Scan day-by-day (bounded by the leap-year cycle), then pick the
        // first matching hour/minute pair within the day.
        for offset in 0..=366u64 {
            let date = start.date_naive().checked_add_days(Days::new(offset))?;
            if !self.day_matches(date) {
                continue;
            }
            for &hour in &self.hours {
                for &minute in &self.minutes {
                    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
                    let candidate = Utc.from_utc_datetime(&date.and_time(time));
                    if candidate >= start {
                        return Some(candidate);
                    }
                }
            }
        }
        None
    }
}

/// Parses one cron field into the set of matching values.
fn parse_field(spec: &str, min: u32, max: u32) -> Result<BTreeSet<u32>, String> {
    let mut values = BTreeSet::new();
    for part in spec.split(',') {
        if part.is_empty() {
            return Err("empty list item".to_string());
        }

        let (range, step) = match part.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| format!("bad step {step:?}"))?;
                if step == 0 {
                    return Err("step must be positive".to_string());
                }
                (range, step)
            }
            None => (part, 1),
        };

        let (lo, hi) = if range == "*" {
            (min, max)
        } else if let Some((a, b)) = range.split_once('-') {
            let a: u32 = a.parse().map_err(|_| format!("bad value {a:?}"))?;
            let b: u32 = b.parse().map_err(|_| format!("bad value {b:?}"))?;
            (a, b)
        } else {
            let v: u32 = range.parse().map_err(|_| format!("bad value {range:?}"))?;
            (v, v)
        };

        if lo > hi {
            return Err(format!("range {lo}-{hi} is inverted"));
        }
        if lo < min || hi > max {
            return Err(format!("value out of range {min}-{max}"));
        }

        let mut v = lo;
        while v <= hi {
            // Day-of-week 7 is accepted as an alias for Sunday by callers
            // passing 0-6; no alias handling needed here.
            values.insert(v);
            v += step;
        }
    }
    Ok(values)
}
