//! # Cadence abstraction.
//!
//! [`Cadence`] is the pluggable seam between cadence expressions and the
//! clock: the clock only ever asks for the next fire time after a given
//! instant. Implementations must be pure (no hidden state), so repeated
//! calls with the same input yield the same output.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::SchedulerError;

use super::{cron::CronCadence, every::EveryCadence};

/// Shared handle to a cadence (`Arc<dyn Cadence>`).
pub type CadenceRef = Arc<dyn Cadence>;

/// # Recurrence rule for one stage.
///
/// A `Cadence` computes fire times; it owns no timers and performs no I/O.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use stagehand::{Cadence, EveryCadence};
/// use std::time::Duration;
///
/// let every = EveryCadence::new(Duration::from_secs(1800));
/// let t0 = Utc.with_ymd_and_hms(2026, 1, 10, 12, 0, 0).unwrap();
/// assert_eq!(every.next_after(t0), Some(t0 + chrono::Duration::minutes(30)));
/// ```
pub trait Cadence: Send + Sync + fmt::Debug {
    /// Returns the first fire time strictly after `after`, or `None` if the
    /// cadence never fires again.
    fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>>;

    /// Estimates the recurrence interval near `from`.
    ///
    /// Used by health staleness checks (a stage armed for longer than twice
    /// this interval with zero runs is considered failing). The default
    /// derives the estimate from the gap between two consecutive fires.
    fn interval_hint(&self, from: DateTime<Utc>) -> Option<Duration> {
        let first = self.next_after(from)?;
        let second = self.next_after(first)?;
        (second - first).to_std().ok()
    }
}

/// Parses a cadence expression into a shared [`Cadence`].
///
/// Dialect selection:
/// - `@every <n><unit>` → [`EveryCadence`] (units: `s`, `m`, `h`, `d`);
/// - anything else → [`CronCadence`] (5-field cron).
///
/// # Errors
/// Returns [`SchedulerError::InvalidCadence`] with the verbatim expression
/// and a parser diagnostic.
///
/// # Example
/// ```
/// use stagehand::parse_cadence;
///
/// assert!(parse_cadence("*/30 * * * *").is_ok());
/// assert!(parse_cadence("@every 15m").is_ok());
/// assert!(parse_cadence("not a cadence").is_err());
/// ```
pub fn parse_cadence(expression: &str) -> Result<CadenceRef, SchedulerError> {
    let invalid = |reason: String| SchedulerError::InvalidCadence {
        expression: expression.to_string(),
        reason,
    };

    if let Some(rest) = expression.strip_prefix("@every") {
        let period = parse_period(rest.trim()).map_err(invalid)?;
        return Ok(Arc::new(EveryCadence::new(period)));
    }

    let cron = CronCadence::parse(expression).map_err(invalid)?;
    Ok(Arc::new(cron))
}

/// Parses `<n><unit>` durations used by `@every` (e.g. `90s`, `30m`, `2h`).
fn parse_period(s: &str) -> Result<Duration, String> {
    if s.is_empty() {
        return Err("missing duration after @every".to_string());
    }
    let unit = s.chars().last().unwrap_or(' ');
    let digits = &s[..s.len() - unit.len_utf8()];
    let value: u64 = digits
        .parse()
        .map_err(|_| format!("bad duration value {digits:?}"))?;
    if value == 0 {
        return Err("duration must be positive".to_string());
    }
    let secs = match unit {
        's' => Some(value),
        'm' => value.checked_mul(60),
        'h' => value.checked_mul(3600),
        'd' => value.checked_mul(86_400),
        other => return Err(format!("bad duration unit {other:?} (expected s/m/h/d)")),
    };
    let secs = secs.ok_or_else(|| format!("duration {s:?} overflows"))?;
    Ok(Duration::from_secs(secs))
}
