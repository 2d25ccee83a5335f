//! Cron-style trigger schedules.
//!
//! Supports the classic 5-field form (`minute hour day-of-month month
//! day-of-week`) with `*`, lists, ranges, and `/step`. Day-of-week uses
//! 0–7 where both 0 and 7 mean Sunday. When both day fields are
//! restricted, a date matches if either does (vixie-cron rule).
//!
//! Schedules are plain data registered explicitly at startup; evaluation
//! happens in the configured timezone while the scan itself steps in UTC
//! so DST transitions cannot trap it.

use chrono::{DateTime, Datelike, Duration as ChronoDuration, Timelike, Utc};
use chrono_tz::Tz;
use passtrack_core::error::PasstrackError;
use std::collections::BTreeSet;

/// Give up scanning a little past one year out; a 5-field expression that
/// matches nothing within that window matches nothing at all.
const MAX_SCAN_MINUTES: u32 = 366 * 24 * 60 + 1;

#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    minutes: Vec<u32>,
    hours: Vec<u32>,
    days_of_month: Vec<u32>,
    months: Vec<u32>,
    days_of_week: Vec<u32>,
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronSchedule {
    pub fn parse(expr: &str) -> Result<Self, PasstrackError> {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(PasstrackError::Config(format!(
                "cron '{expr}': expected 5 fields, got {}",
                fields.len()
            )));
        }

        let minutes = parse_field(expr, fields[0], 0, 59)?;
        let hours = parse_field(expr, fields[1], 0, 23)?;
        let days_of_month = parse_field(expr, fields[2], 1, 31)?;
        let months = parse_field(expr, fields[3], 1, 12)?;

        // 7 is an alias for Sunday.
        let days_of_week: Vec<u32> = parse_field(expr, fields[4], 0, 7)?
            .into_iter()
            .map(|d| d % 7)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Ok(Self {
            expr: expr.to_string(),
            minutes,
            hours,
            days_of_month,
            months,
            days_of_week,
            dom_restricted: fields[2] != "*",
            dow_restricted: fields[4] != "*",
        })
    }

    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// The first matching wall-clock minute strictly after `after`.
    pub fn next_after(&self, after: DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = after.timezone();
        let mut t = after.with_timezone(&Utc) + ChronoDuration::minutes(1);
        t -= ChronoDuration::seconds(t.second() as i64);
        t -= ChronoDuration::nanoseconds(t.nanosecond() as i64);

        for _ in 0..MAX_SCAN_MINUTES {
            let local = t.with_timezone(&tz);
            if self.matches(&local) {
                return Some(local);
            }
            t += ChronoDuration::minutes(1);
        }
        None
    }

    fn matches(&self, t: &DateTime<Tz>) -> bool {
        self.minutes.contains(&t.minute())
            && self.hours.contains(&t.hour())
            && self.months.contains(&t.month())
            && self.day_matches(t)
    }

    fn day_matches(&self, t: &DateTime<Tz>) -> bool {
        let dom = self.days_of_month.contains(&t.day());
        let dow = self
            .days_of_week
            .contains(&t.weekday().num_days_from_sunday());

        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom || dow,
            (true, false) => dom,
            (false, true) => dow,
            (false, false) => true,
        }
    }
}

/// Earliest next fire time across several schedules.
pub fn next_fire(
    schedules: &[CronSchedule],
    after: DateTime<Tz>,
) -> Option<(usize, DateTime<Tz>)> {
    schedules
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.next_after(after).map(|t| (i, t)))
        .min_by_key(|(_, t)| *t)
}

fn parse_field(
    expr: &str,
    field: &str,
    min: u32,
    max: u32,
) -> Result<Vec<u32>, PasstrackError> {
    let bad = |detail: String| PasstrackError::Config(format!("cron '{expr}': {detail}"));

    let mut values = BTreeSet::new();

    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step: u32 = step
                    .parse()
                    .map_err(|_| bad(format!("bad step in '{item}'")))?;
                if step == 0 {
                    return Err(bad(format!("zero step in '{item}'")));
                }
                (range, step)
            }
            None => (item, 1),
        };

        let (lo, hi) = if range == "*" {
            (min, max)
        } else if let Some((a, b)) = range.split_once('-') {
            let lo = a.parse().map_err(|_| bad(format!("bad value in '{item}'")))?;
            let hi = b.parse().map_err(|_| bad(format!("bad value in '{item}'")))?;
            (lo, hi)
        } else {
            let v: u32 = range
                .parse()
                .map_err(|_| bad(format!("bad value in '{item}'")))?;
            // `N/step` means N through the field maximum.
            if step > 1 {
                (v, max)
            } else {
                (v, v)
            }
        };

        if lo < min || hi > max || lo > hi {
            return Err(bad(format!("'{item}' out of range {min}-{max}")));
        }

        let mut v = lo;
        while v <= hi {
            values.insert(v);
            v += step;
        }
    }

    if values.is_empty() {
        return Err(bad(format!("empty field '{field}'")));
    }

    Ok(values.into_iter().collect())
}
