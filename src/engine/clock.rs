// Day-cycle source. The simulation never reads the wall clock directly; it asks
// an injected `DayClock` for "now" so tests and headless runs control time.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::config::{DAY_START_HOUR, NIGHT_START_HOUR};

/// Source of local "now" for sleep scheduling.
pub trait DayClock: Send {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl DayClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Clock that only moves when told to. Clones share the same time, so a test
/// can keep a handle while the pet owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Convenience constructor: a fixed date at the given hour and minute.
    pub fn at(hour: u32, minute: u32) -> Self {
        Self::new(at_time(reference_date(), hour, minute))
    }

    pub fn set(&self, t: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = t;
    }

    pub fn advance(&self, dt: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::from_std(dt).unwrap_or(chrono::Duration::zero());
    }
}

impl DayClock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Wall clock running `scale` times faster than real time from a start point.
#[derive(Debug, Clone)]
pub struct ScaledClock {
    origin: NaiveDateTime,
    started: Instant,
    scale: f64,
}

impl ScaledClock {
    pub fn new(origin: NaiveDateTime, scale: f64) -> Self {
        Self {
            origin,
            started: Instant::now(),
            scale: scale.max(0.0),
        }
    }

    /// Starts from the current local time.
    pub fn from_local(scale: f64) -> Self {
        Self::new(chrono::Local::now().naive_local(), scale)
    }
}

impl DayClock for ScaledClock {
    fn now(&self) -> NaiveDateTime {
        let elapsed = self.started.elapsed().as_secs_f64() * self.scale;
        let millis = (elapsed * 1000.0) as i64;
        self.origin + chrono::Duration::milliseconds(millis)
    }
}

fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

fn at_time(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN))
}

/// Naps are only permitted inside [day start, night start).
pub fn is_daytime(t: NaiveDateTime) -> bool {
    (DAY_START_HOUR..NIGHT_START_HOUR).contains(&t.hour())
}

/// Next occurrence of the day-start hour strictly after `t`.
pub fn next_day_start(t: NaiveDateTime) -> NaiveDateTime {
    let today = at_time(t.date(), DAY_START_HOUR, 0);
    if t < today {
        today
    } else {
        today + chrono::Duration::days(1)
    }
}

/// Most recent night-start instant at or before `t`.
fn last_night_start(t: NaiveDateTime) -> NaiveDateTime {
    let today = at_time(t.date(), NIGHT_START_HOUR, 0);
    if t >= today {
        today
    } else {
        today - chrono::Duration::days(1)
    }
}

/// Whether the night boundary lies in `(prev, now]`.
pub fn crossed_night_start(prev: NaiveDateTime, now: NaiveDateTime) -> bool {
    now > prev && last_night_start(now) > prev
}
