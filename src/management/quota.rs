use std::sync::{
    Arc,
    atomic::{AtomicI32, Ordering},
};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    config::QuotaLimits,
    types::{QuotaState, QuotaStatus},
};

/// Source of the current calendar day in the provider's reset timezone.
pub trait DayClock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

impl<C: DayClock + ?Sized> DayClock for Arc<C> {
    fn today(&self) -> NaiveDate {
        (**self).today()
    }
}

/// Wall clock read in the reset timezone, daylight saving included.
pub struct SystemClock {
    timezone: Tz,
}

impl SystemClock {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Calendar day of `at` in the reset timezone.
    pub fn day_at(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.timezone).date_naive()
    }
}

impl DayClock for SystemClock {
    fn today(&self) -> NaiveDate {
        self.day_at(Utc::now())
    }
}

/// Clock that only moves when told to. Used to exercise the daily reset.
pub struct ManualClock {
    days_from_ce: AtomicI32,
}

impl ManualClock {
    pub fn new(day: NaiveDate) -> Self {
        Self {
            days_from_ce: AtomicI32::new(day.num_days_from_ce()),
        }
    }

    pub fn advance_days(&self, days: i32) {
        self.days_from_ce.fetch_add(days, Ordering::SeqCst);
    }
}

impl DayClock for ManualClock {
    fn today(&self) -> NaiveDate {
        let days = self.days_from_ce.load(Ordering::SeqCst);
        NaiveDate::from_num_days_from_ce_opt(days).unwrap_or_default()
    }
}

/// Process-wide tracker of YouTube quota units consumed today.
///
/// Two independent ceilings apply: the raw daily unit budget and a per-session
/// search cap. A sticky `exceeded` flag records provider-reported denials.
/// All counters reset when the calendar day in the reset timezone changes.
///
/// Concurrent conversions may each observe spare budget and overshoot the cap by
/// up to one batch; the provider's own 403 is the hard backstop.
pub struct QuotaTracker {
    limits: QuotaLimits,
    clock: Box<dyn DayClock>,
    state: Mutex<QuotaState>,
}

impl QuotaTracker {
    /// Tracker on the system clock, read in the configured reset timezone.
    pub fn new(limits: QuotaLimits) -> Self {
        let clock = SystemClock::new(limits.reset_timezone);
        Self::with_clock(limits, Box::new(clock))
    }

    pub fn with_clock(limits: QuotaLimits, clock: Box<dyn DayClock>) -> Self {
        let state = QuotaState {
            units_used_today: 0,
            exceeded: false,
            last_reset_day: clock.today(),
        };
        Self {
            limits,
            clock,
            state: Mutex::new(state),
        }
    }

    pub fn limits(&self) -> QuotaLimits {
        self.limits
    }

    /// Zeroes the counters if the calendar day changed since the last reset.
    /// Returns true when a reset happened.
    pub async fn check_and_maybe_reset(&self) -> bool {
        let mut state = self.state.lock().await;
        self.roll_over(&mut state)
    }

    pub async fn is_exhausted(&self) -> bool {
        let mut state = self.state.lock().await;
        self.roll_over(&mut state);
        self.exhausted(&state)
    }

    pub async fn record_usage(&self, units: u64) {
        let mut state = self.state.lock().await;
        self.roll_over(&mut state);
        state.units_used_today = state.units_used_today.saturating_add(units);
    }

    /// Sets the sticky flag after the provider refused a request for quota reasons.
    pub async fn mark_exceeded(&self) {
        let mut state = self.state.lock().await;
        self.roll_over(&mut state);
        if !state.exceeded {
            warn!(
                units_used = state.units_used_today,
                "provider reported quota exceeded"
            );
        }
        state.exceeded = true;
    }

    /// Clears all counters immediately, regardless of the calendar day.
    /// Returns the units used before the reset.
    pub async fn reset(&self) -> u64 {
        let mut state = self.state.lock().await;
        let previous = state.units_used_today;
        state.units_used_today = 0;
        state.exceeded = false;
        state.last_reset_day = self.clock.today();
        info!(previous_usage = previous, "quota manually reset");
        previous
    }

    /// Number of searches still allowed today.
    pub async fn remaining_searches(&self) -> u64 {
        let mut state = self.state.lock().await;
        self.roll_over(&mut state);
        self.searches_remaining(&state)
    }

    pub async fn units_used(&self) -> u64 {
        let mut state = self.state.lock().await;
        self.roll_over(&mut state);
        state.units_used_today
    }

    pub async fn status(&self) -> QuotaStatus {
        let mut state = self.state.lock().await;
        self.roll_over(&mut state);
        QuotaStatus {
            quota_used: state.units_used_today,
            quota_limit: self.limits.daily_unit_limit,
            quota_remaining: self
                .limits
                .daily_unit_limit
                .saturating_sub(state.units_used_today),
            quota_exceeded: self.exhausted(&state),
            last_reset_date: state.last_reset_day,
            searches_used: self.searches_used(&state),
            searches_remaining: self.searches_remaining(&state),
        }
    }

    pub async fn snapshot(&self) -> QuotaState {
        self.state.lock().await.clone()
    }

    /// Replaces the counters with a previously persisted snapshot. A snapshot
    /// from an earlier day is discarded by the next reset check.
    pub async fn restore(&self, snapshot: QuotaState) {
        let mut state = self.state.lock().await;
        *state = snapshot;
        self.roll_over(&mut state);
    }

    fn roll_over(&self, state: &mut QuotaState) -> bool {
        let today = self.clock.today();
        if today == state.last_reset_day {
            return false;
        }
        info!(
            previous_day = %state.last_reset_day,
            %today,
            units_used = state.units_used_today,
            "daily quota reset"
        );
        state.units_used_today = 0;
        state.exceeded = false;
        state.last_reset_day = today;
        true
    }

    fn searches_used(&self, state: &QuotaState) -> u64 {
        state.units_used_today / self.limits.cost_per_search.max(1)
    }

    fn exhausted(&self, state: &QuotaState) -> bool {
        state.exceeded
            || state.units_used_today >= self.limits.daily_unit_limit
            || self.searches_used(state) >= self.limits.max_searches_per_session
    }

    fn searches_remaining(&self, state: &QuotaState) -> u64 {
        if self.exhausted(state) {
            return 0;
        }
        let by_session = self
            .limits
            .max_searches_per_session
            .saturating_sub(self.searches_used(state));
        let by_units = self
            .limits
            .daily_unit_limit
            .saturating_sub(state.units_used_today)
            / self.limits.cost_per_search.max(1);
        by_session.min(by_units)
    }
}
