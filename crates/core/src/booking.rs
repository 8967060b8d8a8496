//! Client-side booking rules: weekly quotas, double-booking checks and the
//! calendar/slot states a scheduling view renders.
//!
//! Weeks run Sunday through Saturday. Sessions are matched on their UTC
//! instant when both sides carry one, otherwise on the viewer-local
//! `(date, time)` pair.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{BookingError, BookingResult},
    models::{BookedSlot, Plan, SelectedSession},
    slots::Slot,
    timezone::to_zone,
};

pub const DEFAULT_SESSIONS_PER_WEEK: usize = 2;
pub const DEFAULT_TOTAL_SESSIONS: usize = 8;

/// Anything that identifies a bookable slot.
pub trait SlotKey {
    fn date(&self) -> Option<NaiveDate>;
    fn time(&self) -> Option<NaiveTime>;
    fn starts_at_utc(&self) -> Option<DateTime<Utc>>;
}

impl SlotKey for SelectedSession {
    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }

    fn time(&self) -> Option<NaiveTime> {
        Some(self.time)
    }

    fn starts_at_utc(&self) -> Option<DateTime<Utc>> {
        self.starts_at_utc
    }
}

impl SlotKey for BookedSlot {
    fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    fn starts_at_utc(&self) -> Option<DateTime<Utc>> {
        self.starts_at_utc
    }
}

impl SlotKey for Slot {
    fn date(&self) -> Option<NaiveDate> {
        Some(self.local_date())
    }

    fn time(&self) -> Option<NaiveTime> {
        Some(self.local_time())
    }

    fn starts_at_utc(&self) -> Option<DateTime<Utc>> {
        Some(self.starts_at_utc)
    }
}

pub fn same_slot<A: SlotKey, B: SlotKey>(a: &A, b: &B) -> bool {
    match (a.starts_at_utc(), b.starts_at_utc()) {
        (Some(left), Some(right)) => left == right,
        _ => match (a.date().zip(a.time()), b.date().zip(b.time())) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        },
    }
}

pub fn is_booked<S: SlotKey>(slot: &S, booked: &[BookedSlot]) -> bool {
    booked.iter().any(|b| same_slot(slot, b))
}

/// Sunday and Saturday of the week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date - Duration::days(date.weekday().num_days_from_sunday() as i64);
    (start, start + Duration::days(6))
}

/// `Jan 5 - 11`, or `Jan 29 - Feb 4` when the week spans two months.
pub fn format_week_range(date: NaiveDate) -> String {
    let (start, end) = week_bounds(date);
    if start.month() == end.month() {
        format!("{} {} - {}", start.format("%b"), start.day(), end.day())
    } else {
        format!(
            "{} {} - {} {}",
            start.format("%b"),
            start.day(),
            end.format("%b"),
            end.day()
        )
    }
}

/// Today is never bookable; booking opens tomorrow.
pub fn earliest_bookable(today: NaiveDate) -> NaiveDate {
    today.succ_opt().unwrap_or(today)
}

pub fn is_bookable(date: NaiveDate, today: NaiveDate) -> bool {
    date >= earliest_bookable(today)
}

/// `(year, month)` shifted by `delta` months.
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let index = year * 12 + (month as i32 - 1) + delta;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub total: usize,
    pub per_week: usize,
}

impl Quota {
    pub fn for_plan(plan: &Plan) -> Self {
        Self {
            total: plan
                .sessions_per_month
                .filter(|n| *n > 0)
                .map(|n| n as usize)
                .unwrap_or(DEFAULT_TOTAL_SESSIONS),
            per_week: plan
                .sessions_per_week
                .filter(|n| *n > 0)
                .map(|n| n as usize)
                .unwrap_or(DEFAULT_SESSIONS_PER_WEEK),
        }
    }
}

impl Default for Quota {
    fn default() -> Self {
        Self {
            total: DEFAULT_TOTAL_SESSIONS,
            per_week: DEFAULT_SESSIONS_PER_WEEK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotState {
    Available,
    Selected,
    Booked,
    WeekFull,
}

impl SlotState {
    pub fn is_selectable(self) -> bool {
        matches!(self, SlotState::Available | SlotState::Selected)
    }

    pub fn label(self) -> Option<&'static str> {
        match self {
            SlotState::Booked => Some("Booked"),
            SlotState::WeekFull => Some("Week Full"),
            SlotState::Selected => Some("Selected"),
            SlotState::Available => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub slot: Slot,
    pub state: SlotState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayState {
    Past,
    Selected,
    WeekFull,
    Available,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub state: DayState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarMonth {
    /// Empty cells before the 1st in a Sunday-first grid.
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

/// Sessions picked so far, checked against a plan's quota.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSelection {
    quota: Quota,
    sessions: Vec<SelectedSession>,
}

impl SessionSelection {
    pub fn new(quota: Quota) -> Self {
        Self {
            quota,
            sessions: Vec::new(),
        }
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }

    pub fn set_quota(&mut self, quota: Quota) {
        self.quota = quota;
    }

    pub fn sessions(&self) -> &[SelectedSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    pub fn remaining(&self) -> usize {
        self.quota.total.saturating_sub(self.sessions.len())
    }

    pub fn is_complete(&self) -> bool {
        self.sessions.len() >= self.quota.total
    }

    pub fn sessions_in_week(&self, date: NaiveDate) -> usize {
        let (start, end) = week_bounds(date);
        self.sessions
            .iter()
            .filter(|s| s.date >= start && s.date <= end)
            .count()
    }

    pub fn is_week_full(&self, date: NaiveDate) -> bool {
        self.sessions_in_week(date) >= self.quota.per_week
    }

    pub fn is_selected<S: SlotKey>(&self, slot: &S) -> bool {
        self.sessions.iter().any(|s| same_slot(s, slot))
    }

    pub fn has_session_on(&self, date: NaiveDate) -> bool {
        self.sessions.iter().any(|s| s.date == date)
    }

    /// Remove `session` if already picked, otherwise add it subject to the
    /// booked list, the total quota and the weekly quota.
    pub fn toggle(
        &mut self,
        session: SelectedSession,
        booked: &[BookedSlot],
    ) -> BookingResult<Toggle> {
        if let Some(index) = self.sessions.iter().position(|s| same_slot(s, &session)) {
            self.sessions.remove(index);
            return Ok(Toggle::Removed);
        }

        if is_booked(&session, booked) {
            return Err(BookingError::Conflict(
                "This time slot is already booked".to_string(),
            ));
        }

        if self.sessions.len() >= self.quota.total {
            return Err(BookingError::Validation(format!(
                "You can only select {} sessions in total",
                self.quota.total
            )));
        }

        if self.is_week_full(session.date) {
            return Err(BookingError::Validation(format!(
                "Week limit reached ({} sessions max)",
                self.quota.per_week
            )));
        }

        self.sessions.push(session);
        Ok(Toggle::Added)
    }

    /// Drop picks the server now reports as booked; returns what was dropped.
    pub fn reconcile(&mut self, booked: &[BookedSlot]) -> Vec<SelectedSession> {
        let (conflicting, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sessions)
            .into_iter()
            .partition(|s| is_booked(s, booked));
        self.sessions = kept;
        conflicting
    }

    /// Re-express every pick on the wall clock of `tz`.
    ///
    /// Picks are kept in instant order while their new week has room; picks
    /// without a UTC instant or over the weekly quota are dropped and
    /// returned.
    pub fn rezone(&mut self, tz: Tz) -> Vec<SelectedSession> {
        let mut pending = std::mem::take(&mut self.sessions);
        pending.sort_by_key(|s| s.starts_at_utc);

        let mut dropped = Vec::new();
        for mut session in pending {
            let Some(instant) = session.starts_at_utc else {
                dropped.push(session);
                continue;
            };
            let local = to_zone(instant, tz);
            session.date = local.date_naive();
            session.time = local.time();

            if self.is_week_full(session.date) {
                dropped.push(session);
            } else {
                self.sessions.push(session);
            }
        }
        dropped
    }

    pub fn slot_state(&self, slot: &Slot, booked: &[BookedSlot]) -> SlotState {
        let selected = self.is_selected(slot);
        if is_booked(slot, booked) {
            SlotState::Booked
        } else if selected {
            SlotState::Selected
        } else if self.is_week_full(slot.local_date()) {
            SlotState::WeekFull
        } else {
            SlotState::Available
        }
    }

    pub fn slot_views(&self, slots: &[Slot], booked: &[BookedSlot]) -> Vec<SlotView> {
        slots
            .iter()
            .map(|slot| SlotView {
                slot: slot.clone(),
                state: self.slot_state(slot, booked),
            })
            .collect()
    }

    pub fn day_state(&self, date: NaiveDate, today: NaiveDate) -> DayState {
        if !is_bookable(date, today) {
            DayState::Past
        } else if self.has_session_on(date) {
            DayState::Selected
        } else if self.is_week_full(date) {
            DayState::WeekFull
        } else {
            DayState::Available
        }
    }

    pub fn calendar(
        &self,
        year: i32,
        month: u32,
        today: NaiveDate,
    ) -> BookingResult<CalendarMonth> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| BookingError::Validation(format!("Invalid month: {year}-{month}")))?;

        let days = first
            .iter_days()
            .take_while(|date| date.month() == month)
            .map(|date| CalendarDay {
                date,
                state: self.day_state(date, today),
            })
            .collect();

        Ok(CalendarMonth {
            leading_blanks: first.weekday().num_days_from_sunday(),
            days,
        })
    }
}
