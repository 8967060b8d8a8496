use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    models::SelectedSession,
    timezone::{OffsetRule, provider_instant},
};

/// Provider working window, in minutes after Cairo midnight.
///
/// `last_minute` is the start of the final slot, not the end of the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start_minute: u32,
    pub last_minute: u32,
    pub step_minutes: u32,
}

impl WorkingHours {
    /// 08:00 through a final 19:30 slot.
    pub const fn standard() -> Self {
        Self {
            start_minute: 8 * 60,
            last_minute: 19 * 60 + 30,
            step_minutes: 30,
        }
    }

    /// Every half hour of the day, 00:00 through 23:30.
    pub const fn full_day() -> Self {
        Self {
            start_minute: 0,
            last_minute: 23 * 60 + 30,
            step_minutes: 30,
        }
    }

    /// Cairo wall-clock start times inside the window.
    pub fn provider_times(&self) -> Vec<NaiveTime> {
        let step = self.step_minutes.max(1) as usize;
        (self.start_minute..=self.last_minute)
            .step_by(step)
            .filter_map(|minute| NaiveTime::from_num_seconds_from_midnight_opt(minute * 60, 0))
            .collect()
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self::standard()
    }
}

/// One bookable half hour, anchored at the provider's clock and shown in the
/// viewer's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub provider_time: NaiveTime,
    pub starts_at_utc: DateTime<Utc>,
    pub local: DateTime<Tz>,
}

impl Slot {
    pub fn local_date(&self) -> NaiveDate {
        self.local.date_naive()
    }

    pub fn local_time(&self) -> NaiveTime {
        self.local.time()
    }

    /// Selection carrying both the viewer-local pair and the UTC instant.
    pub fn to_session(&self) -> SelectedSession {
        SelectedSession::new(self.local_date(), self.local_time()).at(self.starts_at_utc)
    }
}

/// Slots for the provider's working hours on `date`, shown in `viewer_tz`.
///
/// Ordered by instant. A slot may land on the viewer's previous or next
/// calendar day; `Slot::local_date` reports the viewer's date.
pub fn generate_slots(
    date: NaiveDate,
    hours: &WorkingHours,
    viewer_tz: Tz,
    rule: OffsetRule,
) -> Vec<Slot> {
    let mut slots: Vec<Slot> = hours
        .provider_times()
        .into_iter()
        .map(|provider_time| {
            let starts_at_utc = provider_instant(date, provider_time, rule);
            Slot {
                provider_time,
                starts_at_utc,
                local: starts_at_utc.with_timezone(&viewer_tz),
            }
        })
        .collect();

    slots.sort_by_key(|slot| slot.starts_at_utc);
    slots.dedup_by_key(|slot| slot.starts_at_utc);
    slots
}

/// A slot described as three clock readings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotTriple {
    pub user_time: String,
    pub cairo_time: String,
    pub utc_time: DateTime<Utc>,
}

/// All 48 half-hour slots of `date` as user, Cairo and UTC readings.
pub fn working_slots_for_user(date: NaiveDate, viewer_tz: Tz, rule: OffsetRule) -> Vec<SlotTriple> {
    generate_slots(date, &WorkingHours::full_day(), viewer_tz, rule)
        .into_iter()
        .map(|slot| SlotTriple {
            user_time: slot.local.format("%H:%M").to_string(),
            cairo_time: slot.provider_time.format("%H:%M").to_string(),
            utc_time: slot.starts_at_utc,
        })
        .collect()
}
