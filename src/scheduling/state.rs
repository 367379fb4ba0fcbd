//! Partition of the schedule horizon into historic, published and draft days.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Schedule partition state of one tenant.
///
/// Days up to and including `last_historic_date` are historic. Days from
/// `first_draft_date` onwards are draft. Everything in between is published.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use planning_core::scheduling::ScheduleState;
///
/// let d = |day| NaiveDate::from_ymd_opt(2024, 5, day).unwrap();
/// let state = ScheduleState::new("tenant", d(3), d(10)).with_lengths(7, 14);
///
/// assert!(state.is_historic_date(d(3)));
/// assert!(state.is_published_date(d(4)));
/// assert!(state.is_published_date(d(9)));
/// assert!(state.is_draft_date(d(10)));
/// assert_eq!(state.first_published_date(), d(4));
/// assert_eq!(state.first_unplanned_date(), d(24));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleState {
    pub tenant_id: String,
    /// Days.
    pub publish_length: u32,
    /// Days.
    pub draft_length: u32,
    pub first_draft_date: NaiveDate,
    pub last_historic_date: NaiveDate,
}

impl ScheduleState {
    pub fn new(tenant_id: impl Into<String>, last_historic_date: NaiveDate, first_draft_date: NaiveDate) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            publish_length: 7,
            draft_length: 14,
            first_draft_date,
            last_historic_date,
        }
    }

    pub fn with_lengths(mut self, publish_length: u32, draft_length: u32) -> Self {
        self.publish_length = publish_length;
        self.draft_length = draft_length;
        self
    }

    /// The day after the last historic date.
    pub fn first_published_date(&self) -> NaiveDate {
        self.last_historic_date + Days::new(1)
    }

    /// The first day past the draft window.
    pub fn first_unplanned_date(&self) -> NaiveDate {
        self.first_draft_date + Days::new(u64::from(self.draft_length))
    }

    /// True before midnight of the first published date.
    pub fn is_historic(&self, at: NaiveDateTime) -> bool {
        at < self.first_published_date().and_time(NaiveTime::MIN)
    }

    /// True from midnight of the first draft date.
    pub fn is_draft(&self, at: NaiveDateTime) -> bool {
        at >= self.first_draft_date.and_time(NaiveTime::MIN)
    }

    pub fn is_published(&self, at: NaiveDateTime) -> bool {
        !self.is_historic(at) && !self.is_draft(at)
    }

    pub fn is_historic_date(&self, date: NaiveDate) -> bool {
        self.is_historic(date.and_time(NaiveTime::MIN))
    }

    pub fn is_draft_date(&self, date: NaiveDate) -> bool {
        self.is_draft(date.and_time(NaiveTime::MIN))
    }

    pub fn is_published_date(&self, date: NaiveDate) -> bool {
        self.is_published(date.and_time(NaiveTime::MIN))
    }
}
