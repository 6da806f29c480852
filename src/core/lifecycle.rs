use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Active,
    Expired,
}

/// A poll is active up to and including the instant of its end date.
pub fn classify(end_date: DateTime<Utc>, now: DateTime<Utc>) -> PollStatus {
    if end_date >= now {
        PollStatus::Active
    } else {
        PollStatus::Expired
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLeft {
    seconds: i64,
}

impl TimeLeft {
    pub fn seconds(&self) -> i64 {
        self.seconds
    }
}

impl fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.seconds / 86_400;
        let hours = (self.seconds % 86_400) / 3_600;
        let minutes = (self.seconds % 3_600) / 60;
        let seconds = self.seconds % 60;
        write!(f, "{}D: {}H: {}M: {}S", days, hours, minutes, seconds)
    }
}

pub fn time_left(end_date: DateTime<Utc>, now: DateTime<Utc>) -> TimeLeft {
    TimeLeft {
        seconds: (end_date - now).num_seconds().max(0),
    }
}
