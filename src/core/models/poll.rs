use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::lifecycle::{classify, time_left, PollStatus};
use crate::core::models::option::{Opt, OptCreate};
use crate::core::models::user::UserSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Poll {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub end_date: DateTime<Utc>,
    pub owner_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollWithOwner {
    #[serde(flatten)]
    pub poll: Poll,
    pub owner: UserSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollWithOptions {
    #[serde(flatten)]
    pub poll: Poll,
    pub options: Vec<Opt>,
    pub status: PollStatus,
    pub time_left: String,
    pub seconds_left: i64,
}

impl PollWithOptions {
    pub fn new(poll: Poll, options: Vec<Opt>, now: DateTime<Utc>) -> Self {
        let left = time_left(poll.end_date, now);
        Self {
            status: classify(poll.end_date, now),
            time_left: left.to_string(),
            seconds_left: left.seconds(),
            poll,
            options,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollCreate {
    pub title: String,
    pub description: Option<String>,
    pub end_date: DateTime<Utc>,
    pub options: Vec<OptCreate>,
}

/// Options are fixed at creation, so an update body carrying them is rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollUpdate {
    pub title: String,
    pub description: Option<String>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub title: String,
    pub description: Option<String>,
    pub end_date: DateTime<Utc>,
    pub owner_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Update {
    pub title: String,
    pub description: Option<String>,
    pub end_date: DateTime<Utc>,
}
