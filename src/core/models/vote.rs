use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Vote {
    pub id: i32,
    pub user_id: i32,
    pub poll_id: i32,
    pub option_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteCast {
    pub option_id: i32,
}

/// What a cast did to the caller's vote on the poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CastEffect {
    Created,
    Changed,
    Retracted,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollVotes {
    pub votes: Vec<Vote>,
    pub user_vote: Option<Vote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub option_id: i32,
    pub text: String,
    pub votes: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollResults {
    pub poll_id: i32,
    pub total_votes: usize,
    pub options: Vec<OptionTally>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub user_id: i32,
    pub poll_id: i32,
    pub option_id: i32,
}
