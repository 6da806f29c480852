use serde::Deserialize;

use crate::core::lifecycle::PollStatus;

#[derive(Debug, Deserialize)]
pub struct ListPolls {
    pub status: Option<PollStatus>,
}
