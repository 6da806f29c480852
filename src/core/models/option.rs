use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Opt {
    pub id: i32,
    pub poll_id: i32,
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptCreate {
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub poll_id: i32,
    pub text: String,
}
