use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::core::models::option::OptCreate;
use crate::core::models::poll::PollCreate;
use crate::core::models::user::Session;
use crate::core::ports::repository::Manager;
use crate::core::services::{poll, user};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn session(account: &str) -> Session {
    Session {
        account: format!("github|{}", account),
        name: account.into(),
        image: None,
    }
}

pub async fn sign_in<M: Manager>(manager: &M, account: &str) -> Session {
    let session = session(account);
    user::sign_in(manager.tx().await.unwrap(), &session).await.unwrap();
    session
}

pub fn poll_input(options: &[&str], end_date: DateTime<Utc>) -> PollCreate {
    PollCreate {
        title: "Lunch".into(),
        description: None,
        end_date,
        options: options.iter().map(|t| OptCreate { text: (*t).into() }).collect(),
    }
}

/// Creates a poll at `now()` that ends one day later.
pub async fn create<M: Manager>(manager: &M, session: &Session, options: &[&str]) -> i32 {
    let input = poll_input(options, now() + Duration::days(1));
    poll::create_poll(manager.tx().await.unwrap(), Some(session), input, now).await.unwrap()
}
