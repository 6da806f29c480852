use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    #[serde(skip_serializing)]
    pub account: String,
    pub name: String,
    pub image: Option<String>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            image: self.image.clone(),
        }
    }
}

/// Public part of a user shown next to the polls they own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSummary {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
}

/// Identity carried by a verified session token. `account` is the opaque id
/// handed out by the OAuth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account: String,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Upsert {
    pub account: String,
    pub name: String,
    pub image: Option<String>,
}

impl From<&Session> for Upsert {
    fn from(session: &Session) -> Self {
        Self {
            account: session.account.clone(),
            name: session.name.clone(),
            image: session.image.clone(),
        }
    }
}
