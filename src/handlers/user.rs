use actix_web::web::{Data, Json};

use crate::core::models::user::{Session, User};
use crate::core::ports::repository::Manager;
use crate::core::services::user;
use crate::error::Error;

/// Called by the frontend once the OAuth flow has produced a token.
pub async fn sign_in<M>(session: Session, manager: Data<M>) -> Result<Json<User>, Error>
where
    M: Manager + 'static,
{
    let user = user::sign_in(manager.tx().await?, &session).await?;
    Ok(Json(user))
}

pub async fn me<M>(session: Option<Session>, manager: Data<M>) -> Result<Json<Option<User>>, Error>
where
    M: Manager + 'static,
{
    let mut db = manager.db().await?;
    let user = user::current_user(&mut db, session.as_ref()).await?;
    Ok(Json(user))
}
