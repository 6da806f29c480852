use actix_web::web::{Data, Json, Path};
use chrono::Utc;

use crate::core::models::user::Session;
use crate::core::models::vote::{PollResults, PollVotes, VoteCast};
use crate::core::ports::repository::Manager;
use crate::core::services::vote;
use crate::error::Error;
use crate::response::CastResponse;

/// `null` for anonymous callers.
pub async fn list<M>(session: Option<Session>, path: Path<(i32,)>, manager: Data<M>) -> Result<Json<Option<PollVotes>>, Error>
where
    M: Manager + 'static,
{
    let poll_id = path.into_inner().0;
    let mut db = manager.db().await?;
    let votes = vote::list_votes(&mut db, session.as_ref(), poll_id).await?;
    Ok(Json(votes))
}

pub async fn cast<M>(session: Option<Session>, path: Path<(i32,)>, Json(VoteCast { option_id }): Json<VoteCast>, manager: Data<M>) -> Result<Json<CastResponse>, Error>
where
    M: Manager + 'static,
{
    let poll_id = path.into_inner().0;
    let effect = vote::cast_vote(manager.tx().await?, session.as_ref(), poll_id, option_id, Utc::now).await?;
    Ok(Json(CastResponse { effect }))
}

pub async fn results<M>(path: Path<(i32,)>, manager: Data<M>) -> Result<Json<PollResults>, Error>
where
    M: Manager + 'static,
{
    let poll_id = path.into_inner().0;
    let results = vote::poll_results(manager.tx().await?, poll_id).await?;
    Ok(Json(results))
}
