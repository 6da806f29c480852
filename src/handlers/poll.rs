use actix_web::web::{Data, Json, Path, Query};
use actix_web::HttpResponse;
use chrono::Utc;

use crate::core::lifecycle::PollStatus;
use crate::core::models::poll::{Poll, PollCreate, PollUpdate, PollWithOptions, PollWithOwner};
use crate::core::models::user::Session;
use crate::core::ports::repository::Manager;
use crate::core::services::poll;
use crate::error::Error;
use crate::request::ListPolls;
use crate::response::CreateResponse;

pub async fn list<M>(Query(ListPolls { status }): Query<ListPolls>, manager: Data<M>) -> Result<Json<Vec<PollWithOwner>>, Error>
where
    M: Manager + 'static,
{
    let mut db = manager.db().await?;
    let polls = poll::list_polls(&mut db, status.unwrap_or(PollStatus::Active), Utc::now()).await?;
    Ok(Json(polls))
}

pub async fn mine<M>(session: Option<Session>, manager: Data<M>) -> Result<Json<Option<Vec<Poll>>>, Error>
where
    M: Manager + 'static,
{
    let mut db = manager.db().await?;
    let polls = poll::list_my_polls(&mut db, session.as_ref()).await?;
    Ok(Json(polls))
}

pub async fn create<M>(session: Option<Session>, Json(input): Json<PollCreate>, manager: Data<M>) -> Result<Json<CreateResponse>, Error>
where
    M: Manager + 'static,
{
    let id = poll::create_poll(manager.tx().await?, session.as_ref(), input, Utc::now).await?;
    Ok(Json(CreateResponse { id }))
}

pub async fn detail<M>(path: Path<(i32,)>, manager: Data<M>) -> Result<Json<PollWithOptions>, Error>
where
    M: Manager + 'static,
{
    let poll_id = path.into_inner().0;
    poll::get_poll(manager.tx().await?, poll_id, Utc::now)
        .await?
        .map(Json)
        .ok_or(Error::NotFound("poll"))
}

pub async fn update<M>(session: Option<Session>, path: Path<(i32,)>, Json(input): Json<PollUpdate>, manager: Data<M>) -> Result<HttpResponse, Error>
where
    M: Manager + 'static,
{
    let poll_id = path.into_inner().0;
    poll::update_poll(manager.tx().await?, session.as_ref(), poll_id, input, Utc::now).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn delete<M>(session: Option<Session>, path: Path<(i32,)>, manager: Data<M>) -> Result<HttpResponse, Error>
where
    M: Manager + 'static,
{
    let poll_id = path.into_inner().0;
    poll::delete_poll(manager.tx().await?, session.as_ref(), poll_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
