use chrono::{DateTime, Utc};
use log::debug;

use crate::core::lifecycle::{classify, PollStatus};
use crate::core::models::{
    option::Opt,
    user::Session,
    vote::{CastEffect, Insert as VoteInsert, OptionTally, PollResults, PollVotes, Vote},
};
use crate::core::ports::repository::{OptionCommon, PollCommon, Store, TxStore, VoteCommon};
use crate::core::services::user::{current_user, require_current_user};
use crate::error::Error;

/// All votes of a poll plus the caller's own, read in one query so the two
/// always agree.
pub async fn list_votes<S>(store: &mut S, session: Option<&Session>, poll_id: i32) -> Result<Option<PollVotes>, Error>
where
    S: Store,
{
    let user = match current_user(store, session).await? {
        Some(user) => user,
        None => return Ok(None),
    };
    let votes = VoteCommon::by_poll(store, poll_id).await?;
    let user_vote = votes.iter().find(|v| v.user_id == user.id).cloned();
    Ok(Some(PollVotes { votes, user_vote }))
}

/// Casting the option the caller already holds takes the vote back.
pub async fn cast_vote<T>(mut store: T, session: Option<&Session>, poll_id: i32, option_id: i32, clock: impl Fn() -> DateTime<Utc>) -> Result<CastEffect, Error>
where
    T: TxStore,
{
    let user = require_current_user(&mut store, session).await?;
    let poll = PollCommon::get_for_share(&mut store, poll_id).await?.ok_or(Error::NotFound("poll"))?;
    if classify(poll.end_date, clock()) == PollStatus::Expired {
        return Err(Error::PollExpired);
    }
    match OptionCommon::get(&mut store, option_id).await? {
        Some(opt) if opt.poll_id == poll_id => {}
        _ => return Err(Error::NotFound("option")),
    }
    VoteCommon::lock(&mut store, user.id, poll_id).await?;
    let effect = match VoteCommon::get_by_user_and_poll(&mut store, user.id, poll_id).await? {
        None => {
            VoteCommon::insert(
                &mut store,
                VoteInsert {
                    user_id: user.id,
                    poll_id,
                    option_id,
                },
            )
            .await?;
            CastEffect::Created
        }
        Some(vote) if vote.option_id == option_id => {
            VoteCommon::delete(&mut store, vote.id).await?;
            CastEffect::Retracted
        }
        Some(vote) => {
            VoteCommon::update_option(&mut store, vote.id, option_id).await?;
            CastEffect::Changed
        }
    };
    store.commit().await?;
    debug!("user {} vote on poll {}: {:?}", user.id, poll_id, effect);
    Ok(effect)
}

pub async fn poll_results<T>(mut store: T, poll_id: i32) -> Result<PollResults, Error>
where
    T: TxStore,
{
    PollCommon::get_for_share(&mut store, poll_id).await?.ok_or(Error::NotFound("poll"))?;
    let options = OptionCommon::query(&mut store, poll_id).await?;
    let votes = VoteCommon::by_poll(&mut store, poll_id).await?;
    store.commit().await?;
    Ok(tally(poll_id, &options, &votes))
}

pub fn percentage(option_votes: usize, total_votes: usize) -> u32 {
    if total_votes == 0 {
        return 0;
    }
    (option_votes as f64 / total_votes as f64 * 100.0).round() as u32
}

pub fn tally(poll_id: i32, options: &[Opt], votes: &[Vote]) -> PollResults {
    let total_votes = votes.len();
    let options = options
        .iter()
        .map(|opt| {
            let count = votes.iter().filter(|v| v.option_id == opt.id).count();
            OptionTally {
                option_id: opt.id,
                text: opt.text.clone(),
                votes: count,
                percentage: percentage(count, total_votes),
            }
        })
        .collect();
    PollResults {
        poll_id,
        total_votes,
        options,
    }
}
