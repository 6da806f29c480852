use chrono::{DateTime, Utc};
use log::info;

use crate::core::lifecycle::PollStatus;
use crate::core::models::{
    option::Insert as OptionInsert,
    poll::{Insert as PollInsert, Poll, PollCreate, PollUpdate, PollWithOptions, PollWithOwner, Update},
    user::Session,
};
use crate::core::ports::repository::{OptionCommon, PollCommon, Store, TxStore, UserCommon, VoteCommon};
use crate::core::services::user::{current_user, require_current_user};
use crate::core::validation::{validate_create, validate_update};
use crate::error::Error;

pub const MAX_POLLS_PER_USER: i64 = 10;

pub async fn list_polls<S>(store: &mut S, status: PollStatus, now: DateTime<Utc>) -> Result<Vec<PollWithOwner>, Error>
where
    S: Store,
{
    PollCommon::query(store, status, now).await
}

/// The poll row is held shared while its options are read, so a concurrent
/// delete cannot leave a poll without options in the result.
pub async fn get_poll<T>(mut store: T, poll_id: i32, clock: impl Fn() -> DateTime<Utc>) -> Result<Option<PollWithOptions>, Error>
where
    T: TxStore,
{
    let poll = match PollCommon::get_for_share(&mut store, poll_id).await? {
        Some(poll) => poll,
        None => return Ok(None),
    };
    let options = OptionCommon::query(&mut store, poll_id).await?;
    store.commit().await?;
    Ok(Some(PollWithOptions::new(poll, options, clock())))
}

pub async fn list_my_polls<S>(store: &mut S, session: Option<&Session>) -> Result<Option<Vec<Poll>>, Error>
where
    S: Store,
{
    match current_user(store, session).await? {
        Some(user) => Ok(Some(PollCommon::by_owner(store, user.id).await?)),
        None => Ok(None),
    }
}

pub async fn create_poll<T>(mut store: T, session: Option<&Session>, input: PollCreate, clock: impl Fn() -> DateTime<Utc>) -> Result<i32, Error>
where
    T: TxStore,
{
    let user = require_current_user(&mut store, session).await?;
    // 锁住用户, 并发创建时配额检查不会被绕过
    UserCommon::lock(&mut store, user.id).await?;
    let now = clock();
    let poll = validate_create(input, now)?;
    if PollCommon::count_by_owner(&mut store, user.id).await? >= MAX_POLLS_PER_USER {
        return Err(Error::QuotaExceeded(MAX_POLLS_PER_USER));
    }
    let poll_id = PollCommon::insert(
        &mut store,
        PollInsert {
            title: poll.title().to_owned(),
            description: poll.description().map(str::to_owned),
            end_date: poll.end_date(),
            owner_id: user.id,
            created_at: now,
        },
    )
    .await?;
    OptionCommon::bulk_insert(
        &mut store,
        poll.options()
            .iter()
            .map(|text| OptionInsert {
                poll_id,
                text: text.clone(),
            })
            .collect(),
    )
    .await?;
    store.commit().await?;
    info!("user {} created poll {} with {} options", user.id, poll_id, poll.options().len());
    Ok(poll_id)
}

pub async fn update_poll<T>(mut store: T, session: Option<&Session>, poll_id: i32, input: PollUpdate, clock: impl Fn() -> DateTime<Utc>) -> Result<(), Error>
where
    T: TxStore,
{
    let user = require_current_user(&mut store, session).await?;
    let poll = PollCommon::get_for_update(&mut store, poll_id).await?.ok_or(Error::NotFound("poll"))?;
    let changes = validate_update(input, clock())?;
    if poll.owner_id != user.id {
        return Err(Error::NotOwner);
    }
    PollCommon::update(
        &mut store,
        poll_id,
        Update {
            title: changes.title().to_owned(),
            description: changes.description().map(str::to_owned),
            end_date: changes.end_date(),
        },
    )
    .await?;
    store.commit().await?;
    info!("user {} updated poll {}", user.id, poll_id);
    Ok(())
}

pub async fn delete_poll<T>(mut store: T, session: Option<&Session>, poll_id: i32) -> Result<(), Error>
where
    T: TxStore,
{
    let user = require_current_user(&mut store, session).await?;
    let poll = PollCommon::get_for_update(&mut store, poll_id).await?.ok_or(Error::NotFound("poll"))?;
    if poll.owner_id != user.id {
        return Err(Error::NotOwner);
    }
    let votes = VoteCommon::delete_by_poll(&mut store, poll_id).await?;
    let options = OptionCommon::delete_by_poll(&mut store, poll_id).await?;
    PollCommon::delete(&mut store, poll_id).await?;
    store.commit().await?;
    info!("user {} deleted poll {} ({} options, {} votes)", user.id, poll_id, options, votes);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::ports::repository::Manager;
    use crate::core::services::fixtures::{create, now, poll_input, sign_in};
    use crate::core::services::vote::cast_vote;
    use crate::database::memory::MemoryManager;
    use chrono::Duration;
    use std::cell::Cell;

    #[tokio::test]
    async fn test_create_and_get_poll() {
        let manager = MemoryManager::new();
        let alice = sign_in(&manager, "alice").await;
        let poll_id = create(&manager, &alice, &["A", "B", "C"]).await;

        let poll = get_poll(manager.tx().await.unwrap(), poll_id, now).await.unwrap().unwrap();
        assert_eq!(poll.poll.title, "Lunch");
        assert_eq!(poll.status, PollStatus::Active);
        let texts: Vec<&str> = poll.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
        assert!(get_poll(manager.tx().await.unwrap(), poll_id + 100, now).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_requires_sign_in() {
        let manager = MemoryManager::new();
        let input = poll_input(&["A", "B"], now() + Duration::days(1));
        let err = create_poll(manager.tx().await.unwrap(), None, input.clone(), now).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));

        // a verified session without a user record is still unauthenticated
        let stranger = Session {
            account: "github|404".into(),
            name: "stranger".into(),
            image: None,
        };
        let err = create_poll(manager.tx().await.unwrap(), Some(&stranger), input, now).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
    }

    #[tokio::test]
    async fn test_invalid_input_writes_nothing() {
        let manager = MemoryManager::new();
        let alice = sign_in(&manager, "alice").await;
        let input = poll_input(&["Same", "same"], now() + Duration::days(8));
        let err = create_poll(manager.tx().await.unwrap(), Some(&alice), input, now).await.unwrap_err();
        match err {
            Error::ValidationFailed(errors) => assert_eq!(errors.fields().len(), 2),
            other => panic!("unexpected error: {:?}", other),
        }
        let mine = list_my_polls(&mut manager.db().await.unwrap(), Some(&alice)).await.unwrap().unwrap();
        assert!(mine.is_empty());
    }

    #[tokio::test]
    async fn test_end_date_window_edges() {
        let manager = MemoryManager::new();
        let alice = sign_in(&manager, "alice").await;
        let ok = poll_input(&["A", "B"], now() + Duration::days(7));
        assert!(create_poll(manager.tx().await.unwrap(), Some(&alice), ok, now).await.is_ok());
        let late = poll_input(&["A", "B"], now() + Duration::days(8));
        let err = create_poll(manager.tx().await.unwrap(), Some(&alice), late, now).await.unwrap_err();
        assert!(matches!(err, Error::ValidationFailed(_)));
    }

    #[tokio::test]
    async fn test_quota() {
        let manager = MemoryManager::new();
        let alice = sign_in(&manager, "alice").await;
        for _ in 0..MAX_POLLS_PER_USER {
            create(&manager, &alice, &["A", "B"]).await;
        }
        let input = poll_input(&["A", "B"], now() + Duration::days(1));
        let err = create_poll(manager.tx().await.unwrap(), Some(&alice), input.clone(), now).await.unwrap_err();
        assert!(matches!(err, Error::QuotaExceeded(10)));
        let mine = list_my_polls(&mut manager.db().await.unwrap(), Some(&alice)).await.unwrap().unwrap();
        assert_eq!(mine.len(), 10);

        // the quota is per owner
        let bob = sign_in(&manager, "bob").await;
        assert!(create_poll(manager.tx().await.unwrap(), Some(&bob), input, now).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_polls_partitions_on_end_date() {
        let manager = MemoryManager::new();
        let alice = sign_in(&manager, "alice").await;
        let first = create(&manager, &alice, &["A", "B"]).await;
        let second = create(&manager, &alice, &["A", "B"]).await;

        let later = now() + Duration::hours(36);
        let input = poll_input(&["A", "B"], later + Duration::days(2));
        let third = create_poll(manager.tx().await.unwrap(), Some(&alice), input, move || later).await.unwrap();

        // fixtures end one day after `now()`
        let mut db = manager.db().await.unwrap();
        let active = list_polls(&mut db, PollStatus::Active, later).await.unwrap();
        let expired = list_polls(&mut db, PollStatus::Expired, later).await.unwrap();
        let ids = |polls: &[PollWithOwner]| polls.iter().map(|p| p.poll.id).collect::<Vec<_>>();
        assert_eq!(ids(&active), vec![third]);
        assert_eq!(ids(&expired), vec![second, first]);
        assert_eq!(expired[0].owner.name, "alice");
    }

    #[tokio::test]
    async fn test_list_my_polls() {
        let manager = MemoryManager::new();
        let alice = sign_in(&manager, "alice").await;
        let bob = sign_in(&manager, "bob").await;
        let a1 = create(&manager, &alice, &["A", "B"]).await;
        create(&manager, &bob, &["A", "B"]).await;
        let a2 = create(&manager, &alice, &["A", "B"]).await;

        let mut db = manager.db().await.unwrap();
        let mine = list_my_polls(&mut db, Some(&alice)).await.unwrap().unwrap();
        assert_eq!(mine.iter().map(|p| p.id).collect::<Vec<_>>(), vec![a2, a1]);
        assert!(list_my_polls(&mut db, None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_poll() {
        let manager = MemoryManager::new();
        let alice = sign_in(&manager, "alice").await;
        let poll_id = create(&manager, &alice, &["A", "B"]).await;
        let later = now() + Duration::days(5);
        let input = PollUpdate {
            title: "  Dinner ".into(),
            description: Some("where?".into()),
            end_date: later + Duration::days(7),
        };
        update_poll(manager.tx().await.unwrap(), Some(&alice), poll_id, input, move || later).await.unwrap();

        let poll = get_poll(manager.tx().await.unwrap(), poll_id, move || later).await.unwrap().unwrap();
        assert_eq!(poll.poll.title, "Dinner");
        assert_eq!(poll.poll.description.as_deref(), Some("where?"));
        assert_eq!(poll.poll.end_date, later + Duration::days(7));
        assert_eq!(poll.options.len(), 2);
    }

    #[tokio::test]
    async fn test_update_by_non_owner_changes_nothing() {
        let manager = MemoryManager::new();
        let alice = sign_in(&manager, "alice").await;
        let bob = sign_in(&manager, "bob").await;
        let poll_id = create(&manager, &alice, &["A", "B"]).await;
        let before = get_poll(manager.tx().await.unwrap(), poll_id, now).await.unwrap().unwrap();

        let input = PollUpdate {
            title: "Hijacked".into(),
            description: None,
            end_date: now() + Duration::days(2),
        };
        let err = update_poll(manager.tx().await.unwrap(), Some(&bob), poll_id, input.clone(), now).await.unwrap_err();
        assert!(matches!(err, Error::NotOwner));
        let after = get_poll(manager.tx().await.unwrap(), poll_id, now).await.unwrap().unwrap();
        assert_eq!(before.poll, after.poll);

        let err = update_poll(manager.tx().await.unwrap(), Some(&alice), poll_id + 100, input, now).await.unwrap_err();
        assert!(matches!(err, Error::NotFound("poll")));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let manager = MemoryManager::new();
        let alice = sign_in(&manager, "alice").await;
        let bob = sign_in(&manager, "bob").await;
        let poll_id = create(&manager, &alice, &["A", "B", "C"]).await;
        let options = get_poll(manager.tx().await.unwrap(), poll_id, now).await.unwrap().unwrap().options;
        cast_vote(manager.tx().await.unwrap(), Some(&alice), poll_id, options[0].id, now).await.unwrap();
        cast_vote(manager.tx().await.unwrap(), Some(&bob), poll_id, options[2].id, now).await.unwrap();

        let err = delete_poll(manager.tx().await.unwrap(), Some(&bob), poll_id).await.unwrap_err();
        assert!(matches!(err, Error::NotOwner));

        delete_poll(manager.tx().await.unwrap(), Some(&alice), poll_id).await.unwrap();
        assert!(get_poll(manager.tx().await.unwrap(), poll_id, now).await.unwrap().is_none());
        let mut db = manager.db().await.unwrap();
        assert!(OptionCommon::query(&mut db, poll_id).await.unwrap().is_empty());
        assert!(VoteCommon::by_poll(&mut db, poll_id).await.unwrap().is_empty());
        drop(db);

        let err = delete_poll(manager.tx().await.unwrap(), Some(&alice), poll_id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound("poll")));
    }

    #[tokio::test]
    async fn test_clock_is_read_once_the_poll_is_held() {
        let manager = MemoryManager::new();
        let alice = sign_in(&manager, "alice").await;
        let poll_id = create(&manager, &alice, &["A", "B"]).await;
        let reads = Cell::new(0);
        let clock = || {
            reads.set(reads.get() + 1);
            now()
        };
        let input = PollUpdate {
            title: "Dinner".into(),
            description: None,
            end_date: now() + Duration::days(2),
        };

        let err = update_poll(manager.tx().await.unwrap(), Some(&alice), poll_id + 100, input.clone(), &clock).await.unwrap_err();
        assert!(matches!(err, Error::NotFound("poll")));
        assert_eq!(reads.get(), 0);

        update_poll(manager.tx().await.unwrap(), Some(&alice), poll_id, input, &clock).await.unwrap();
        assert_eq!(reads.get(), 1);

        let input = poll_input(&["A", "B"], now() + Duration::days(1));
        let err = create_poll(manager.tx().await.unwrap(), None, input, &clock).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
        assert_eq!(reads.get(), 1);
    }
}
