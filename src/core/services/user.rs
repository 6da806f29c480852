use crate::core::models::user::{Session, User};
use crate::core::ports::repository::{Store, TxStore, UserCommon};
use crate::error::Error;
use log::info;

pub async fn current_user<S>(store: &mut S, session: Option<&Session>) -> Result<Option<User>, Error>
where
    S: Store,
{
    match session {
        Some(session) => UserCommon::get_by_account(store, &session.account).await,
        None => Ok(None),
    }
}

pub async fn require_current_user<S>(store: &mut S, session: Option<&Session>) -> Result<User, Error>
where
    S: Store,
{
    current_user(store, session).await?.ok_or(Error::Unauthenticated)
}

/// Records the account behind a freshly verified session, refreshing the
/// display name and avatar when the user already exists.
pub async fn sign_in<T>(mut store: T, session: &Session) -> Result<User, Error>
where
    T: TxStore,
{
    let user = UserCommon::upsert(&mut store, session.into()).await?;
    store.commit().await?;
    info!("user {} signed in", user.id);
    Ok(user)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::ports::repository::Manager;
    use crate::core::services::fixtures::session;
    use crate::database::memory::MemoryManager;

    #[tokio::test]
    async fn test_sign_in_is_idempotent() {
        let manager = MemoryManager::new();
        let mut alice = session("alice");
        let first = sign_in(manager.tx().await.unwrap(), &alice).await.unwrap();
        alice.name = "Alice".into();
        alice.image = Some("https://avatars.example/alice.png".into());
        let second = sign_in(manager.tx().await.unwrap(), &alice).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Alice");

        let mut db = manager.db().await.unwrap();
        let current = current_user(&mut db, Some(&alice)).await.unwrap().unwrap();
        assert_eq!(current, second);
    }

    #[tokio::test]
    async fn test_resolver_without_session() {
        let manager = MemoryManager::new();
        let mut db = manager.db().await.unwrap();
        assert!(current_user(&mut db, None).await.unwrap().is_none());
        let err = require_current_user(&mut db, None).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
        let err = require_current_user(&mut db, Some(&session("nobody"))).await.unwrap_err();
        assert!(matches!(err, Error::Unauthenticated));
    }
}
