use crate::core::lifecycle::PollStatus;
use crate::core::models::{
    option::{Insert as OptionInsert, Opt},
    poll::{Insert as PollInsert, Poll, PollWithOwner, Update as PollUpdate},
    user::{Upsert as UserUpsert, User, UserSummary},
    vote::{Insert as VoteInsert, Vote},
};
use crate::core::ports::repository::{Common, Manager, OptionCommon, PollCommon, Store, TxStore, UserCommon, VoteCommon};
use crate::error::Error;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::pool::PoolConnection;
use sqlx::{query, query_as, query_scalar, Executor, FromRow, PgPool, Postgres, QueryBuilder, Transaction};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub struct PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e>,
{
    executor: E,
}

impl<E> PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

#[derive(Debug, FromRow)]
struct PollWithOwnerRow {
    id: i32,
    title: String,
    description: Option<String>,
    end_date: DateTime<Utc>,
    owner_id: i32,
    created_at: DateTime<Utc>,
    owner_name: String,
    owner_image: Option<String>,
}

impl From<PollWithOwnerRow> for PollWithOwner {
    fn from(row: PollWithOwnerRow) -> Self {
        Self {
            owner: UserSummary {
                id: row.owner_id,
                name: row.owner_name,
                image: row.owner_image,
            },
            poll: Poll {
                id: row.id,
                title: row.title,
                description: row.description,
                end_date: row.end_date,
                owner_id: row.owner_id,
                created_at: row.created_at,
            },
        }
    }
}

impl<E> UserCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn get_by_account(&mut self, account: &str) -> Result<Option<User>, Error> {
        let user = query_as("SELECT id, account, name, image FROM users WHERE account = $1")
            .bind(account)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(user)
    }

    async fn upsert(&mut self, user: UserUpsert) -> Result<User, Error> {
        let user = query_as(
            "
        INSERT INTO users (account, name, image) VALUES ($1, $2, $3)
        ON CONFLICT (account) DO UPDATE SET name = EXCLUDED.name, image = EXCLUDED.image
        RETURNING id, account, name, image",
        )
        .bind(user.account)
        .bind(user.name)
        .bind(user.image)
        .fetch_one(&mut self.executor)
        .await?;
        Ok(user)
    }

    async fn lock(&mut self, id: i32) -> Result<(), Error> {
        query("SELECT id FROM users WHERE id = $1 FOR UPDATE").bind(id).execute(&mut self.executor).await?;
        Ok(())
    }
}

impl<E> PollCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, poll: PollInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO polls (title, description, end_date, owner_id, created_at) VALUES ($1, $2, $3, $4, $5) RETURNING id")
            .bind(poll.title)
            .bind(poll.description)
            .bind(poll.end_date)
            .bind(poll.owner_id)
            .bind(poll.created_at)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Poll>, Error> {
        let poll = query_as("SELECT * FROM polls WHERE id = $1").bind(id).fetch_optional(&mut self.executor).await?;
        Ok(poll)
    }

    async fn get_for_share(&mut self, id: i32) -> Result<Option<Poll>, Error> {
        let poll = query_as("SELECT * FROM polls WHERE id = $1 FOR SHARE").bind(id).fetch_optional(&mut self.executor).await?;
        Ok(poll)
    }

    async fn get_for_update(&mut self, id: i32) -> Result<Option<Poll>, Error> {
        let poll = query_as("SELECT * FROM polls WHERE id = $1 FOR UPDATE").bind(id).fetch_optional(&mut self.executor).await?;
        Ok(poll)
    }

    async fn query(&mut self, status: PollStatus, now: DateTime<Utc>) -> Result<Vec<PollWithOwner>, Error> {
        let mut stmt = QueryBuilder::new(
            "
        SELECT
            p.*,
            u.name AS owner_name,
            u.image AS owner_image
        FROM polls AS p
        JOIN users AS u ON p.owner_id = u.id
        WHERE p.end_date ",
        );
        match status {
            PollStatus::Active => stmt.push(">= "),
            PollStatus::Expired => stmt.push("< "),
        };
        stmt.push_bind(now);
        stmt.push(" ORDER BY p.created_at DESC, p.id DESC");
        let rows: Vec<PollWithOwnerRow> = stmt.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(rows.into_iter().map(PollWithOwner::from).collect())
    }

    async fn by_owner(&mut self, owner_id: i32) -> Result<Vec<Poll>, Error> {
        let polls = query_as("SELECT * FROM polls WHERE owner_id = $1 ORDER BY created_at DESC, id DESC")
            .bind(owner_id)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(polls)
    }

    async fn count_by_owner(&mut self, owner_id: i32) -> Result<i64, Error> {
        let total = query_scalar("SELECT COUNT(*) FROM polls WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(total)
    }

    async fn update(&mut self, id: i32, poll: PollUpdate) -> Result<(), Error> {
        query("UPDATE polls SET title = $1, description = $2, end_date = $3 WHERE id = $4")
            .bind(poll.title)
            .bind(poll.description)
            .bind(poll.end_date)
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn delete(&mut self, id: i32) -> Result<u64, Error> {
        let res = query("DELETE FROM polls WHERE id = $1").bind(id).execute(&mut self.executor).await?;
        Ok(res.rows_affected())
    }
}

impl<E> OptionCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn bulk_insert(&mut self, options: Vec<OptionInsert>) -> Result<(), Error> {
        QueryBuilder::new("INSERT INTO options (poll_id, text)")
            .push_values(options, |mut b, o| {
                b.push_bind(o.poll_id);
                b.push_bind(o.text);
            })
            .build()
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Option<Opt>, Error> {
        let opt = query_as("SELECT * FROM options WHERE id = $1").bind(id).fetch_optional(&mut self.executor).await?;
        Ok(opt)
    }

    async fn query(&mut self, poll_id: i32) -> Result<Vec<Opt>, Error> {
        let opts = query_as("SELECT * FROM options WHERE poll_id = $1 ORDER BY id")
            .bind(poll_id)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(opts)
    }

    async fn delete_by_poll(&mut self, poll_id: i32) -> Result<u64, Error> {
        let res = query("DELETE FROM options WHERE poll_id = $1").bind(poll_id).execute(&mut self.executor).await?;
        Ok(res.rows_affected())
    }
}

impl<E> VoteCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, vote: VoteInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO votes (user_id, poll_id, option_id) VALUES ($1, $2, $3) RETURNING id")
            .bind(vote.user_id)
            .bind(vote.poll_id)
            .bind(vote.option_id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn by_poll(&mut self, poll_id: i32) -> Result<Vec<Vote>, Error> {
        let votes = query_as("SELECT * FROM votes WHERE poll_id = $1 ORDER BY id")
            .bind(poll_id)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(votes)
    }

    async fn get_by_user_and_poll(&mut self, user_id: i32, poll_id: i32) -> Result<Option<Vote>, Error> {
        let vote = query_as("SELECT * FROM votes WHERE user_id = $1 AND poll_id = $2")
            .bind(user_id)
            .bind(poll_id)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(vote)
    }

    async fn lock(&mut self, user_id: i32, poll_id: i32) -> Result<(), Error> {
        query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(user_id)
            .bind(poll_id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn update_option(&mut self, id: i32, option_id: i32) -> Result<(), Error> {
        query("UPDATE votes SET option_id = $1 WHERE id = $2")
            .bind(option_id)
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM votes WHERE id = $1").bind(id).execute(&mut self.executor).await?;
        Ok(())
    }

    async fn delete_by_poll(&mut self, poll_id: i32) -> Result<u64, Error> {
        let res = query("DELETE FROM votes WHERE poll_id = $1").bind(poll_id).execute(&mut self.executor).await?;
        Ok(res.rows_affected())
    }
}

impl Common for PgSqlx<PoolConnection<Postgres>> {}
impl<'a> Common for PgSqlx<Transaction<'a, Postgres>> {}
impl Store for PgSqlx<PoolConnection<Postgres>> {}
impl<'a> Store for PgSqlx<Transaction<'a, Postgres>> {}

impl<'a> TxStore for PgSqlx<Transaction<'a, Postgres>> {
    async fn commit(self) -> Result<(), Error> {
        self.executor.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgSqlxManager {
    pool: PgPool,
}

impl PgSqlxManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Manager for PgSqlxManager {
    type Store = PgSqlx<PoolConnection<Postgres>>;
    type TxStore = PgSqlx<Transaction<'static, Postgres>>;

    async fn db(&self) -> Result<Self::Store, Error> {
        let conn = self.pool.acquire().await?;
        Ok(PgSqlx::new(conn))
    }

    async fn tx(&self) -> Result<Self::TxStore, Error> {
        let tx = self.pool.begin().await?;
        Ok(PgSqlx::new(tx))
    }
}

// These run against a throwaway database created by `sqlx::test` from
// DATABASE_URL: `cargo test -- --ignored`.
#[cfg(test)]
mod test {
    use super::*;
    use crate::core::models::vote::CastEffect;
    use crate::core::services::fixtures::{create, now, poll_input, sign_in};
    use crate::core::services::{poll, vote};
    use chrono::Duration;

    async fn option_ids(manager: &PgSqlxManager, poll_id: i32) -> Vec<i32> {
        let mut db = manager.db().await.unwrap();
        OptionCommon::query(&mut db, poll_id).await.unwrap().iter().map(|o| o.id).collect()
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_concurrent_casts_of_one_user(pool: PgPool) {
        let manager = PgSqlxManager::new(pool);
        let u = sign_in(&manager, "u").await;
        let poll_id = create(&manager, &u, &["A", "B"]).await;
        let ids = option_ids(&manager, poll_id).await;

        for _ in 0..5 {
            let first = async { vote::cast_vote(manager.tx().await.unwrap(), Some(&u), poll_id, ids[0], now).await };
            let second = async { vote::cast_vote(manager.tx().await.unwrap(), Some(&u), poll_id, ids[1], now).await };
            let (first, second) = tokio::join!(first, second);
            first.unwrap();
            second.unwrap();
            let mut db = manager.db().await.unwrap();
            assert!(VoteCommon::by_poll(&mut db, poll_id).await.unwrap().len() <= 1);
        }
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_concurrent_creates_at_quota(pool: PgPool) {
        let manager = PgSqlxManager::new(pool);
        let alice = sign_in(&manager, "alice").await;
        for _ in 0..poll::MAX_POLLS_PER_USER - 1 {
            create(&manager, &alice, &["A", "B"]).await;
        }

        let input = poll_input(&["A", "B"], now() + Duration::days(1));
        let first = async { poll::create_poll(manager.tx().await.unwrap(), Some(&alice), input.clone(), now).await };
        let second = async { poll::create_poll(manager.tx().await.unwrap(), Some(&alice), input.clone(), now).await };
        let (first, second) = tokio::join!(first, second);
        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|r| matches!(r, Err(Error::QuotaExceeded(10)))));

        let mut db = manager.db().await.unwrap();
        let mine = poll::list_my_polls(&mut db, Some(&alice)).await.unwrap().unwrap();
        assert_eq!(mine.len(), 10);
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_cast_racing_delete(pool: PgPool) {
        let manager = PgSqlxManager::new(pool);
        let alice = sign_in(&manager, "alice").await;
        let bob = sign_in(&manager, "bob").await;

        for _ in 0..3 {
            let poll_id = create(&manager, &alice, &["A", "B"]).await;
            let a = option_ids(&manager, poll_id).await[0];
            let cast = async { vote::cast_vote(manager.tx().await.unwrap(), Some(&bob), poll_id, a, now).await };
            let delete = async { poll::delete_poll(manager.tx().await.unwrap(), Some(&alice), poll_id).await };
            let (cast, delete) = tokio::join!(cast, delete);
            delete.unwrap();
            assert!(matches!(cast, Ok(CastEffect::Created) | Err(Error::NotFound("poll"))), "{:?}", cast);

            let mut db = manager.db().await.unwrap();
            assert!(PollCommon::get(&mut db, poll_id).await.unwrap().is_none());
            assert!(OptionCommon::query(&mut db, poll_id).await.unwrap().is_empty());
            assert!(VoteCommon::by_poll(&mut db, poll_id).await.unwrap().is_empty());
        }
    }

    #[sqlx::test]
    #[ignore = "needs DATABASE_URL"]
    async fn test_uncommitted_transaction_is_discarded(pool: PgPool) {
        let manager = PgSqlxManager::new(pool);
        {
            let mut tx = manager.tx().await.unwrap();
            UserCommon::upsert(
                &mut tx,
                UserUpsert {
                    account: "github|ghost".into(),
                    name: "ghost".into(),
                    image: None,
                },
            )
            .await
            .unwrap();
        }
        let mut db = manager.db().await.unwrap();
        assert!(UserCommon::get_by_account(&mut db, "github|ghost").await.unwrap().is_none());
    }
}
