use crate::core::lifecycle::PollStatus;
use crate::core::models::{
    option::{Insert as OptionInsert, Opt},
    poll::{Insert as PollInsert, Poll, PollWithOwner, Update as PollUpdate},
    user::{Upsert as UserUpsert, User},
    vote::{Insert as VoteInsert, Vote},
};
use crate::error::Error;
use chrono::{DateTime, Utc};

pub trait UserCommon {
    async fn get_by_account(&mut self, account: &str) -> Result<Option<User>, Error>;
    async fn upsert(&mut self, user: UserUpsert) -> Result<User, Error>;
    /// Holds the user row until the transaction ends.
    async fn lock(&mut self, id: i32) -> Result<(), Error>;
}

pub trait PollCommon {
    async fn insert(&mut self, poll: PollInsert) -> Result<i32, Error>;
    async fn get(&mut self, id: i32) -> Result<Option<Poll>, Error>;
    async fn get_for_share(&mut self, id: i32) -> Result<Option<Poll>, Error>;
    async fn get_for_update(&mut self, id: i32) -> Result<Option<Poll>, Error>;
    async fn query(&mut self, status: PollStatus, now: DateTime<Utc>) -> Result<Vec<PollWithOwner>, Error>;
    async fn by_owner(&mut self, owner_id: i32) -> Result<Vec<Poll>, Error>;
    async fn count_by_owner(&mut self, owner_id: i32) -> Result<i64, Error>;
    async fn update(&mut self, id: i32, poll: PollUpdate) -> Result<(), Error>;
    async fn delete(&mut self, id: i32) -> Result<u64, Error>;
}

pub trait OptionCommon {
    async fn bulk_insert(&mut self, options: Vec<OptionInsert>) -> Result<(), Error>;
    async fn get(&mut self, id: i32) -> Result<Option<Opt>, Error>;
    async fn query(&mut self, poll_id: i32) -> Result<Vec<Opt>, Error>;
    async fn delete_by_poll(&mut self, poll_id: i32) -> Result<u64, Error>;
}

pub trait VoteCommon {
    async fn insert(&mut self, vote: VoteInsert) -> Result<i32, Error>;
    async fn by_poll(&mut self, poll_id: i32) -> Result<Vec<Vote>, Error>;
    async fn get_by_user_and_poll(&mut self, user_id: i32, poll_id: i32) -> Result<Option<Vote>, Error>;
    /// Serialises casts of one user on one poll until the transaction ends.
    async fn lock(&mut self, user_id: i32, poll_id: i32) -> Result<(), Error>;
    async fn update_option(&mut self, id: i32, option_id: i32) -> Result<(), Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    async fn delete_by_poll(&mut self, poll_id: i32) -> Result<u64, Error>;
}

pub trait Common: UserCommon + PollCommon + OptionCommon + VoteCommon {}

pub trait Store: Common {}

pub trait TxStore: Store {
    /// Dropping an uncommitted store discards its writes.
    async fn commit(self) -> Result<(), Error>;
}

pub trait Manager {
    type Store: Store;
    type TxStore: TxStore;

    async fn db(&self) -> Result<Self::Store, Error>;
    async fn tx(&self) -> Result<Self::TxStore, Error>;
}
