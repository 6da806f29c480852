use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::lifecycle::{classify, PollStatus};
use crate::core::models::{
    option::{Insert as OptionInsert, Opt},
    poll::{Insert as PollInsert, Poll, PollWithOwner, Update as PollUpdate},
    user::{Upsert as UserUpsert, User},
    vote::{Insert as VoteInsert, Vote},
};
use crate::core::ports::repository::{Common, Manager, OptionCommon, PollCommon, Store, TxStore, UserCommon, VoteCommon};
use crate::error::Error;

#[derive(Debug, Clone, Default)]
struct Tables {
    seq: i32,
    users: BTreeMap<i32, User>,
    polls: BTreeMap<i32, Poll>,
    options: BTreeMap<i32, Opt>,
    votes: BTreeMap<i32, Vote>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.seq += 1;
        self.seq
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryManager {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryManager {
    pub fn new() -> Self {
        Self::default()
    }
}

// holds the table lock until dropped; `staged` is only written back on commit
pub struct Memory {
    guard: OwnedMutexGuard<Tables>,
    staged: Option<Tables>,
}

impl Memory {
    fn tables(&mut self) -> &mut Tables {
        match self.staged {
            Some(ref mut staged) => staged,
            None => &mut *self.guard,
        }
    }
}

impl Manager for MemoryManager {
    type Store = Memory;
    type TxStore = Memory;

    async fn db(&self) -> Result<Memory, Error> {
        let guard = self.tables.clone().lock_owned().await;
        Ok(Memory { guard, staged: None })
    }

    async fn tx(&self) -> Result<Memory, Error> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = Some(guard.clone());
        Ok(Memory { guard, staged })
    }
}

impl Common for Memory {}
impl Store for Memory {}

impl TxStore for Memory {
    async fn commit(mut self) -> Result<(), Error> {
        if let Some(staged) = self.staged.take() {
            *self.guard = staged;
        }
        Ok(())
    }
}

impl UserCommon for Memory {
    async fn get_by_account(&mut self, account: &str) -> Result<Option<User>, Error> {
        Ok(self.tables().users.values().find(|u| u.account == account).cloned())
    }

    async fn upsert(&mut self, user: UserUpsert) -> Result<User, Error> {
        let tables = self.tables();
        if let Some(existing) = tables.users.values_mut().find(|u| u.account == user.account) {
            existing.name = user.name;
            existing.image = user.image;
            return Ok(existing.clone());
        }
        let id = tables.next_id();
        let user = User {
            id,
            account: user.account,
            name: user.name,
            image: user.image,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn lock(&mut self, _id: i32) -> Result<(), Error> {
        Ok(())
    }
}

impl PollCommon for Memory {
    async fn insert(&mut self, poll: PollInsert) -> Result<i32, Error> {
        let tables = self.tables();
        if !tables.users.contains_key(&poll.owner_id) {
            return Err(Error::StoreError(format!("owner {} does not exist", poll.owner_id)));
        }
        let id = tables.next_id();
        tables.polls.insert(
            id,
            Poll {
                id,
                title: poll.title,
                description: poll.description,
                end_date: poll.end_date,
                owner_id: poll.owner_id,
                created_at: poll.created_at,
            },
        );
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Poll>, Error> {
        Ok(self.tables().polls.get(&id).cloned())
    }

    async fn get_for_share(&mut self, id: i32) -> Result<Option<Poll>, Error> {
        PollCommon::get(self, id).await
    }

    async fn get_for_update(&mut self, id: i32) -> Result<Option<Poll>, Error> {
        PollCommon::get(self, id).await
    }

    async fn query(&mut self, status: PollStatus, now: DateTime<Utc>) -> Result<Vec<PollWithOwner>, Error> {
        let tables = self.tables();
        let mut polls: Vec<PollWithOwner> = tables
            .polls
            .values()
            .filter(|p| classify(p.end_date, now) == status)
            .filter_map(|p| {
                tables.users.get(&p.owner_id).map(|owner| PollWithOwner {
                    poll: p.clone(),
                    owner: owner.summary(),
                })
            })
            .collect();
        polls.sort_by(|a, b| (b.poll.created_at, b.poll.id).cmp(&(a.poll.created_at, a.poll.id)));
        Ok(polls)
    }

    async fn by_owner(&mut self, owner_id: i32) -> Result<Vec<Poll>, Error> {
        let mut polls: Vec<Poll> = self.tables().polls.values().filter(|p| p.owner_id == owner_id).cloned().collect();
        polls.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(polls)
    }

    async fn count_by_owner(&mut self, owner_id: i32) -> Result<i64, Error> {
        Ok(self.tables().polls.values().filter(|p| p.owner_id == owner_id).count() as i64)
    }

    async fn update(&mut self, id: i32, poll: PollUpdate) -> Result<(), Error> {
        if let Some(existing) = self.tables().polls.get_mut(&id) {
            existing.title = poll.title;
            existing.description = poll.description;
            existing.end_date = poll.end_date;
        }
        Ok(())
    }

    async fn delete(&mut self, id: i32) -> Result<u64, Error> {
        let tables = self.tables();
        let referenced = tables.options.values().any(|o| o.poll_id == id) || tables.votes.values().any(|v| v.poll_id == id);
        if referenced {
            return Err(Error::StoreError(format!("poll {} is still referenced", id)));
        }
        Ok(tables.polls.remove(&id).map_or(0, |_| 1))
    }
}

impl OptionCommon for Memory {
    async fn bulk_insert(&mut self, options: Vec<OptionInsert>) -> Result<(), Error> {
        let tables = self.tables();
        for option in options {
            if !tables.polls.contains_key(&option.poll_id) {
                return Err(Error::StoreError(format!("poll {} does not exist", option.poll_id)));
            }
            let id = tables.next_id();
            tables.options.insert(
                id,
                Opt {
                    id,
                    poll_id: option.poll_id,
                    text: option.text,
                },
            );
        }
        Ok(())
    }

    async fn get(&mut self, id: i32) -> Result<Option<Opt>, Error> {
        Ok(self.tables().options.get(&id).cloned())
    }

    async fn query(&mut self, poll_id: i32) -> Result<Vec<Opt>, Error> {
        Ok(self.tables().options.values().filter(|o| o.poll_id == poll_id).cloned().collect())
    }

    async fn delete_by_poll(&mut self, poll_id: i32) -> Result<u64, Error> {
        let tables = self.tables();
        if tables.votes.values().any(|v| v.poll_id == poll_id) {
            return Err(Error::StoreError(format!("options of poll {} are still voted", poll_id)));
        }
        let before = tables.options.len();
        tables.options.retain(|_, o| o.poll_id != poll_id);
        Ok((before - tables.options.len()) as u64)
    }
}

impl VoteCommon for Memory {
    async fn insert(&mut self, vote: VoteInsert) -> Result<i32, Error> {
        let tables = self.tables();
        if tables.votes.values().any(|v| v.user_id == vote.user_id && v.poll_id == vote.poll_id) {
            return Err(Error::StoreError(format!("user {} already voted on poll {}", vote.user_id, vote.poll_id)));
        }
        let id = tables.next_id();
        tables.votes.insert(
            id,
            Vote {
                id,
                user_id: vote.user_id,
                poll_id: vote.poll_id,
                option_id: vote.option_id,
            },
        );
        Ok(id)
    }

    async fn by_poll(&mut self, poll_id: i32) -> Result<Vec<Vote>, Error> {
        Ok(self.tables().votes.values().filter(|v| v.poll_id == poll_id).cloned().collect())
    }

    async fn get_by_user_and_poll(&mut self, user_id: i32, poll_id: i32) -> Result<Option<Vote>, Error> {
        Ok(self.tables().votes.values().find(|v| v.user_id == user_id && v.poll_id == poll_id).cloned())
    }

    async fn lock(&mut self, _user_id: i32, _poll_id: i32) -> Result<(), Error> {
        Ok(())
    }

    async fn update_option(&mut self, id: i32, option_id: i32) -> Result<(), Error> {
        if let Some(vote) = self.tables().votes.get_mut(&id) {
            vote.option_id = option_id;
        }
        Ok(())
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.tables().votes.remove(&id);
        Ok(())
    }

    async fn delete_by_poll(&mut self, poll_id: i32) -> Result<u64, Error> {
        let tables = self.tables();
        let before = tables.votes.len();
        tables.votes.retain(|_, v| v.poll_id != poll_id);
        Ok((before - tables.votes.len()) as u64)
    }
}
