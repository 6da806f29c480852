pub mod poll;
pub mod user;
pub mod vote;

#[cfg(test)]
pub(crate) mod fixtures;
