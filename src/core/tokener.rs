use crate::core::models::user::Session;
use crate::error::Error;
use serde::{Deserialize, Serialize};

/// Claims issued by the sign-in provider for a signed-in account.
pub trait Payload: Serialize + for<'d> Deserialize<'d> {
    fn session(&self) -> Session;
}

pub trait Tokener<P: Payload> {
    fn gen_token(&self, payload: &P) -> Result<String, Error>;
    fn verify_token(&self, token: &str) -> Result<P, Error>;
}
