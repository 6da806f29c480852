use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::core::models::user::Session;
use crate::error::Error;

/// Routes that need a signed-in caller take `Session`; routes that serve
/// anonymous callers too take `Option<Session>`.
impl FromRequest for Session {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<Self>() {
            Some(session) => ready(Ok(session.clone())),
            None => ready(Err(Error::Unauthenticated)),
        }
    }
}
