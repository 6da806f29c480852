use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error as ActixError, HttpMessage, ResponseError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::future::{ready, Future, Ready};
use std::pin::Pin;

use crate::core::models::user::Session;
use crate::core::tokener::{Payload, Tokener};
use crate::error::Error;
use crate::impls::tokener::jwt::JWT;

pub static AUTHORIZATION: &str = "Authorization";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Claim {
    pub user: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub exp: i64,
}

impl Payload for Claim {
    fn session(&self) -> Session {
        Session {
            account: self.user.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
        }
    }
}

/// Verifies the bearer token when one is present. Requests without an
/// `Authorization` header pass through anonymously.
pub struct JWTMiddleware {
    secret: Vec<u8>,
}

impl JWTMiddleware {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JWTMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = ActixError;
    type Response = ServiceResponse<EitherBody<B>>;
    type Transform = JWTService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JWTService {
            tokener: JWT::new(self.secret.clone()),
            next_service: service,
        }))
    }
}

pub struct JWTService<S> {
    tokener: JWT,
    next_service: S,
}

impl<S> JWTService<S> {
    fn session(&self, req: &ServiceRequest) -> Result<Option<Session>, Error> {
        let header = match req.headers().get(AUTHORIZATION) {
            Some(header) => header,
            None => return Ok(None),
        };
        let value = header.to_str().map_err(|_| Error::Unauthenticated)?;
        let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
        match <JWT as Tokener<Claim>>::verify_token(&self.tokener, token) {
            Ok(claim) => Ok(Some(claim.session())),
            Err(e) => {
                debug!("rejected token: {}", e);
                Err(Error::Unauthenticated)
            }
        }
    }
}

impl<S, B> Service<ServiceRequest> for JWTService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, ctx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.next_service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.session(&req) {
            Err(e) => {
                let res = req.into_response(e.error_response()).map_into_right_body();
                Box::pin(async move { Ok(res) })
            }
            Ok(session) => {
                if let Some(session) = session {
                    req.extensions_mut().insert(session);
                }
                let res_fut = self.next_service.call(req);
                Box::pin(async move {
                    let res = res_fut.await?;
                    Ok(res.map_into_left_body())
                })
            }
        }
    }
}
