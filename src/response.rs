use serde::Serialize;

use crate::core::models::vote::CastEffect;

#[derive(Debug, Serialize)]
pub struct CreateResponse {
    pub id: i32,
}

#[derive(Debug, Serialize)]
pub struct CastResponse {
    pub effect: CastEffect,
}
