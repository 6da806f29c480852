pub mod poll;
pub mod user;
pub mod vote;

use actix_web::web::{delete, get, post, put, resource, scope, JsonConfig, QueryConfig, ServiceConfig};

use crate::core::ports::repository::Manager;
use crate::core::validation::ValidationErrors;
use crate::error::Error;

pub fn routes<M>(cfg: &mut ServiceConfig)
where
    M: Manager + 'static,
{
    cfg.app_data(JsonConfig::default().error_handler(|err, _| Error::from(ValidationErrors::single("body", err.to_string())).into()))
        .app_data(QueryConfig::default().error_handler(|err, _| Error::from(ValidationErrors::single("query", err.to_string())).into()))
        .service(resource("/session").route(post().to(user::sign_in::<M>)))
        .service(resource("/me").route(get().to(user::me::<M>)))
        .service(
            scope("/polls")
                .route("", get().to(poll::list::<M>))
                .route("", post().to(poll::create::<M>))
                .route("/mine", get().to(poll::mine::<M>))
                .service(
                    scope("/{poll_id}")
                        .route("", get().to(poll::detail::<M>))
                        .route("", put().to(poll::update::<M>))
                        .route("", delete().to(poll::delete::<M>))
                        .route("/votes", get().to(vote::list::<M>))
                        .route("/votes", post().to(vote::cast::<M>))
                        .route("/results", get().to(vote::results::<M>)),
                ),
        );
}
