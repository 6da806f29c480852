#![allow(async_fn_in_trait)]

mod config;
mod context;
mod core;
mod database;
mod error;
mod handlers;
mod impls;
mod middlewares;
mod request;
mod response;

use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use log::info;
use sqlx::postgres::PgPoolOptions;

use crate::config::{Config, StoreKind};
use crate::core::ports::repository::Manager;
use crate::database::memory::MemoryManager;
use crate::database::sqlx::{PgSqlxManager, MIGRATOR};
use crate::error::Error;
use crate::middlewares::jwt::JWTMiddleware;

#[actix_web::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::load()?;
    match config.store {
        StoreKind::Postgres => {
            let url = config.database_url.clone().ok_or_else(|| Error::ConfigError("DATABASE_URL is not set".into()))?;
            let pool = PgPoolOptions::new().max_connections(config.database_max_connections).connect(&url).await?;
            if config.run_migrations {
                MIGRATOR.run(&pool).await?;
                info!("migrations applied");
            }
            serve(config, PgSqlxManager::new(pool)).await
        }
        StoreKind::Memory => {
            info!("using in-memory store, data is lost on exit");
            serve(config, MemoryManager::new()).await
        }
    }
}

async fn serve<M>(config: Config, manager: M) -> Result<(), Error>
where
    M: Manager + Clone + Send + 'static,
{
    info!("listening on {}", config.bind_addr);
    let secret = config.jwt_secret.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(JWTMiddleware::new(secret.clone()))
            .wrap(Logger::default())
            .app_data(Data::new(manager.clone()))
            .configure(handlers::routes::<M>)
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await?;
    Ok(())
}
