use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use log::info;

use std::env;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;

/// Builds the connection pool from the `POSTGRES_*` environment.
pub fn create_pool() -> Result<DbPool, r2d2::Error> {
    let default_postgres_host = String::from("localhost");
    let default_postgres_port = String::from("5432");
    let default_postgres_pw = String::from("default_pw");

    let postgres_url = format!(
        "postgres://trains:{}@{}:{}/trains",
        env::var("POSTGRES_TRAINS_PASSWORD").unwrap_or(default_postgres_pw),
        env::var("POSTGRES_HOST").unwrap_or(default_postgres_host),
        env::var("POSTGRES_PORT").unwrap_or(default_postgres_port)
    );

    info!("Connecting to postgres database {}", &postgres_url);
    Pool::builder().build(ConnectionManager::new(postgres_url))
}
