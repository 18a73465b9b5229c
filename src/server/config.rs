//! Server configuration from environment variables.
//!
//! The store is not optional: without PostgreSQL no endpoint can do
//! anything useful, so a missing or unreachable `DATABASE_URL` fails
//! startup instead of limping along.

use sqlx::PgPool;

/// Default port when `SERVER_PORT` is unset.
pub const DEFAULT_PORT: u16 = 8000;

/// Read the listen port from `SERVER_PORT`, falling back to the default.
pub fn server_port() -> u16 {
    match std::env::var("SERVER_PORT") {
        Ok(value) => match value.parse() {
            Ok(port) => port,
            Err(_) => {
                tracing::warn!("SERVER_PORT `{value}` is not a valid port, using {DEFAULT_PORT}");
                DEFAULT_PORT
            }
        },
        Err(_) => DEFAULT_PORT,
    }
}

/// Connect to PostgreSQL and bring the schema up to date.
pub async fn load_database() -> Result<PgPool, sqlx::Error> {
    let database_url = std::env::var("DATABASE_URL").map_err(|_| {
        tracing::error!("DATABASE_URL is not set");
        sqlx::Error::Configuration("DATABASE_URL is not set".into())
    })?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(&database_url).await?;
    tracing::info!("Database connection pool created");

    tracing::info!("Running database migrations...");
    match sqlx::migrate!().run(&pool).await {
        Ok(_) => tracing::info!("Database migrations completed"),
        Err(e) => {
            // Migrations may already have been applied out of band.
            tracing::error!("Failed to run database migrations: {e}");
            tracing::warn!("Continuing - database might not be up to date");
        }
    }

    Ok(pool)
}
