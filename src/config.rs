use std::net::SocketAddr;

use anyhow::Context;

use crate::models::RatingSource;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub default_rating_source: RatingSource,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://reelstats.db?mode=rwc".to_string());

        let db_max_connections = pool_size(std::env::var("DB_MAX_CONNECTIONS").ok().as_deref())?;

        let default_rating_source = match std::env::var("DEFAULT_RATING_SOURCE") {
            Ok(raw) => RatingSource::parse(&raw)
                .with_context(|| format!("DEFAULT_RATING_SOURCE: unknown source `{raw}`"))?,
            Err(_) => RatingSource::Imdb,
        };

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            db_max_connections,
            default_rating_source,
        })
    }
}

/// `DB_MAX_CONNECTIONS`: 8 when unset, otherwise a positive integer.
fn pool_size(raw: Option<&str>) -> anyhow::Result<u32> {
    let Some(raw) = raw else {
        return Ok(8);
    };
    let size: u32 = raw.trim().parse().with_context(|| format!("DB_MAX_CONNECTIONS: invalid value `{raw}`"))?;
    anyhow::ensure!(size > 0, "DB_MAX_CONNECTIONS must be at least 1");
    Ok(size)
}
