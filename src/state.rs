//! Shared application state for all routes. Constructed once at startup and
//! cloned into handlers; the database handle is a pooled client reference.

use crate::config::Config;
use crate::extractors::JwtKeys;
use crate::model::{Registry, ENTITIES};
use mongodb::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub registry: Registry,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(db: Database, config: &Config) -> Self {
        AppState {
            db,
            registry: Registry::new(ENTITIES),
            jwt: JwtKeys::from_secret(&config.jwt_secret),
        }
    }
}
