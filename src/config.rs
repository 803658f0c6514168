use std::path::{Path, PathBuf};

use chrono::Duration;
use log::{error, info, warn};
use mongodb::Client as MongoClient;
use rand::RngCore;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::bootstrap;

/// Length of a generated JWT secret, in bytes.
const GENERATED_SECRET_LENGTH: usize = 32;

fn default_upload_dir() -> PathBuf {
    PathBuf::from("static/img")
}

/// Raw configuration as found in `Rocket.toml` and `ROCKET_*` environment
/// variables.
#[derive(Deserialize)]
struct RawConfig {
    // non-secrets
    auth_ttl: u32,
    #[serde(default = "default_upload_dir")]
    upload_dir: PathBuf,
    // secrets
    jwt_secret: Option<String>,
}

/// Application configuration. This struct becomes managed state and can be
/// inspected by any endpoint.
pub struct Config {
    auth_ttl: u32,
    upload_dir: PathBuf,
    jwt_secret: Vec<u8>,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Directory that candidate photos are stored in and served from.
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Secret key used to sign session JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        &self.jwt_secret
    }

    fn from_raw(raw: RawConfig) -> Self {
        let jwt_secret = match raw.jwt_secret {
            Some(secret) if !secret.is_empty() => secret.into_bytes(),
            _ => {
                warn!("No `jwt_secret` configured; generated a random one, sessions will not survive a restart");
                let mut secret = vec![0_u8; GENERATED_SECRET_LENGTH];
                rand::thread_rng().fill_bytes(&mut secret);
                secret
            }
        };
        Self {
            auth_ttl: raw.auth_ttl,
            upload_dir: raw.upload_dir,
            jwt_secret,
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<RawConfig>() {
            Ok(config) => Config::from_raw(config),
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
}

/// A fairing that loads the MongoDB config, connects to the database,
/// bootstraps it, and places both a `Client` and a `Database` into managed
/// state.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "MongoDB",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(config.db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&get_database_name());

        // Seed the admin and categories, and create indexes and counters.
        if let Err(e) = bootstrap(&db).await {
            error!("Failed to bootstrap database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(client).manage(db);
        Ok(rocket)
    }
}

/// Get the name of the database to use.
fn get_database_name() -> String {
    "campus_vote".to_string()
}

/// Put an already-connected database into managed state, bypassing
/// [`DatabaseFairing`]. Used by tests, which pick their own database.
#[cfg(test)]
pub(crate) async fn manage_database(
    rocket: Rocket<Build>,
    client: MongoClient,
    db: mongodb::Database,
) -> Rocket<Build> {
    bootstrap(&db).await.expect("bootstrap failed");
    rocket.manage(client).manage(db)
}
