use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;

use crate::constants::{DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_TOKEN_LIFETIME_HOURS};

/// Recipe catalog API server.
#[derive(Parser, Debug, Clone)]
#[command(name = "recipe-catalog", version, about)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "CATALOG_BIND", default_value = "127.0.0.1:8000")]
    pub bind: SocketAddr,

    /// PostgreSQL connection string; without it data lives in memory
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "CATALOG_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Secret used to sign access tokens; random per process when unset
    #[arg(long, env = "CATALOG_TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    #[arg(long, env = "CATALOG_TOKEN_LIFETIME_HOURS", default_value_t = DEFAULT_TOKEN_LIFETIME_HOURS)]
    pub token_lifetime_hours: i64,

    /// Directory uploaded images are written to and served from
    #[arg(long, env = "CATALOG_MEDIA_ROOT", default_value = "./media")]
    pub media_root: PathBuf,

    #[arg(long, env = "CATALOG_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,

    /// Mark the account inactive and exit instead of serving
    #[arg(long, value_name = "EMAIL", conflicts_with = "activate_user")]
    pub deactivate_user: Option<String>,

    /// Mark the account active again and exit instead of serving
    #[arg(long, value_name = "EMAIL")]
    pub activate_user: Option<String>,
}

impl Config {
    /// The one-off account change requested on the command line, if any.
    pub fn account_change(&self) -> Option<(&str, bool)> {
        match (&self.deactivate_user, &self.activate_user) {
            (Some(email), _) => Some((email, false)),
            (None, Some(email)) => Some((email, true)),
            (None, None) => None,
        }
    }
}
