use std::{convert::Infallible, path::PathBuf, sync::Arc};

use chrono::Duration;
use warp::Filter;

use crate::{
    actions::PgStore,
    authentication::jwt::TokenIssuer,
    config::Config,
    error::Error,
    media::MediaStore,
    memory::MemoryStore,
    store::{CatalogStore, UserStore},
};

/// Everything a request handler needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub tokens: TokenIssuer,
    pub media: MediaStore,
}

impl AppState {
    pub fn new<S>(store: Arc<S>, tokens: TokenIssuer, media: MediaStore) -> Self
    where
        S: UserStore + CatalogStore + 'static,
    {
        Self {
            users: store.clone(),
            catalog: store,
            tokens,
            media,
        }
    }

    /// State backed by a fresh `MemoryStore` and an ephemeral token secret.
    pub fn in_memory(media_root: impl Into<PathBuf>) -> Result<Self, Error> {
        Ok(Self::new(
            Arc::new(MemoryStore::new()),
            TokenIssuer::ephemeral(Duration::hours(crate::DEFAULT_TOKEN_LIFETIME_HOURS))?,
            MediaStore::new(media_root, crate::DEFAULT_MAX_UPLOAD_BYTES),
        ))
    }

    pub async fn from_config(config: &Config) -> Result<Self, Error> {
        let lifetime = Duration::hours(config.token_lifetime_hours);
        let tokens = match &config.token_secret {
            Some(secret) => TokenIssuer::new(secret.as_bytes(), lifetime)?,
            None => {
                log::warn!("No token secret configured; issued tokens will not survive a restart");
                TokenIssuer::ephemeral(lifetime)?
            }
        };
        let media = MediaStore::new(&config.media_root, config.max_upload_bytes);

        match &config.database_url {
            Some(url) => {
                let store = PgStore::connect(url, config.max_connections).await?;
                log::info!("Using PostgreSQL store");
                Ok(Self::new(Arc::new(store), tokens, media))
            }
            None => {
                log::warn!("No database configured; using the in-memory store");
                Ok(Self::new(Arc::new(MemoryStore::new()), tokens, media))
            }
        }
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
