use std::sync::Arc;

use crate::config::Config;
use crate::crypto::envelope::EnvelopeCipher;
use crate::crypto::keys::KeyManager;
use crate::error::Result;
use crate::repositories::postgres::PgSessionStore;
use crate::repositories::session::SessionStore;
use crate::services::sessions::SessionLifecycle;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The session state machine shared by handlers and the reaper.
    pub lifecycle: Arc<SessionLifecycle>,
    /// The session store, shared with the reaper.
    pub store: Arc<dyn SessionStore>,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState`: database pool, schema, keypair, cipher,
    /// lifecycle.
    ///
    /// Fails (and the process must not serve) when the keypair cannot be
    /// generated or loaded - no encryption-dependent operation may run
    /// without valid key material.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = crate::db::create_pool(&config.database_url)?;
        tracing::info!("✅ PostgreSQL pool initialized");

        let store = PgSessionStore::new(pool);
        store.ensure_schema().await?;

        let keys = Arc::new(KeyManager::ensure(&config.keys_dir, config.rsa_key_bits)?);
        tracing::info!("✅ Keypair ready ({} bits configured)", config.rsa_key_bits);

        let store: Arc<dyn SessionStore> = Arc::new(store);
        let cipher = EnvelopeCipher::new(keys);
        let lifecycle = Arc::new(SessionLifecycle::new(store.clone(), cipher));

        Ok(AppState {
            lifecycle,
            store,
            config: config.clone(),
        })
    }

    /// Assembles a state from pre-built parts. Lets tests run the full
    /// router over an in-memory store and an ephemeral keypair.
    pub fn from_parts(store: Arc<dyn SessionStore>, keys: Arc<KeyManager>, config: Config) -> Self {
        let cipher = EnvelopeCipher::new(keys);
        let lifecycle = Arc::new(SessionLifecycle::new(store.clone(), cipher));
        AppState {
            lifecycle,
            store,
            config,
        }
    }
}
