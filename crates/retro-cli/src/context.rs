use std::sync::Arc;

use retro_auth::{open_session_store, IdentityStore, RegistrationPolicy};
use retro_core::config::{OrphanPolicy, RetroConfig};
use retro_core::latency::Latency;
use retro_core::models::user::User;
use retro_core::repository::CatalogRepository;
use retro_core::validation::MIN_PASSWORD_LEN;
use retro_db::SqliteCatalog;
use retro_scan::CatalogScanner;
use retro_store::CollectionStore;

/// Everything a command needs, wired from the configuration.
pub struct App {
    pub config: RetroConfig,
    pub catalog: Arc<dyn CatalogRepository>,
    pub identity: Arc<IdentityStore>,
    latency: Latency,
}

impl App {
    /// Open the catalog and session backends and restore any saved session.
    pub fn open() -> anyhow::Result<Self> {
        let config = RetroConfig::load()?;
        let catalog: Arc<dyn CatalogRepository> =
            Arc::new(SqliteCatalog::open(&RetroConfig::db_path()?)?);
        let sessions = open_session_store(config.session_backend, RetroConfig::session_dir()?);
        let latency = Latency::from_config(&config.latency);

        let identity = Arc::new(IdentityStore::new(
            catalog.clone(),
            sessions,
            latency.clone(),
            RegistrationPolicy {
                require_unique_username: config.require_unique_username,
                min_password_len: MIN_PASSWORD_LEN,
            },
        ));
        identity.restore()?;

        Ok(Self {
            config,
            catalog,
            identity,
            latency,
        })
    }

    /// Route guard for every command that needs a logged-in collector.
    pub fn require_user(&self) -> anyhow::Result<User> {
        self.identity.current_user().ok_or_else(|| {
            anyhow::anyhow!("Utilisateur non connecté. Lancez `retro login` pour vous connecter.")
        })
    }

    /// Collection store for the current session, loaded and ready.
    pub async fn collections(&self) -> anyhow::Result<CollectionStore> {
        self.collections_with(self.config.orphan_policy).await
    }

    pub async fn collections_with(&self, policy: OrphanPolicy) -> anyhow::Result<CollectionStore> {
        let store = CollectionStore::new(
            self.catalog.clone(),
            self.identity.clone(),
            Arc::new(CatalogScanner::new(self.catalog.clone())),
            self.latency.clone(),
        )
        .with_orphan_policy(policy);
        crate::display::spin("Chargement des collections...", store.fetch_user_collections())
            .await?;
        Ok(store)
    }
}
