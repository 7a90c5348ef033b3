//! Application services shared by every handler.

use std::sync::Arc;

use anyhow::Context;

use registrar_auth::{Hs256Tokens, PermissionCode};
use registrar_infra::{IdentityService, InMemoryStore, PostgresStore, Store, bootstrap};

use crate::authz::PermissionGate;
use crate::config::ApiConfig;

pub struct AppServices {
    pub store: Arc<dyn Store>,
    pub identity: Arc<IdentityService<dyn Store>>,
}

impl AppServices {
    /// Wire services over an existing store (no bootstrap).
    pub fn new(store: Arc<dyn Store>, tokens: Hs256Tokens) -> Self {
        let identity = Arc::new(IdentityService::new(store.clone(), tokens));
        Self { store, identity }
    }

    /// Guard requiring `code`.
    pub fn gate(&self, code: PermissionCode) -> PermissionGate {
        PermissionGate::new(self.identity.clone(), code)
    }
}

/// Select the store from configuration, apply the schema when it is Postgres,
/// then seed the permission catalog and bootstrap admin.
pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pg = PostgresStore::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            pg.migrate().await.context("failed to apply schema")?;
            tracing::info!("using Postgres store");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
            Arc::new(InMemoryStore::new())
        }
    };

    let tokens = Hs256Tokens::new(&config.jwt_secret, config.token_ttl);
    let services = AppServices::new(store, tokens);

    bootstrap::run(services.identity.as_ref(), config.bootstrap_admin.as_ref())
        .await
        .context("bootstrap failed")?;

    Ok(services)
}
