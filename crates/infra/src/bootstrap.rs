//! Startup seeding: the permission catalog and an optional first admin.
//!
//! Safe to run on every start.

use tracing::{info, warn};

use registrar_auth::{AuthError, CATALOG};

use crate::identity::{IdentityService, normalize_username};
use crate::store::{PermissionRecord, PermissionStore, StoreError, UserRecord, UserStore};

/// Credentials for the account created on first start.
#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Insert every catalog entry that is not stored yet. Existing entries are left alone.
pub async fn ensure_catalog<S>(store: &S) -> Result<Vec<PermissionRecord>, StoreError>
where
    S: PermissionStore + ?Sized,
{
    let mut records = Vec::with_capacity(CATALOG.len());
    for entry in CATALOG {
        records.push(store.ensure_permission(entry.name, &entry.code).await?);
    }
    info!(count = records.len(), "permission catalog ensured");
    Ok(records)
}

/// Make sure the seeded admin exists and holds every entry of `catalog`.
///
/// An existing active account with the seed's username keeps its password but
/// has any missing grants restored. Returns `None` when the username belongs to
/// a soft-deleted account.
pub async fn ensure_admin<S>(
    identity: &IdentityService<S>,
    seed: &AdminSeed,
    catalog: &[PermissionRecord],
) -> Result<Option<UserRecord>, AuthError>
where
    S: UserStore + PermissionStore + ?Sized,
{
    let admin = match identity.register(&seed.username, &seed.password).await {
        Ok(user) => {
            info!(user_id = %user.id, username = %user.username, "bootstrap admin created");
            user
        }
        Err(AuthError::Conflict) => {
            let username = normalize_username(&seed.username)?;
            match identity.store().find_active_by_username(&username).await? {
                Some(user) => {
                    info!(user_id = %user.id, %username, "bootstrap admin already present");
                    user
                }
                None => {
                    warn!(%username, "bootstrap admin username belongs to a deleted account");
                    return Ok(None);
                }
            }
        }
        Err(e) => return Err(e),
    };

    let mut added = 0usize;
    for permission in catalog {
        match identity.store().grant(admin.id, permission.id).await {
            Ok(_) => added += 1,
            Err(StoreError::Conflict(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    info!(user_id = %admin.id, added, "bootstrap admin grants ensured");
    Ok(Some(admin))
}

/// Seed the catalog, then the admin if one is configured.
pub async fn run<S>(identity: &IdentityService<S>, admin: Option<&AdminSeed>) -> Result<(), AuthError>
where
    S: UserStore + PermissionStore + ?Sized,
{
    let catalog = ensure_catalog(identity.store().as_ref()).await?;
    if let Some(seed) = admin {
        ensure_admin(identity, seed, &catalog).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;
    use registrar_auth::{Hs256Tokens, codes};

    use super::*;
    use crate::store::InMemoryStore;

    fn service() -> IdentityService<InMemoryStore> {
        IdentityService::new(
            Arc::new(InMemoryStore::new()),
            Hs256Tokens::new("test-secret", Duration::hours(24)),
        )
    }

    fn seed() -> AdminSeed {
        AdminSeed {
            username: "admin".into(),
            password: "password123".into(),
        }
    }

    #[tokio::test]
    async fn catalog_is_seeded_once() {
        let svc = service();
        let first = ensure_catalog(svc.store().as_ref()).await.unwrap();
        let second = ensure_catalog(svc.store().as_ref()).await.unwrap();

        assert_eq!(first.len(), CATALOG.len());
        // Same codes, same ids: the second pass inserted nothing.
        assert_eq!(first, second);
        assert_eq!(svc.store().list_permissions().await.unwrap().len(), CATALOG.len());
    }

    #[tokio::test]
    async fn admin_gets_every_catalog_permission() {
        let svc = service();
        run(&svc, Some(&seed())).await.unwrap();

        let outcome = svc.login("admin", "password123").await.unwrap();
        assert_eq!(outcome.permissions.len(), CATALOG.len());
        assert!(outcome.permissions.contains(&codes::PERMISSIONS_ASSIGN));
    }

    #[tokio::test]
    async fn rerunning_leaves_the_admin_alone() {
        let svc = service();
        run(&svc, Some(&seed())).await.unwrap();
        let changed = AdminSeed {
            password: "another-password".into(),
            ..seed()
        };
        run(&svc, Some(&changed)).await.unwrap();

        assert!(svc.login("admin", "password123").await.is_ok());
        assert!(svc.login("admin", "another-password").await.is_err());
        assert_eq!(svc.store().list_active_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rerunning_restores_missing_admin_grants() {
        let svc = service();
        run(&svc, Some(&seed())).await.unwrap();
        let admin = svc.store().find_active_by_username("admin").await.unwrap().unwrap();
        let catalog = svc.store().list_permissions().await.unwrap();
        for permission in catalog.iter().take(5) {
            svc.store().revoke(admin.id, permission.id).await.unwrap();
        }
        assert_eq!(svc.granted_codes(admin.id).await.unwrap().len(), CATALOG.len() - 5);

        run(&svc, Some(&seed())).await.unwrap();

        assert_eq!(svc.granted_codes(admin.id).await.unwrap().len(), CATALOG.len());
        assert!(svc.login("admin", "password123").await.is_ok());
    }

    #[tokio::test]
    async fn deleted_admin_is_not_revived() {
        let svc = service();
        run(&svc, Some(&seed())).await.unwrap();
        let admin = svc.store().find_active_by_username("admin").await.unwrap().unwrap();
        svc.store().soft_delete_user(admin.id).await.unwrap();

        let catalog = ensure_catalog(svc.store().as_ref()).await.unwrap();
        assert_eq!(ensure_admin(&svc, &seed(), &catalog).await.unwrap(), None);
        assert!(svc.store().list_active_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn without_a_seed_only_the_catalog_is_created() {
        let svc = service();
        run(&svc, None).await.unwrap();
        assert!(svc.store().list_active_users().await.unwrap().is_empty());
        assert_eq!(svc.store().list_permissions().await.unwrap().len(), CATALOG.len());
    }
}
