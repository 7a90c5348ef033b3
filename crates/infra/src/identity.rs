//! Registration, login and permission resolution on top of a store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use registrar_auth::password::{PasswordError, hash_password, verify_against_dummy, verify_password};
use registrar_auth::{AuthError, Hs256Tokens, Identity, PermissionCode, SessionClaims};
use registrar_core::UserId;

use crate::store::{PermissionStore, StoreError, UserChanges, UserRecord, UserStore};

pub const USERNAME_MIN_CHARS: usize = 3;
pub const USERNAME_MAX_CHARS: usize = 64;
const PASSWORD_MAX_BYTES: usize = 1024;

impl From<StoreError> for AuthError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(_) => AuthError::UserNotFound,
            StoreError::Conflict(_) => AuthError::Conflict,
            StoreError::InvalidReference(msg) | StoreError::Storage(msg) => AuthError::Internal(msg),
        }
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub claims: SessionClaims,
    pub user: UserRecord,
    /// Codes granted at login time. Informational only; every guarded request
    /// re-reads them.
    pub permissions: Vec<PermissionCode>,
}

/// Trim and check a username.
pub fn normalize_username(raw: &str) -> Result<String, AuthError> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AuthError::Validation("username is required".into()));
    }
    let len = username.chars().count();
    if !(USERNAME_MIN_CHARS..=USERNAME_MAX_CHARS).contains(&len) {
        return Err(AuthError::Validation(format!(
            "username must be between {USERNAME_MIN_CHARS} and {USERNAME_MAX_CHARS} characters"
        )));
    }
    if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AuthError::Validation("username must not contain whitespace".into()));
    }
    Ok(username.to_string())
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::Validation("password is required".into()));
    }
    if password.len() > PASSWORD_MAX_BYTES {
        return Err(AuthError::Validation(format!(
            "password must be at most {PASSWORD_MAX_BYTES} bytes"
        )));
    }
    Ok(())
}

async fn hash_off_thread(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| match e {
            PasswordError::Empty => AuthError::Validation("password is required".into()),
            PasswordError::Hashing(msg) => AuthError::Internal(msg),
        })
}

/// Compare against `stored_hash`, or against a dummy hash when there is none.
async fn verify_off_thread(password: &str, stored_hash: Option<String>) -> Result<bool, AuthError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => verify_password(&password, &hash),
        None => verify_against_dummy(&password),
    })
    .await
    .map_err(|e| AuthError::Internal(format!("password verification task failed: {e}")))
}

/// Identity operations shared by the HTTP layer and bootstrap.
///
/// Generic over the store so it can sit on a concrete store in tests and on
/// `dyn Store` in the application.
pub struct IdentityService<S: ?Sized> {
    store: Arc<S>,
    tokens: Hs256Tokens,
}

impl<S: ?Sized> core::fmt::Debug for IdentityService<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdentityService")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl<S> IdentityService<S>
where
    S: UserStore + PermissionStore + ?Sized,
{
    pub fn new(store: Arc<S>, tokens: Hs256Tokens) -> Self {
        Self { store, tokens }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn tokens(&self) -> &Hs256Tokens {
        &self.tokens
    }

    /// Create a new account. A taken username (even a soft-deleted one) is a
    /// conflict and leaves the existing record untouched.
    pub async fn register(&self, username: &str, password: &str) -> Result<UserRecord, AuthError> {
        let username = normalize_username(username)?;
        check_password(password)?;

        // Cheap early exit; the store's unique constraint settles races.
        if self.store.find_by_username(&username).await?.is_some() {
            warn!(%username, "registration rejected: username taken");
            return Err(AuthError::Conflict);
        }

        let hash = hash_off_thread(password).await?;
        match self.store.create_user(&username, &hash).await {
            Ok(user) => {
                info!(user_id = %user.id, username = %user.username, "user registered");
                Ok(user)
            }
            Err(StoreError::Conflict(_)) => {
                warn!(%username, "registration rejected: username taken");
                Err(AuthError::Conflict)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check credentials and issue a session token.
    ///
    /// Unknown usernames, soft-deleted users and wrong passwords all fail with
    /// the same error after the same amount of hashing work.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Validation("username and password are required".into()));
        }

        let user = self.store.find_active_by_username(username).await?;
        let stored_hash = user.as_ref().map(|u| u.password_hash.clone());
        let matched = verify_off_thread(password, stored_hash).await?;

        let user = match user {
            Some(user) if matched => user,
            _ => {
                warn!(%username, "login rejected");
                return Err(AuthError::InvalidCredentials);
            }
        };

        let issued = self.tokens.issue(user.id, &user.username, Utc::now())?;
        let permissions = self.store.granted_codes(user.id).await?;
        info!(user_id = %user.id, username = %user.username, "login succeeded");

        Ok(LoginOutcome {
            token: issued.token,
            claims: issued.claims,
            user,
            permissions,
        })
    }

    /// Codes currently granted to an active user.
    pub async fn granted_codes(&self, user_id: UserId) -> Result<Vec<PermissionCode>, AuthError> {
        self.store.granted_codes(user_id).await.map_err(|e| match e {
            StoreError::NotFound(_) => {
                warn!(%user_id, "authenticated user no longer exists");
                AuthError::UserNotFound
            }
            other => other.into(),
        })
    }

    /// Allow the request only if `identity` currently holds `required`.
    pub async fn authorize(&self, identity: &Identity, required: &PermissionCode) -> Result<(), AuthError> {
        let granted = self.granted_codes(identity.user_id).await?;
        registrar_auth::authorize(&granted, required).map_err(|e| {
            debug!(user_id = %identity.user_id, permission = %required, "permission denied");
            AuthError::from(e)
        })
    }

    /// Change username and/or password of an active user.
    pub async fn update_user(
        &self,
        id: UserId,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<UserRecord, AuthError> {
        let username = username.map(normalize_username).transpose()?;
        let password_hash = match password {
            Some(password) => {
                check_password(password)?;
                Some(hash_off_thread(password).await?)
            }
            None => None,
        };

        let user = self
            .store
            .update_user(
                id,
                UserChanges {
                    username,
                    password_hash,
                },
            )
            .await?;
        info!(user_id = %user.id, "user updated");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use registrar_auth::{TokenVerifier, codes};

    use super::*;
    use crate::store::InMemoryStore;

    fn service() -> IdentityService<InMemoryStore> {
        IdentityService::new(
            Arc::new(InMemoryStore::new()),
            Hs256Tokens::new("test-secret", Duration::hours(24)),
        )
    }

    #[test]
    fn usernames_are_trimmed_and_bounded() {
        assert_eq!(normalize_username("  admin ").unwrap(), "admin");
        assert!(normalize_username("ab").is_err());
        assert!(normalize_username("   ").is_err());
        assert!(normalize_username(&"x".repeat(65)).is_err());
        assert!(normalize_username("two words").is_err());
    }

    #[tokio::test]
    async fn login_returns_a_token_for_the_registered_user() {
        let svc = service();
        let user = svc.register("admin", "password123").await.unwrap();

        let outcome = svc.login("admin", "password123").await.unwrap();
        assert_eq!(outcome.user.id, user.id);

        let claims = svc.tokens().verify(&outcome.token, Utc::now()).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.username, "admin");
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_fail_identically() {
        let svc = service();
        svc.register("admin", "password123").await.unwrap();

        let wrong = svc.login("admin", "wrong").await.unwrap_err();
        let unknown = svc.login("nobody", "password123").await.unwrap_err();
        assert_eq!(wrong, AuthError::InvalidCredentials);
        assert_eq!(unknown, AuthError::InvalidCredentials);
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn soft_deleted_users_cannot_log_in() {
        let svc = service();
        let user = svc.register("alice", "password123").await.unwrap();
        svc.store().soft_delete_user(user.id).await.unwrap();

        assert_eq!(
            svc.login("alice", "password123").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn re_registering_keeps_the_original_account() {
        let svc = service();
        let original = svc.register("alice", "password123").await.unwrap();

        assert_eq!(
            svc.register("alice", "hijacked").await.unwrap_err(),
            AuthError::Conflict
        );
        let outcome = svc.login("alice", "password123").await.unwrap();
        assert_eq!(outcome.user.id, original.id);
        assert!(svc.login("alice", "hijacked").await.is_err());
    }

    #[tokio::test]
    async fn registration_validates_input() {
        let svc = service();
        assert!(matches!(
            svc.register("", "password123").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            svc.register("alice", "").await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn authorization_follows_grants_and_revocations() {
        let svc = service();
        let user = svc.register("alice", "password123").await.unwrap();
        let identity = Identity::new(user.id, "alice");
        let perm = svc
            .store()
            .create_permission("Create department", &codes::DEPARTMENTS_CREATE)
            .await
            .unwrap();

        assert_eq!(
            svc.authorize(&identity, &codes::DEPARTMENTS_CREATE).await,
            Err(AuthError::Forbidden {
                permission: codes::DEPARTMENTS_CREATE
            })
        );

        svc.store().grant(user.id, perm.id).await.unwrap();
        assert_eq!(svc.authorize(&identity, &codes::DEPARTMENTS_CREATE).await, Ok(()));

        svc.store().revoke(user.id, perm.id).await.unwrap();
        assert!(matches!(
            svc.authorize(&identity, &codes::DEPARTMENTS_CREATE).await,
            Err(AuthError::Forbidden { .. })
        ));
    }

    #[tokio::test]
    async fn deleted_users_resolve_to_user_not_found() {
        let svc = service();
        let user = svc.register("alice", "password123").await.unwrap();
        svc.store().soft_delete_user(user.id).await.unwrap();

        let identity = Identity::new(user.id, "alice");
        assert_eq!(
            svc.authorize(&identity, &codes::DASHBOARD_VIEW).await,
            Err(AuthError::UserNotFound)
        );
    }

    #[tokio::test]
    async fn password_change_takes_effect_on_next_login() {
        let svc = service();
        let user = svc.register("alice", "password123").await.unwrap();

        svc.update_user(user.id, None, Some("new-password")).await.unwrap();
        assert!(svc.login("alice", "password123").await.is_err());
        assert!(svc.login("alice", "new-password").await.is_ok());
    }

    #[tokio::test]
    async fn renaming_onto_a_taken_username_conflicts() {
        let svc = service();
        svc.register("alice", "password123").await.unwrap();
        let bob = svc.register("bob", "password123").await.unwrap();

        assert_eq!(
            svc.update_user(bob.id, Some("alice"), None).await.unwrap_err(),
            AuthError::Conflict
        );
    }
}
