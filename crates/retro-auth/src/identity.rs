use std::sync::{Arc, Mutex, MutexGuard};

use retro_core::error::RetroError;
use retro_core::latency::{Latency, Operation};
use retro_core::models::user::{NewUser, ProfilePatch, User, UserAccount};
use retro_core::repository::CatalogRepository;
use retro_core::validation;

use crate::{SessionStore, SESSION_KEY};

/// Extra checks applied at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistrationPolicy {
    /// Reject a username already held by another account.
    pub require_unique_username: bool,
    /// Minimum password length in characters; 0 disables the rule.
    pub min_password_len: usize,
}

#[derive(Debug, Default)]
struct IdentityState {
    current: Option<User>,
    loading: bool,
    error: Option<String>,
}

/// Holder of the logged-in user, backed by the catalog for credentials and
/// a [`SessionStore`] for durability across runs.
pub struct IdentityStore {
    catalog: Arc<dyn CatalogRepository>,
    sessions: Arc<dyn SessionStore>,
    latency: Latency,
    policy: RegistrationPolicy,
    state: Mutex<IdentityState>,
}

impl IdentityStore {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        sessions: Arc<dyn SessionStore>,
        latency: Latency,
        policy: RegistrationPolicy,
    ) -> Self {
        Self {
            catalog,
            sessions,
            latency,
            policy,
            state: Mutex::new(IdentityState::default()),
        }
    }

    /// Reload the session record written by a previous run.
    ///
    /// A record that does not parse is deleted and treated as no session.
    pub fn restore(&self) -> Result<Option<User>, RetroError> {
        let Some(raw) = self.sessions.get(SESSION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<User>(&raw) {
            Ok(user) => {
                tracing::debug!(user = %user.id, "restored session");
                self.state().current = Some(user.clone());
                Ok(Some(user))
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed session record");
                self.sessions.delete(SESSION_KEY)?;
                self.state().current = None;
                Ok(None)
            }
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.state().current.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().current.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state().error.clone()
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, RetroError> {
        self.begin();
        self.latency.simulate(Operation::Login).await;
        let result = self.try_login(email, password);
        self.finish(result)
    }

    fn try_login(&self, email: &str, password: &str) -> Result<User, RetroError> {
        let account = self
            .catalog
            .find_user_by_email(email)?
            .filter(|a| a.password_matches(password))
            .ok_or(RetroError::InvalidCredentials)?;
        tracing::info!(user = %account.user.id, "logged in");
        self.open_session(account.user)
    }

    pub async fn register(&self, new_user: NewUser) -> Result<User, RetroError> {
        self.begin();
        self.latency.simulate(Operation::Register).await;
        let result = self.try_register(new_user);
        self.finish(result)
    }

    fn try_register(&self, new_user: NewUser) -> Result<User, RetroError> {
        validation::validate_registration(&new_user, self.policy.min_password_len)?;
        if self.catalog.find_user_by_email(&new_user.email)?.is_some() {
            return Err(RetroError::DuplicateEmail {
                email: new_user.email,
            });
        }
        if self.policy.require_unique_username
            && self.catalog.find_user_by_username(&new_user.username)?.is_some()
        {
            return Err(RetroError::DuplicateUsername {
                username: new_user.username,
            });
        }

        let id = self.catalog.next_user_id()?;
        let account = UserAccount::register(id, new_user);
        self.catalog.insert_user(&account)?;
        tracing::info!(user = %account.user.id, username = %account.user.username, "registered");
        self.open_session(account.user)
    }

    /// Clear the current user and the durable record. Never fails on a
    /// missing record.
    pub fn logout(&self) -> Result<(), RetroError> {
        let previous = self.state().current.take();
        self.sessions.delete(SESSION_KEY)?;
        if let Some(user) = previous {
            tracing::info!(user = %user.id, "logged out");
        }
        Ok(())
    }

    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<User, RetroError> {
        self.begin();
        self.latency.simulate(Operation::Profile).await;
        let result = self.try_update_profile(patch);
        self.finish(result)
    }

    fn try_update_profile(&self, patch: ProfilePatch) -> Result<User, RetroError> {
        let current = self.current_user().ok_or(RetroError::NotAuthenticated)?;
        let mut account = self
            .catalog
            .get_user(&current.id)?
            .ok_or_else(|| RetroError::UserNotFound {
                id: current.id.to_string(),
            })?;

        if let Some(email) = &patch.email {
            let taken = self
                .catalog
                .find_user_by_email(email)?
                .is_some_and(|other| other.user.id != current.id);
            if taken {
                return Err(RetroError::DuplicateEmail {
                    email: email.clone(),
                });
            }
        }
        if let (true, Some(username)) = (self.policy.require_unique_username, &patch.username) {
            let taken = self
                .catalog
                .find_user_by_username(username)?
                .is_some_and(|other| other.user.id != current.id);
            if taken {
                return Err(RetroError::DuplicateUsername {
                    username: username.clone(),
                });
            }
        }

        account.apply(patch);
        self.catalog.update_user(&account)?;
        tracing::info!(user = %account.user.id, "profile updated");
        self.open_session(account.user)
    }

    /// Make `user` current and persist it (without password) as the session.
    fn open_session(&self, user: User) -> Result<User, RetroError> {
        let record = serde_json::to_string(&user)?;
        self.sessions.store(SESSION_KEY, &record)?;
        self.state().current = Some(user.clone());
        Ok(user)
    }

    fn begin(&self) {
        let mut state = self.state();
        state.loading = true;
        state.error = None;
    }

    fn finish<T>(&self, result: Result<T, RetroError>) -> Result<T, RetroError> {
        let mut state = self.state();
        state.loading = false;
        if let Err(e) = &result {
            tracing::debug!(error = %e, "identity operation failed");
            state.error = Some(e.to_string());
        }
        result
    }

    fn state(&self) -> MutexGuard<'_, IdentityState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
