//! Application auth context
//!
//! Process-wide `{is_admin, user}` state with explicit mutation entry points.
//! The admin flag and the cached identity are mirrored to the key-value store
//! so a restarted host starts from the last known state.

use kuteera_core::{Identity, KeyValueStore, keys};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Authentication state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub is_admin: bool,
    pub user: Option<Identity>,
}

/// Mutations accepted by the auth context
#[derive(Debug, Clone)]
pub enum AuthAction {
    SetAdmin(bool),
    SetUser(Option<Identity>),
    Logout,
}

/// Shared auth context
#[derive(Clone)]
pub struct AuthContext {
    state: Arc<watch::Sender<AuthState>>,
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl AuthContext {
    /// Create a context backed by `store`, hydrated from what it persisted
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let initial = hydrate(store.as_ref());
        let (state, _) = watch::channel(initial);
        Self {
            state: Arc::new(state),
            store,
        }
    }

    /// Current state
    pub fn snapshot(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                warn!(key, "Failed to read session store: {err}");
                None
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(keys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(keys::REFRESH_TOKEN)
    }

    /// Apply a mutation. Storage failures are logged and never abort it.
    pub fn dispatch(&self, action: AuthAction) {
        match action {
            AuthAction::SetAdmin(is_admin) => {
                self.persist(keys::IS_ADMIN, Some(if is_admin { "1" } else { "0" }));
                self.state.send_modify(|state| state.is_admin = is_admin);
            }
            AuthAction::SetUser(user) => {
                let serialized = user
                    .as_ref()
                    .and_then(|u| serde_json::to_string(u).ok());
                self.persist(keys::AUTH_USER, serialized.as_deref());
                self.state.send_modify(|state| state.user = user);
            }
            AuthAction::Logout => {
                for key in [
                    keys::ACCESS_TOKEN,
                    keys::REFRESH_TOKEN,
                    keys::IS_ADMIN,
                    keys::AUTH_USER,
                ] {
                    self.persist(key, None);
                }
                self.state.send_replace(AuthState::default());
                info!("Session cleared");
            }
        }
    }

    pub fn set_admin(&self, is_admin: bool) {
        self.dispatch(AuthAction::SetAdmin(is_admin));
    }

    pub fn set_user(&self, user: Option<Identity>) {
        self.dispatch(AuthAction::SetUser(user));
    }

    pub fn logout(&self) {
        self.dispatch(AuthAction::Logout);
    }

    fn persist(&self, key: &str, value: Option<&str>) {
        let result = match value {
            Some(value) => self.store.set(key, value),
            None => self.store.remove(key),
        };
        if let Err(err) = result {
            warn!(key, "Failed to update session store: {err}");
        }
    }
}

fn hydrate(store: &dyn KeyValueStore) -> AuthState {
    let is_admin = matches!(store.get(keys::IS_ADMIN), Ok(Some(v)) if v == "1");
    let user = match store.get(keys::AUTH_USER) {
        Ok(Some(raw)) => serde_json::from_str(&raw)
            .inspect_err(|err| debug!("Ignoring cached identity: {err}"))
            .ok(),
        _ => None,
    };
    AuthState { is_admin, user }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuteera_core::{CoreError, CoreResult, MemoryStore, Role};

    fn customer() -> Identity {
        Identity {
            admin_id: None,
            customer_id: Some(12),
            phone: Some("9876543210".into()),
            role: Role::Customer,
            name: Some("Meera".into()),
        }
    }

    #[test]
    fn test_mutations_are_persisted() {
        let store = Arc::new(MemoryStore::new());
        let context = AuthContext::new(store.clone());

        context.set_admin(true);
        context.set_user(Some(customer()));

        let state = context.snapshot();
        assert!(state.is_admin);
        assert_eq!(state.user, Some(customer()));
        assert_eq!(store.get(keys::IS_ADMIN).unwrap().as_deref(), Some("1"));

        let restored = AuthContext::new(store.clone());
        assert_eq!(restored.snapshot(), state);

        context.set_user(None);
        assert!(store.get(keys::AUTH_USER).unwrap().is_none());
    }

    #[test]
    fn test_logout_clears_everything() {
        let store = Arc::new(MemoryStore::with_entries([
            (keys::ACCESS_TOKEN, "a"),
            (keys::REFRESH_TOKEN, "r"),
            (keys::IS_ADMIN, "1"),
        ]));
        let context = AuthContext::new(store.clone());
        context.set_user(Some(customer()));
        let mut changes = context.subscribe();

        context.logout();

        assert_eq!(context.snapshot(), AuthState::default());
        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), AuthState::default());
        for key in [
            keys::ACCESS_TOKEN,
            keys::REFRESH_TOKEN,
            keys::IS_ADMIN,
            keys::AUTH_USER,
        ] {
            assert!(store.get(key).unwrap().is_none(), "{key} should be cleared");
        }

        // Logging out an empty session is harmless
        context.logout();
        assert_eq!(context.snapshot(), AuthState::default());
    }

    #[test]
    fn test_corrupt_cached_identity_is_ignored() {
        let store = Arc::new(MemoryStore::with_entries([
            (keys::AUTH_USER, "{not json"),
            (keys::IS_ADMIN, "0"),
        ]));
        let context = AuthContext::new(store);
        assert_eq!(context.snapshot(), AuthState::default());
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> CoreResult<Option<String>> {
            Err(CoreError::storage("unavailable"))
        }

        fn set(&self, _key: &str, _value: &str) -> CoreResult<()> {
            Err(CoreError::storage("unavailable"))
        }

        fn remove(&self, _key: &str) -> CoreResult<()> {
            Err(CoreError::storage("unavailable"))
        }
    }

    #[test]
    fn test_storage_failures_do_not_block_state() {
        let context = AuthContext::new(Arc::new(BrokenStore));
        context.set_admin(true);
        assert!(context.snapshot().is_admin);
        assert!(context.access_token().is_none());

        context.logout();
        assert_eq!(context.snapshot(), AuthState::default());
    }
}
