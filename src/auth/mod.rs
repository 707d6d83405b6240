// akeno-admin/src/auth/mod.rs
//! Auth session gateway: sign-in/out, session restore and refresh, access
//! tokens for outbound calls, and the admin check.

pub mod identity;
pub mod policy;
pub mod store;

pub use identity::IdentityClient;
pub use policy::AdminPolicy;
pub use store::{FileSessionStore, MemorySessionStore, SessionStore};

use crate::config::AppConfig;
use crate::models::{AuthEvent, ClientError, Session};
use crate::utils::now_epoch;
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

type AuthCallback = dyn Fn(AuthEvent, Option<&Session>) + Send + Sync;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    callbacks: HashMap<u64, Arc<AuthCallback>>,
}

/// Handle returned by [`AuthGateway::on_auth_state_change`]. Dropping it
/// unregisters the listener.
pub struct AuthSubscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl AuthSubscription {
    pub fn unsubscribe(self) {}
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            if let Ok(mut listeners) = listeners.lock() {
                listeners.callbacks.remove(&self.id);
            }
        }
    }
}

pub struct AuthGateway {
    identity: IdentityClient,
    store: Box<dyn SessionStore>,
    policy: AdminPolicy,
    refresh_window_secs: i64,
    current: Mutex<Option<Session>>,
    // Serializes refreshes so a rotated refresh token is only spent once
    refresh_lock: tokio::sync::Mutex<()>,
    listeners: Arc<Mutex<Listeners>>,
}

impl AuthGateway {
    pub fn new(
        identity: IdentityClient,
        store: Box<dyn SessionStore>,
        policy: AdminPolicy,
        refresh_window_secs: i64,
    ) -> Self {
        // Restore whatever the store kept from a previous run
        let restored = store.load();
        if let Some(session) = &restored {
            info!("🔁 Restored session for {:?}", session.email());
        }

        Self {
            identity,
            store,
            policy,
            refresh_window_secs,
            current: Mutex::new(restored),
            refresh_lock: tokio::sync::Mutex::new(()),
            listeners: Arc::new(Mutex::new(Listeners::default())),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        let identity = IdentityClient::new(
            &config.identity_url,
            &config.identity_anon_key,
            config.request_timeout,
        )?;
        Ok(Self::new(
            identity,
            Box::new(FileSessionStore::new(&config.session_file)),
            AdminPolicy::new(&config.admin_emails),
            config.refresh_window_secs,
        ))
    }

    pub fn policy(&self) -> &AdminPolicy {
        &self.policy
    }

    // Session as currently held, with no expiry handling
    pub fn peek_session(&self) -> Option<Session> {
        self.current.lock().ok().and_then(|guard| guard.clone())
    }

    fn set_session(&self, session: Option<Session>) {
        match self.current.lock() {
            Ok(mut guard) => *guard = session.clone(),
            Err(e) => error!("❌ Session lock poisoned: {:?}", e),
        }

        let persisted = match &session {
            Some(session) => self.store.save(session),
            None => self.store.clear(),
        };
        if let Err(e) = persisted {
            error!("❌ Failed to persist session state: {:?}", e);
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        info!("🔑 Sign-in request for email: {}", email);

        let session = self.identity.password_grant(email, password).await.map_err(|e| {
            error!("❌ Sign-in failed for {}: {}", email, e);
            e
        })?;

        self.set_session(Some(session.clone()));
        info!("✅ Signed in: {:?}", session.email());
        self.emit(AuthEvent::SignedIn, Some(&session));
        Ok(session)
    }

    /// Clears local state first; a provider failure is reported but the
    /// session is already gone locally. Signing out twice is a no-op.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let previous = self.current.lock().ok().and_then(|mut guard| guard.take());
        if let Err(e) = self.store.clear() {
            error!("❌ Failed to clear stored session: {:?}", e);
        }

        let Some(previous) = previous else {
            return Ok(());
        };

        info!("👋 Signing out {:?}", previous.email());
        let result = self.identity.logout(&previous.access_token).await;
        if let Err(e) = &result {
            warn!("⚠️ Provider sign-out failed, local session cleared anyway: {}", e);
        }
        self.emit(AuthEvent::SignedOut, None);
        result
    }

    /// Current session, refreshed once if it has expired. `None` is the normal
    /// answer when nobody is signed in or the refresh fails.
    pub async fn get_session(&self) -> Option<Session> {
        let session = self.peek_session()?;
        if !session.is_expired_at(now_epoch()) {
            return Some(session);
        }

        match self.refresh(&session).await {
            Ok(fresh) => Some(fresh),
            Err(e) => {
                warn!("⚠️ Expired session could not be refreshed: {}", e);
                self.drop_expired(&session);
                None
            }
        }
    }

    pub async fn is_admin(&self) -> bool {
        let session = self.get_session().await;
        self.policy.permits_session(session.as_ref())
    }

    /// Bearer token for outbound calls. Refreshes ahead of expiry; a token
    /// that has not expired yet is still returned when the refresh fails.
    pub async fn get_access_token(&self) -> Option<String> {
        let session = self.peek_session()?;
        let now = now_epoch();
        if !session.expires_within(now, self.refresh_window_secs) {
            return Some(session.access_token);
        }

        match self.refresh(&session).await {
            Ok(fresh) => Some(fresh.access_token),
            Err(e) if session.is_expired_at(now_epoch()) => {
                warn!("⚠️ Session expired and refresh failed: {}", e);
                self.drop_expired(&session);
                None
            }
            Err(e) => {
                warn!("⚠️ Token refresh failed, using current token until expiry: {}", e);
                Some(session.access_token)
            }
        }
    }

    // Pure expiry check, never refreshes
    pub fn is_session_valid(&self) -> bool {
        self.peek_session()
            .map_or(false, |session| !session.is_expired_at(now_epoch()))
    }

    async fn refresh(&self, stale: &Session) -> Result<Session, ClientError> {
        let _guard = self.refresh_lock.lock().await;

        // Signed out, or refreshed by someone else, while we waited
        match self.peek_session() {
            None => return Err(ClientError::SessionExpired),
            Some(current)
                if current.access_token != stale.access_token
                    && !current.expires_within(now_epoch(), self.refresh_window_secs) =>
            {
                return Ok(current);
            }
            Some(_) => {}
        }

        let refresh_token = stale
            .refresh_token
            .as_deref()
            .ok_or(ClientError::SessionExpired)?;
        let fresh = self.identity.refresh_grant(refresh_token).await?;

        self.set_session(Some(fresh.clone()));
        info!("🔄 Token refreshed for {:?}", fresh.email());
        self.emit(AuthEvent::TokenRefreshed, Some(&fresh));
        Ok(fresh)
    }

    // Forget a session whose refresh failed, unless it was replaced meanwhile
    fn drop_expired(&self, stale: &Session) {
        let still_current = self
            .peek_session()
            .map_or(false, |current| current.access_token == stale.access_token);
        if still_current {
            self.set_session(None);
            self.emit(AuthEvent::SignedOut, None);
        }
    }

    /// Registers `callback` for auth events. It is called right away with
    /// `InitialSession` and the stored session, if any.
    pub fn on_auth_state_change<F>(&self, callback: F) -> AuthSubscription
    where
        F: Fn(AuthEvent, Option<&Session>) + Send + Sync + 'static,
    {
        let callback: Arc<AuthCallback> = Arc::new(callback);
        let id = match self.listeners.lock() {
            Ok(mut listeners) => {
                let id = listeners.next_id;
                listeners.next_id += 1;
                listeners.callbacks.insert(id, callback.clone());
                id
            }
            Err(e) => {
                error!("❌ Listener registry poisoned: {:?}", e);
                u64::MAX
            }
        };

        let initial = self.peek_session();
        callback(AuthEvent::InitialSession, initial.as_ref());

        AuthSubscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().map_or(0, |l| l.callbacks.len())
    }

    fn emit(&self, event: AuthEvent, session: Option<&Session>) {
        let callbacks: Vec<Arc<AuthCallback>> = match self.listeners.lock() {
            Ok(listeners) => listeners.callbacks.values().cloned().collect(),
            Err(_) => return,
        };
        for callback in callbacks {
            callback(event, session);
        }
    }
}
