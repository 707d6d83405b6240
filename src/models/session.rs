// akeno-admin/src/models/session.rs
use serde::{Deserialize, Serialize};

// Identity-provider token bundle, as persisted by the session store
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    // Epoch seconds; absent means the provider did not say
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl Session {
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at <= now)
    }

    pub fn expires_within(&self, now: i64, window_secs: i64) -> bool {
        self.expires_at
            .map_or(false, |expires_at| expires_at - now <= window_secs)
    }

    pub fn email(&self) -> Option<&str> {
        self.user.email.as_deref()
    }

    // Full name, else the local part of the email, else "Admin"
    pub fn display_name(&self) -> String {
        if let Some(name) = self.user.full_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        self.user
            .email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("Admin")
            .to_string()
    }
}

// Events pushed to auth-state listeners
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

// Identity of a signed-in administrator, as shown by the dashboard header
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AdminIdentity {
    pub name: String,
    pub email: String,
}

impl AdminIdentity {
    pub fn from_session(session: &Session) -> Self {
        Self {
            name: session.display_name(),
            email: session.email().unwrap_or_default().to_string(),
        }
    }
}
