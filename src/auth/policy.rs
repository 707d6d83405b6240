// akeno-admin/src/auth/policy.rs
use crate::models::Session;
use log::debug;
use std::collections::HashSet;

/// The one authorization rule of the dashboard: a signed-in identity may
/// administer the system iff its normalized email is on the allow-list.
#[derive(Debug, Clone)]
pub struct AdminPolicy {
    allowed: HashSet<String>,
}

impl AdminPolicy {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed = emails
            .into_iter()
            .map(|email| Self::normalize(email.as_ref()))
            .filter(|email| !email.is_empty())
            .collect();
        Self { allowed }
    }

    pub fn normalize(email: &str) -> String {
        email.trim().to_lowercase()
    }

    pub fn permits(&self, email: &str) -> bool {
        let normalized = Self::normalize(email);
        let permitted = !normalized.is_empty() && self.allowed.contains(&normalized);
        debug!("🛡️ Admin check for {:?}: {}", normalized, permitted);
        permitted
    }

    /// False when there is no session or the session carries no email.
    pub fn permits_session(&self, session: Option<&Session>) -> bool {
        session
            .and_then(|session| session.email())
            .map_or(false, |email| self.permits(email))
    }
}
