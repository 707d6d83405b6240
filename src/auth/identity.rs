// akeno-admin/src/auth/identity.rs
//
// REST calls against the hosted identity provider (GoTrue-compatible API).

use crate::models::{ClientError, Session, SessionUser};
use crate::utils::{jwt, now_epoch};
use log::debug;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: WireUser,
}

#[derive(Deserialize, Debug)]
struct WireUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<Value>,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| now_epoch() + secs))
            .or_else(|| jwt::expiry_from_token(&self.access_token));

        let full_name = self
            .user
            .user_metadata
            .as_ref()
            .and_then(|meta| meta.get("full_name"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: SessionUser {
                id: self.user.id,
                email: self.user.email,
                full_name,
            },
        }
    }
}

pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl IdentityClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    // Email/password sign-in
    pub async fn password_grant(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        debug!("Requesting password grant for {}", email);
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    pub async fn refresh_grant(&self, refresh_token: &str) -> Result<Session, ClientError> {
        debug!("Requesting refresh grant");
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, ClientError> {
        let resp = self
            .http
            .post(self.auth_url("/token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::error_from_body(status, &body));
        }

        let token: TokenResponse = resp.json().await?;
        Ok(token.into_session())
    }

    // Revoke the session with the provider
    pub async fn logout(&self, access_token: &str) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(self.auth_url("/logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = resp.status();
        // An already revoked token is as good as signed out
        if status.is_success() || status == StatusCode::UNAUTHORIZED || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Self::error_from_body(status, &body))
    }

    fn error_from_body(status: StatusCode, body: &str) -> ClientError {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|value| {
                ["error_description", "msg", "message", "error"]
                    .iter()
                    .find_map(|key| value.get(*key).and_then(Value::as_str))
            })
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

        match status {
            StatusCode::BAD_REQUEST
            | StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::UNPROCESSABLE_ENTITY => ClientError::Auth(message),
            _ => ClientError::backend(Some(status.as_u16()), message),
        }
    }
}
