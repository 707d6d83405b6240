// akeno-admin/src/client/mod.rs
//! Authenticated client for the consultation and admin backends.
//!
//! The backends signal success differently per endpoint (`status: "success"`
//! on listings, `success: true` on mutations); each call checks the marker its
//! endpoint actually returns.

pub mod team;

pub use team::TeamService;

use crate::auth::AuthGateway;
use crate::config::AppConfig;
use crate::models::{
    AvailableSlot, ClientError, ConsultationForm, ConsultationLogEntry, ConsultationRecord,
    ConsultationStatus, TeamMember,
};
use chrono::Utc;
use log::debug;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA};
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub struct ApiClient {
    http: reqwest::Client,
    consultation_base: String,
    admin_base: String,
    gateway: Arc<AuthGateway>,
}

impl ApiClient {
    pub fn new(config: &AppConfig, gateway: Arc<AuthGateway>) -> Result<Self, ClientError> {
        Self::with_bases(
            &config.consultation_api,
            &config.admin_api,
            config.request_timeout,
            gateway,
        )
    }

    pub fn with_bases(
        consultation_base: &str,
        admin_base: &str,
        timeout: Duration,
        gateway: Arc<AuthGateway>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            consultation_base: consultation_base.trim_end_matches('/').to_string(),
            admin_base: admin_base.trim_end_matches('/').to_string(),
            gateway,
        })
    }

    // Base URL plus path segments, each segment percent-encoded
    pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(base)
            .map_err(|e| ClientError::Network(format!("Invalid backend URL {:?}: {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Network(format!("Backend URL {:?} cannot take a path", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn cache_buster() -> String {
        Utc::now().timestamp_millis().to_string()
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(PRAGMA, "no-cache")
            .header(EXPIRES, "0");

        match self.gateway.get_access_token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_json(builder: RequestBuilder) -> Result<Value, ClientError> {
        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| message_of(&v))
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            return Err(ClientError::backend(Some(status.as_u16()), message));
        }

        serde_json::from_str(&body).map_err(|e| {
            ClientError::backend(Some(status.as_u16()), format!("Malformed response: {}", e))
        })
    }

    // Listing endpoints answer with {"status": "success", ...}
    fn require_status_success(body: &Value, failure: &str) -> Result<(), ClientError> {
        if body.get("status").and_then(Value::as_str) == Some("success") {
            Ok(())
        } else {
            Err(ClientError::backend(None, message_of(body).unwrap_or_else(|| failure.to_string())))
        }
    }

    // Mutation endpoints answer with {"success": true, ...}
    fn require_success_flag(body: &Value, failure: &str) -> Result<(), ClientError> {
        if body.get("success").and_then(Value::as_bool) == Some(true) {
            Ok(())
        } else {
            Err(ClientError::backend(None, message_of(body).unwrap_or_else(|| failure.to_string())))
        }
    }

    // A missing or null list field reads as empty
    fn list_field<T: DeserializeOwned>(body: &Value, key: &str) -> Result<Vec<T>, ClientError> {
        match body.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                ClientError::backend(None, format!("Malformed '{}' in response: {}", key, e))
            }),
        }
    }

    // =========================================================================
    // Consultations
    // =========================================================================

    pub async fn list_consultations(&self) -> Result<Vec<ConsultationRecord>, ClientError> {
        let mut url = Self::endpoint(&self.consultation_base, &["consultation", "all"])?;
        url.query_pairs_mut().append_pair("t", &Self::cache_buster());

        let body = Self::send_json(self.request(Method::GET, url).await).await?;
        Self::require_status_success(&body, "Failed to load consultations")?;
        let records: Vec<ConsultationRecord> = Self::list_field(&body, "requests")?;
        debug!("Fetched {} consultations", records.len());
        Ok(records)
    }

    pub async fn update_status(
        &self,
        id: &str,
        status: ConsultationStatus,
    ) -> Result<(), ClientError> {
        let mut url = Self::endpoint(
            &self.consultation_base,
            &["consultation", "update-status", id],
        )?;
        url.query_pairs_mut().append_pair("status", status.as_str());

        let body = Self::send_json(self.request(Method::PUT, url).await).await?;
        Self::require_success_flag(&body, "Failed to update consultation status")
    }

    pub async fn delete_consultation(&self, id: &str) -> Result<(), ClientError> {
        let url = Self::endpoint(&self.consultation_base, &["consultation", "delete", id])?;
        let body = Self::send_json(self.request(Method::DELETE, url).await).await?;
        Self::require_success_flag(&body, "Failed to delete consultation")
    }

    pub async fn available_slots(&self) -> Result<Vec<AvailableSlot>, ClientError> {
        let url = Self::endpoint(
            &self.consultation_base,
            &["consultation", "available-slots"],
        )?;
        let body = Self::send_json(self.request(Method::GET, url).await).await?;
        Self::require_success_flag(&body, "Failed to load available time slots")?;
        Self::list_field(&body, "available_slots")
    }

    pub async fn schedule(&self, form: &ConsultationForm) -> Result<(), ClientError> {
        let url = Self::endpoint(&self.consultation_base, &["consultation", "schedule"])?;
        let builder = self.request(Method::POST, url).await.json(form);
        let body = Self::send_json(builder).await?;
        Self::require_success_flag(&body, "Failed to schedule consultation")
    }

    // =========================================================================
    // Admin: logs and team
    // =========================================================================

    pub async fn recent_logs(&self, hours: u32) -> Result<Vec<ConsultationLogEntry>, ClientError> {
        let mut url = Self::endpoint(&self.admin_base, &["admin", "logs", "recent"])?;
        url.query_pairs_mut()
            .append_pair("hours", &hours.to_string())
            .append_pair("t", &Self::cache_buster());

        let body = Self::send_json(self.request(Method::GET, url).await).await?;
        Self::require_status_success(&body, "Failed to load consultation logs")?;
        Self::list_field(&body, "logs")
    }

    // Any 2xx counts; the endpoint's body carries nothing we use
    pub async fn clear_all_logs(&self) -> Result<(), ClientError> {
        let url = Self::endpoint(&self.admin_base, &["admin", "clear-all-logs"])?;
        let resp = self.request(Method::POST, url).await.send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::backend(
                Some(status.as_u16()),
                format!("HTTP error! status: {}", status.as_u16()),
            ))
        }
    }

    pub async fn list_team(&self) -> Result<Vec<TeamMember>, ClientError> {
        let url = Self::endpoint(&self.admin_base, &["admin", "team"])?;
        let body = Self::send_json(self.request(Method::GET, url).await).await?;
        Self::require_status_success(&body, "Failed to load team members")?;
        Self::list_field(&body, "team_members")
    }

    pub async fn add_team_member(&self, member: &TeamMember) -> Result<(), ClientError> {
        let mut url = Self::endpoint(&self.admin_base, &["admin", "team", "add"])?;
        url.query_pairs_mut()
            .append_pair("name", &member.name)
            .append_pair("email", &member.email)
            .append_pair("role", &member.role)
            .append_pair("phone", &member.phone);

        let body = Self::send_json(self.request(Method::POST, url).await).await?;
        Self::require_success_flag(&body, "Failed to add team member")
    }

    pub async fn remove_team_member(&self, email: &str) -> Result<(), ClientError> {
        let url = Self::endpoint(&self.admin_base, &["admin", "team", "remove", email])?;
        let body = Self::send_json(self.request(Method::DELETE, url).await).await?;
        Self::require_success_flag(&body, "Failed to remove team member")
    }
}

fn message_of(body: &Value) -> Option<String> {
    ["message", "detail", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}
