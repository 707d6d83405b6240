// akeno-admin/src/client/team.rs
//
// The backend has no update for team members, only add and remove-by-email.
// `update` runs remove then add and puts the original record back when the
// add fails, so an edit never silently loses a member.

use crate::client::ApiClient;
use crate::models::{ClientError, TeamMember};
use log::{error, info, warn};
use std::sync::Arc;

pub struct TeamService {
    api: Arc<ApiClient>,
}

impl TeamService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<TeamMember>, ClientError> {
        self.api.list_team().await
    }

    // Add a member; an email already on the team is refused
    pub async fn add(&self, member: &TeamMember) -> Result<(), ClientError> {
        member.validate()?;

        let current = self.list().await?;
        if current.iter().any(|m| m.same_email(&member.email)) {
            warn!("⚠️ Team member already exists: {}", member.email);
            return Err(ClientError::Conflict(format!(
                "A team member with email {} already exists",
                member.email
            )));
        }

        self.api.add_team_member(member).await?;
        info!("✅ Team member added: {}", member.email);
        Ok(())
    }

    pub async fn remove(&self, email: &str) -> Result<(), ClientError> {
        self.api.remove_team_member(email).await?;
        info!("🗑️ Team member removed: {}", email);
        Ok(())
    }

    pub async fn update(&self, original_email: &str, member: &TeamMember) -> Result<(), ClientError> {
        member.validate()?;

        let current = self.list().await?;
        let original = current
            .iter()
            .find(|m| m.same_email(original_email))
            .cloned()
            .ok_or_else(|| {
                ClientError::backend(Some(404), format!("Team member {} not found", original_email))
            })?;

        let email_changed = !member.same_email(original_email);
        if email_changed && current.iter().any(|m| m.same_email(&member.email)) {
            return Err(ClientError::Conflict(format!(
                "A team member with email {} already exists",
                member.email
            )));
        }

        if &original == member {
            return Ok(());
        }

        info!("🔄 Updating team member {} -> {}", original_email, member.email);
        self.api.remove_team_member(&original.email).await?;

        let add_err = match self.api.add_team_member(member).await {
            Ok(()) => {
                info!("✅ Team member updated: {}", member.email);
                return Ok(());
            }
            Err(e) => e,
        };

        warn!("⚠️ Adding updated member failed ({}), restoring {}", add_err, original.email);
        match self.api.add_team_member(&original).await {
            Ok(()) => Err(add_err),
            Err(restore_err) => {
                error!(
                    "❌ Team member {} was removed and could not be restored: {}",
                    original.email, restore_err
                );
                Err(ClientError::backend(
                    None,
                    format!(
                        "Update failed ({}) and restoring the original record failed ({}); \
                         re-add {} <{}> manually",
                        add_err, restore_err, original.name, original.email
                    ),
                ))
            }
        }
    }
}
