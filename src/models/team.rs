use serde::{Deserialize, Serialize};

// Notification team member; email is the identifying key on the backend
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TeamMember {
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub phone: String,
}

impl TeamMember {
    pub fn same_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }

    pub fn validate(&self) -> Result<(), crate::models::ClientError> {
        use crate::models::ClientError;

        if self.name.trim().is_empty() {
            return Err(ClientError::validation("name", "Name is required"));
        }
        if self.email.trim().is_empty() {
            return Err(ClientError::validation("email", "Email is required"));
        }
        if self.role.trim().is_empty() {
            return Err(ClientError::validation("role", "Role is required"));
        }
        Ok(())
    }
}
