use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role a user was invited under. Serialized snake_case to match the
/// `userType` values the provisioning step writes into the fixture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    ProjectAdmin,
    AccountAdmin,
    ProjectExecutive,
    ProjectUser,
    OversheetAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ProjectAdmin => "project_admin",
            Role::AccountAdmin => "account_admin",
            Role::ProjectExecutive => "project_executive",
            Role::ProjectUser => "project_user",
            Role::OversheetAdmin => "oversheet_admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One invited user awaiting activation. Produced by provisioning, consumed
/// read-only by the activation flow. Email uniqueness is NOT enforced:
/// duplicates in a batch are processed independently, each producing its
/// own outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitedAccount {
    pub email: String,
    #[serde(rename = "userType")]
    pub role: Role,
    pub account_id: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub invited_at: DateTime<Utc>,
}

impl InvitedAccount {
    pub fn new(
        email: impl Into<String>,
        role: Role,
        account_id: impl Into<String>,
        project_id: Option<String>,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Self {
        Self {
            email: email.into(),
            role,
            account_id: account_id.into(),
            project_id,
            first_name,
            last_name,
            invited_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_snake_case() {
        let v = serde_json::to_string(&Role::AccountAdmin).unwrap();
        assert_eq!(v, "\"account_admin\"");

        let r: Role = serde_json::from_str("\"project_executive\"").unwrap();
        assert_eq!(r, Role::ProjectExecutive);
    }

    #[test]
    fn invited_account_uses_fixture_field_names() {
        let account = InvitedAccount::new(
            "a@x.test",
            Role::ProjectAdmin,
            "acct-1",
            Some("proj-1".to_string()),
            Some("APMA".to_string()),
            Some("User".to_string()),
        );

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["email"], "a@x.test");
        assert_eq!(json["userType"], "project_admin");
        assert_eq!(json["accountId"], "acct-1");
        assert_eq!(json["projectId"], "proj-1");
        assert_eq!(json["firstName"], "APMA");
        assert!(json["invitedAt"].is_string());
    }
}
