use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::FlowError;
use crate::types::{InvitedAccount, Role};

/// The handoff artifact between provisioning and activation: every email
/// invited in a run, in insertion order, plus a per-role summary.
///
/// Duplicate emails are kept as-is. The batch deliberately tolerates them
/// (each entry is activated independently); whether re-invitation of the
/// same address is intended test coverage or a latent bug upstream is an
/// open product question, so the tolerant behavior is preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailFixture {
    pub generated_at: DateTime<Utc>,
    pub total_emails: usize,
    pub emails: Vec<InvitedAccount>,
    pub summary: BTreeMap<Role, u32>,
}

impl EmailFixture {
    pub fn new(emails: Vec<InvitedAccount>) -> Self {
        let mut summary = BTreeMap::new();
        for account in &emails {
            *summary.entry(account.role).or_insert(0) += 1;
        }
        Self {
            generated_at: Utc::now(),
            total_emails: emails.len(),
            emails,
            summary,
        }
    }

    /// Load the fixture, failing fast when the file is missing, unreadable,
    /// or holds no invited emails. Activation requires provisioned data.
    pub fn load(path: &Path) -> Result<Self, FlowError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            FlowError::Fixture(format!("cannot read {}: {}", path.display(), e))
        })?;
        let fixture: EmailFixture = serde_json::from_str(&raw).map_err(|e| {
            FlowError::Fixture(format!("cannot parse {}: {}", path.display(), e))
        })?;
        if fixture.emails.is_empty() {
            return Err(FlowError::Fixture(format!(
                "{} contains no invited emails",
                path.display()
            )));
        }
        info!(
            path = %path.display(),
            total = fixture.emails.len(),
            "loaded invited-emails fixture"
        );
        Ok(fixture)
    }

    pub fn save(&self, path: &Path) -> Result<(), FlowError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                FlowError::Fixture(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| FlowError::Fixture(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| {
            FlowError::Fixture(format!("cannot write {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), total = self.total_emails, "saved invited-emails fixture");
        Ok(())
    }

    /// Plain-text sibling of the fixture: one email address per line.
    pub fn save_address_list(&self, path: &Path) -> Result<(), FlowError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                FlowError::Fixture(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }
        let list = self
            .emails
            .iter()
            .map(|a| a.email.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        std::fs::write(path, list).map_err(|e| {
            FlowError::Fixture(format!("cannot write {}: {}", path.display(), e))
        })
    }
}
