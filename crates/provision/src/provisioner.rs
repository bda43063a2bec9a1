//! Provisioning step: create a scratch project and invite a standard set of
//! users into it, recording every invited address for the activation batch.

use serde_json::json;
use tracing::{info, warn};

use inviteflow_core::fixture::EmailFixture;
use inviteflow_core::types::{InvitedAccount, Role};
use inviteflow_core::FlowError;

use crate::api::ApiClient;
use crate::project::ProjectSpec;

pub struct Provisioner {
    api: ApiClient,
    email_domain: String,
    environment: String,
    /// Per-run tag embedded in generated addresses so parallel or repeated
    /// runs never reuse an address.
    run_tag: String,
    counter: u32,
    invited: Vec<InvitedAccount>,
}

impl Provisioner {
    pub fn new(api: ApiClient, email_domain: &str, environment: &str) -> Self {
        Self {
            api,
            email_domain: email_domain.to_string(),
            environment: environment.to_string(),
            run_tag: format!("{:04x}", rand::random::<u16>()),
            counter: 0,
            invited: Vec::new(),
        }
    }

    /// Generated addresses look like `r3f1admin_staging+01@srv.mailbox.example`.
    /// The plus suffix keeps them unique while landing in the same hosted
    /// inbox server.
    pub fn generate_email(&mut self, label: &str) -> String {
        self.counter += 1;
        format!(
            "{}{}_{}+{:02}@{}",
            self.run_tag, label, self.environment, self.counter, self.email_domain
        )
    }

    pub async fn create_project(
        &self,
        account_id: &str,
        spec: &ProjectSpec,
    ) -> Result<String, FlowError> {
        let path = format!("/construction/admin/v1/accounts/{}/projects", account_id);
        let body = serde_json::to_value(spec)
            .map_err(|e| FlowError::Api(format!("project body encoding failed: {}", e)))?;
        let response = self.api.post_json(&path, &body).await?;
        let id = response["id"]
            .as_str()
            .ok_or_else(|| FlowError::Api("project response carried no id".into()))?
            .to_string();
        info!(project_id = %id, name = %spec.name, "project created");
        Ok(id)
    }

    pub async fn invite_project_user(
        &mut self,
        account_id: &str,
        project_id: &str,
        role: Role,
    ) -> Result<String, FlowError> {
        let email = self.generate_email(role.as_str());
        let path = format!("/construction/admin/v1/projects/{}/users", project_id);
        let body = json!({
            "email": email,
            "products": role_products(role),
        });
        self.api.post_json(&path, &body).await?;
        info!(%email, role = %role, project_id, "project user invited");
        self.invited.push(InvitedAccount::new(
            &email,
            role,
            account_id,
            Some(project_id.to_string()),
            None,
            None,
        ));
        Ok(email)
    }

    pub async fn invite_account_admin(&mut self, account_id: &str) -> Result<String, FlowError> {
        let email = self.generate_email(Role::AccountAdmin.as_str());
        let path = format!("/bim360/admin/v1/accounts/{}/users", account_id);
        let body = json!({
            "email": email,
            "accessLevels": {
                "accountAdmin": true,
                "accountStandardsAdministrator": true,
            },
        });
        self.api.post_json(&path, &body).await?;
        info!(%email, account_id, "account admin invited");
        self.invited.push(InvitedAccount::new(
            &email,
            Role::AccountAdmin,
            account_id,
            None,
            None,
            None,
        ));
        Ok(email)
    }

    /// The standard pre-test population: one scratch project holding a
    /// project admin, executive and member, an account admin on the primary
    /// account, and optionally one more on a secondary account.
    pub async fn provision_standard_set(
        &mut self,
        account_id: &str,
        second_account_id: Option<&str>,
    ) -> Result<(), FlowError> {
        let spec = ProjectSpec::generated("E2E-");
        let project_id = self.create_project(account_id, &spec).await?;

        for role in [
            Role::ProjectAdmin,
            Role::ProjectExecutive,
            Role::ProjectUser,
            Role::OversheetAdmin,
        ] {
            self.invite_project_user(account_id, &project_id, role)
                .await?;
        }
        self.invite_account_admin(account_id).await?;

        match second_account_id {
            Some(second) => {
                self.invite_account_admin(second).await?;
            }
            None => warn!("no secondary account configured, skipping second admin invite"),
        }
        Ok(())
    }

    pub fn invited(&self) -> &[InvitedAccount] {
        &self.invited
    }

    /// Hand the invited set over as the activation fixture, in invite order.
    pub fn into_fixture(self) -> EmailFixture {
        EmailFixture::new(self.invited)
    }
}

/// Product access granted with a project invitation, per role.
fn role_products(role: Role) -> serde_json::Value {
    match role {
        Role::ProjectAdmin => json!([
            { "key": "projectAdministration", "access": "administrator" },
        ]),
        Role::ProjectExecutive => json!([
            { "key": "projectAdministration", "access": "administrator" },
            { "key": "insight", "access": "member" },
        ]),
        Role::OversheetAdmin => json!([
            { "key": "docs", "access": "administrator" },
        ]),
        _ => json!([
            { "key": "docs", "access": "member" },
        ]),
    }
}
