use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use inviteflow_activation::executor::{FlowConfig, FlowExecutor};
use inviteflow_activation::{BatchRunner, ChromeSession};
use inviteflow_core::config::AppConfig;
use inviteflow_core::fixture::EmailFixture;
use inviteflow_mailbox::{HostedMailbox, InboxPoller};
use inviteflow_provision::{ApiClient, Provisioner};

pub async fn run_provision(config: &AppConfig, account: Option<String>) -> Result<()> {
    let mut api = ApiClient::new(&config.api, &config.environment)?;
    api.authenticate().await?;

    let account_id = account.unwrap_or_else(|| config.api.account_id.clone());
    let mut provisioner = Provisioner::new(
        api,
        &config.mailbox.email_domain,
        &config.environment.name,
    );
    provisioner
        .provision_standard_set(&account_id, config.api.second_account_id.as_deref())
        .await?;

    let fixture = provisioner.into_fixture();
    let path = config.activation.fixture_path(&config.environment.name);
    fixture.save(&path)?;
    fixture.save_address_list(&path.with_extension("txt"))?;
    info!(total = fixture.total_emails, path = %path.display(), "provisioning complete");
    Ok(())
}

pub async fn run_activate(
    config: &AppConfig,
    fixture: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let fixture = load_fixture(config, fixture)?;
    let cap = limit
        .unwrap_or(config.activation.max_accounts)
        .min(fixture.emails.len());
    let accounts = &fixture.emails[..cap];
    info!(
        selected = accounts.len(),
        available = fixture.emails.len(),
        "starting activation batch"
    );

    let report = batch_runner(config)?.process_all(accounts).await;
    if report.failed > 0 {
        bail!(
            "{} of {} accounts failed activation",
            report.failed,
            report.processed
        );
    }
    Ok(())
}

pub async fn run_single(config: &AppConfig, fixture: Option<String>) -> Result<()> {
    let fixture = load_fixture(config, fixture)?;
    let accounts = &fixture.emails[..1];
    info!(email = %accounts[0].email, "activating single account");

    let report = batch_runner(config)?.process_all(accounts).await;
    if report.failed > 0 {
        bail!("activation failed: {}", report.outcomes[0].reason);
    }
    Ok(())
}

pub async fn run_purge(config: &AppConfig) -> Result<()> {
    poller(config)?.purge().await?;
    info!("mailbox purged");
    Ok(())
}

fn load_fixture(config: &AppConfig, path_override: Option<String>) -> Result<EmailFixture> {
    let path = path_override
        .map(PathBuf::from)
        .unwrap_or_else(|| config.activation.fixture_path(&config.environment.name));
    EmailFixture::load(&path)
        .with_context(|| "provisioning must run before activation".to_string())
}

fn poller(config: &AppConfig) -> Result<InboxPoller> {
    let store = HostedMailbox::new(&config.mailbox)?;
    Ok(InboxPoller::new(
        Arc::new(store),
        Duration::from_millis(config.mailbox.poll_interval_ms),
    ))
}

fn batch_runner(config: &AppConfig) -> Result<BatchRunner> {
    let session = Arc::new(ChromeSession::launch(&config.browser)?);
    let executor = FlowExecutor::new(
        session.clone(),
        poller(config)?,
        FlowConfig::from_app(config),
    );
    Ok(BatchRunner::new(session, executor))
}
