//! Drives one invited account through registration: wait for the invitation
//! email, open the link, classify the page, fill whichever form generation
//! showed up, and handle an optional one-time-passcode challenge.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use inviteflow_core::config::AppConfig;
use inviteflow_core::types::InvitedAccount;
use inviteflow_core::wait::wait_until;
use inviteflow_core::FlowError;
use inviteflow_mailbox::InboxPoller;

use crate::classifier::{classify, PageVariant};
use crate::dom;
use crate::names;
use crate::page::PageDriver;

const EMAIL_FIELD: &str = "input[name='email'], input[type='email']";
const PASSWORD_FIELD: &str = "input[type='password'], input[name='password']";
const FIRST_NAME_FIELD: &str = "input[name='firstName'], input[name='first_name']";
const LAST_NAME_FIELD: &str = "input[name='lastName'], input[name='last_name']";

const LEGACY_FIRST_NAME: &str = "input[name='FirstName']";
const LEGACY_LAST_NAME: &str = "input[name='LastName']";
const LEGACY_EMAIL: &str = "input[name='Email']";
const LEGACY_CONFIRM_EMAIL: &str = "input[name='ConfirmEmail']";
const LEGACY_PASSWORD: &str = "input[name='Password']";
const LEGACY_TERMS: &str = "#privacypolicy_checkbox";

const CONTINUE_LABELS: &[&str] = &["Continue", "Next", "Proceed"];
const VERIFY_LABELS: &[&str] = &["Continue", "Verify"];

/// Milestones of a single account's flow, recorded in the order reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Landed,
    Classified,
    FieldsFilled,
    Submitted,
    ContinueChecked,
    PasscodeChallenged,
    Completed,
    Failed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::Landed => "landed",
            FlowState::Classified => "classified",
            FlowState::FieldsFilled => "fields_filled",
            FlowState::Submitted => "submitted",
            FlowState::ContinueChecked => "continue_checked",
            FlowState::PasscodeChallenged => "passcode_challenged",
            FlowState::Completed => "completed",
            FlowState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Completed,
    Failed,
}

/// What happened to one account, with the state trail for diagnosis.
#[derive(Debug, Clone)]
pub struct AccountOutcome {
    pub email: String,
    pub status: OutcomeStatus,
    pub reason: String,
    pub states: Vec<FlowState>,
}

impl AccountOutcome {
    pub fn failure(email: &str, reason: impl Into<String>) -> Self {
        Self {
            email: email.to_string(),
            status: OutcomeStatus::Failed,
            reason: reason.into(),
            states: vec![FlowState::Failed],
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == OutcomeStatus::Completed
    }
}

#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub password: String,
    pub invitation_timeout: Duration,
    pub passcode_timeout: Duration,
    pub dom_wait: Duration,
    pub dom_poll: Duration,
    pub settle: Duration,
    pub screenshot_dir: Option<PathBuf>,
}

impl FlowConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            password: config.activation.password.clone(),
            invitation_timeout: Duration::from_millis(config.mailbox.invitation_timeout_ms),
            passcode_timeout: Duration::from_millis(config.mailbox.passcode_timeout_ms),
            dom_wait: Duration::from_secs(config.browser.dom_wait_seconds),
            dom_poll: Duration::from_millis(500),
            settle: Duration::from_secs(2),
            screenshot_dir: Some(PathBuf::from(&config.browser.screenshot_dir)),
        }
    }
}

/// Tracks the state trail for one account while the flow runs.
struct FlowRun {
    email: String,
    states: Vec<FlowState>,
}

impl FlowRun {
    fn new(email: &str) -> Self {
        Self {
            email: email.to_string(),
            states: Vec::new(),
        }
    }

    fn advance(&mut self, state: FlowState) {
        info!(email = %self.email, state = %state, "flow state");
        self.states.push(state);
    }

    fn completed(mut self, reason: impl Into<String>) -> AccountOutcome {
        self.advance(FlowState::Completed);
        AccountOutcome {
            email: self.email,
            status: OutcomeStatus::Completed,
            reason: reason.into(),
            states: self.states,
        }
    }

    fn failed(mut self, reason: impl Into<String>) -> AccountOutcome {
        self.advance(FlowState::Failed);
        AccountOutcome {
            email: self.email,
            status: OutcomeStatus::Failed,
            reason: reason.into(),
            states: self.states,
        }
    }
}

pub struct FlowExecutor {
    driver: Arc<dyn PageDriver>,
    poller: InboxPoller,
    config: FlowConfig,
}

impl FlowExecutor {
    pub fn new(driver: Arc<dyn PageDriver>, poller: InboxPoller, config: FlowConfig) -> Self {
        Self {
            driver,
            poller,
            config,
        }
    }

    /// Run the full flow for one account. `Err` means an infrastructure
    /// failure (browser gone, mailbox unreachable); flow-level problems
    /// come back as a failed [`AccountOutcome`].
    pub async fn run(&self, account: &InvitedAccount) -> Result<AccountOutcome, FlowError> {
        let email = account.email.as_str();
        let mut run = FlowRun::new(email);
        info!(email, role = %account.role, "processing account");

        let invitation = match self
            .poller
            .wait_for_invitation(email, self.config.invitation_timeout)
            .await
        {
            Ok(invitation) => invitation,
            Err(e) if e.is_timeout() => return Ok(run.failed(e.to_string())),
            Err(e) => return Err(e),
        };
        let url = match invitation.invitation_url {
            Some(url) => url,
            None => return Ok(run.failed("no invitation link found in email")),
        };

        self.driver.navigate(&url).await?;
        run.advance(FlowState::Landed);
        if let (Ok(url), Ok(title)) = (self.driver.current_url().await, self.driver.title().await) {
            debug!(url, title, "landed on activation page");
        }
        self.save_screenshot(email, "landing").await;

        let html = self.driver.content().await?;
        let variant = classify(dom::PageEvidence::collect(&html));
        run.advance(FlowState::Classified);
        info!(email, variant = variant.name(), "page classified");

        match variant {
            PageVariant::TwoStepNew(_) => self.run_two_step(run, account).await,
            PageVariant::SingleStepNew(evidence) => {
                self.run_single_step(run, account, &evidence).await
            }
            PageVariant::OldForm(_) => self.run_old_form(run, account).await,
            PageVariant::AlreadyRegistered(_) => {
                info!(email, "address already holds an active account");
                Ok(run.completed("skipped - already active"))
            }
            PageVariant::Unknown(evidence) => {
                self.save_screenshot(email, "unknown-variant").await;
                warn!(email, ?evidence, "unrecognized activation page");
                Ok(run.failed("unknown page variant, no fields recognized"))
            }
        }
    }

    /// Email and terms first, then a second screen asking for the password.
    async fn run_two_step(
        &self,
        mut run: FlowRun,
        account: &InvitedAccount,
    ) -> Result<AccountOutcome, FlowError> {
        self.driver.fill(EMAIL_FIELD, &account.email).await?;
        self.check_general_terms().await?;
        run.advance(FlowState::FieldsFilled);

        self.submit().await?;
        run.advance(FlowState::Submitted);

        if let Err(e) = self.wait_for_password_field().await {
            if e.is_timeout() {
                self.save_screenshot(&account.email, "no-password-step").await;
                return Ok(run.failed(e.to_string()));
            }
            return Err(e);
        }
        self.driver.fill(PASSWORD_FIELD, &self.config.password).await?;
        self.submit().await?;

        self.continue_and_passcode(run, account, true).await
    }

    /// Everything on one screen.
    async fn run_single_step(
        &self,
        mut run: FlowRun,
        account: &InvitedAccount,
        evidence: &dom::PageEvidence,
    ) -> Result<AccountOutcome, FlowError> {
        if evidence.has_first_name_input {
            let first = names::display_name(account.first_name.as_deref(), "Test");
            self.driver.fill(FIRST_NAME_FIELD, &first).await?;
        }
        if evidence.has_last_name_input {
            let last = names::display_name(account.last_name.as_deref(), "User");
            self.driver.fill(LAST_NAME_FIELD, &last).await?;
        }
        self.driver.fill(PASSWORD_FIELD, &self.config.password).await?;
        self.check_general_terms().await?;
        run.advance(FlowState::FieldsFilled);

        self.submit().await?;
        run.advance(FlowState::Submitted);

        self.continue_and_passcode(run, account, true).await
    }

    /// The pre-redesign form with capitalized field names and a fixed
    /// privacy-policy checkbox id.
    async fn run_old_form(
        &self,
        mut run: FlowRun,
        account: &InvitedAccount,
    ) -> Result<AccountOutcome, FlowError> {
        let first = names::display_name(account.first_name.as_deref(), "Test");
        let last = names::display_name(account.last_name.as_deref(), "User");
        self.driver.fill(LEGACY_FIRST_NAME, &first).await?;
        self.driver.fill(LEGACY_LAST_NAME, &last).await?;
        self.driver.fill(LEGACY_EMAIL, &account.email).await?;
        self.driver.fill(LEGACY_CONFIRM_EMAIL, &account.email).await?;
        self.driver.fill(LEGACY_PASSWORD, &self.config.password).await?;
        if let Err(e) = self.driver.click(LEGACY_TERMS).await {
            warn!(error = %e, "privacy policy checkbox not found, continuing");
        }
        run.advance(FlowState::FieldsFilled);

        self.submit().await?;
        run.advance(FlowState::Submitted);

        self.continue_and_passcode(run, account, false).await
    }

    /// Post-submit tail shared by all form variants: optionally press
    /// through an interstitial continue button, then handle a passcode
    /// challenge when the page shows one.
    async fn continue_and_passcode(
        &self,
        mut run: FlowRun,
        account: &InvitedAccount,
        press_continue: bool,
    ) -> Result<AccountOutcome, FlowError> {
        if press_continue {
            run.advance(FlowState::ContinueChecked);
            if self.driver.click_button_with_text(CONTINUE_LABELS).await? {
                debug!("pressed interstitial continue");
                tokio::time::sleep(self.config.settle).await;
            }
        }

        self.save_screenshot(&account.email, "post-submit").await;
        let html = self.driver.content().await.unwrap_or_default();
        if !dom::contains_passcode_prompt(&html) {
            return Ok(run.completed("activated, no passcode required"));
        }

        run.advance(FlowState::PasscodeChallenged);
        info!(email = %account.email, "passcode challenge detected");
        match self.complete_passcode(account, &html).await? {
            None => Ok(run.completed("activated")),
            Some(warning) => {
                warn!(email = %account.email, warning, "passcode step incomplete");
                Ok(run.completed(format!("completed with warning: {}", warning)))
            }
        }
    }

    /// Fetch the emailed code and type it in. A missing code or input is a
    /// warning, not a failure; activation often completes regardless.
    async fn complete_passcode(
        &self,
        account: &InvitedAccount,
        html: &str,
    ) -> Result<Option<String>, FlowError> {
        let code = match self
            .poller
            .wait_for_passcode(&account.email, self.config.passcode_timeout)
            .await
        {
            Ok(Some(code)) => code,
            Ok(None) => return Ok(Some("passcode email held no recognizable code".into())),
            Err(e) if e.is_timeout() => return Ok(Some(e.to_string())),
            Err(e) => return Err(e),
        };

        let input = match dom::find_passcode_input(html) {
            Some(selector) => selector,
            None => return Ok(Some("no passcode input found on page".into())),
        };
        self.driver.fill(&input, &code).await?;

        if !self.driver.click_button_with_text(VERIFY_LABELS).await? {
            let html = self.driver.content().await.unwrap_or_default();
            match dom::find_submit_control(&html) {
                Some(control) => self.driver.click(&control.selector).await?,
                None => return Ok(Some("no control to confirm passcode".into())),
            }
        }
        tokio::time::sleep(self.config.settle).await;
        Ok(None)
    }

    async fn submit(&self) -> Result<(), FlowError> {
        let html = self.driver.content().await?;
        let control = dom::find_submit_control(&html)
            .ok_or_else(|| FlowError::Browser("no submit control on page".into()))?;
        debug!(selector = %control.selector, text = %control.text, "submitting form");
        self.driver.click(&control.selector).await?;
        tokio::time::sleep(self.config.settle).await;
        Ok(())
    }

    async fn check_general_terms(&self) -> Result<(), FlowError> {
        let html = self.driver.content().await?;
        let boxes = dom::checkboxes(&html);
        match dom::general_terms_checkbox_index(&boxes) {
            Some(index) => self.driver.check_checkbox(index).await,
            None => {
                warn!("no general terms checkbox to accept");
                Ok(())
            }
        }
    }

    async fn wait_for_password_field(&self) -> Result<(), FlowError> {
        let driver = &self.driver;
        wait_until(
            "password field to appear",
            self.config.dom_wait,
            self.config.dom_poll,
            || async move {
                let html = driver.content().await?;
                Ok(dom::has_password_input(&html).then_some(()))
            },
        )
        .await
    }

    async fn save_screenshot(&self, email: &str, label: &str) {
        let Some(dir) = &self.config.screenshot_dir else {
            return;
        };
        let slug: String = email
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
            .collect();
        let path = dir.join(format!("{}-{}.png", slug, label));
        if let Err(e) = self.driver.screenshot(&path).await {
            debug!(error = %e, "screenshot skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use inviteflow_core::types::Role;

    use crate::testutil::{invitation_message, passcode_message, FlowHarness, StagedPage};

    fn account(email: &str) -> InvitedAccount {
        InvitedAccount::new(email, Role::ProjectAdmin, "acct-1", None, None, None)
    }

    const SINGLE_STEP_FORM: &str = r#"
        <form>
            <input name="firstName" type="text" />
            <input name="lastName" type="text" />
            <input type="password" name="password" />
            <input type="checkbox" name="generalTerms" />
            <input type="checkbox" name="marketingTerms" />
            <button type="submit">Create account</button>
        </form>
    "#;

    const WELCOME_PAGE: &str = "<h1>Welcome to your projects</h1>";

    #[tokio::test]
    async fn single_step_flow_fills_everything_and_completes() {
        let page = Arc::new(StagedPage::new(vec![SINGLE_STEP_FORM, WELCOME_PAGE]));
        let harness = FlowHarness::new(page.clone());
        harness.store.push("a@x.test", invitation_message());

        let outcome = harness.executor().run(&account("a@x.test")).await.unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.reason, "activated, no passcode required");
        assert_eq!(
            outcome.states,
            vec![
                FlowState::Landed,
                FlowState::Classified,
                FlowState::FieldsFilled,
                FlowState::Submitted,
                FlowState::ContinueChecked,
                FlowState::Completed,
            ]
        );

        let fills = page.fills();
        assert!(fills
            .iter()
            .any(|(s, v)| s == PASSWORD_FIELD && v == "Autodesk1!"));
        assert!(fills.iter().any(|(s, v)| s == FIRST_NAME_FIELD && v == "Test"));
        // First checkbox is generalTerms, marketing stays untouched.
        assert_eq!(page.checked(), vec![0]);
        assert_eq!(page.navigations(), vec!["https://app.example.test/activate?t=abc"]);
    }

    #[tokio::test]
    async fn two_step_flow_handles_passcode_challenge() {
        let stages = vec![
            // Step one: email and terms, no password yet.
            r#"
                <input type="email" name="email" />
                <input type="checkbox" name="generalTerms" />
                <button type="submit">Continue</button>
            "#,
            // Step two: password.
            r#"
                <input type="password" name="password" />
                <button type="submit">Continue</button>
            "#,
            // Passcode challenge.
            r#"
                <p>Enter the code we sent to your email</p>
                <input type="text" name="code" />
                <button>Verify</button>
            "#,
            WELCOME_PAGE,
        ];
        let page = Arc::new(StagedPage::new(stages));
        let harness = FlowHarness::new(page.clone());
        harness.store.push("b@x.test", invitation_message());
        harness.store.push("b@x.test", passcode_message());

        let outcome = harness.executor().run(&account("b@x.test")).await.unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.reason, "activated");
        assert!(outcome.states.contains(&FlowState::PasscodeChallenged));
        let fills = page.fills();
        assert!(fills.iter().any(|(s, v)| s == EMAIL_FIELD && v == "b@x.test"));
        assert!(fills
            .iter()
            .any(|(s, v)| s == "input[name='code']" && v == "482913"));
    }

    #[tokio::test]
    async fn old_form_fills_legacy_fields() {
        let stages = vec![
            r#"
                <form>
                    <input name="FirstName" /><input name="LastName" />
                    <input name="Email" /><input name="ConfirmEmail" />
                    <input name="Password" type="password" />
                    <input type="checkbox" id="privacypolicy_checkbox" />
                    <input type="submit" id="register-submit" value="Register" />
                </form>
            "#,
            WELCOME_PAGE,
        ];
        let page = Arc::new(StagedPage::new(stages));
        let harness = FlowHarness::new(page.clone());
        harness.store.push("c@x.test", invitation_message());

        let outcome = harness.executor().run(&account("c@x.test")).await.unwrap();

        assert!(outcome.succeeded());
        let fills = page.fills();
        assert!(fills
            .iter()
            .any(|(s, v)| s == LEGACY_CONFIRM_EMAIL && v == "c@x.test"));
        assert!(page.clicks().iter().any(|s| s == LEGACY_TERMS));
        // Old form has no interstitial continue step.
        assert!(!outcome.states.contains(&FlowState::ContinueChecked));
    }

    #[tokio::test]
    async fn already_registered_page_is_skipped_without_touching_fields() {
        let page = Arc::new(StagedPage::new(vec![
            r#"<a href="/login">Sign in</a><p>Already have an account?</p>"#,
        ]));
        let harness = FlowHarness::new(page.clone());
        harness.store.push("d@x.test", invitation_message());

        let outcome = harness.executor().run(&account("d@x.test")).await.unwrap();

        assert!(outcome.succeeded());
        assert_eq!(outcome.reason, "skipped - already active");
        assert!(page.fills().is_empty());
        assert!(page.checked().is_empty());
    }

    #[tokio::test]
    async fn unknown_page_fails_the_account() {
        let page = Arc::new(StagedPage::new(vec!["<p>Something went wrong</p>"]));
        let harness = FlowHarness::new(page.clone());
        harness.store.push("e@x.test", invitation_message());

        let outcome = harness.executor().run(&account("e@x.test")).await.unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.reason.contains("unknown page variant"));
        assert_eq!(*outcome.states.last().unwrap(), FlowState::Failed);
    }

    #[tokio::test]
    async fn invitation_without_link_fails_cleanly() {
        let page = Arc::new(StagedPage::new(vec![SINGLE_STEP_FORM]));
        let harness = FlowHarness::new(page.clone());
        let mut message = invitation_message();
        message.links.clear();
        harness.store.push("f@x.test", message);

        let outcome = harness.executor().run(&account("f@x.test")).await.unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.reason.contains("no invitation link"));
        assert!(page.navigations().is_empty());
    }

    #[tokio::test]
    async fn missing_passcode_email_completes_with_warning() {
        let stages = vec![
            SINGLE_STEP_FORM,
            r#"
                <p>Enter the code we sent you</p>
                <input type="text" name="code" />
                <button>Verify</button>
            "#,
        ];
        let page = Arc::new(StagedPage::new(stages));
        let harness = FlowHarness::new(page.clone());
        harness.store.push("g@x.test", invitation_message());
        // No passcode message queued; the wait times out.

        let outcome = harness.executor().run(&account("g@x.test")).await.unwrap();

        assert!(outcome.succeeded());
        assert!(outcome.reason.starts_with("completed with warning"));
        assert!(outcome.states.contains(&FlowState::PasscodeChallenged));
    }
}
