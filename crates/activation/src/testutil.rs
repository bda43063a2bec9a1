//! In-memory stand-ins for the browser and the hosted inbox so the flow
//! state machine can be exercised without Chrome or network access.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use inviteflow_core::FlowError;
use inviteflow_mailbox::{InboxMessage, InboxPoller, MessageLink, MessageStore};

use crate::dom;
use crate::executor::{FlowConfig, FlowExecutor};
use crate::page::PageDriver;

/// A page that advances through scripted HTML stages. Clicking a submit-like
/// control or a matching labelled button moves to the next stage; navigation
/// rewinds to the first. Every interaction is recorded for assertions.
pub(crate) struct StagedPage {
    stages: Vec<String>,
    stage: Mutex<usize>,
    fills: Mutex<Vec<(String, String)>>,
    clicks: Mutex<Vec<String>>,
    checked: Mutex<Vec<usize>>,
    navigations: Mutex<Vec<String>>,
    resets: AtomicUsize,
}

impl StagedPage {
    pub(crate) fn new(stages: Vec<&str>) -> Self {
        Self {
            stages: stages.into_iter().map(String::from).collect(),
            stage: Mutex::new(0),
            fills: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            checked: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
            resets: AtomicUsize::new(0),
        }
    }

    fn current(&self) -> String {
        let stage = *self.stage.lock().unwrap();
        self.stages[stage.min(self.stages.len() - 1)].clone()
    }

    fn advance_stage(&self) {
        let mut stage = self.stage.lock().unwrap();
        if *stage + 1 < self.stages.len() {
            *stage += 1;
        }
    }

    pub(crate) fn fills(&self) -> Vec<(String, String)> {
        self.fills.lock().unwrap().clone()
    }

    pub(crate) fn clicks(&self) -> Vec<String> {
        self.clicks.lock().unwrap().clone()
    }

    pub(crate) fn checked(&self) -> Vec<usize> {
        self.checked.lock().unwrap().clone()
    }

    pub(crate) fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub(crate) fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageDriver for StagedPage {
    async fn navigate(&self, url: &str) -> Result<(), FlowError> {
        self.navigations.lock().unwrap().push(url.to_string());
        *self.stage.lock().unwrap() = 0;
        Ok(())
    }

    async fn content(&self) -> Result<String, FlowError> {
        Ok(self.current())
    }

    async fn current_url(&self) -> Result<String, FlowError> {
        Ok(self
            .navigations
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn title(&self) -> Result<String, FlowError> {
        Ok("Staged page".to_string())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), FlowError> {
        self.fills
            .lock()
            .unwrap()
            .push((selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), FlowError> {
        self.clicks.lock().unwrap().push(selector.to_string());
        // Submit-like clicks load the next stage; checkbox clicks do not.
        if selector.starts_with("button") || selector.contains("submit") {
            self.advance_stage();
        }
        Ok(())
    }

    async fn click_button_with_text(&self, labels: &[&str]) -> Result<bool, FlowError> {
        let html = self.current();
        if dom::page_has_button_with_text(&html, labels) {
            self.clicks
                .lock()
                .unwrap()
                .push(format!("text:{}", labels.join("|")));
            self.advance_stage();
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn check_checkbox(&self, index: usize) -> Result<(), FlowError> {
        self.checked.lock().unwrap().push(index);
        Ok(())
    }

    async fn screenshot(&self, _path: &Path) -> Result<(), FlowError> {
        Ok(())
    }

    async fn reset_session(&self) -> Result<(), FlowError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Message store that hands out queued messages per recipient, one per
/// fetch, oldest first.
pub(crate) struct ScriptedStore {
    queues: Mutex<HashMap<String, VecDeque<InboxMessage>>>,
}

impl ScriptedStore {
    pub(crate) fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn push(&self, recipient: &str, message: InboxMessage) {
        self.queues
            .lock()
            .unwrap()
            .entry(recipient.to_string())
            .or_default()
            .push_back(message);
    }
}

#[async_trait]
impl MessageStore for ScriptedStore {
    async fn first_for(&self, recipient: &str) -> Result<Option<InboxMessage>, FlowError> {
        Ok(self
            .queues
            .lock()
            .unwrap()
            .get_mut(recipient)
            .and_then(|q| q.pop_front()))
    }

    async fn delete_message(&self, _id: &str) -> Result<(), FlowError> {
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), FlowError> {
        self.queues.lock().unwrap().clear();
        Ok(())
    }
}

pub(crate) fn invitation_message() -> InboxMessage {
    InboxMessage {
        id: "inv-1".to_string(),
        subject: "You have been invited".to_string(),
        html_body: Some("<p>You have been invited to a project</p>".to_string()),
        text_body: None,
        links: vec![
            MessageLink {
                href: "mailto:support@example.test".to_string(),
            },
            MessageLink {
                href: "https://app.example.test/activate?t=abc".to_string(),
            },
        ],
    }
}

pub(crate) fn passcode_message() -> InboxMessage {
    InboxMessage {
        id: "otp-1".to_string(),
        subject: "Your verification code".to_string(),
        html_body: Some("<p>Your code: 482913</p>".to_string()),
        text_body: None,
        links: vec![],
    }
}

/// Wires a staged page and scripted inbox to a [`FlowExecutor`] with
/// timeouts short enough for tests.
pub(crate) struct FlowHarness {
    pub(crate) store: Arc<ScriptedStore>,
    driver: Arc<StagedPage>,
}

impl FlowHarness {
    pub(crate) fn new(driver: Arc<StagedPage>) -> Self {
        Self {
            store: Arc::new(ScriptedStore::new()),
            driver,
        }
    }

    pub(crate) fn config() -> FlowConfig {
        FlowConfig {
            password: "Autodesk1!".to_string(),
            invitation_timeout: Duration::from_millis(50),
            passcode_timeout: Duration::from_millis(50),
            dom_wait: Duration::from_millis(200),
            dom_poll: Duration::from_millis(5),
            settle: Duration::ZERO,
            screenshot_dir: None,
        }
    }

    pub(crate) fn executor(&self) -> FlowExecutor {
        let poller = InboxPoller::new(self.store.clone(), Duration::from_millis(5));
        FlowExecutor::new(self.driver.clone(), poller, Self::config())
    }
}
