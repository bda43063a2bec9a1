use std::path::Path;

use async_trait::async_trait;

use inviteflow_core::FlowError;

/// Browser seam for the activation flow. The production implementation is
/// [`crate::ChromeSession`]; tests drive the state machine with an
/// in-memory page instead.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), FlowError>;

    /// Full rendered HTML of the current page.
    async fn content(&self) -> Result<String, FlowError>;

    async fn current_url(&self) -> Result<String, FlowError>;

    async fn title(&self) -> Result<String, FlowError>;

    /// Set an input's value and fire input/change events.
    async fn fill(&self, selector: &str, value: &str) -> Result<(), FlowError>;

    async fn click(&self, selector: &str) -> Result<(), FlowError>;

    /// Click the first button whose visible text contains one of `labels`,
    /// case-insensitively. Returns whether anything was clicked.
    async fn click_button_with_text(&self, labels: &[&str]) -> Result<bool, FlowError>;

    /// Check the nth checkbox on the page, in document order.
    async fn check_checkbox(&self, index: usize) -> Result<(), FlowError>;

    async fn screenshot(&self, path: &Path) -> Result<(), FlowError>;

    /// Drop cookies and storage so the next account starts from a clean
    /// profile.
    async fn reset_session(&self) -> Result<(), FlowError>;
}
