use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use inviteflow_core::wait::wait_until;
use inviteflow_core::FlowError;

use crate::extract;
use crate::store::MessageStore;
use crate::types::{ExtractedInvitation, InboxMessage};

/// Polls the hosted inbox for a message matching a recipient and predicate
/// under a bounded wait. Transport failures end the wait immediately;
/// expiry is a `FlowError::Timeout` for this wait only.
pub struct InboxPoller {
    store: Arc<dyn MessageStore>,
    poll_interval: Duration,
}

impl InboxPoller {
    pub fn new(store: Arc<dyn MessageStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    pub async fn wait_for_message<P>(
        &self,
        recipient: &str,
        predicate: P,
        timeout: Duration,
    ) -> Result<InboxMessage, FlowError>
    where
        P: Fn(&InboxMessage) -> bool + Send + Sync,
    {
        info!(recipient, "waiting for message");
        let predicate = &predicate;
        wait_until(
            &format!("message to {}", recipient),
            timeout,
            self.poll_interval,
            || async move {
                match self.store.first_for(recipient).await? {
                    Some(message) if predicate(&message) => Ok(Some(message)),
                    _ => Ok(None),
                }
            },
        )
        .await
    }

    /// Wait for the invitation mail and extract the activation link. A
    /// message with an unknown subject or no usable link still resolves the
    /// wait; the absence is reported through `ExtractedInvitation`.
    pub async fn wait_for_invitation(
        &self,
        recipient: &str,
        timeout: Duration,
    ) -> Result<ExtractedInvitation, FlowError> {
        let message = self.wait_for_message(recipient, |_| true, timeout).await?;
        let extracted = extract::invitation_from(&message);
        match &extracted.invitation_url {
            Some(url) => info!(subject = %extracted.subject, url, "invitation email received"),
            None => warn!(subject = %extracted.subject, "no invitation link found in email"),
        }
        Ok(extracted)
    }

    /// Wait for the one-time-passcode mail and pull the code out of it.
    /// `Ok(None)` means a message arrived but held no recognizable code.
    pub async fn wait_for_passcode(
        &self,
        recipient: &str,
        timeout: Duration,
    ) -> Result<Option<String>, FlowError> {
        let message = self.wait_for_message(recipient, |_| true, timeout).await?;
        Ok(extract::verification_code(&message))
    }

    pub async fn delete_message(&self, id: &str) -> Result<(), FlowError> {
        self.store.delete_message(id).await
    }

    /// Purge every message in the server. Useful between runs so stale
    /// invitations are not picked up for reused addresses.
    pub async fn purge(&self) -> Result<(), FlowError> {
        info!("deleting all messages from mailbox server");
        self.store.delete_all().await
    }
}
