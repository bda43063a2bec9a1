use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use inviteflow_core::config::MailboxConfig;
use inviteflow_core::FlowError;

use crate::types::{InboxMessage, MessageLink};

/// The polling-get contract the harness needs from the hosted inbox
/// service: newest matching message for a recipient, plus cleanup.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// First message addressed to `recipient`, or None when the inbox has
    /// nothing for that address yet.
    async fn first_for(&self, recipient: &str) -> Result<Option<InboxMessage>, FlowError>;

    async fn delete_message(&self, id: &str) -> Result<(), FlowError>;

    async fn delete_all(&self) -> Result<(), FlowError>;
}

/// REST client for the hosted mailbox. Messages live in a named server;
/// listing filters by the `sentTo` address and bodies are fetched per id.
pub struct HostedMailbox {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    server_id: String,
}

impl HostedMailbox {
    pub fn new(config: &MailboxConfig) -> Result<Self, FlowError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| FlowError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            server_id: config.server_id.clone(),
        })
    }

    async fn fetch_message(&self, id: &str) -> Result<InboxMessage, FlowError> {
        let url = format!("{}/api/messages/{}", self.api_base, id);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FlowError::Transport(format!(
                "mailbox message fetch failed: HTTP {}",
                response.status()
            )));
        }

        let dto: MessageDto = response
            .json()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;
        Ok(dto.into())
    }
}

#[async_trait]
impl MessageStore for HostedMailbox {
    async fn first_for(&self, recipient: &str) -> Result<Option<InboxMessage>, FlowError> {
        let url = format!("{}/api/messages", self.api_base);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.api_key, Some(""))
            .query(&[("server", self.server_id.as_str()), ("sentTo", recipient)])
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FlowError::Transport(format!(
                "mailbox listing failed: HTTP {}",
                response.status()
            )));
        }

        let listing: MessageListDto = response
            .json()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;

        let Some(summary) = listing.items.into_iter().next() else {
            debug!(recipient, "no messages yet");
            return Ok(None);
        };

        self.fetch_message(&summary.id).await.map(Some)
    }

    async fn delete_message(&self, id: &str) -> Result<(), FlowError> {
        let url = format!("{}/api/messages/{}", self.api_base, id);
        let response = self
            .http
            .delete(&url)
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FlowError::Transport(format!(
                "mailbox delete failed: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), FlowError> {
        let url = format!("{}/api/messages", self.api_base);
        let response = self
            .http
            .delete(&url)
            .basic_auth(&self.api_key, Some(""))
            .query(&[("server", self.server_id.as_str())])
            .send()
            .await
            .map_err(|e| FlowError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FlowError::Transport(format!(
                "mailbox purge failed: HTTP {}",
                response.status()
            )));
        }
        Ok(())
    }
}

// Wire shapes, kept separate from the domain message type.

#[derive(Debug, Deserialize)]
struct MessageListDto {
    #[serde(default)]
    items: Vec<MessageSummaryDto>,
}

#[derive(Debug, Deserialize)]
struct MessageSummaryDto {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageDto {
    id: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    html: Option<BodyDto>,
    #[serde(default)]
    text: Option<BodyDto>,
}

#[derive(Debug, Deserialize)]
struct BodyDto {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    links: Vec<LinkDto>,
}

#[derive(Debug, Deserialize)]
struct LinkDto {
    #[serde(default)]
    href: Option<String>,
}

impl From<MessageDto> for InboxMessage {
    fn from(dto: MessageDto) -> Self {
        let links = dto
            .html
            .as_ref()
            .map(|h| {
                h.links
                    .iter()
                    .filter_map(|l| l.href.clone())
                    .map(|href| MessageLink { href })
                    .collect()
            })
            .unwrap_or_default();

        InboxMessage {
            id: dto.id,
            subject: dto.subject.unwrap_or_default(),
            html_body: dto.html.and_then(|h| h.body),
            text_body: dto.text.and_then(|t| t.body),
            links,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_dto_maps_links_in_order() {
        let raw = r#"{
            "id": "msg-1",
            "subject": "You have been invited",
            "html": {
                "body": "<p>hi</p>",
                "links": [
                    {"href": "mailto:support@example.test"},
                    {"href": "https://app.example.test/activate?t=abc"}
                ]
            },
            "text": {"body": "hi"}
        }"#;

        let dto: MessageDto = serde_json::from_str(raw).unwrap();
        let message: InboxMessage = dto.into();
        assert_eq!(message.links.len(), 2);
        assert_eq!(message.links[0].href, "mailto:support@example.test");
        assert_eq!(message.subject, "You have been invited");
        assert_eq!(message.html_body.as_deref(), Some("<p>hi</p>"));
    }
}
