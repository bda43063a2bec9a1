/// A message fetched from the hosted inbox. Ephemeral: pulled fresh on
/// every poll and owned by the poller for the duration of one wait.
#[derive(Debug, Clone)]
pub struct InboxMessage {
    pub id: String,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    /// Links in the rendered body, in document order.
    pub links: Vec<MessageLink>,
}

#[derive(Debug, Clone)]
pub struct MessageLink {
    pub href: String,
}

/// What the invitation extractor found in a message.
#[derive(Debug, Clone)]
pub struct ExtractedInvitation {
    pub invitation_url: Option<String>,
    pub subject: String,
    pub message_id: String,
    pub matched_known_subject: bool,
}
