use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::types::{ExtractedInvitation, InboxMessage};

/// Subject substrings that mark a message as an invitation.
pub const INVITATION_SUBJECTS: &[&str] = &[
    "Invitation to",
    "You have been invited",
    "Join the",
    "Welcome to the",
    "You're invited to join",
];

/// Subject of the account-verification mail (second link is the verify URL).
pub const ACCOUNT_VERIFICATION_SUBJECT: &str = "Verify your Autodesk account";

pub fn matches_known_subject(subject: &str) -> bool {
    INVITATION_SUBJECTS.iter().any(|s| subject.contains(s))
}

/// The action link of an invitation message: the first link whose href is
/// not a mailto (those are contact/support links, not the activate button).
/// Returns None on unknown subject or when no web link exists; callers
/// treat that as a reported miss, not an error.
pub fn invitation_url(message: &InboxMessage) -> Option<String> {
    if !matches_known_subject(&message.subject) {
        warn!(subject = %message.subject, "unexpected subject, expected invitation email");
        return None;
    }
    message
        .links
        .iter()
        .find(|link| !link.href.starts_with("mailto:"))
        .map(|link| link.href.clone())
}

pub fn invitation_from(message: &InboxMessage) -> ExtractedInvitation {
    let matched = matches_known_subject(&message.subject);
    ExtractedInvitation {
        invitation_url: invitation_url(message),
        subject: message.subject.clone(),
        message_id: message.id.clone(),
        matched_known_subject: matched,
    }
}

/// The URL of the account-verification mail. By convention the second link
/// in the body is the verify button; anything else is a miss.
pub fn account_verification_url(message: &InboxMessage) -> Option<String> {
    if message.subject != ACCOUNT_VERIFICATION_SUBJECT {
        warn!(
            subject = %message.subject,
            expected = ACCOUNT_VERIFICATION_SUBJECT,
            "unexpected verification email subject"
        );
    }
    message.links.get(1).map(|link| link.href.clone())
}

fn code_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Ordered by decreasing specificity; first match wins.
        [
            r"(?i)verification code[:\s]*(\d{4,8})",
            r"(?i)code[:\s]*(\d{4,8})",
            r"(?i)enter[:\s]*(\d{4,8})",
            // A bare six-digit number on a line of its own.
            r"(?m)^\s*(\d{6})\s*$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
    })
}

fn standalone_six_digits() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{6})\b").expect("static pattern"))
}

/// Pull a one-time passcode out of a message body. Prefers the rendered
/// html body, falls back to plain text. None when nothing matches.
pub fn verification_code(message: &InboxMessage) -> Option<String> {
    let content = message
        .html_body
        .as_deref()
        .filter(|body| !body.is_empty())
        .or(message.text_body.as_deref())?;

    for pattern in code_patterns() {
        if let Some(captures) = pattern.captures(content) {
            let code = captures[1].to_string();
            debug!(code, "found verification code");
            return Some(code);
        }
    }

    // Last resort: any standalone 6-digit token anywhere in the content.
    if let Some(captures) = standalone_six_digits().captures(content) {
        let code = captures[1].to_string();
        debug!(code, "found 6-digit code");
        return Some(code);
    }

    warn!("could not extract verification code from message");
    None
}
