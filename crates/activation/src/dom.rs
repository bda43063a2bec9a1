//! Pure HTML inspection: everything the flow needs to know about a page is
//! derived from its rendered markup, so these helpers stay testable without
//! a browser.

use scraper::{ElementRef, Html, Selector};

/// Field-presence signals gathered from one rendered page. This is the only
/// portable evidence across form redesigns, so classification runs on these
/// flags alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageEvidence {
    pub has_password_input: bool,
    pub has_email_input: bool,
    pub has_general_terms_checkbox: bool,
    pub has_marketing_checkbox: bool,
    pub checkbox_count: usize,
    /// Capitalized field names from the registration form that predates the
    /// current one (FirstName/LastName/Email/ConfirmEmail).
    pub has_legacy_fields: bool,
    pub has_first_name_input: bool,
    pub has_last_name_input: bool,
    pub has_signin_affordance: bool,
}

impl PageEvidence {
    pub fn collect(html: &str) -> Self {
        let document = Html::parse_document(html);
        let input_selector = Selector::parse("input").unwrap();

        let mut evidence = PageEvidence::default();

        for input in document.select(&input_selector) {
            let input_type = input.value().attr("type").unwrap_or("text");
            let name = input.value().attr("name").unwrap_or("");
            let id = input.value().attr("id").unwrap_or("");
            let placeholder = input.value().attr("placeholder").unwrap_or("");
            let hidden = input.value().attr("hidden").is_some();

            if hidden {
                continue;
            }

            if input_type == "password"
                || name == "password"
                || placeholder.to_lowercase().contains("password")
            {
                evidence.has_password_input = true;
            }

            if input_type == "email" || name == "email" {
                evidence.has_email_input = true;
            }

            if input_type == "checkbox" {
                evidence.checkbox_count += 1;
                if is_general_terms_name(name) || is_general_terms_name(id) {
                    evidence.has_general_terms_checkbox = true;
                }
                if is_marketing_name(name) || is_marketing_name(id) {
                    evidence.has_marketing_checkbox = true;
                }
            }

            if matches!(name, "FirstName" | "LastName" | "Email" | "ConfirmEmail") {
                evidence.has_legacy_fields = true;
            }

            if matches!(name, "firstName" | "first_name") {
                evidence.has_first_name_input = true;
            }
            if matches!(name, "lastName" | "last_name") {
                evidence.has_last_name_input = true;
            }
        }

        evidence.has_signin_affordance = has_signin_affordance(&document);
        evidence
    }
}

fn is_general_terms_name(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    let lower = value.to_lowercase();
    lower.contains("generalterms") || (lower.contains("terms") && !lower.contains("marketing"))
}

fn is_marketing_name(value: &str) -> bool {
    value.to_lowercase().contains("marketing")
}

fn has_signin_affordance(document: &Html) -> bool {
    let selector = Selector::parse("button, a").unwrap();
    document.select(&selector).any(|el| {
        let text = el.text().collect::<String>().to_lowercase();
        text.contains("sign in") || text.contains("log in") || text.contains("already have an account")
    })
}

/// One checkbox on the page, in document order. `index` addresses it via
/// `querySelectorAll('input[type=checkbox]')` on the live page.
#[derive(Debug, Clone)]
pub struct CheckboxInfo {
    pub index: usize,
    pub name: Option<String>,
    pub id: Option<String>,
    pub checked: bool,
}

pub fn checkboxes(html: &str) -> Vec<CheckboxInfo> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("input[type='checkbox']").unwrap();
    document
        .select(&selector)
        .enumerate()
        .map(|(index, el)| CheckboxInfo {
            index,
            name: el.value().attr("name").map(String::from),
            id: el.value().attr("id").map(String::from),
            checked: el.value().attr("checked").is_some(),
        })
        .collect()
}

/// Checkbox policy: exactly one checkbox may be checked per page, the first
/// unchecked general-terms one. Marketing/optional checkboxes are left
/// unchecked system-wide; when no named terms checkbox exists, the first
/// unchecked non-marketing checkbox stands in for it.
pub fn general_terms_checkbox_index(boxes: &[CheckboxInfo]) -> Option<usize> {
    let named = |cb: &&CheckboxInfo| {
        cb.name.as_deref().map(is_general_terms_name).unwrap_or(false)
            || cb.id.as_deref().map(is_general_terms_name).unwrap_or(false)
    };
    let marketing = |cb: &&CheckboxInfo| {
        cb.name.as_deref().map(is_marketing_name).unwrap_or(false)
            || cb.id.as_deref().map(is_marketing_name).unwrap_or(false)
    };

    boxes
        .iter()
        .filter(|cb| !cb.checked)
        .find(named)
        .or_else(|| boxes.iter().filter(|cb| !cb.checked).find(|cb| !marketing(cb)))
        .map(|cb| cb.index)
}

/// A clickable control resolved to a CSS selector.
#[derive(Debug, Clone)]
pub struct Control {
    pub selector: String,
    pub text: String,
}

/// Find the form's submit control. Explicit submit buttons win; untyped
/// buttons are ranked by whether their text looks like a form action.
pub fn find_submit_control(html: &str) -> Option<Control> {
    let document = Html::parse_document(html);
    let mut candidates: Vec<(Control, f32)> = Vec::new();

    let button_selector = Selector::parse("button").unwrap();
    for el in document.select(&button_selector) {
        let text = el.text().collect::<String>().trim().to_string();
        let explicit = el.value().attr("type") == Some("submit");
        let confidence = if explicit {
            0.9
        } else if is_action_text(&text) {
            0.8
        } else {
            0.5
        };
        candidates.push((
            Control {
                selector: build_selector(&el),
                text,
            },
            confidence,
        ));
    }

    let input_selector = Selector::parse("input[type='submit']").unwrap();
    for el in document.select(&input_selector) {
        let text = el.value().attr("value").unwrap_or("Submit").to_string();
        candidates.push((
            Control {
                selector: build_selector(&el),
                text,
            },
            0.9,
        ));
    }

    candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().next().map(|(control, _)| control)
}

fn is_action_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["create", "continue", "complete", "next", "sign up", "submit", "register"]
        .iter()
        .any(|k| lower.contains(k))
}

/// Whether any button on the page carries one of `labels` as visible text.
pub fn page_has_button_with_text(html: &str, labels: &[&str]) -> bool {
    let document = Html::parse_document(html);
    let selector = Selector::parse("button, input[type='submit']").unwrap();
    document.select(&selector).any(|el| {
        let mut text = el.text().collect::<String>();
        if text.trim().is_empty() {
            text = el.value().attr("value").unwrap_or("").to_string();
        }
        let lower = text.to_lowercase();
        labels.iter().any(|l| lower.contains(&l.to_lowercase()))
    })
}

/// Keywords that mark a page as a one-time-passcode challenge.
pub const PASSCODE_KEYWORDS: &[&str] = &[
    "passcode",
    "verification code",
    "Enter the code",
    "One-time",
    "6-digit",
];

pub fn contains_passcode_prompt(html: &str) -> bool {
    PASSCODE_KEYWORDS.iter().any(|k| html.contains(k))
}

/// Locate the input the passcode goes into: a named code field when the
/// page has one, otherwise the first generic text input.
pub fn find_passcode_input(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    for selector_str in [
        "input[name='code']",
        "input[name='passcode']",
        "input[type='text']",
    ] {
        let selector = Selector::parse(selector_str).unwrap();
        if document.select(&selector).next().is_some() {
            return Some(selector_str.to_string());
        }
    }
    None
}

pub fn has_password_input(html: &str) -> bool {
    PageEvidence::collect(html).has_password_input
}

/// CSS selector for an element: id, then name, then first class, then tag.
fn build_selector(element: &ElementRef) -> String {
    if let Some(id) = element.value().attr("id") {
        return format!("#{}", id);
    }
    if let Some(name) = element.value().attr("name") {
        return format!("{}[name='{}']", element.value().name(), name);
    }
    if let Some(class) = element.value().attr("class") {
        if let Some(first) = class.split_whitespace().next() {
            return format!("{}.{}", element.value().name(), first);
        }
    }
    element.value().name().to_string()
}
