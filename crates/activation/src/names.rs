//! Display-name hygiene. Generated addresses embed counters and role tags,
//! so raw name parts carry digits that the registration form rejects.

/// Strip digits and surrounding whitespace; fall back when nothing is left.
pub fn clean_name(raw: Option<&str>, fallback: &str) -> String {
    let cleaned: String = raw
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

/// What actually goes into a name field.
pub fn display_name(raw: Option<&str>, fallback: &str) -> String {
    title_case(&clean_name(raw, fallback))
}
