//! Small HTML chores around model-generated forms.
//!
//! The model returns a loose HTML fragment, so these helpers match tags with
//! regexes instead of parsing a document.

use std::sync::LazyLock;

use regex::Regex;

/// Challenge text used when the form carries no recognisable question
pub const UNKNOWN_CHALLENGE: &str = "Unknown challenge";

/// Any `<input ...>` tag
static INPUT_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<input\b[^>]*>").expect("input regex is valid"));

/// `name="challenge"` as a whole attribute
static CHALLENGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\sname\s*=\s*"challenge""#).expect("name regex is valid"));

/// Double-quoted `value` attribute, captured
static VALUE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\svalue\s*=\s*"([^"]*)""#).expect("value regex is valid"));

/// Opening form tag; `<formula` does not count
static FORM_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<form\b[^>]*>").expect("form regex is valid"));

/// Strip markdown code fences the model likes to wrap HTML in
pub fn clean_llm_response(content: &str) -> String {
    content.replace("```html", "").replace("```", "").trim().to_string()
}

/// Pull the challenge out of the generated form.
///
/// Prefers the hidden `challenge` input; falls back to the first text line
/// that looks like a question.
pub fn extract_challenge_from_form(html: &str) -> String {
    let hidden = INPUT_TAG
        .find_iter(html)
        .map(|tag| tag.as_str())
        .filter(|tag| CHALLENGE_NAME.is_match(tag))
        .find_map(|tag| VALUE_ATTR.captures(tag))
        .and_then(|caps| caps.get(1));

    if let Some(value) = hidden {
        return unescape_html(value.as_str());
    }

    html.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('<') && line.contains('?'))
        .and_then(|line| line.split('?').next())
        .map(|question| format!("{}?", question))
        .unwrap_or_else(|| UNKNOWN_CHALLENGE.to_string())
}

/// Insert a hidden `session_id` input right after the opening form tag
pub fn add_session_to_form(html: &str, session_id: &str) -> String {
    let input = format!(
        r#"<input type="hidden" name="session_id" value="{}">"#,
        escape_html(session_id)
    );

    match FORM_OPEN.find(html) {
        Some(form) => {
            let split = form.end();
            format!("{}\n{}{}", &html[..split], input, &html[split..])
        }
        None => format!("{}\n{}", input, html),
    }
}

/// Escape text for HTML element content and quoted attributes
pub fn escape_html(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}

/// Decode entities the way a browser does before submitting a value
pub fn unescape_html(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Shorten long values for debug logs
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
