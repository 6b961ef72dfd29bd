// Credential masking applied to every payload that reaches the log
use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

pub const MASK: &str = "***";

const LOG_PREVIEW_CHARS: usize = 1000;

// The regex crate has no backreferences, so the opening tag is captured and the
// closing tag only has to carry the same local name.
static XML_LOGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<((?:[A-Za-z0-9_]+:)?login)>.*?</(?:[A-Za-z0-9_]+:)?login>")
        .expect("static regex")
});

static XML_PASSWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<((?:[A-Za-z0-9_]+:)?password)>.*?</(?:[A-Za-z0-9_]+:)?password>")
        .expect("static regex")
});

static JSON_CREDENTIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"("(?:login|password)"\s*:\s*")(?:[^"\\]|\\.)*(")"#).expect("static regex")
});

// Replaces login/password values in XML tags (any namespace prefix) and JSON
// string fields with `MASK`. Masking an already masked string is a no-op.
pub fn mask_credentials(data: &str) -> String {
    let masked = XML_LOGIN.replace_all(data, format!("<${{1}}>{MASK}</${{1}}>"));
    let masked = XML_PASSWORD.replace_all(&masked, format!("<${{1}}>{MASK}</${{1}}>"));
    let masked = JSON_CREDENTIAL.replace_all(&masked, format!("${{1}}{MASK}${{2}}"));
    masked.into_owned()
}

pub fn mask_json<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => mask_credentials(&json),
        Err(_) => "[Unmaskable Data]".to_string(),
    }
}

// Cuts on a char boundary. Never call on unmasked data: a cut inside a
// credential tag hides the closing tag from the masking regexes.
fn truncate_for_log(data: &str) -> Cow<'_, str> {
    match data.char_indices().nth(LOG_PREVIEW_CHARS) {
        None => Cow::Borrowed(data),
        Some((cut, _)) => Cow::Owned(format!("{}...", &data[..cut])),
    }
}

// Masked and shortened payload for debug logs.
pub fn log_preview(data: &str) -> String {
    truncate_for_log(&mask_credentials(data)).into_owned()
}
