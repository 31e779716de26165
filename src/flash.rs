//! One-shot messages carried across a redirect in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub message: String,
}

impl FlashMessage {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Bootstrap alert class.
    pub fn css_class(&self) -> &'static str {
        match self.level {
            Level::Success => "success",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Danger => "danger",
        }
    }
}

pub fn encode(messages: &[FlashMessage]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Tampered or stale cookies decode to nothing.
pub fn decode(value: &str) -> Vec<FlashMessage> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

fn flash_cookie(value: String) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, value))
        .path("/")
        .http_only(true)
        .build()
}

/// Appends a message to whatever is already queued in the jar.
pub fn push(jar: CookieJar, level: Level, message: impl Into<String>) -> CookieJar {
    let mut messages = jar
        .get(FLASH_COOKIE)
        .map(|cookie| decode(cookie.value()))
        .unwrap_or_default();
    messages.push(FlashMessage::new(level, message));
    jar.add(flash_cookie(encode(&messages)))
}

/// Drains the queued messages.
pub fn take(jar: CookieJar) -> (CookieJar, Vec<FlashMessage>) {
    match jar.get(FLASH_COOKIE) {
        Some(cookie) => {
            let messages = decode(cookie.value());
            let jar = jar.remove(Cookie::build(FLASH_COOKIE).path("/"));
            (jar, messages)
        }
        None => (jar, Vec::new()),
    }
}

/// `Set-Cookie` value for responses built without a jar.
pub fn set_cookie_value(level: Level, message: impl Into<String>) -> String {
    flash_cookie(encode(&[FlashMessage::new(level, message)])).to_string()
}
