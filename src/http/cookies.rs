//! Cookie jar that can be written to and restored from `state.kdl`.
//!
//! The refresh endpoint authenticates with a server-set cookie rather than the
//! expired bearer token. A browser keeps that cookie across reloads; the CLI
//! gets the same behaviour by recording the raw `Set-Cookie` headers it sees
//! and replaying them into a fresh jar on the next run.

use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct PersistentCookieJar {
    jar: Jar,
    /// Raw `Set-Cookie` strings keyed by cookie name, latest wins
    raw: Mutex<BTreeMap<String, String>>,
}

impl PersistentCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a jar pre-populated with previously saved `Set-Cookie` strings.
    pub fn restore(url: &Url, saved: &[String]) -> Self {
        let jar = Self::new();
        for cookie in saved {
            jar.jar.add_cookie_str(cookie, url);
            jar.record(cookie);
        }
        jar
    }

    /// Raw `Set-Cookie` strings to persist, in name order.
    pub fn snapshot(&self) -> Vec<String> {
        self.raw().values().cloned().collect()
    }

    fn raw(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.raw.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, set_cookie: &str) {
        let Some(name) = cookie_name(set_cookie) else {
            return;
        };
        let mut raw = self.raw();
        if is_removal(set_cookie) {
            raw.remove(name);
        } else {
            raw.insert(name.to_string(), set_cookie.to_string());
        }
    }
}

impl CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<&HeaderValue> = cookie_headers.collect();
        for header in &headers {
            if let Ok(value) = header.to_str() {
                self.record(value);
            }
        }
        self.jar.set_cookies(&mut headers.into_iter(), url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

fn cookie_name(set_cookie: &str) -> Option<&str> {
    let (name, _) = set_cookie.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

/// A `Set-Cookie` that deletes the cookie (logout clears the refresh cookie this way).
fn is_removal(set_cookie: &str) -> bool {
    let mut parts = set_cookie.split(';');
    let value_empty = parts
        .next()
        .and_then(|pair| pair.split_once('='))
        .is_some_and(|(_, value)| value.trim().is_empty());
    let expired = parts.any(|attr| {
        let attr = attr.trim().to_ascii_lowercase();
        attr == "max-age=0" || attr.starts_with("max-age=-")
    });
    value_empty || expired
}
