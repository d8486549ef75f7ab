//! Immutable set of headers added to every REST response.

use std::sync::Arc;

use http::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};

/// Rejected header value
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error(transparent)]
    Invalid(#[from] InvalidHeaderValue),

    #[error("value of {0} must be visible ASCII")]
    NotVisibleAscii(HeaderName),
}

/// Ordered, read-only response headers.
///
/// Entries keep insertion order. Inserting a name twice keeps the first
/// position and the last value. Clones share the same storage, which is safe
/// because no method hands out mutable access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    entries: Arc<[(HeaderName, HeaderValue)]>,
}

impl ResponseHeaders {
    pub fn builder() -> ResponseHeadersBuilder {
        ResponseHeadersBuilder::default()
    }

    /// Looks up a header value, ignoring ASCII case in the name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.as_str().eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.to_str().ok())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(n, v)| v.to_str().ok().map(|v| (n.as_str(), v)))
    }

    /// Copies the headers into a fresh `HeaderMap` owned by the caller.
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in self.entries.iter() {
            map.insert(name.clone(), value.clone());
        }
        map
    }
}

/// Collects headers before they are frozen into [`ResponseHeaders`].
#[derive(Debug, Default)]
pub struct ResponseHeadersBuilder {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl ResponseHeadersBuilder {
    /// Adds `name`, replacing an earlier value for the same name.
    ///
    /// Values must be visible ASCII so they read back unchanged through
    /// [`ResponseHeaders::get`].
    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self, HeaderError> {
        let value = HeaderValue::from_str(value)?;
        if value.to_str().is_err() {
            return Err(HeaderError::NotVisibleAscii(name));
        }
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
        Ok(self)
    }

    pub fn build(self) -> ResponseHeaders {
        ResponseHeaders {
            entries: self.entries.into(),
        }
    }
}
