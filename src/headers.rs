use crate::services::HeaderAccessor;
use crate::util::normalize_lower;
use indexmap::IndexMap;
use url::Url;

/// Response header fields of a single response, keyed case-insensitively.
///
/// Repeated fields are folded into one comma-separated value, the way a
/// network stack hands them to a header accessor. That folding is what lets
/// the sharing check spot a duplicated `Access-Control-Allow-Origin`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    fields: IndexMap<String, (String, String)>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Self::append`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let key = normalize_lower(name.trim());

        match self.fields.get_mut(&key) {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(value.trim());
            }
            None => {
                self.fields
                    .insert(key, (name.trim().to_string(), value.trim().to_string()));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(&normalize_lower(name.trim()))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields
            .shift_remove(&normalize_lower(name.trim()))
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates `(name, value)` pairs in arrival order, names as first seen.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Parses a raw `Name: value` block separated by CR and/or LF.
    /// Lines without a colon are skipped.
    pub fn parse(raw: &str) -> Self {
        raw.split(['\r', '\n'])
            .filter_map(|line| line.split_once(':'))
            .filter(|(name, _)| !name.trim().is_empty())
            .fold(Self::new(), |headers, (name, value)| headers.with(name, value))
    }
}

impl<N, V> FromIterator<(N, V)> for ResponseHeaders
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

impl HeaderAccessor for ResponseHeaders {
    fn header_value(&self, _url: &Url, name: &str) -> Option<String> {
        self.get(name).map(str::to_owned)
    }
}

#[cfg(test)]
#[path = "headers_test.rs"]
mod headers_test;
