//! Memo of preflight grants, so that a repeated non-simple request to the
//! same resource can skip its `OPTIONS` round-trip until the grant expires.
//!
//! One entry authorizes exactly one method or one header name for an
//! `(origin, url, credentials)` triple.

use crate::options::ManagerOptions;
use crate::request::CrossOriginRequest;
use crate::result::CorsError;
use crate::util::normalize_lower;
use indexmap::IndexMap;
use std::time::{Duration, Instant};
use url::Url;

/// The value an entry authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CachedValue {
    /// Compared exactly; methods are case-sensitive.
    Method(String),
    /// Stored lowercased; header names compare case-insensitively.
    Header(String),
}

impl CachedValue {
    pub(crate) fn header(name: &str) -> Self {
        CachedValue::Header(normalize_lower(name.trim()))
    }

    pub(crate) fn method(name: &str) -> Self {
        CachedValue::Method(name.trim().to_string())
    }

    pub fn is_method(&self) -> bool {
        matches!(self, CachedValue::Method(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            CachedValue::Method(value) | CachedValue::Header(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    origin: String,
    url: String,
    credentials: bool,
    value: CachedValue,
}

impl EntryKey {
    fn new(request: &CrossOriginRequest, value: CachedValue) -> Self {
        Self {
            origin: request.origin().to_string(),
            url: request.url().as_str().to_string(),
            credentials: request.with_credentials(),
            value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreflightCacheEntry {
    expires_at: Instant,
    origin: String,
    url: Url,
    max_age: Duration,
    credentials: bool,
    value: CachedValue,
}

impl PreflightCacheEntry {
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn credentials(&self) -> bool {
        self.credentials
    }

    pub fn value(&self) -> &CachedValue {
        &self.value
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }

    fn refresh(&mut self, max_age: Duration, now: Instant) {
        self.max_age = max_age;
        self.expires_at = expiry(now, max_age);
    }
}

fn expiry(now: Instant, max_age: Duration) -> Instant {
    // An unrepresentable expiry is treated as "do not cache".
    now.checked_add(max_age).unwrap_or(now)
}

#[derive(Debug, Clone)]
pub struct PreflightCache {
    entries: IndexMap<EntryKey, PreflightCacheEntry>,
    default_max_age: Duration,
    maximum_max_age: Duration,
    max_size: usize,
}

impl PreflightCache {
    pub fn new(default_max_age: Duration, maximum_max_age: Duration, max_size: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            default_max_age,
            maximum_max_age,
            max_size,
        }
    }

    pub fn from_options(options: &ManagerOptions) -> Self {
        Self::new(
            options.default_max_age,
            options.maximum_max_age,
            options.max_size,
        )
    }

    pub fn default_max_age(&self) -> Duration {
        self.default_max_age
    }

    pub fn maximum_max_age(&self) -> Duration {
        self.maximum_max_age
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Max-age to store for a grant: the server's value clamped to
    /// `[0, maximum_max_age]`, or `default_max_age` when it sent none.
    pub fn max_age_for(&self, requested_seconds: Option<u64>) -> Duration {
        match requested_seconds {
            Some(seconds) => Duration::from_secs(seconds).min(self.maximum_max_age),
            None => self.default_max_age,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order, expired ones included until the next sweep.
    pub fn entries(&self) -> impl Iterator<Item = &PreflightCacheEntry> {
        self.entries.values()
    }

    pub fn method_match(&self, request: &CrossOriginRequest, method: &str) -> bool {
        self.method_match_at(request, method, Instant::now())
    }

    pub fn header_match(&self, request: &CrossOriginRequest, name: &str) -> bool {
        self.header_match_at(request, name, Instant::now())
    }

    pub(crate) fn method_match_at(
        &self,
        request: &CrossOriginRequest,
        method: &str,
        now: Instant,
    ) -> bool {
        self.live_match(EntryKey::new(request, CachedValue::method(method)), now)
    }

    pub(crate) fn header_match_at(
        &self,
        request: &CrossOriginRequest,
        name: &str,
        now: Instant,
    ) -> bool {
        self.live_match(EntryKey::new(request, CachedValue::header(name)), now)
    }

    fn live_match(&self, key: EntryKey, now: Instant) -> bool {
        self.entries
            .get(&key)
            .is_some_and(|entry| entry.is_live(now))
    }

    pub fn update_method_cache(
        &mut self,
        methods: &[&str],
        request: &CrossOriginRequest,
        max_age: Duration,
    ) -> Result<(), CorsError> {
        let values: Vec<CachedValue> = methods.iter().map(|m| CachedValue::method(m)).collect();
        self.update_at(values, request, max_age, Instant::now())
    }

    pub fn update_header_cache(
        &mut self,
        headers: &[&str],
        request: &CrossOriginRequest,
        max_age: Duration,
    ) -> Result<(), CorsError> {
        let values: Vec<CachedValue> = headers.iter().map(|h| CachedValue::header(h)).collect();
        self.update_at(values, request, max_age, Instant::now())
    }

    /// Refreshes matching entries in place and inserts the rest.
    ///
    /// Capacity is reserved before anything changes, so an allocation
    /// failure leaves the cache as it was.
    pub(crate) fn update_at(
        &mut self,
        values: Vec<CachedValue>,
        request: &CrossOriginRequest,
        max_age: Duration,
        now: Instant,
    ) -> Result<(), CorsError> {
        self.entries
            .try_reserve(values.len())
            .map_err(|_| CorsError::ResourceExhausted)?;

        for value in values {
            let key = EntryKey::new(request, value);
            if let Some(entry) = self.entries.get_mut(&key) {
                entry.refresh(max_age, now);
                continue;
            }

            if max_age.is_zero() {
                continue;
            }

            self.make_room(now);
            let entry = PreflightCacheEntry {
                expires_at: expiry(now, max_age),
                origin: key.origin.clone(),
                url: request.url().clone(),
                max_age,
                credentials: key.credentials,
                value: key.value.clone(),
            };
            tracing::trace!(
                origin = %entry.origin,
                url = %entry.url,
                value = entry.value.as_str(),
                ?max_age,
                "preflight grant cached"
            );
            self.entries.insert(key, entry);
        }

        Ok(())
    }

    fn make_room(&mut self, now: Instant) {
        if self.entries.len() < self.max_size {
            return;
        }

        self.sweep(now);
        while self.entries.len() >= self.max_size {
            let Some(oldest) = self
                .entries
                .values()
                .enumerate()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(index, _)| index)
            else {
                break;
            };
            if let Some((_, evicted)) = self.entries.shift_remove_index(oldest) {
                tracing::debug!(
                    origin = %evicted.origin,
                    url = %evicted.url,
                    "preflight cache full, evicted entry closest to expiry"
                );
            }
        }
    }

    /// Purges every grant for an exact `(origin, url)` pair, whatever its
    /// credentials flag or value.
    pub fn remove_origin_requests(&mut self, origin: &str, url: &Url) {
        let before = self.entries.len();
        self.entries
            .retain(|key, _| !(key.origin == origin && key.url == url.as_str()));
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(origin, url = %url, removed, "preflight grants purged");
        }
    }

    /// Sweeps expired entries and reports whether new grants may be stored.
    /// A full cache makes room by eviction, so this always agrees.
    pub fn allow_updates(&mut self, request: &CrossOriginRequest) -> bool {
        self.sweep(Instant::now());
        tracing::trace!(
            request = %request.id(),
            entries = self.entries.len(),
            "cache updates allowed"
        );
        true
    }

    /// Drops expired entries, or every entry when `expire_all` is set.
    pub fn invalidate(&mut self, expire_all: bool) {
        if expire_all {
            self.entries.clear();
        } else {
            self.sweep(Instant::now());
        }
    }

    pub(crate) fn sweep(&mut self, now: Instant) {
        self.entries.retain(|_, entry| entry.is_live(now));
    }
}

#[cfg(test)]
#[path = "preflight_cache_test.rs"]
mod preflight_cache_test;
