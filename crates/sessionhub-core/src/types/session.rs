//! The session record.

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::SessionId;

/// A server-side session.
///
/// The expiry deadline is `last_accessed_at + max_inactive_interval_seconds`.
/// A session is expired once the current time is strictly after that deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last time the session was accessed.
    pub last_accessed_at: DateTime<Utc>,
    /// Inactivity interval after which the session expires, in seconds.
    pub max_inactive_interval_seconds: u64,
    /// Application attributes.
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl Session {
    /// Create a fresh session with a random id and no attributes.
    pub fn new(max_inactive_interval: StdDuration) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            created_at: now,
            last_accessed_at: now,
            max_inactive_interval_seconds: max_inactive_interval.as_secs(),
            attributes: HashMap::new(),
        }
    }

    /// Inactivity interval as a duration.
    pub fn max_inactive_interval(&self) -> StdDuration {
        StdDuration::from_secs(self.max_inactive_interval_seconds)
    }

    /// Replace the inactivity interval. A zero interval expires the session
    /// on its next check.
    pub fn set_max_inactive_interval(&mut self, interval: StdDuration) {
        self.max_inactive_interval_seconds = interval.as_secs();
    }

    /// Moment after which the session counts as expired.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let secs = i64::try_from(self.max_inactive_interval_seconds).unwrap_or(i64::MAX);
        let interval = Duration::try_seconds(secs).unwrap_or(Duration::MAX);
        self.last_accessed_at
            .checked_add_signed(interval)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether the session is expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }

    /// Whether the session is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Bump the last-access timestamp.
    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
    }

    /// Get an attribute value.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Set an attribute. Setting `Value::Null` removes it.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if value.is_null() {
            self.attributes.remove(&name);
        } else {
            self.attributes.insert(name, value);
        }
    }

    /// Remove an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        self.attributes.remove(name)
    }

    /// Names of all attributes, sorted.
    pub fn attribute_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.attributes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
