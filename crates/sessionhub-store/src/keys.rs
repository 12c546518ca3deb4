//! Key builders for session store entries.
//!
//! Keys are relative; the Redis client applies the configured prefix.

use sessionhub_core::types::SessionId;

/// Key holding the serialized session record.
pub fn session_by_id(session_id: &SessionId) -> String {
    format!("session:{session_id}")
}

/// Sorted set of all session ids scored by expiry deadline (unix seconds).
pub fn session_index() -> &'static str {
    "sessions"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_embeds_id() {
        let id = SessionId::new();
        assert_eq!(session_by_id(&id), format!("session:{id}"));
    }
}
