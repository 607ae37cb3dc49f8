//! Conversation history bounding.
//!
//! Token counts are estimated once, when a turn is appended, and stored on the
//! [`Message`]. Truncation only ever consumes those precomputed counts.

pub mod tokens;

pub use tokens::estimate_tokens;

use serde::{Deserialize, Serialize};

use crate::sessions::{Message, Role};

/// Budgets applied to a session's in-memory history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLimits {
    /// Maximum number of turns retained.
    #[serde(default = "default_max_messages")]
    pub max_messages: usize,
    /// Maximum summed `token_count` across retained turns.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_max_messages() -> usize {
    20
}

fn default_max_tokens() -> usize {
    4000
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl HistoryLimits {
    pub fn apply<'a>(&self, history: &'a [Message]) -> &'a [Message] {
        truncate_history(history, self.max_tokens, self.max_messages)
    }
}

/// Bound `history` by message count first, then by token budget.
///
/// Returns the most recent suffix of `history` that fits: the oldest turns
/// beyond `message_limit` are dropped, then the oldest remaining turns are
/// dropped one at a time until the summed `token_count` is within
/// `token_limit`. A message limit of 0 drains the history entirely.
pub fn truncate_history(history: &[Message], token_limit: usize, message_limit: usize) -> &[Message] {
    if history.is_empty() {
        return history;
    }

    let floor = history.len().saturating_sub(message_limit);
    let mut start = history.len();
    let mut total: usize = 0;

    // Longest newest-first suffix within budget; counts come off the wire, so never overflow.
    while start > floor {
        match total.checked_add(history[start - 1].token_count) {
            Some(next) if next <= token_limit => {
                total = next;
                start -= 1;
            }
            _ => break,
        }
    }

    &history[start..]
}

/// Return a copy of `history` with a new turn appended.
///
/// The new message's token count is estimated here and stamped with the
/// current time. `history` itself is left untouched.
pub fn append_message(history: &[Message], role: Role, content: impl Into<String>) -> Vec<Message> {
    let mut next = Vec::with_capacity(history.len() + 1);
    next.extend_from_slice(history);
    next.push(Message::new(role, content));
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(content: &str, tokens: usize) -> Message {
        Message {
            role: Role::User,
            content: content.to_string(),
            token_count: tokens,
            timestamp: Utc::now(),
        }
    }

    fn contents(history: &[Message]) -> Vec<&str> {
        history.iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn empty_history_is_returned_unchanged() {
        let history: Vec<Message> = Vec::new();
        assert!(truncate_history(&history, 10, 10).is_empty());
    }

    #[test]
    fn within_budget_history_is_unchanged() {
        let history = vec![msg("a", 3), msg("b", 3), msg("c", 3)];
        let kept = truncate_history(&history, 100, 10);
        assert_eq!(kept, history.as_slice());
    }

    #[test]
    fn message_limit_keeps_last_n_in_order() {
        let history: Vec<Message> = (0..5).map(|i| msg(&format!("m{i}"), 1)).collect();
        let kept = truncate_history(&history, 100, 2);
        assert_eq!(contents(kept), vec!["m3", "m4"]);
    }

    #[test]
    fn huge_stored_counts_do_not_overflow() {
        let history = vec![msg("huge", usize::MAX), msg("small", 1)];
        assert_eq!(contents(truncate_history(&history, 10, 10)), vec!["small"]);

        let history = vec![msg("a", 3), msg("huge", usize::MAX), msg("b", usize::MAX)];
        assert!(truncate_history(&history, usize::MAX - 1, 10).is_empty());
        assert_eq!(contents(truncate_history(&history, usize::MAX, 10)), vec!["b"]);
    }

    #[test]
    fn huge_counts_decoded_from_wire_are_bounded() {
        let raw = format!(
            r#"[{{"role":"user","content":"x","token_count":{},"timestamp":"2025-01-01T00:00:00Z"}},
               {{"role":"assistant","content":"y","token_count":1,"timestamp":"2025-01-01T00:00:01Z"}}]"#,
            u64::MAX
        );
        let history: Vec<Message> = serde_json::from_str(&raw).unwrap();
        assert_eq!(contents(truncate_history(&history, 10, 10)), vec!["y"]);
    }

    #[test]
    fn token_limit_drops_oldest_of_remaining() {
        let history: Vec<Message> = (0..5).map(|i| msg(&format!("m{i}"), 10)).collect();
        let kept = truncate_history(&history, 15, 2);
        assert_eq!(contents(kept), vec!["m4"]);
    }

    #[test]
    fn zero_budgets_drain_everything() {
        let history = vec![msg("a", 1), msg("b", 1)];
        assert!(truncate_history(&history, 0, 10).is_empty());
        assert!(truncate_history(&history, 10, 0).is_empty());
    }

    #[test]
    fn zero_token_messages_survive_zero_budget() {
        let history = vec![msg("a", 5), msg("", 0)];
        assert_eq!(contents(truncate_history(&history, 0, 10)), vec![""]);
    }

    #[test]
    fn append_leaves_original_untouched() {
        let history = vec![msg("first", 2)];
        let next = append_message(&history, Role::Assistant, "日本語");
        assert_eq!(history.len(), 1);
        assert_eq!(next.len(), 2);
        assert_eq!(next[1].role, Role::Assistant);
        assert_eq!(next[1].token_count, 3);
    }

    #[test]
    fn limits_deserialize_with_defaults() {
        let limits: HistoryLimits = toml::from_str("max_messages = 4").unwrap();
        assert_eq!(limits.max_messages, 4);
        assert_eq!(limits.max_tokens, 4000);
    }
}
