/// Append-only, capacity-bounded log of viewer chat messages with a
/// recency-windowed consumption query.
///
/// One producer (the transport ingest task) appends while the game loop
/// periodically consumes; a single mutex guards both paths and is never held
/// across I/O. Messages are immutable once recorded and evicted oldest-first
/// past capacity.
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::engine::state::ClickIntent;

/// Eviction threshold for the message log.
pub const MAX_MESSAGES: usize = 100;

/// A consumed batch never carries more than this many intents; excess intents
/// in the window are dropped, not deferred.
pub const MAX_BATCH_INTENTS: usize = 4;

/// One chat message as received from the transport, already annotated with
/// any click intents parsed out of its text.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub user: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
    pub intents: Vec<ClickIntent>,
}

/// The next batch of viewer suggestions to execute: the claiming user, the
/// receipt time of their earliest in-window command message, and their
/// intents in the order they were typed.
#[derive(Debug, Clone)]
pub struct SuggestionBatch {
    pub user: String,
    pub first_intent_at: DateTime<Utc>,
    pub intents: Vec<ClickIntent>,
}

#[derive(Debug, Clone, Default)]
pub struct ChatStats {
    pub total_messages: usize,
    pub messages_with_intents: usize,
    pub unique_users: usize,
    pub recent_activity: usize,
    pub last_user_with_intents: Option<String>,
}

#[derive(Default)]
struct BufferInner {
    messages: VecDeque<ChatMessage>,
    last_consumed_id: Option<String>,
    last_query_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct ChatBuffer {
    inner: Mutex<BufferInner>,
}

impl ChatBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, evicting the oldest once past capacity.
    pub fn record(&self, message: ChatMessage) {
        let mut inner = self.lock();
        inner.messages.push_back(message);
        while inner.messages.len() > MAX_MESSAGES {
            inner.messages.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    /// Pick the next unconsumed suggestion batch, or `None` if nothing
    /// actionable arrived since the previous query.
    ///
    /// The effective cutoff is `now - max_age_minutes`, raised to the time of
    /// the previous query so material already considered once is never
    /// reconsidered. The most recent intent-bearing message inside the window
    /// claims the batch for its user; that user's intents are then collected
    /// chronologically from their earliest in-window command message, capped
    /// at [`MAX_BATCH_INTENTS`].
    pub fn consume_next(&self, max_age_minutes: i64) -> Option<SuggestionBatch> {
        self.consume_next_at(max_age_minutes, Utc::now())
    }

    fn consume_next_at(&self, max_age_minutes: i64, now: DateTime<Utc>) -> Option<SuggestionBatch> {
        let mut inner = self.lock();

        let age_cutoff = now - Duration::minutes(max_age_minutes);
        let cutoff = match inner.last_query_at {
            Some(prev) if prev > age_cutoff => prev,
            _ => age_cutoff,
        };

        // Backward scan: the most recent in-window message with intents
        // claims the batch. The previously consumed anchor is skipped
        // defensively; normally the cutoff already excludes it.
        let anchor = inner
            .messages
            .iter()
            .rev()
            .filter(|m| m.received_at >= cutoff)
            .filter(|m| inner.last_consumed_id.as_deref() != Some(m.id.as_str()))
            .find(|m| !m.intents.is_empty())
            .map(|m| (m.id.clone(), m.user.clone()));

        // The cutoff advances even on an empty result so the next query never
        // re-walks this material.
        inner.last_query_at = Some(now);

        let (anchor_id, user) = anchor?;

        // Forward scan: replay the user's commands in the order they typed
        // them, starting from their earliest in-window command message.
        let mut intents: Vec<ClickIntent> = Vec::new();
        let mut first_intent_at = None;
        for msg in inner.messages.iter() {
            if msg.received_at < cutoff || msg.user != user || msg.intents.is_empty() {
                continue;
            }
            if first_intent_at.is_none() {
                first_intent_at = Some(msg.received_at);
            }
            for intent in &msg.intents {
                if intents.len() >= MAX_BATCH_INTENTS {
                    break;
                }
                intents.push(intent.clone());
            }
            if intents.len() >= MAX_BATCH_INTENTS {
                break;
            }
        }

        let first_intent_at = first_intent_at?;
        inner.last_consumed_id = Some(anchor_id);
        drop(inner);
        tracing::debug!(
            user = %user,
            intents = intents.len(),
            "claimed chat suggestion batch"
        );
        Some(SuggestionBatch {
            user,
            first_intent_at,
            intents,
        })
    }

    /// Aggregate view over the buffer, for status logging.
    pub fn stats(&self, max_age_minutes: i64) -> ChatStats {
        let inner = self.lock();
        let cutoff = Utc::now() - Duration::minutes(max_age_minutes);
        let users: HashSet<&str> = inner.messages.iter().map(|m| m.user.as_str()).collect();
        ChatStats {
            total_messages: inner.messages.len(),
            messages_with_intents: inner.messages.iter().filter(|m| !m.intents.is_empty()).count(),
            unique_users: users.len(),
            recent_activity: inner
                .messages
                .iter()
                .filter(|m| m.received_at > cutoff)
                .count(),
            last_user_with_intents: inner
                .messages
                .iter()
                .rev()
                .find(|m| !m.intents.is_empty())
                .map(|m| m.user.clone()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BufferInner> {
        // A poisoned lock only means another thread panicked mid-append; the
        // buffer contents are still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::ClickIntent;

    fn msg(id: &str, user: &str, intents: Vec<ClickIntent>, minutes_ago: i64) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            user: user.to_string(),
            text: String::new(),
            received_at: Utc::now() - Duration::minutes(minutes_ago),
            intents,
        }
    }

    fn cell(n: u32) -> ClickIntent {
        ClickIntent::cell(n, format!("cell {n}"))
    }

    #[test]
    fn capacity_eviction_keeps_newest_hundred() {
        let buffer = ChatBuffer::new();
        for i in 0..101 {
            buffer.record(msg(&format!("m{i}"), "alice", vec![], 0));
        }
        assert_eq!(buffer.len(), MAX_MESSAGES);
        let inner = buffer.lock();
        assert_eq!(inner.messages.front().unwrap().id, "m1");
        assert_eq!(inner.messages.back().unwrap().id, "m100");
    }

    #[test]
    fn batch_belongs_to_most_recent_commander_in_typed_order() {
        let buffer = ChatBuffer::new();
        buffer.record(msg("b1", "bob", vec![cell(9)], 4));
        buffer.record(msg("a1", "alice", vec![cell(1)], 3));
        buffer.record(msg("x", "carol", vec![], 2));
        buffer.record(msg("a2", "alice", vec![cell(2)], 2));
        buffer.record(msg("a3", "alice", vec![cell(3)], 1));

        let batch = buffer.consume_next(5).expect("alice has suggestions");
        assert_eq!(batch.user, "alice");
        // Timestamp of alice's chronologically earliest command message.
        let inner = buffer.lock();
        let a1 = inner.messages.iter().find(|m| m.id == "a1").unwrap();
        assert_eq!(batch.first_intent_at, a1.received_at);
        drop(inner);
        let cells: Vec<_> = batch.intents.iter().map(|i| i.target.clone()).collect();
        assert_eq!(
            cells,
            vec![
                crate::engine::state::ClickTarget::Cell { index: 1 },
                crate::engine::state::ClickTarget::Cell { index: 2 },
                crate::engine::state::ClickTarget::Cell { index: 3 },
            ]
        );
    }

    #[test]
    fn intents_capped_at_four() {
        let buffer = ChatBuffer::new();
        for i in 1..=6u32 {
            buffer.record(msg(&format!("a{i}"), "alice", vec![cell(i)], 3));
        }
        let batch = buffer.consume_next(5).unwrap();
        assert_eq!(batch.intents.len(), MAX_BATCH_INTENTS);
        assert_eq!(
            batch.intents[0].target,
            crate::engine::state::ClickTarget::Cell { index: 1 }
        );
        assert_eq!(
            batch.intents[3].target,
            crate::engine::state::ClickTarget::Cell { index: 4 }
        );
    }

    #[test]
    fn messages_outside_window_are_invisible() {
        let buffer = ChatBuffer::new();
        buffer.record(msg("old", "alice", vec![cell(1)], 10));
        assert!(buffer.consume_next(5).is_none());
    }

    #[test]
    fn second_query_without_new_messages_is_empty() {
        let buffer = ChatBuffer::new();
        buffer.record(msg("a1", "alice", vec![cell(1)], 1));
        assert!(buffer.consume_next(5).is_some());
        // last_query_at advanced past everything already in the buffer.
        assert!(buffer.consume_next(5).is_none());
    }

    #[test]
    fn empty_query_still_advances_the_window() {
        let buffer = ChatBuffer::new();
        buffer.record(msg("noise", "bob", vec![], 1));
        assert!(buffer.consume_next(5).is_none());
        // The message recorded before the first query is behind the advanced
        // cutoff even if it had carried intents.
        buffer.record(msg("b2", "bob", vec![cell(5)], 0));
        let batch = buffer.consume_next(5).expect("new message is eligible");
        assert_eq!(batch.user, "bob");
        assert_eq!(batch.intents.len(), 1);
    }

    #[test]
    fn only_the_claiming_users_intents_are_collected() {
        let buffer = ChatBuffer::new();
        buffer.record(msg("b1", "bob", vec![cell(7)], 2));
        buffer.record(msg("a1", "alice", vec![cell(1)], 1));
        let batch = buffer.consume_next(5).unwrap();
        assert_eq!(batch.user, "alice");
        assert_eq!(batch.intents.len(), 1);
        assert_eq!(
            batch.intents[0].target,
            crate::engine::state::ClickTarget::Cell { index: 1 }
        );
    }

    #[test]
    fn stats_reflect_buffer_contents() {
        let buffer = ChatBuffer::new();
        buffer.record(msg("a1", "alice", vec![cell(1)], 1));
        buffer.record(msg("b1", "bob", vec![], 1));
        let stats = buffer.stats(5);
        assert_eq!(stats.total_messages, 2);
        assert_eq!(stats.messages_with_intents, 1);
        assert_eq!(stats.unique_users, 2);
        assert_eq!(stats.recent_activity, 2);
        assert_eq!(stats.last_user_with_intents.as_deref(), Some("alice"));
    }
}
