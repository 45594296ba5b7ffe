//! In-memory conversation threads.

use async_openai::types::ChatCompletionRequestMessage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Message history of one conversation. The system prompt is not stored.
#[derive(Debug, Clone)]
pub struct Thread {
    pub messages: Vec<ChatCompletionRequestMessage>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Append a completed turn and trim to `max_messages`.
    pub fn append(&mut self, turn: Vec<ChatCompletionRequestMessage>, max_messages: usize) {
        self.messages.extend(turn);
        trim_history(&mut self.messages, max_messages);
        self.updated_at = Utc::now();
    }
}

/// Listing entry for a thread.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    pub id: String,
    pub message_count: usize,
    pub updated_at: DateTime<Utc>,
}

/// Conversation threads keyed by id.
///
/// Turns on one thread run one after another through a per-thread turn lock,
/// while the stored history sits behind a separate, briefly held lock so
/// listings never wait on a turn in progress. A thread only exists once a
/// turn on it has completed.
pub struct ConversationStore {
    threads: RwLock<HashMap<String, Thread>>,
    turns: Mutex<HashMap<String, Weak<Mutex<()>>>>,
    max_messages: usize,
}

impl ConversationStore {
    pub fn new(max_messages: usize) -> Self {
        Self {
            threads: RwLock::new(HashMap::new()),
            turns: Mutex::new(HashMap::new()),
            max_messages,
        }
    }

    pub fn max_messages(&self) -> usize {
        self.max_messages
    }

    /// Wait for exclusive use of a thread for one turn.
    ///
    /// The turn lasts as long as the returned guard.
    pub async fn begin_turn(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut turns = self.turns.lock().await;
            turns.retain(|_, lock| lock.strong_count() > 0);
            match turns.get(id).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(Mutex::new(()));
                    turns.insert(id.to_string(), Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Store a completed turn, creating the thread if needed.
    pub async fn commit(&self, id: &str, turn: Vec<ChatCompletionRequestMessage>) {
        self.threads
            .write()
            .await
            .entry(id.to_string())
            .or_insert_with(Thread::new)
            .append(turn, self.max_messages);
    }

    /// Copy of a thread's messages; empty for unknown threads.
    pub async fn history(&self, id: &str) -> Vec<ChatCompletionRequestMessage> {
        self.threads
            .read()
            .await
            .get(id)
            .map(|t| t.messages.clone())
            .unwrap_or_default()
    }

    /// Summaries of all threads, sorted by id.
    pub async fn threads(&self) -> Vec<ThreadSummary> {
        let mut summaries: Vec<ThreadSummary> = self
            .threads
            .read()
            .await
            .iter()
            .map(|(id, thread)| ThreadSummary {
                id: id.clone(),
                message_count: thread.messages.len(),
                updated_at: thread.updated_at,
            })
            .collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    /// Remove a thread. Returns whether it existed.
    pub async fn clear(&self, id: &str) -> bool {
        self.threads.write().await.remove(id).is_some()
    }
}

fn is_user(message: &ChatCompletionRequestMessage) -> bool {
    matches!(message, ChatCompletionRequestMessage::User(_))
}

/// Drop the oldest messages so at most `max` remain.
///
/// Cuts only in front of a user message so a tool result never loses the
/// assistant tool call it answers. If no boundary fits, the latest turn is
/// kept whole.
pub fn trim_history(messages: &mut Vec<ChatCompletionRequestMessage>, max: usize) {
    let len = messages.len();
    if len <= max {
        return;
    }

    let cut = (len - max..len)
        .find(|&i| is_user(&messages[i]))
        .or_else(|| messages.iter().rposition(is_user))
        .unwrap_or(0);

    messages.drain(..cut);
}
