//! Conversation store
//!
//! Shared cache mapping thread ids to accumulated histories, so independent
//! requests sharing a thread id continue the same conversation. Bounded:
//! once over capacity, the least recently touched thread is evicted.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::agent::conversation::Conversation;

/// Keyed cache of conversations by thread id
pub struct ConversationStore {
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    threads: HashMap<String, Entry>,
    capacity: usize,
    clock: u64,
}

struct Entry {
    conversation: Conversation,
    touched: u64,
}

impl ConversationStore {
    /// Create a store holding at most `capacity` threads
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                threads: HashMap::new(),
                capacity: capacity.max(1),
                clock: 0,
            }),
        }
    }

    /// Copy out the history for a thread, empty when unseen
    pub fn get(&self, thread_id: &str) -> Conversation {
        let mut inner = self.inner.lock().unwrap();
        inner.clock += 1;
        let clock = inner.clock;
        match inner.threads.get_mut(thread_id) {
            Some(entry) => {
                entry.touched = clock;
                entry.conversation.clone()
            }
            None => Conversation::new(),
        }
    }

    /// Replace a thread's history atomically
    pub fn put(&self, thread_id: &str, conversation: Conversation) {
        let mut inner = self.inner.lock().unwrap();
        inner.clock += 1;
        let touched = inner.clock;
        inner.threads.insert(
            thread_id.to_string(),
            Entry {
                conversation,
                touched,
            },
        );

        if inner.threads.len() > inner.capacity {
            if let Some(oldest) = inner
                .threads
                .iter()
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(thread, _)| thread.clone())
            {
                inner.threads.remove(&oldest);
            }
        }
    }

    /// Number of cached threads
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().threads.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unseen_thread_yields_empty_history() {
        let store = ConversationStore::new(4);
        assert!(store.get("t1").is_empty());
    }

    #[test]
    fn test_put_then_get_round_trips() {
        let store = ConversationStore::new(4);
        let mut conversation = Conversation::new();
        conversation.push_user("hello");
        store.put("t1", conversation);

        let loaded = store.get("t1");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.messages()[0].content, "hello");
    }

    #[test]
    fn test_eviction_drops_least_recently_touched() {
        let store = ConversationStore::new(2);
        let mut conversation = Conversation::new();
        conversation.push_user("x");
        store.put("a", conversation.clone());
        store.put("b", conversation.clone());

        // Touch "a" so "b" is the eviction candidate
        let _ = store.get("a");
        store.put("c", conversation);

        assert_eq!(store.len(), 2);
        assert!(!store.get("a").is_empty());
        // "b" was evicted; its history restarts empty
        assert!(store.get("b").is_empty());
    }

    #[test]
    fn test_put_replaces_whole_history() {
        let store = ConversationStore::new(4);
        let mut first = Conversation::new();
        first.push_user("one");
        store.put("t1", first);

        let mut second = Conversation::new();
        second.push_user("one");
        second.push_user("two");
        store.put("t1", second);

        assert_eq!(store.get("t1").len(), 2);
        assert_eq!(store.len(), 1);
    }
}
