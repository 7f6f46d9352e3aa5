use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

use crate::models::GenerateRequest;

// Memoized generation results: hash map plus recency order, least recently
// used entry evicted once capacity is exceeded. No TTL; entries live for the
// process lifetime.
pub struct ResponseCache {
    capacity: usize,
    state: Mutex<LruState>,
}

struct LruState {
    entries: HashMap<String, String>,
    order: VecDeque<String>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LruState {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut state = self.state.lock().await;
        let value = state.entries.get(key).cloned()?;
        state.touch(key);
        Some(value)
    }

    // First write wins: reinserting an existing key refreshes recency but
    // never replaces the stored value.
    pub async fn insert(&self, key: String, value: String) {
        let mut state = self.state.lock().await;
        if state.entries.contains_key(&key) {
            state.touch(&key);
            return;
        }
        state.entries.insert(key.clone(), value);
        state.order.push_back(key);
        while state.entries.len() > self.capacity {
            match state.order.pop_front() {
                Some(oldest) => {
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}

impl LruState {
    fn touch(&mut self, key: &str) {
        if self.order.back().is_some_and(|last| last == key) {
            return;
        }
        if let Some(idx) = self.order.iter().position(|k| k == key) {
            self.order.remove(idx);
            self.order.push_back(key.to_string());
        }
    }
}

// Cache key for the (prompt, language, max_length) tuple. Fields are
// length-prefixed so no field contents can alias another tuple's encoding.
pub fn make_cache_key(req: &GenerateRequest) -> String {
    let mut hasher = Sha256::new();
    hasher.update((req.prompt.len() as u64).to_le_bytes());
    hasher.update(req.prompt.as_bytes());
    hasher.update((req.language.len() as u64).to_le_bytes());
    hasher.update(req.language.as_bytes());
    hasher.update(req.max_length.to_le_bytes());
    format!("{:x}", hasher.finalize())
}
