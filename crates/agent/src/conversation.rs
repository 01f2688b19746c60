//! Serializes command handling per conversation.
//!
//! Session updates are read-modify-write; two commands for the same
//! conversation must not interleave. Different conversations never wait on
//! each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ConversationLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, conversation_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds so the map tracks active conversations only.
            locks.retain(|id, lock| id == conversation_id || Arc::strong_count(lock) > 1);
            locks.entry(conversation_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
