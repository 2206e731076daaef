//! Idempotency tokens and correlation keys.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of idempotency tokens and per-item correlation keys.
pub trait TokenGenerator: Send + Sync {
    /// A fresh operation id for one create call.
    fn operation_id(&self) -> Uuid;

    /// A fresh correlation key for one submitted item.
    fn correlation_key(&self) -> String;
}

/// Random UUID v4 tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokens;

impl TokenGenerator for RandomTokens {
    fn operation_id(&self) -> Uuid {
        Uuid::new_v4()
    }

    fn correlation_key(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

/// Deterministic tokens for tests.
#[derive(Debug)]
pub struct SequentialTokens {
    next_operation: AtomicU64,
    next_key: AtomicU64,
}

impl SequentialTokens {
    /// Starts both sequences at 1.
    pub fn new() -> Self {
        Self {
            next_operation: AtomicU64::new(1),
            next_key: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialTokens {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator for SequentialTokens {
    fn operation_id(&self) -> Uuid {
        Uuid::from_u128(u128::from(self.next_operation.fetch_add(1, Ordering::SeqCst)))
    }

    fn correlation_key(&self) -> String {
        format!("key-{:08}", self.next_key.fetch_add(1, Ordering::SeqCst))
    }
}
