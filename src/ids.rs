//! Surface id allocation
use crate::errors::ReconcilerError;
use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hands out one namespace per allocator so ids stay unique across engine
/// instances for the lifetime of the process.
static NAMESPACE_COUNTER: Lazy<AtomicUsize> = Lazy::new(|| AtomicUsize::new(0));

#[derive(Debug)]
pub struct IdAllocator {
    prefix: String,
    namespace: usize,
    issued: u64,
    limit: u64,
}

impl IdAllocator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_limit(prefix, u64::MAX)
    }

    pub fn with_limit(prefix: impl Into<String>, limit: u64) -> Self {
        IdAllocator {
            prefix: prefix.into(),
            namespace: NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst),
            issued: 0,
            limit,
        }
    }

    /// Next fresh surface id. Fails instead of wrapping once the limit is hit.
    pub fn next_id(&mut self) -> Result<String, ReconcilerError> {
        if self.issued >= self.limit {
            return Err(ReconcilerError::IdExhausted { issued: self.issued });
        }
        let id = format!("{}{}_{}", self.prefix, self.namespace, self.issued);
        self.issued += 1;
        Ok(id)
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        IdAllocator::new("fw_id_")
    }
}
