//! Ingestion queue feeding the ordering service.

use std::sync::Arc;

use crossbeam::queue::SegQueue;
use kagura_proto::api::Transaction;

/// Unbounded multi-producer queue of pending transactions.
///
/// Writers are the transport handlers; the single permitted consumer is the
/// ordering service. `push` and `try_pop` are wait-free; `len` and
/// `is_empty` are advisory and may be stale under concurrency.
#[derive(Default)]
pub struct TransactionQueue {
    inner: SegQueue<Arc<Transaction>>,
}

impl TransactionQueue {
    pub fn new() -> Self {
        Self {
            inner: SegQueue::new(),
        }
    }

    pub fn push(&self, tx: Arc<Transaction>) {
        self.inner.push(tx);
    }

    pub fn try_pop(&self) -> Option<Arc<Transaction>> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
