//! Ordering service thread.
//!
//! The service owns a dedicated single-threaded tokio runtime so that the
//! proposal height and the queue-drain cursor have exactly one writer. Both
//! emission triggers — the interval timer and the size threshold — resolve
//! to the same task, so a proposal is never emitted concurrently from both.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use kagura_proto::api::Proposal;
use slog::Logger;
use tokio::sync::Notify;

use super::{PeerQuery, ProposalTransport};
use crate::now_ms;
use crate::queue::TransactionQueue;

/// First height an ordering service emits. Heights 0 and 1 belong to the
/// genesis machinery.
const INITIAL_PROPOSAL_HEIGHT: u64 = 2;

/// Trigger policy for proposal emission.
#[derive(Debug, Clone)]
pub struct OrderingConfig {
    /// Size trigger: emit as soon as this many transactions are queued.
    /// Also the upper bound on transactions per proposal.
    pub max_size: usize,
    /// Time trigger: emit whatever is pending at this cadence.
    pub delay: Duration,
}

impl Default for OrderingConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            delay: Duration::from_millis(5_000),
        }
    }
}

/// Ingestion endpoint handed to transport handlers.
///
/// Pushing is wait-free; crossing the size threshold wakes the ordering
/// task, which cancels the running timer interval.
#[derive(Clone)]
pub struct OrderingHandle {
    queue: Arc<TransactionQueue>,
    max_size: usize,
    size_trigger: Arc<Notify>,
}

impl OrderingHandle {
    pub fn on_transaction(&self, tx: kagura_proto::api::Transaction) {
        self.queue.push(Arc::new(tx));
        if self.queue.len() >= self.max_size {
            self.size_trigger.notify_one();
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }
}

/// The ordering service: sole writer of proposal heights.
pub struct OrderingService {
    handle: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl OrderingService {
    /// Spawns the ordering loop on its own OS thread with a current-thread
    /// tokio runtime, and returns the ingestion handle for the transport.
    pub fn spawn<T, P>(
        config: OrderingConfig,
        queue: Arc<TransactionQueue>,
        transport: Arc<T>,
        peer_query: Arc<P>,
        logger: Logger,
    ) -> (Self, OrderingHandle)
    where
        T: ProposalTransport + 'static,
        P: PeerQuery + 'static,
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_notify = Arc::new(Notify::new());
        let size_trigger = Arc::new(Notify::new());

        let ingestion = OrderingHandle {
            queue: Arc::clone(&queue),
            max_size: config.max_size,
            size_trigger: Arc::clone(&size_trigger),
        };

        let shutdown_flag = Arc::clone(&shutdown);
        let shutdown_wake = Arc::clone(&shutdown_notify);
        let handle = thread::Builder::new()
            .name("ordering".into())
            .spawn(move || {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .enable_io()
                    .build()
                    .expect("Failed to build ordering runtime");
                rt.block_on(ordering_loop(
                    config,
                    queue,
                    transport,
                    peer_query,
                    shutdown_flag,
                    shutdown_wake,
                    size_trigger,
                    logger,
                ));
            })
            .expect("Failed to spawn ordering thread");

        (
            Self {
                handle: Some(handle),
                shutdown,
                shutdown_notify,
            },
            ingestion,
        )
    }

    /// Signals shutdown and waits for the thread to terminate. An in-flight
    /// emission completes; the timer fires no further callbacks.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.shutdown_notify.notify_waiters();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Returns true if the service is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for OrderingService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[allow(clippy::too_many_arguments)]
async fn ordering_loop<T, P>(
    config: OrderingConfig,
    queue: Arc<TransactionQueue>,
    transport: Arc<T>,
    peer_query: Arc<P>,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    size_trigger: Arc<Notify>,
    logger: Logger,
) where
    T: ProposalTransport,
    P: PeerQuery,
{
    let mut proposal_height = INITIAL_PROPOSAL_HEIGHT;
    let mut interval = tokio::time::interval(config.delay);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick completes immediately; consume it so the timer starts
    // one full delay out.
    interval.tick().await;

    slog::info!(
        logger,
        "Ordering service started";
        "max_size" => config.max_size,
        "delay_ms" => config.delay.as_millis() as u64,
    );

    while !shutdown.load(Ordering::Acquire) {
        tokio::select! {
            biased;

            _ = shutdown_notify.notified() => break,

            _ = size_trigger.notified() => {
                // Re-check under the single-writer task: a competing timer
                // emission may already have drained the queue.
                if queue.len() >= config.max_size {
                    emit(
                        &mut proposal_height,
                        &config,
                        &queue,
                        transport.as_ref(),
                        peer_query.as_ref(),
                        &logger,
                    )
                    .await;
                    interval.reset();
                }
            }

            _ = interval.tick() => {
                if queue.is_empty() {
                    slog::trace!(logger, "timer fired with empty queue");
                } else {
                    emit(
                        &mut proposal_height,
                        &config,
                        &queue,
                        transport.as_ref(),
                        peer_query.as_ref(),
                        &logger,
                    )
                    .await;
                }
            }
        }
    }

    slog::info!(
        logger,
        "Ordering service shutting down";
        "next_height" => proposal_height,
        "pending" => queue.len(),
    );
}

/// Drains up to `max_size` transactions and broadcasts them as one proposal.
/// Skipped entirely when the queue turns out to be empty.
async fn emit<T, P>(
    proposal_height: &mut u64,
    config: &OrderingConfig,
    queue: &TransactionQueue,
    transport: &T,
    peer_query: &P,
    logger: &Logger,
) where
    T: ProposalTransport,
    P: PeerQuery,
{
    let mut transactions = Vec::with_capacity(config.max_size);
    while transactions.len() < config.max_size {
        match queue.try_pop() {
            Some(tx) => transactions.push(Arc::unwrap_or_clone(tx)),
            None => break,
        }
    }
    if transactions.is_empty() {
        return;
    }

    let proposal = Proposal {
        height: *proposal_height,
        created_time: now_ms(),
        transactions,
    };
    *proposal_height += 1;

    let peers: Vec<String> = peer_query
        .get_ledger_peers()
        .unwrap_or_default()
        .into_iter()
        .map(|peer| peer.address)
        .collect();

    slog::debug!(
        logger,
        "Publishing proposal";
        "height" => proposal.height,
        "tx_count" => proposal.transactions.len(),
        "peers" => peers.len(),
    );
    transport.publish_proposal(proposal, &peers).await;
}
