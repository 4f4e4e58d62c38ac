//! Shared harness for transport integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ed25519_dalek::SigningKey;
use kagura_core::codec;
use kagura_core::directory::{PeerDirectory, PeerEntry};
use kagura_core::identity::NodeIdentity;
use kagura_grpc::config::GrpcConfig;
use kagura_grpc::server::RpcServer;
use kagura_grpc::sink::{EventSink, QuerySink, TransactionSink};
use kagura_proto::api::sumeragi_client::SumeragiClient;
use kagura_proto::api::{ConsensusEvent, Query, Transaction};
use rand::rngs::OsRng;
use slog::{o, Drain, Level, Logger};
use tokio::sync::Notify;
use tonic::transport::Channel;

pub fn create_test_logger() -> Logger {
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|env_str| Level::from_str(&env_str).ok())
        .unwrap_or(Level::Error);

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain)
        .build()
        .fuse()
        .filter_level(log_level)
        .fuse();

    Logger::root(drain, o!())
}

/// Reserve an ephemeral localhost port.
pub fn free_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind to random port");
    let addr = listener.local_addr().expect("get local addr");
    drop(listener);
    addr
}

/// Handler that records every delivery it receives.
#[derive(Default)]
pub struct CollectingSink {
    pub events: Mutex<Vec<(String, ConsensusEvent)>>,
    pub transactions: Mutex<Vec<(String, Transaction)>>,
    pub queries: Mutex<Vec<(String, Query)>>,
}

impl CollectingSink {
    pub fn event_count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }
}

impl EventSink for CollectingSink {
    fn on_event(&self, from: &str, event: ConsensusEvent) {
        self.events.lock().unwrap().push((from.to_string(), event));
    }
}

impl TransactionSink for CollectingSink {
    fn on_transaction(&self, from: &str, transaction: Transaction) {
        self.transactions
            .lock()
            .unwrap()
            .push((from.to_string(), transaction));
    }
}

impl QuerySink for CollectingSink {
    fn on_find(&self, from: &str, query: Query) {
        self.queries.lock().unwrap().push((from.to_string(), query));
    }
}

/// One in-process node: a running RPC server plus its identity and sink.
pub struct TestNode {
    pub addr: SocketAddr,
    pub identity: NodeIdentity,
    pub sink: Arc<CollectingSink>,
    shutdown: Arc<Notify>,
}

impl TestNode {
    /// Spawn a node server on an ephemeral port and wait for it to accept.
    pub async fn spawn(logger: Logger) -> Self {
        let addr = free_port();
        let identity = NodeIdentity::generate(&mut OsRng);
        let sink = Arc::new(CollectingSink::default());
        let shutdown = Arc::new(Notify::new());

        let config = GrpcConfig {
            listen_addr: addr,
            request_timeout_secs: 5,
        };
        let server = RpcServer::new(
            config,
            Arc::clone(&sink),
            Arc::clone(&sink),
            identity.signer(),
            logger,
        );

        let stop = Arc::clone(&shutdown);
        tokio::spawn(async move {
            let _ = server
                .serve_with_shutdown(async move {
                    stop.notified().await;
                })
                .await;
        });

        wait_until_serving(addr).await;

        Self {
            addr,
            identity,
            sink,
            shutdown,
        }
    }

    /// Raw client straight at this node, bypassing the directory gate.
    pub async fn sumeragi_client(&self) -> SumeragiClient<Channel> {
        SumeragiClient::connect(format!("http://{}", self.addr))
            .await
            .expect("connect to test node")
    }

    /// A peer directory for some other node that knows this node under
    /// `127.0.0.1` and shares this node's port.
    pub fn directory_for_sender(&self, sender_address: &str) -> Arc<PeerDirectory> {
        Arc::new(PeerDirectory::new(
            sender_address.to_string(),
            Some(self.addr.port()),
            NodeIdentity::generate(&mut OsRng),
            vec![PeerEntry {
                address: "127.0.0.1".to_string(),
                public_key: self.identity.public_key(),
            }],
        ))
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

pub async fn wait_until_serving(addr: SocketAddr) {
    for _ in 0..100 {
        if SumeragiClient::connect(format!("http://{}", addr)).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("gRPC server at {addr} did not come up");
}

/// Poll until `predicate` holds or `timeout` elapses.
pub async fn wait_for(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}

/// A transaction signed by `keys`, unique per `created_time`.
pub fn signed_transaction(creator: &str, created_time: u64, keys: &[&SigningKey]) -> Transaction {
    let mut tx = Transaction {
        creator_account_id: creator.to_string(),
        created_time,
        commands: Vec::new(),
        signatures: Vec::new(),
    };
    for key in keys {
        codec::sign_transaction(&mut tx, key);
    }
    tx
}

pub fn event_for(tx: &Transaction) -> ConsensusEvent {
    ConsensusEvent {
        transaction: Some(tx.clone()),
        event_signatures: Vec::new(),
        status: String::new(),
    }
}
