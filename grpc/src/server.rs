//! gRPC server setup and wire service implementations.
//!
//! Every inbound RPC deserializes its argument, fans it out to the wired
//! handler, then answers with `value = "OK"` plus — for Verify and Torii —
//! a signed receipt confirmation over the argument's content hash.

use std::future::Future;
use std::sync::Arc;

use kagura_core::codec::{self, MessageSigner};
use kagura_proto::api::asset_repository_server::{AssetRepository, AssetRepositoryServer};
use kagura_proto::api::sumeragi_server::{Sumeragi, SumeragiServer};
use kagura_proto::api::transaction_repository_server::{
    TransactionRepository, TransactionRepositoryServer,
};
use kagura_proto::api::{
    AssetResponse, ConsensusEvent, Query, StatusResponse, Transaction, TransactionResponse,
};
use slog::Logger;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

use crate::config::GrpcConfig;
use crate::sink::{EventSink, QuerySink, TransactionSink};

/// Sender label attached to handler deliveries.
fn remote_label<T>(request: &Request<T>) -> String {
    request
        .remote_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_default()
}

/// Sumeragi service: peer event delivery plus client transaction submission.
pub struct SumeragiService<H> {
    handler: Arc<H>,
    signer: MessageSigner,
    logger: Logger,
}

impl<H> SumeragiService<H> {
    pub fn new(handler: Arc<H>, signer: MessageSigner, logger: Logger) -> Self {
        Self {
            handler,
            signer,
            logger,
        }
    }
}

#[tonic::async_trait]
impl<H> Sumeragi for SumeragiService<H>
where
    H: EventSink + TransactionSink,
{
    async fn verify(
        &self,
        request: Request<ConsensusEvent>,
    ) -> Result<Response<StatusResponse>, Status> {
        let from = remote_label(&request);
        let event = request.into_inner();
        let hash = codec::event_transaction_hash(&event)
            .ok_or_else(|| Status::invalid_argument("consensus event carries no transaction"))?;

        slog::debug!(
            self.logger,
            "Verify received";
            "from" => %from,
            "event_signatures" => event.event_signatures.len(),
        );
        self.handler.on_event(&from, event);

        Ok(Response::new(StatusResponse {
            value: "OK".to_string(),
            confirm: Some(self.signer.sign(&hash)),
        }))
    }

    async fn torii(
        &self,
        request: Request<Transaction>,
    ) -> Result<Response<StatusResponse>, Status> {
        let from = remote_label(&request);
        let transaction = request.into_inner();
        let hash = codec::transaction_hash(&transaction);

        slog::debug!(
            self.logger,
            "Torii received";
            "from" => %from,
            "creator" => %transaction.creator_account_id,
            "tx_hash" => hex::encode(&hash[..8]),
        );
        self.handler.on_transaction(&from, transaction);

        Ok(Response::new(StatusResponse {
            value: "OK".to_string(),
            confirm: Some(self.signer.sign(&hash)),
        }))
    }
}

/// Transaction repository query surface.
pub struct TransactionRepositoryService<Q> {
    handler: Arc<Q>,
    logger: Logger,
}

impl<Q> TransactionRepositoryService<Q> {
    pub fn new(handler: Arc<Q>, logger: Logger) -> Self {
        Self { handler, logger }
    }
}

#[tonic::async_trait]
impl<Q: QuerySink> TransactionRepository for TransactionRepositoryService<Q> {
    async fn find(
        &self,
        request: Request<Query>,
    ) -> Result<Response<TransactionResponse>, Status> {
        let from = remote_label(&request);
        let query = request.into_inner();
        slog::debug!(self.logger, "transaction query"; "from" => %from, "account" => %query.account_id);
        self.handler.on_find(&from, query);

        Ok(Response::new(TransactionResponse {
            message: "OK".to_string(),
        }))
    }
}

/// Asset repository query surface.
pub struct AssetRepositoryService<Q> {
    handler: Arc<Q>,
    logger: Logger,
}

impl<Q> AssetRepositoryService<Q> {
    pub fn new(handler: Arc<Q>, logger: Logger) -> Self {
        Self { handler, logger }
    }
}

#[tonic::async_trait]
impl<Q: QuerySink> AssetRepository for AssetRepositoryService<Q> {
    async fn find(&self, request: Request<Query>) -> Result<Response<AssetResponse>, Status> {
        let from = remote_label(&request);
        let query = request.into_inner();
        slog::debug!(self.logger, "asset query"; "from" => %from, "asset" => %query.asset_name);
        self.handler.on_find(&from, query);

        Ok(Response::new(AssetResponse {
            message: "OK".to_string(),
        }))
    }
}

/// gRPC server instance binding the three wire services.
///
/// `H` handles Sumeragi deliveries, `Q` handles repository queries. Both are
/// wired once at construction; there is no runtime handler registration.
pub struct RpcServer<H, Q> {
    config: GrpcConfig,
    handler: Arc<H>,
    query_handler: Arc<Q>,
    signer: MessageSigner,
    logger: Logger,
}

impl<H, Q> RpcServer<H, Q>
where
    H: EventSink + TransactionSink,
    Q: QuerySink,
{
    pub fn new(
        config: GrpcConfig,
        handler: Arc<H>,
        query_handler: Arc<Q>,
        signer: MessageSigner,
        logger: Logger,
    ) -> Self {
        Self {
            config,
            handler,
            query_handler,
            signer,
            logger,
        }
    }

    /// Start the gRPC server. Blocks until the server is shut down.
    pub async fn serve(self) -> Result<(), tonic::transport::Error> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Start the gRPC server, stopping gracefully once `signal` resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), tonic::transport::Error>
    where
        F: Future<Output = ()>,
    {
        let addr = self.config.listen_addr;

        slog::info!(
            self.logger,
            "Starting gRPC server";
            "address" => %addr,
        );

        let sumeragi = SumeragiService::new(
            Arc::clone(&self.handler),
            self.signer.clone(),
            self.logger.new(slog::o!("service" => "sumeragi")),
        );
        let transaction_repository = TransactionRepositoryService::new(
            Arc::clone(&self.query_handler),
            self.logger.new(slog::o!("service" => "transaction_repository")),
        );
        let asset_repository = AssetRepositoryService::new(
            Arc::clone(&self.query_handler),
            self.logger.new(slog::o!("service" => "asset_repository")),
        );

        Server::builder()
            .add_service(SumeragiServer::new(sumeragi))
            .add_service(TransactionRepositoryServer::new(transaction_repository))
            .add_service(AssetRepositoryServer::new(asset_repository))
            .serve_with_shutdown(addr, signal)
            .await
    }
}
