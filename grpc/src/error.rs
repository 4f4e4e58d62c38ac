//! Error types for the transport fabric.

use thiserror::Error;
use tonic::Status;

/// Transport-level errors raised by the fabric.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Destination address is not in the peer directory. No connection is
    /// attempted.
    #[error("unknown peer address: {0}")]
    UnknownPeer(String),

    /// A returned confirmation did not verify.
    #[error("confirmation signature did not verify")]
    InvalidSignature,

    /// Dial, RPC or per-call timeout failure.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// Inbound message was malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<TransportError> for Status {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::UnknownPeer(addr) => {
                Status::failed_precondition(format!("unknown peer address: {}", addr))
            }
            TransportError::InvalidSignature => Status::unauthenticated(err.to_string()),
            TransportError::ConnectionFailure(msg) => Status::unavailable(msg),
            TransportError::InvalidArgument(msg) => Status::invalid_argument(msg),
        }
    }
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_error_kinds() {
        let status: Status = TransportError::UnknownPeer("10.0.0.9".into()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: Status = TransportError::InvalidSignature.into();
        assert_eq!(status.code(), tonic::Code::Unauthenticated);

        let status: Status = TransportError::ConnectionFailure("dial failed".into()).into();
        assert_eq!(status.code(), tonic::Code::Unavailable);

        let status: Status = TransportError::InvalidArgument("bad event".into()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }
}
