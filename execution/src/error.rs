//! Execution-side error type.

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("unknown session {0}")]
    UnknownSession(uuid::Uuid),

    #[error("broker error during live execution: {0}")]
    Broker(#[from] fiona_markets::BrokerError),
}
