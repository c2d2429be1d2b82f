//! Workspace-level error aggregate: the single catch-all the worker loop's
//! outermost boundary needs when a per-asset step can fail in any subsystem.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("markets error: {0}")]
    Markets(#[from] fiona_markets::MarketsError),

    #[error("broker error: {0}")]
    Broker(#[from] fiona_markets::BrokerError),

    #[error("market data error: {0}")]
    Data(#[from] fiona_data::DataError),

    #[error("strategy error: {0}")]
    Strategy(#[from] fiona_strategies::StrategyError),

    #[error("KI orchestration error: {0}")]
    Ki(#[from] fiona_ki::KiError),

    #[error("execution error: {0}")]
    Execution(#[from] fiona_execution::ExecutionError),

    #[error("storage error: {0}")]
    Storage(#[from] fiona_storage::StorageError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("task join error: {0}")]
    Join(String),
}

impl From<tokio::task::JoinError> for WorkerError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Join(format!("{value:?}"))
    }
}
