//! Errors a [`crate::engine::StrategyEngine`] implementation may raise.
//!
//! Per spec, failures inside the engine are caught by the worker loop and
//! converted to a diagnostic message; the tick continues. This type exists
//! so an implementation has something well-typed to raise before that
//! conversion happens.

#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("no market data available for {0}")]
    NoData(String),

    #[error("data provider error: {0}")]
    DataProvider(#[from] fiona_data::DataError),
}
