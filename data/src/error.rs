//! Crate-wide error type for `fiona-data`.

use fiona_markets::BrokerError;

use crate::range_store::RangeStoreError;

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    RangeStore(#[from] RangeStoreError),

    #[error("no broker client available: no current asset set and no default client configured")]
    NoBrokerAvailable,
}
