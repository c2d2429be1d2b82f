//! Crate-wide error aggregate for `fiona-markets`.

use crate::broker::BrokerError;
use crate::registry::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum MarketsError {
    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
