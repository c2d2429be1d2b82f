#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Brokers
//!
//! Concrete [`fiona_markets::BrokerClient`] implementations: IG (session
//! header auth), MEXC (OAuth bearer + refresh), and Kraken (HMAC-signed
//! REST). Each drives its connection lifecycle through the shared
//! [`reauth::ReauthState`] machine.

pub mod ig;
pub mod kraken;
pub mod mexc;
pub mod reauth;

pub use ig::{IgClient, IgConfig};
pub use kraken::{KrakenClient, KrakenConfig};
pub use mexc::{MexcClient, MexcConfig};
pub use reauth::ReauthState;
