//! OnionWallet daemon: composition root for the transport and wallet
//! lifecycle crates.

pub mod adapters;
pub mod bootstrap;
pub mod cli;
